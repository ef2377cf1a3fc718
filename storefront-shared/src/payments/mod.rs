/// Payment provider abstraction
///
/// Defines the [`PaymentProvider`] trait used by the payment service to
/// create and look up payment intents. Intents are not persisted locally;
/// the provider is the source of truth.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod dummy;
pub mod stripe;

pub use dummy::DummyProvider;
pub use self::stripe::StripeProvider;

/// Result type for payment provider operations
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Errors that can occur while talking to a payment provider
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment provider API error: {0}")]
    ProviderApi(String),

    #[error("Payment intent not found: {0}")]
    NotFound(String),

    #[error("Invalid payment data: {0}")]
    InvalidData(String),
}

/// Request for a new payment intent
#[derive(Debug, Clone)]
pub struct NewPaymentIntent {
    /// Amount in the currency's smallest unit (cents for USD)
    pub amount: i64,

    /// ISO 4217 code, lowercase
    pub currency: String,

    pub description: Option<String>,

    /// User the intent is created for, stored in provider metadata
    pub user_id: Uuid,
}

/// Payment intent as reported by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,

    /// Secret the frontend uses to confirm the payment
    pub client_secret: Option<String>,

    pub amount: i64,

    pub currency: String,

    pub status: String,

    /// Owner recorded at creation
    #[serde(skip_serializing)]
    pub user_id: Option<Uuid>,
}

/// Abstract payment provider interface
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_intent(&self, request: &NewPaymentIntent) -> Result<PaymentIntent>;

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent>;
}
