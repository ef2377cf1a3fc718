/// Payment intents
///
/// Thin layer over [`PaymentProvider`]: validates the request, tags the
/// intent with the caller's user id, and refuses to show an intent to
/// anyone but its owner.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult, Dependency, Entity};
use crate::payments::{NewPaymentIntent, PaymentError, PaymentIntent, PaymentProvider};

fn default_currency() -> String {
    "usd".to_string()
}

/// Payload for creating an intent; `amount` is in the currency's minor unit
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePaymentIntent {
    #[validate(range(min = 50, max = 99_999_999, message = "amount must be between 50 and 99999999"))]
    pub amount: i64,

    #[serde(default = "default_currency")]
    #[validate(length(equal = 3, message = "currency must be a three-letter ISO code"))]
    pub currency: String,

    #[validate(length(max = 500, message = "description must be at most 500 characters"))]
    pub description: Option<String>,
}

pub struct PaymentService {
    provider: Option<Arc<dyn PaymentProvider>>,
}

impl PaymentService {
    pub fn new(provider: Option<Arc<dyn PaymentProvider>>) -> Self {
        Self { provider }
    }

    fn provider(&self) -> AppResult<&dyn PaymentProvider> {
        self.provider
            .as_deref()
            .ok_or(AppError::NotConfigured(Dependency::PaymentProvider))
    }

    pub async fn create_intent(
        &self,
        user_id: Uuid,
        request: CreatePaymentIntent,
    ) -> AppResult<PaymentIntent> {
        let provider = self.provider()?;
        request.validate()?;
        if !request.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(AppError::InvalidRequest(
                "currency must be a three-letter ISO code".to_string(),
            ));
        }

        let intent = provider
            .create_intent(&NewPaymentIntent {
                amount: request.amount,
                currency: request.currency.to_ascii_lowercase(),
                description: request.description,
                user_id,
            })
            .await
            .map_err(payment_error)?;

        debug!(user_id = %user_id, intent_id = %intent.id, amount = intent.amount, "Payment intent created");
        Ok(intent)
    }

    /// Another user's intent is reported as missing
    pub async fn get_intent(&self, user_id: Uuid, intent_id: &str) -> AppResult<PaymentIntent> {
        let intent = self
            .provider()?
            .retrieve_intent(intent_id)
            .await
            .map_err(payment_error)?;

        if intent.user_id != Some(user_id) {
            return Err(AppError::NotFound(Entity::PaymentIntent));
        }
        Ok(intent)
    }
}

fn payment_error(err: PaymentError) -> AppError {
    match err {
        PaymentError::NotFound(_) => AppError::NotFound(Entity::PaymentIntent),
        PaymentError::InvalidData(message) => AppError::InvalidRequest(message),
        other => AppError::Payment(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::dummy::DummyProvider;

    fn service() -> PaymentService {
        PaymentService::new(Some(Arc::new(DummyProvider::new())))
    }

    fn request(amount: i64, currency: &str) -> CreatePaymentIntent {
        CreatePaymentIntent {
            amount,
            currency: currency.to_string(),
            description: Some("Order #1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_own_intent() {
        let service = service();
        let user_id = Uuid::new_v4();

        let intent = service.create_intent(user_id, request(2500, "USD")).await.unwrap();
        assert_eq!(intent.amount, 2500);
        assert_eq!(intent.currency, "usd");
        assert!(intent.client_secret.is_some());

        let fetched = service.get_intent(user_id, &intent.id).await.unwrap();
        assert_eq!(fetched.id, intent.id);
    }

    #[tokio::test]
    async fn test_other_users_intent_is_not_found() {
        let service = service();
        let intent = service
            .create_intent(Uuid::new_v4(), request(2500, "usd"))
            .await
            .unwrap();

        let err = service.get_intent(Uuid::new_v4(), &intent.id).await.unwrap_err();
        assert_eq!(err.code(), "payment_intent_not_found");

        let err = service.get_intent(Uuid::new_v4(), "pi_missing").await.unwrap_err();
        assert_eq!(err.code(), "payment_intent_not_found");
    }

    #[tokio::test]
    async fn test_validation() {
        let service = service();
        let user_id = Uuid::new_v4();

        for bad in [request(0, "usd"), request(-5, "usd"), request(100, "us"), request(100, "u5d")] {
            let err = service.create_intent(user_id, bad).await.unwrap_err();
            assert_eq!(err.code(), "invalid_request");
        }
    }

    #[tokio::test]
    async fn test_missing_provider() {
        let service = PaymentService::new(None);
        let err = service
            .create_intent(Uuid::new_v4(), request(100, "usd"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "not_configured");
    }
}
