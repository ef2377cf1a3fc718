/// Dummy payment provider implementation
///
/// Keeps intents in memory and reports them as `requires_payment_method`.
/// Useful for development and tests.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use super::{NewPaymentIntent, PaymentError, PaymentIntent, PaymentProvider, Result};

#[derive(Debug, Default)]
pub struct DummyProvider {
    intents: Mutex<HashMap<String, PaymentIntent>>,
}

impl DummyProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentProvider for DummyProvider {
    async fn create_intent(&self, request: &NewPaymentIntent) -> Result<PaymentIntent> {
        let id = format!("pi_dummy_{}", Uuid::new_v4().simple());
        let intent = PaymentIntent {
            client_secret: Some(format!("{}_secret", id)),
            id: id.clone(),
            amount: request.amount,
            currency: request.currency.clone(),
            status: "requires_payment_method".to_string(),
            user_id: Some(request.user_id),
        };

        self.intents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), intent.clone());

        tracing::info!(intent_id = %id, user_id = %request.user_id, "Dummy provider created payment intent");
        Ok(intent)
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent> {
        self.intents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(intent_id)
            .cloned()
            .ok_or_else(|| PaymentError::NotFound(intent_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_retrieve() {
        let provider = DummyProvider::new();
        let user_id = Uuid::new_v4();
        let created = provider
            .create_intent(&NewPaymentIntent {
                amount: 1000,
                currency: "usd".to_string(),
                description: None,
                user_id,
            })
            .await
            .unwrap();

        assert!(created.id.starts_with("pi_dummy_"));
        let fetched = provider.retrieve_intent(&created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.user_id, Some(user_id));

        assert!(matches!(
            provider.retrieve_intent("pi_missing").await,
            Err(PaymentError::NotFound(_))
        ));
    }
}
