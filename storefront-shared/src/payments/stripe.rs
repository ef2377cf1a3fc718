/// Stripe payment provider implementation

use async_trait::async_trait;
use stripe::{Client, CreatePaymentIntent, Currency, Metadata, PaymentIntentId, StripeError};

use super::{NewPaymentIntent, PaymentError, PaymentIntent, PaymentProvider, Result};

/// Stripe payment provider
pub struct StripeProvider {
    api_key: String,
    api_base: Option<String>,
}

impl std::fmt::Debug for StripeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeProvider")
            .field("api_key", &"[redacted]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl StripeProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: None,
        }
    }

    /// Points the provider at another API base, e.g. stripe-mock
    pub fn with_base_url(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: Some(api_base.into()),
        }
    }

    /// Get a Stripe client
    fn client(&self) -> Client {
        match &self.api_base {
            Some(base) => Client::from_url(base.as_str(), self.api_key.as_str()),
            None => Client::new(self.api_key.as_str()),
        }
    }
}

fn parse_currency(currency: &str) -> Result<Currency> {
    currency
        .parse()
        .map_err(|_| PaymentError::InvalidData(format!("Unsupported currency: {}", currency)))
}

fn parse_intent_id(intent_id: &str) -> Result<PaymentIntentId> {
    intent_id
        .parse()
        .map_err(|_| PaymentError::InvalidData("Invalid payment intent id".to_string()))
}

fn provider_error(err: StripeError, intent_id: &str) -> PaymentError {
    match err {
        StripeError::Stripe(ref request) if request.http_status == 404 => {
            PaymentError::NotFound(intent_id.to_string())
        }
        StripeError::Stripe(request) => PaymentError::ProviderApi(
            request
                .message
                .unwrap_or_else(|| format!("status {}", request.http_status)),
        ),
        other => PaymentError::ProviderApi(other.to_string()),
    }
}

fn user_metadata(request: &NewPaymentIntent) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("user_id".to_string(), request.user_id.to_string());
    metadata
}

impl From<stripe::PaymentIntent> for PaymentIntent {
    fn from(intent: stripe::PaymentIntent) -> Self {
        let user_id = intent
            .metadata
            .get("user_id")
            .and_then(|id| uuid::Uuid::parse_str(id).ok());

        Self {
            id: intent.id.to_string(),
            client_secret: intent.client_secret,
            amount: intent.amount,
            currency: intent.currency.to_string(),
            status: intent.status.as_str().to_string(),
            user_id,
        }
    }
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    async fn create_intent(&self, request: &NewPaymentIntent) -> Result<PaymentIntent> {
        let client = self.client();

        let mut params = CreatePaymentIntent::new(request.amount, parse_currency(&request.currency)?);
        params.metadata = Some(user_metadata(request));
        params.description = request.description.as_deref();

        let intent = stripe::PaymentIntent::create(&client, params)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %request.user_id, "Failed to create Stripe payment intent: {:?}", e);
                provider_error(e, "new")
            })?;

        tracing::info!(
            intent_id = %intent.id,
            user_id = %request.user_id,
            amount = intent.amount,
            "Created Stripe payment intent"
        );
        Ok(intent.into())
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent> {
        let id = parse_intent_id(intent_id)?;

        let intent = stripe::PaymentIntent::retrieve(&self.client(), &id, &[])
            .await
            .map_err(|e| provider_error(e, intent_id))?;

        Ok(intent.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_parse_currency() {
        assert_eq!(parse_currency("usd").unwrap(), Currency::USD);
        assert_eq!(parse_currency("eur").unwrap(), Currency::EUR);
        assert!(matches!(
            parse_currency("doubloons"),
            Err(PaymentError::InvalidData(_))
        ));
    }

    #[test]
    fn test_parse_intent_id() {
        assert!(parse_intent_id("pi_3MtwBwLkdIwHu7ix28a3tqPa").is_ok());
        assert!(matches!(
            parse_intent_id("cus_123"),
            Err(PaymentError::InvalidData(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_foreign_ids_before_calling_stripe() {
        let provider = StripeProvider::with_base_url("sk_test", "http://127.0.0.1:9");
        assert!(matches!(
            provider.retrieve_intent("../customers").await,
            Err(PaymentError::InvalidData(_))
        ));
    }

    #[test]
    fn test_user_metadata() {
        let user_id = Uuid::new_v4();
        let request = NewPaymentIntent {
            amount: 2599,
            currency: "usd".to_string(),
            description: None,
            user_id,
        };
        let metadata = user_metadata(&request);
        assert_eq!(metadata.get("user_id"), Some(&user_id.to_string()));
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug = format!("{:?}", StripeProvider::new("sk_live_secret"));
        assert!(!debug.contains("sk_live_secret"));
    }
}
