/// Payment intent endpoints
///
/// - `POST /v1/payments/intents` - Create an intent for the caller
/// - `GET /v1/payments/intents/:id` - Fetch one of the caller's intents
///
/// The frontend confirms payment with the returned `client_secret`.

use crate::{
    app::AppState,
    error::ApiResult,
    extractors::{AppJson, AppPath, CurrentUser},
};
use axum::{extract::State, http::StatusCode, Json};
use storefront_shared::{payments::PaymentIntent, services::payment::CreatePaymentIntent};
use tracing::info;

pub async fn create_intent(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(req): AppJson<CreatePaymentIntent>,
) -> ApiResult<(StatusCode, Json<PaymentIntent>)> {
    let intent = state
        .services
        .payment_service()
        .create_intent(user.id, req)
        .await?;

    info!(user_id = %user.id, intent_id = %intent.id, amount = intent.amount, "Payment intent created");
    Ok((StatusCode::CREATED, Json(intent)))
}

pub async fn get_intent(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<String>,
) -> ApiResult<Json<PaymentIntent>> {
    let intent = state
        .services
        .payment_service()
        .get_intent(user.id, &id)
        .await?;
    Ok(Json(intent))
}
