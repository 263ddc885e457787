use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use subtle::ConstantTimeEq;
use validator::Validate;

use crate::{
    config::get_config,
    dto::payment_dto::{SignRequest, SignResponse},
    error::{Error, Result},
    AppState,
};

/// Trusted signing endpoint: computes the PaySky secure hash for an untrusted
/// checkout client, so the shared secret never ships to the client.
pub async fn sign_transaction(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Json(request): Json<SignRequest>,
) -> Result<(StatusCode, Json<SignResponse>)> {
    verify_agent_secret(&headers)?;
    request.validate()?;

    let secure_hash = state.signing_service.sign(
        request.amount,
        &request.merchant_reference,
        &request.trx_date_time,
    )?;

    Ok((
        StatusCode::OK,
        Json(SignResponse {
            secure_hash,
            merchant_id: state.signing_service.merchant_id().to_string(),
            terminal_id: state.signing_service.terminal_id().to_string(),
        }),
    ))
}

pub async fn list_payments(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let records = state.payment_ledger.list()?;
    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "payments": records })),
    ))
}

/// Test tooling only: reopens a terminal payment record so a checkout can be
/// replayed against it.
pub async fn reset_payment(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Path(reference): Path<String>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    verify_agent_secret(&headers)?;
    let record = state.payment_ledger.reset_to_pending(&reference)?;
    Ok((
        StatusCode::OK,
        Json(serde_json::to_value(record)?),
    ))
}

fn verify_agent_secret(headers: &axum::http::HeaderMap) -> Result<()> {
    let provided = headers
        .get("x-agent-secret")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::Unauthorized("Missing agent secret".to_string()))?;

    let expected = get_config().agent_secret.as_bytes();
    if provided.as_bytes().ct_eq(expected).unwrap_u8() == 1 {
        Ok(())
    } else {
        Err(Error::Unauthorized("Invalid agent secret".to_string()))
    }
}
