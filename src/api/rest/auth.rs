use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const PAYMENT_CALLBACK_HEADER: &str = "x-payment-callback-token";

/// The authenticated caller, taken from the identity header set by the
/// upstream auth layer.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized(format!("missing {USER_ID_HEADER} header")))?
            .to_str()
            .map_err(|_| AppError::Unauthorized(format!("{USER_ID_HEADER} is not ascii")))?;

        let user_id = Uuid::parse_str(raw.trim())
            .map_err(|err| AppError::Unauthorized(format!("invalid {USER_ID_HEADER}: {err}")))?;

        Ok(CurrentUser(user_id))
    }
}

/// Marks a request as coming from the payment collaborator: the callback
/// header must match the configured token.
#[derive(Debug, Clone, Copy)]
pub struct PaymentCallback;

#[async_trait]
impl FromRequestParts<Arc<AppState>> for PaymentCallback {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let expected = state.payment_callback_token.as_deref().ok_or_else(|| {
            AppError::Unauthorized("payment callbacks are not configured".to_string())
        })?;

        let presented = parts
            .headers
            .get(PAYMENT_CALLBACK_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                AppError::Unauthorized(format!("missing {PAYMENT_CALLBACK_HEADER} header"))
            })?;

        if presented.trim() != expected {
            return Err(AppError::Unauthorized(format!(
                "invalid {PAYMENT_CALLBACK_HEADER}"
            )));
        }

        Ok(PaymentCallback)
    }
}
