//! Client identity extractor.
//!
//! Annotators are not authenticated. A client may name itself with the
//! `x-client-id` header; the value only reaches logs and the annotation's
//! audit column.

use annotator_core::annotation::validate_client_id;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;

/// Header carrying the caller's self-reported identity.
pub const CLIENT_ID_HEADER: &str = "x-client-id";

/// Identity used when the header is absent or blank.
pub const ANONYMOUS_CLIENT: &str = "anonymous";

/// The caller's client id, taken from the `x-client-id` header.
///
/// ```ignore
/// async fn my_handler(client: ClientId) -> AppResult<Json<()>> {
///     tracing::info!(client_id = %client.0, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(pub String);

impl ClientId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for ClientId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(CLIENT_ID_HEADER) else {
            return Ok(ClientId(ANONYMOUS_CLIENT.to_string()));
        };

        let value = raw
            .to_str()
            .map_err(|_| AppError::BadRequest(format!("{CLIENT_ID_HEADER} must be ASCII")))?
            .trim();

        if value.is_empty() {
            return Ok(ClientId(ANONYMOUS_CLIENT.to_string()));
        }

        validate_client_id(value)?;
        Ok(ClientId(value.to_string()))
    }
}
