//! User-facing text for failed requests.
//!
//! Server messages are shown only when they come in the structured
//! `{message, code}` format or when a legacy `{error}` string carries no
//! backend vocabulary. Everything else falls back to a fixed message per
//! status code.

use crate::types::ServerErrorBody;

pub const GENERIC_PROCESSING: &str =
    "Something went wrong while processing the request. Please try again.";
pub const INVALID_DATA: &str =
    "The submitted data is not valid. Please check the fields and try again.";
pub const SESSION_EXPIRED: &str =
    "Your session has expired or the credentials are invalid. Please sign in again.";
pub const FORBIDDEN: &str = "You do not have permission to perform this action.";
pub const NOT_FOUND: &str = "The requested resource was not found.";
pub const CONFLICT: &str = "A resource with this data already exists. Please check the information.";
pub const SERVER_ERROR: &str = "The server ran into an error. Please try again later.";
pub const UNEXPECTED: &str = "An unexpected error occurred. Please try again.";
pub const CONNECTION_FAILED: &str =
    "Could not reach the server. Please check your internet connection.";
pub const TIMED_OUT: &str = "The request took too long. Please try again.";
pub const NETWORK_ERROR: &str = "A network error occurred. Please try again.";

/// Backend vocabulary that must never reach the user.
const TECHNICAL_MARKERS: [&str; 6] = [
    "SQL",
    "Exception",
    "Constraint",
    "Table",
    "Column",
    "Foreign key",
];

/// Pick the message to show for a failed response.
#[must_use]
pub fn safe_error_message(status: u16, body: Option<&ServerErrorBody>) -> String {
    if let Some(body) = body {
        if let (Some(message), Some(_)) = (&body.message, &body.code) {
            return message.clone();
        }
        if let Some(error) = &body.error {
            if is_technical(error) {
                return GENERIC_PROCESSING.to_string();
            }
            return error.clone();
        }
    }
    status_message(status).to_string()
}

/// Fixed message for a status code.
#[must_use]
pub fn status_message(status: u16) -> &'static str {
    match status {
        400 | 422 => INVALID_DATA,
        401 => SESSION_EXPIRED,
        403 => FORBIDDEN,
        404 => NOT_FOUND,
        409 => CONFLICT,
        500 | 502 | 503 => SERVER_ERROR,
        _ => UNEXPECTED,
    }
}

fn is_technical(message: &str) -> bool {
    TECHNICAL_MARKERS.iter().any(|marker| message.contains(marker))
}

/// Read a failed response's body and pick the message to show.
///
/// A body that is not a JSON error object falls back to the status message.
#[cfg(feature = "gateway")]
pub async fn response_error_message(response: reqwest::Response) -> String {
    let status = response.status().as_u16();
    let body = match response.json::<ServerErrorBody>().await {
        Ok(body) => Some(body),
        Err(e) => {
            tracing::debug!(status, error = %e, "Error response without a JSON body");
            None
        }
    };
    safe_error_message(status, body.as_ref())
}

/// Message for a request that never produced a response.
#[cfg(feature = "gateway")]
#[must_use]
pub fn network_error_message(error: &reqwest::Error) -> &'static str {
    if error.is_timeout() {
        TIMED_OUT
    } else if error.is_connect() {
        CONNECTION_FAILED
    } else {
        NETWORK_ERROR
    }
}

/// Message for any crate error surfaced to the user.
#[must_use]
pub fn crate_error_message(error: &crate::Error) -> &'static str {
    match error {
        #[cfg(feature = "gateway")]
        crate::Error::Http(e) => network_error_message(e),
        _ => UNEXPECTED,
    }
}
