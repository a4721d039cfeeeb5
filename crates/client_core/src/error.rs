use reqwest::StatusCode;
use thiserror::Error;
use tracing::warn;

/// Every failure a page can hit while talking to the backend.
///
/// The first four variants mirror how a request can go wrong: the server answered with an
/// error status, nothing came back, the request could not be built, or the body did not
/// decode.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("server responded with {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("no response from server: {0}")]
    NoResponse(#[source] reqwest::Error),
    #[error("failed to set up request: {0}")]
    Setup(String),
    #[error("unexpected response body: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("{resource} kept changing during update; gave up after {attempts} attempts")]
    Conflict { resource: String, attempts: usize },
    #[error("not logged in: no stored user id")]
    NotLoggedIn,
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_precondition_failed(&self) -> bool {
        self.status() == Some(StatusCode::PRECONDITION_FAILED)
    }

    /// Writes the failure to the diagnostic log. Nothing is shown to the user.
    pub fn report(&self, context: &str) {
        match self {
            ClientError::Status { status, body } => warn!(
                context,
                status = status.as_u16(),
                body = %body,
                "request failed: server responded with error status"
            ),
            ClientError::NoResponse(err) => warn!(
                context,
                error = %err,
                "request failed: no response received"
            ),
            ClientError::Setup(message) => warn!(
                context,
                error = %message,
                "request failed: could not set up request"
            ),
            ClientError::Decode(err) => warn!(
                context,
                error = %err,
                "request failed: response body did not decode"
            ),
            ClientError::Conflict { resource, attempts } => warn!(
                context,
                resource = %resource,
                attempts,
                "update abandoned: resource changed on every attempt"
            ),
            ClientError::NotLoggedIn => warn!(context, "request skipped: not logged in"),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return ClientError::Status {
                status,
                body: String::new(),
            };
        }
        if err.is_decode() {
            ClientError::Decode(err)
        } else if err.is_builder() {
            ClientError::Setup(err.to_string())
        } else {
            ClientError::NoResponse(err)
        }
    }
}
