use std::fmt::{Display, Formatter};

/// Which step of the session lifecycle failed.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    /// Logging in failed, either locally (missing credentials) or remotely.
    Auth,
    /// A query failed after, or while, being authenticated.
    Request,
}

/// A terminal failure surfaced by [`crate::SessionClient`].
///
/// `code` is the HTTP status of the response or `0` when no response was received.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub code: u16,
    pub message: String,
    pub body: String,
}

impl ApiError {
    pub(crate) fn missing_credentials() -> Self {
        Self {
            kind: ErrorKind::Auth,
            code: 0,
            message: "You must supply a username and a password".to_string(),
            body: String::new(),
        }
    }

    pub(crate) fn auth_status(code: u16, body: String) -> Self {
        Self {
            kind: ErrorKind::Auth,
            code,
            message: format!("Unable to authenticate, received {code}"),
            body,
        }
    }

    pub(crate) fn request_status(code: u16, body: String) -> Self {
        Self {
            kind: ErrorKind::Request,
            code,
            message: format!("Unexpected response code: {code}"),
            body,
        }
    }

    /// Classify a failure where no response was received at all.
    pub(crate) fn no_response(kind: ErrorKind, cause: &anyhow::Error) -> Self {
        let message = match kind {
            ErrorKind::Auth => format!("Unable to authenticate, no response: {cause:#}"),
            ErrorKind::Request => format!("No response: {cause:#}"),
        };
        Self {
            kind,
            code: 0,
            message,
            body: String::new(),
        }
    }

    /// Classify a failure where the status arrived but the body did not.
    pub(crate) fn unread_body(kind: ErrorKind, code: u16, cause: &anyhow::Error) -> Self {
        Self {
            kind,
            code,
            message: format!("Incomplete response: {cause:#}"),
            body: String::new(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let Self { message, body, .. } = self;
        if body.is_empty() {
            write!(f, "{message}")
        } else {
            write!(f, "{message}:\n{body}")
        }
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_body_when_present() {
        let error = ApiError::request_status(500, "error".to_string());
        assert_eq!(error.to_string(), "Unexpected response code: 500:\nerror");
    }

    #[test]
    fn display_omits_empty_body() {
        let error = ApiError::missing_credentials();
        assert_eq!(error.kind(), ErrorKind::Auth);
        assert_eq!(error.code, 0);
        assert_eq!(error.to_string(), "You must supply a username and a password");
    }

    #[test]
    fn no_response_keeps_the_cause() {
        let cause = anyhow::anyhow!("operation timed out");
        let error = ApiError::no_response(ErrorKind::Request, &cause);
        assert_eq!(error.code, 0);
        assert!(error.message.contains("operation timed out"));
    }

    #[test]
    fn unread_body_keeps_the_status() {
        let cause = anyhow::anyhow!("connection reset");
        let error = ApiError::unread_body(ErrorKind::Auth, 200, &cause);
        assert_eq!(error.code, 200);
        assert!(error.message.contains("connection reset"));
    }
}
