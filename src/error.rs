//! # Uploader Errors

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds surfaced by route synthesis and the upload run.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("code: route_file_not_found, description: {0}")]
    RouteFileNotFound(String),

    #[error("code: invalid_route_file, description: {0}")]
    InvalidRouteFile(String),

    #[error("code: empty_route, description: {0}")]
    EmptyRoute(String),

    #[error("code: auth_error, description: {0}")]
    Auth(String),

    #[error("code: rule_fetch_error, description: {0}")]
    RuleFetch(String),

    #[error("code: upload_error, description: {0}")]
    Upload(String),

    #[error("code: route_rejected, description: {0}")]
    RouteRejected(String),

    #[error("code: config_error, description: {0}")]
    Config(String),

    #[error("code: cancelled")]
    Cancelled,
}

impl Error {
    /// Returns the machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &str {
        match self {
            Self::RouteFileNotFound(_) => "route_file_not_found",
            Self::InvalidRouteFile(_) => "invalid_route_file",
            Self::EmptyRoute(_) => "empty_route",
            Self::Auth(_) => "auth_error",
            Self::RuleFetch(_) => "rule_fetch_error",
            Self::Upload(_) => "upload_error",
            Self::RouteRejected(_) => "route_rejected",
            Self::Config(_) => "config_error",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns the error description without the code prefix.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::RouteFileNotFound(d)
            | Self::InvalidRouteFile(d)
            | Self::EmptyRoute(d)
            | Self::Auth(d)
            | Self::RuleFetch(d)
            | Self::Upload(d)
            | Self::RouteRejected(d)
            | Self::Config(d) => d.clone(),
            Self::Cancelled => "task stopped".to_string(),
        }
    }

    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("failed to parse config: {err}"))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn code_and_description() {
        let err = Error::EmptyRoute("no coordinates in user.txt".to_string());

        assert_eq!(err.code(), "empty_route");
        assert_eq!(err.description(), "no coordinates in user.txt");
        assert_eq!(
            err.to_string(),
            "code: empty_route, description: no coordinates in user.txt"
        );
    }

    #[test]
    fn cancelled_has_no_payload() {
        assert_eq!(Error::Cancelled.to_string(), "code: cancelled");
        assert!(Error::Cancelled.is_cancelled());
        assert!(!Error::Upload("timeout".to_string()).is_cancelled());
    }

    #[test]
    fn toml_errors_become_config_errors() {
        let err: Error = toml::from_str::<toml::Value>("RUN_TIMES = ").unwrap_err().into();

        assert_eq!(err.code(), "config_error");
        assert!(err.description().starts_with("failed to parse config"));
    }
}
