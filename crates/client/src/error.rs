use std::path::PathBuf;
use studionavi_common::{FailureKind, FetchFailure, Studio};
use thiserror::Error;

pub const NETWORK_ERROR_CODE: &str = "NETWORK_ERROR";
pub const UNKNOWN_ERROR_CODE: &str = "UNKNOWN_ERROR";
pub const NETWORK_ERROR_MESSAGE: &str = "サーバーとの接続に失敗しました";
pub const UNKNOWN_ERROR_MESSAGE: &str = "予期しないエラーが発生しました";

/// Why one request to the studio API did not produce a result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// Connection refused, DNS failure, timeout.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with an error envelope.
    #[error("server error {code}: {message}")]
    Server {
        code: String,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("unexpected response: {0}")]
    Unknown(String),
}

impl FetchError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            FetchError::Network(err.to_string())
        } else {
            FetchError::Unknown(err.to_string())
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Network(_) => FailureKind::Network,
            FetchError::Server { .. } => FailureKind::Server,
            FetchError::Unknown(_) => FailureKind::Unknown,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            FetchError::Network(_) => NETWORK_ERROR_CODE,
            FetchError::Server { code, .. } => code.as_str(),
            FetchError::Unknown(_) => UNKNOWN_ERROR_CODE,
        }
    }

    /// Text suitable for showing to the user. Details of network and
    /// unknown failures go to the log instead.
    pub fn user_message(&self) -> &str {
        match self {
            FetchError::Network(_) => NETWORK_ERROR_MESSAGE,
            FetchError::Server { message, .. } if !message.is_empty() => message.as_str(),
            FetchError::Server { .. } | FetchError::Unknown(_) => UNKNOWN_ERROR_MESSAGE,
        }
    }

    pub fn into_failure(self, studio: &Studio) -> FetchFailure {
        FetchFailure {
            studio_id: studio.id,
            studio_name: studio.name.clone(),
            error_message: self.user_message().to_string(),
            error_code: self.code().to_string(),
            kind: self.kind(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid API base URL `{value}`: {reason}")]
    InvalidBaseUrl { value: String, reason: String },

    #[error("invalid value for {key}: `{value}`")]
    InvalidValue { key: &'static str, value: String },

    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn studio() -> Studio {
        Studio::placeholder(7)
    }

    #[test]
    fn network_failure_uses_fixed_message() {
        let failure = FetchError::Network("connection refused".into()).into_failure(&studio());
        assert_eq!(failure.studio_id, 7);
        assert_eq!(failure.error_code, NETWORK_ERROR_CODE);
        assert_eq!(failure.error_message, NETWORK_ERROR_MESSAGE);
        assert_eq!(failure.kind, FailureKind::Network);
    }

    #[test]
    fn server_failure_is_verbatim() {
        let err = FetchError::Server {
            code: "STUDIO_NOT_CONFIGURED".into(),
            message: "このスタジオは空き状況確認に対応していません".into(),
            details: None,
        };
        let failure = err.into_failure(&studio());
        assert_eq!(failure.error_code, "STUDIO_NOT_CONFIGURED");
        assert_eq!(failure.error_message, "このスタジオは空き状況確認に対応していません");
        assert_eq!(failure.kind, FailureKind::Server);
    }

    #[test]
    fn server_failure_without_message_falls_back() {
        let err = FetchError::Server {
            code: "X".into(),
            message: String::new(),
            details: None,
        };
        assert_eq!(err.user_message(), UNKNOWN_ERROR_MESSAGE);
        assert_eq!(err.code(), "X");
    }

    #[test]
    fn unknown_failure_hides_details() {
        let err = FetchError::Unknown("expected value at line 1 column 1".into());
        assert_eq!(err.user_message(), UNKNOWN_ERROR_MESSAGE);
        assert_eq!(err.code(), UNKNOWN_ERROR_CODE);
    }
}
