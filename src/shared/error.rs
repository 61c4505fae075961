use std::fmt;

/// エンタイトルメント処理全体で使うエラー型
///
/// 単一フライトで合流した全呼び出し元へ同じ失敗を配るため `Clone` を実装する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    Network(String),
    Timeout(String),
    MalformedResponse(String),
    Storage(String),
    SerializationError(String),
    DeserializationError(String),
    UnknownFeature(String),
    UnknownProduct(String),
    ConfigurationError(String),
    InvalidInput(String),
    Internal(String),
}

impl AppError {
    /// リモート由来の失敗（キャッシュ層でフォールバックされる種類）か
    pub fn is_remote_failure(&self) -> bool {
        matches!(
            self,
            AppError::Network(_)
                | AppError::Timeout(_)
                | AppError::MalformedResponse(_)
                | AppError::DeserializationError(_)
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Network(msg) => write!(f, "Network error: {}", msg),
            AppError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            AppError::MalformedResponse(msg) => write!(f, "Malformed response: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            AppError::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            AppError::UnknownFeature(msg) => write!(f, "Unknown feature: {}", msg),
            AppError::UnknownProduct(msg) => write!(f, "Unknown product: {}", msg),
            AppError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            AppError::DeserializationError(err.to_string())
        } else {
            AppError::SerializationError(err.to_string())
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout(err.to_string())
        } else if err.is_decode() {
            AppError::MalformedResponse(err.to_string())
        } else {
            AppError::Network(err.to_string())
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        AppError::Internal(err)
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        AppError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
