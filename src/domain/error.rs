//! Application error types with proper error chaining.

use thiserror::Error;

/// Failures talking to the node's REST API.
#[derive(Error, Debug, Clone)]
pub enum NodeApiError {
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("Malformed response body: {0}")]
    Decode(String),
}

/// Failures deriving numeric values from a decoded node status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainStatusError {
    #[error("Invalid block height: {0:?}")]
    InvalidHeight(String),
    #[error("Invalid block timestamp: {0:?}")]
    InvalidTimestamp(String),
    #[error("Time skew does not fit in nanoseconds: {0}")]
    SkewOutOfRange(String),
}

#[derive(Error, Debug, Clone)]
pub enum AddressBookError {
    #[error("Cannot read address book: {0}")]
    FileAccess(String),
    #[error("Malformed address book: {0}")]
    FileFormat(String),
}

#[derive(Error, Debug, Clone)]
pub enum ConnectionTableError {
    #[error("Connection table unavailable: {0}")]
    Unavailable(String),
    #[error("Connection table not supported on this platform")]
    Unsupported,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    NodeApi(#[from] NodeApiError),
    #[error(transparent)]
    ChainStatus(#[from] ChainStatusError),
    #[error(transparent)]
    AddressBook(#[from] AddressBookError),
    #[error(transparent)]
    ConnectionTable(#[from] ConnectionTableError),
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Operation not supported: {0}")]
    NotSupported(String),
}

impl From<reqwest::Error> for NodeApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NodeApiError::Timeout(err.to_string())
        } else if err.is_decode() {
            NodeApiError::Decode(err.to_string())
        } else {
            NodeApiError::Connection(err.to_string())
        }
    }
}

impl From<serde_json::Error> for NodeApiError {
    fn from(err: serde_json::Error) -> Self {
        NodeApiError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for AddressBookError {
    fn from(err: std::io::Error) -> Self {
        AddressBookError::FileAccess(err.to_string())
    }
}

impl From<serde_json::Error> for AddressBookError {
    fn from(err: serde_json::Error) -> Self {
        AddressBookError::FileFormat(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_json_error_conversions() {
        let json_err = serde_json::from_str::<String>("invalid json").unwrap_err();
        let api_err = NodeApiError::from(json_err);
        assert!(matches!(api_err, NodeApiError::Decode(_)));

        let json_err = serde_json::from_str::<String>("{").unwrap_err();
        let book_err = AddressBookError::from(json_err);
        assert!(matches!(book_err, AddressBookError::FileFormat(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let book_err = AddressBookError::from(io_err);
        assert!(matches!(book_err, AddressBookError::FileAccess(msg) if msg.contains("no such file")));
    }

    #[test]
    fn test_node_api_error_display() {
        let err = NodeApiError::Connection("refused".to_string());
        assert_eq!(err.to_string(), "Connection failed: refused");

        let err = NodeApiError::Timeout("10s".to_string());
        assert_eq!(err.to_string(), "Request timed out: 10s");

        let err = NodeApiError::Decode("eof".to_string());
        assert_eq!(err.to_string(), "Malformed response body: eof");
    }

    #[test]
    fn test_chain_status_error_display() {
        let err = ChainStatusError::InvalidHeight("abc".to_string());
        assert_eq!(err.to_string(), "Invalid block height: \"abc\"");

        let err = ChainStatusError::InvalidTimestamp(String::new());
        assert_eq!(err.to_string(), "Invalid block timestamp: \"\"");
    }

    #[test]
    fn test_peer_source_error_display() {
        let err = AddressBookError::FileAccess("denied".to_string());
        assert_eq!(err.to_string(), "Cannot read address book: denied");

        let err = AddressBookError::FileFormat("expected value".to_string());
        assert_eq!(err.to_string(), "Malformed address book: expected value");

        let err = ConnectionTableError::Unsupported;
        assert_eq!(
            err.to_string(),
            "Connection table not supported on this platform"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue {
            key: "listen-address".to_string(),
            message: "not a socket address".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid value for 'listen-address': not a socket address"
        );
    }

    #[test]
    fn test_app_error_is_transparent() {
        let app_err: AppError = NodeApiError::Timeout("5s".to_string()).into();
        assert!(matches!(app_err, AppError::NodeApi(NodeApiError::Timeout(_))));
        assert_eq!(app_err.to_string(), "Request timed out: 5s");

        let app_err: AppError = ChainStatusError::InvalidHeight("x".to_string()).into();
        assert!(matches!(app_err, AppError::ChainStatus(_)));

        let app_err: AppError = ConnectionTableError::Unavailable("eperm".to_string()).into();
        assert!(matches!(
            app_err,
            AppError::ConnectionTable(ConnectionTableError::Unavailable(_))
        ));
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::Internal("join".to_string());
        assert_eq!(err.to_string(), "Internal error: join");

        let err = AppError::NotSupported("validators".to_string());
        assert_eq!(err.to_string(), "Operation not supported: validators");
    }
}
