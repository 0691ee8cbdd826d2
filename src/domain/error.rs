use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Credentials missing or unusable — the gateway behaves as disabled.
    #[error("configuration: {0}")]
    Configuration(String),

    /// Transport failure or processor-reported error. Not retried here;
    /// retry policy belongs to the caller.
    #[error("remote: {0}")]
    Remote(String),

    #[error("webhook signature: {0}")]
    Signature(String),

    #[error("order not found: {0}")]
    OrderNotFound(String),

    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// Processor accepted the request but returned no usable payment URL.
    #[error("initiation: {0}")]
    Initiation(String),

    #[error("storage: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}
