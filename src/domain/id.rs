use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::error::GatewayError;

/// Processor-assigned identifier for a payment attempt.
///
/// Inbound return/callback requests carry it as a query/form field; an empty
/// value is rejected here, before any order lookup happens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Result<Self, GatewayError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(GatewayError::MalformedRequest(
                "transaction id not provided".into(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Order-correlation token echoed back by the processor. The processor may
/// echo either the value we stored on the order or the order id itself, so
/// lookups try both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceId(String);

impl ReferenceId {
    pub fn new(id: impl Into<String>) -> Result<Self, GatewayError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(GatewayError::MalformedRequest(
                "reference id not provided".into(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}
