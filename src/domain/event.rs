use {
    super::error::GatewayError,
    super::id::ReferenceId,
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Server-to-server events the processor pushes to the webhook endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WebhookEventKind {
    #[serde(rename = "payment.success")]
    PaymentSuccess,
    #[serde(rename = "payment.failed")]
    PaymentFailed,
    #[serde(rename = "refund.completed")]
    RefundCompleted,
}

impl WebhookEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentSuccess => "payment.success",
            Self::PaymentFailed => "payment.failed",
            Self::RefundCompleted => "refund.completed",
        }
    }
}

impl fmt::Display for WebhookEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A verified webhook delivery, parsed from the raw payload. The payload
/// itself is authoritative here — webhooks are signed, so no status query
/// back to the processor is needed.
#[derive(Debug, Clone)]
pub struct WebhookNotice {
    pub kind: WebhookEventKind,
    pub reference_id: ReferenceId,
    pub transaction_id: Option<String>,
    pub signature: String,
    pub raw: serde_json::Value,
}

impl WebhookNotice {
    /// Parse a raw (already signature-verified) webhook body. Returns
    /// Ok(None) for event types we do not handle — those are acknowledged
    /// and dropped, not errors.
    pub fn parse(raw: serde_json::Value, signature: String) -> Result<Option<Self>, GatewayError> {
        let event = raw
            .get("event")
            .and_then(|v| v.as_str())
            .ok_or_else(|| GatewayError::MalformedRequest("webhook event not provided".into()))?;

        let kind = match event {
            "payment.success" => WebhookEventKind::PaymentSuccess,
            "payment.failed" => WebhookEventKind::PaymentFailed,
            "refund.completed" => WebhookEventKind::RefundCompleted,
            other => {
                tracing::warn!(event = %other, "unknown webhook event, acknowledging without action");
                return Ok(None);
            }
        };

        let reference_id = raw
            .get("referenceId")
            .and_then(|v| v.as_str())
            .map(ReferenceId::new)
            .transpose()?
            .ok_or_else(|| {
                GatewayError::MalformedRequest("webhook referenceId not provided".into())
            })?;

        let transaction_id = raw
            .get("transactionId")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string);

        Ok(Some(Self {
            kind,
            reference_id,
            transaction_id,
            signature,
            raw,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_success_event() {
        let raw = serde_json::json!({
            "event": "payment.success",
            "referenceId": "hp_123",
            "transactionId": "txn_9",
        });
        let notice = WebhookNotice::parse(raw, "sig".into()).unwrap().unwrap();
        assert_eq!(notice.kind, WebhookEventKind::PaymentSuccess);
        assert_eq!(notice.reference_id.as_str(), "hp_123");
        assert_eq!(notice.transaction_id.as_deref(), Some("txn_9"));
    }

    #[test]
    fn unknown_event_is_dropped_not_errored() {
        let raw = serde_json::json!({"event": "payout.settled", "referenceId": "hp_1"});
        assert!(WebhookNotice::parse(raw, "sig".into()).unwrap().is_none());
    }

    #[test]
    fn missing_reference_is_malformed() {
        let raw = serde_json::json!({"event": "payment.success"});
        assert!(WebhookNotice::parse(raw, "sig".into()).is_err());
    }
}
