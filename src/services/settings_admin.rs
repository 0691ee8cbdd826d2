use {
    crate::domain::error::GatewayError,
    crate::domain::gateway::PaymentGateway,
    crate::domain::settings::{ApiEndpoint, GatewaySettings, Mode},
    crate::domain::stores::SettingsStore,
    serde::Deserialize,
};

/// Admin settings update payload. String enums are validated here, before
/// anything touches the store.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsUpdate {
    pub enabled: bool,
    pub mode: String,
    pub api_key: String,
    pub api_secret: String,
    pub api_endpoint: String,
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

pub async fn update_settings(
    store: &dyn SettingsStore,
    update: SettingsUpdate,
) -> Result<GatewaySettings, GatewayError> {
    let mode = Mode::try_from(update.mode.as_str())?;
    let api_endpoint = ApiEndpoint::try_from(update.api_endpoint.as_str())?;

    if update.enabled && (update.api_key.trim().is_empty() || update.api_secret.trim().is_empty())
    {
        return Err(GatewayError::MalformedRequest(
            "api_key and api_secret are required to enable the gateway".into(),
        ));
    }

    let webhook_secret = update
        .webhook_secret
        .filter(|s| !s.trim().is_empty());

    if update.enabled && webhook_secret.is_none() {
        // Deliberate development affordance, never a silent default.
        tracing::warn!(
            mode = %mode,
            "gateway enabled without a webhook secret; webhooks are unverifiable \
             and will be rejected in live mode"
        );
    }

    let previous = store.load().await?;
    let settings = GatewaySettings {
        enabled: update.enabled,
        mode,
        api_key: update.api_key,
        api_secret: update.api_secret,
        api_endpoint,
        webhook_secret,
        last_tested_at: previous.as_ref().and_then(|s| s.last_tested_at),
        credentials_valid: previous.map(|s| s.credentials_valid).unwrap_or(false),
    };
    store.save(&settings).await?;

    tracing::info!(enabled = settings.enabled, mode = %settings.mode, "gateway settings updated");
    Ok(settings)
}

/// Admin "test connection" action: probe the processor with the current
/// credentials and stamp the result on the settings row.
pub async fn test_connection(
    store: &dyn SettingsStore,
    gateway: &dyn PaymentGateway,
) -> Result<bool, GatewayError> {
    let valid = gateway.validate_credentials().await;
    store.mark_tested(valid).await?;

    if valid {
        tracing::info!("credential probe succeeded");
    } else {
        tracing::warn!("credential probe failed");
    }
    Ok(valid)
}

/// Settings as exposed to the admin UI: secrets reduced to set/unset flags.
pub fn masked_view(settings: &GatewaySettings) -> serde_json::Value {
    serde_json::json!({
        "enabled": settings.enabled,
        "mode": settings.mode.as_str(),
        "api_endpoint": settings.api_endpoint.as_str(),
        "api_url": settings.api_endpoint.api_url(),
        "portal_url": settings.api_endpoint.portal_url(),
        "api_key_set": !settings.api_key.is_empty(),
        "api_secret_set": !settings.api_secret.is_empty(),
        "webhook_secret_set": settings.webhook_secret.is_some(),
        "last_tested_at": settings.last_tested_at,
        "credentials_valid": settings.credentials_valid,
    })
}
