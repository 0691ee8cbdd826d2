use {
    crate::domain::error::GatewayError,
    crate::domain::settings::{ApiEndpoint, GatewaySettings, Mode},
    crate::domain::stores::SettingsStore,
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    sqlx::PgPool,
};

/// Singleton `healthpay_settings` row. Reads always target the oldest row,
/// so a stray duplicate cannot change behavior.
pub struct PgSettingsStore {
    pool: PgPool,
}

impl PgSettingsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type SettingsRow = (
    bool,
    String,
    String,
    String,
    String,
    Option<String>,
    Option<DateTime<Utc>>,
    bool,
);

fn into_settings(row: SettingsRow) -> Result<GatewaySettings, GatewayError> {
    let (enabled, mode, api_key, api_secret, api_endpoint, webhook_secret, last_tested_at, credentials_valid) =
        row;
    Ok(GatewaySettings {
        enabled,
        mode: Mode::try_from(mode.as_str())?,
        api_key,
        api_secret,
        api_endpoint: ApiEndpoint::try_from(api_endpoint.as_str())?,
        webhook_secret,
        last_tested_at,
        credentials_valid,
    })
}

const SELECT_SETTINGS: &str = "SELECT enabled, mode, api_key, api_secret, api_endpoint, \
     webhook_secret, last_tested_at, credentials_valid \
     FROM healthpay_settings ORDER BY id LIMIT 1";

#[async_trait]
impl SettingsStore for PgSettingsStore {
    async fn load(&self) -> Result<Option<GatewaySettings>, GatewayError> {
        let row: Option<SettingsRow> = sqlx::query_as(SELECT_SETTINGS)
            .fetch_optional(&self.pool)
            .await?;

        row.map(into_settings).transpose()
    }

    async fn ensure_defaults(&self) -> Result<GatewaySettings, GatewayError> {
        sqlx::query(
            "INSERT INTO healthpay_settings (enabled, mode, api_key, api_secret, api_endpoint, credentials_valid) \
             SELECT false, 'sandbox', '', '', 'sandbox', false \
             WHERE NOT EXISTS (SELECT 1 FROM healthpay_settings)",
        )
        .execute(&self.pool)
        .await?;

        self.load()
            .await?
            .ok_or(GatewayError::Storage(sqlx::Error::RowNotFound))
    }

    async fn save(&self, settings: &GatewaySettings) -> Result<(), GatewayError> {
        let result = sqlx::query(
            "UPDATE healthpay_settings \
             SET enabled = $1, mode = $2, api_key = $3, api_secret = $4, api_endpoint = $5, \
                 webhook_secret = $6, last_tested_at = $7, credentials_valid = $8, \
                 updated_at = now() \
             WHERE id = (SELECT id FROM healthpay_settings ORDER BY id LIMIT 1)",
        )
        .bind(settings.enabled)
        .bind(settings.mode.as_str())
        .bind(&settings.api_key)
        .bind(&settings.api_secret)
        .bind(settings.api_endpoint.as_str())
        .bind(settings.webhook_secret.as_deref())
        .bind(settings.last_tested_at)
        .bind(settings.credentials_valid)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            sqlx::query(
                "INSERT INTO healthpay_settings \
                 (enabled, mode, api_key, api_secret, api_endpoint, webhook_secret, \
                  last_tested_at, credentials_valid) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(settings.enabled)
            .bind(settings.mode.as_str())
            .bind(&settings.api_key)
            .bind(&settings.api_secret)
            .bind(settings.api_endpoint.as_str())
            .bind(settings.webhook_secret.as_deref())
            .bind(settings.last_tested_at)
            .bind(settings.credentials_valid)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn mark_tested(&self, valid: bool) -> Result<(), GatewayError> {
        sqlx::query(
            "UPDATE healthpay_settings \
             SET last_tested_at = now(), credentials_valid = $1, updated_at = now() \
             WHERE id = (SELECT id FROM healthpay_settings ORDER BY id LIMIT 1)",
        )
        .bind(valid)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
