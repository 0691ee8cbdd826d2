use {
    crate::domain::settings::{ApiEndpoint, GatewaySettings, Mode},
    std::env,
};

/// Environment-sourced fallbacks, captured once at construction so the
/// resolver itself stays a pure read+map.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub mode: Option<Mode>,
    pub api_endpoint: Option<ApiEndpoint>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub webhook_secret: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        let parse_nonempty = |key: &str| env::var(key).ok().filter(|v| !v.trim().is_empty());

        Self {
            mode: parse_nonempty("HEALTHPAY_MODE").and_then(|v| Mode::try_from(v.as_str()).ok()),
            api_endpoint: parse_nonempty("HEALTHPAY_API_ENDPOINT")
                .and_then(|v| ApiEndpoint::try_from(v.as_str()).ok()),
            api_key: parse_nonempty("HEALTHPAY_API_KEY"),
            api_secret: parse_nonempty("HEALTHPAY_API_SECRET"),
            webhook_secret: parse_nonempty("HEALTHPAY_WEBHOOK_SECRET"),
        }
    }
}

/// Endpoint lookup table. Defaults to the processor's published URLs; kept
/// configurable so tests and staging proxies can point elsewhere.
#[derive(Debug, Clone)]
pub struct EndpointTable {
    pub sandbox_url: String,
    pub production_url: String,
}

impl Default for EndpointTable {
    fn default() -> Self {
        Self {
            sandbox_url: ApiEndpoint::Sandbox.api_url().to_string(),
            production_url: ApiEndpoint::Production.api_url().to_string(),
        }
    }
}

impl EndpointTable {
    fn url_for(&self, endpoint: ApiEndpoint) -> &str {
        match endpoint {
            ApiEndpoint::Sandbox => &self.sandbox_url,
            ApiEndpoint::Production => &self.production_url,
        }
    }
}

/// What the remote client needs to issue a signed request.
#[derive(Debug, Clone)]
pub struct ResolvedCredentials {
    pub enabled: bool,
    pub mode: Mode,
    pub base_url: String,
    pub portal_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub webhook_secret: Option<String>,
}

/// Layered precedence: persisted settings row → environment → static
/// defaults (sandbox, blank credentials). Absence of configuration is an
/// expected startup state, so this never fails — a blank-credential result
/// simply means the gateway is disabled.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    env: EnvOverrides,
    endpoints: EndpointTable,
}

impl CredentialResolver {
    pub fn new(env: EnvOverrides, endpoints: EndpointTable) -> Self {
        Self { env, endpoints }
    }

    pub fn resolve(&self, persisted: Option<&GatewaySettings>) -> ResolvedCredentials {
        let mode = persisted
            .map(|s| s.mode)
            .or(self.env.mode)
            .unwrap_or(Mode::Sandbox);

        // Unknown or missing endpoint resolves to sandbox.
        let endpoint = persisted
            .map(|s| s.api_endpoint)
            .or(self.env.api_endpoint)
            .unwrap_or(ApiEndpoint::Sandbox);

        let api_key = persisted
            .map(|s| s.api_key.clone())
            .filter(|v| !v.is_empty())
            .or_else(|| self.env.api_key.clone())
            .unwrap_or_default();

        let api_secret = persisted
            .map(|s| s.api_secret.clone())
            .filter(|v| !v.is_empty())
            .or_else(|| self.env.api_secret.clone())
            .unwrap_or_default();

        let webhook_secret = persisted
            .and_then(|s| s.webhook_secret.clone())
            .filter(|v| !v.is_empty())
            .or_else(|| self.env.webhook_secret.clone());

        ResolvedCredentials {
            enabled: persisted.map(|s| s.enabled).unwrap_or(false),
            mode,
            base_url: self.endpoints.url_for(endpoint).to_string(),
            portal_url: endpoint.portal_url().to_string(),
            api_key,
            api_secret,
            webhook_secret,
        }
    }
}
