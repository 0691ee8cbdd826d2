use {
    super::error::GatewayError,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
};

pub const SANDBOX_API_URL: &str = "https://api.beta.healthpay.tech/graphql";
pub const PRODUCTION_API_URL: &str = "https://api.healthpay.tech/graphql";
pub const SANDBOX_PORTAL_URL: &str = "https://portal.beta.healthpay.tech";
pub const PRODUCTION_PORTAL_URL: &str = "https://portal.healthpay.tech";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Sandbox,
    Live,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::Live => "live",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Mode {
    type Error = GatewayError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "sandbox" => Ok(Self::Sandbox),
            "live" => Ok(Self::Live),
            other => Err(GatewayError::MalformedRequest(format!(
                "mode must be sandbox or live, got: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApiEndpoint {
    Sandbox,
    Production,
}

impl ApiEndpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::Production => "production",
        }
    }

    pub fn api_url(&self) -> &'static str {
        match self {
            Self::Sandbox => SANDBOX_API_URL,
            Self::Production => PRODUCTION_API_URL,
        }
    }

    pub fn portal_url(&self) -> &'static str {
        match self {
            Self::Sandbox => SANDBOX_PORTAL_URL,
            Self::Production => PRODUCTION_PORTAL_URL,
        }
    }
}

impl fmt::Display for ApiEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for ApiEndpoint {
    type Error = GatewayError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "sandbox" => Ok(Self::Sandbox),
            "production" => Ok(Self::Production),
            other => Err(GatewayError::MalformedRequest(format!(
                "api_endpoint must be sandbox or production, got: {other}"
            ))),
        }
    }
}

/// Persisted singleton settings row. Read-mostly: the engine only writes
/// `last_tested_at` / `credentials_valid` after a connectivity probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    pub enabled: bool,
    pub mode: Mode,
    pub api_key: String,
    pub api_secret: String,
    pub api_endpoint: ApiEndpoint,
    pub webhook_secret: Option<String>,
    pub last_tested_at: Option<DateTime<Utc>>,
    pub credentials_valid: bool,
}

impl GatewaySettings {
    /// Startup state before an admin has configured anything: disabled,
    /// sandbox, blank credentials.
    pub fn disabled_sandbox() -> Self {
        Self {
            enabled: false,
            mode: Mode::Sandbox,
            api_key: String::new(),
            api_secret: String::new(),
            api_endpoint: ApiEndpoint::Sandbox,
            webhook_secret: None,
            last_tested_at: None,
            credentials_valid: false,
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}
