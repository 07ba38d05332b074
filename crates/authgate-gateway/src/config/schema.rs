use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use authgate_core::error::{AuthGateError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthGateConfig {
    pub version: u32,

    /// Emergency switch: allow every request unconditionally.
    #[serde(default)]
    pub kill_switch: bool,

    /// Deployment stage; namespaces the counter table.
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default)]
    pub fault_policy: FaultPolicy,

    #[serde(default)]
    pub secrets: SecretsSection,

    #[serde(default)]
    pub limits: LimitsSection,

    #[serde(default)]
    pub identity: IdentitySection,

    #[serde(default)]
    pub tokens: TokenSection,

    #[serde(default)]
    pub server: ServerSection,
}

impl Default for AuthGateConfig {
    fn default() -> Self {
        Self {
            version: 1,
            kill_switch: false,
            environment: default_environment(),
            fault_policy: FaultPolicy::default(),
            secrets: SecretsSection::default(),
            limits: LimitsSection::default(),
            identity: IdentitySection::default(),
            tokens: TokenSection::default(),
            server: ServerSection::default(),
        }
    }
}

impl AuthGateConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(AuthGateError::Config(format!(
                "unsupported config version: {}",
                self.version
            )));
        }
        if self.environment.trim().is_empty() {
            return Err(AuthGateError::Config("environment must not be empty".into()));
        }

        self.secrets.validate()?;
        self.limits.validate()?;
        self.identity.validate()?;
        self.tokens.validate()?;

        Ok(())
    }

    /// Counter table name for this deployment stage.
    pub fn counter_table(&self) -> String {
        format!("authgate-rate-limits-{}", self.environment.trim())
    }
}

fn default_environment() -> String {
    "dev".into()
}

/// What to do when the counter store cannot answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultPolicy {
    /// Allow the request; an infra outage must not become an API outage.
    #[default]
    FailOpen,
    FailClosed,
}

impl FromStr for FaultPolicy {
    type Err = AuthGateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail_open" | "open" => Ok(FaultPolicy::FailOpen),
            "fail_closed" | "closed" => Ok(FaultPolicy::FailClosed),
            other => Err(AuthGateError::Config(format!("unknown fault policy: {other}"))),
        }
    }
}

/// Two independent signing secrets, one per tier.
#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct SecretsSection {
    #[serde(default, rename = "override")]
    pub override_secret: String,
    #[serde(default, rename = "user")]
    pub user_secret: String,
}

impl SecretsSection {
    pub fn validate(&self) -> Result<()> {
        if self.override_secret.is_empty() {
            return Err(AuthGateError::Config("secrets.override must not be empty".into()));
        }
        if self.user_secret.is_empty() {
            return Err(AuthGateError::Config("secrets.user must not be empty".into()));
        }
        if self.override_secret == self.user_secret {
            return Err(AuthGateError::Config(
                "secrets.override and secrets.user must differ".into(),
            ));
        }
        Ok(())
    }
}

// Never print secret material.
impl fmt::Debug for SecretsSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretsSection")
            .field("override_secret", &"<redacted>")
            .field("user_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsSection {
    #[serde(default = "default_admin_points")]
    pub admin_points: u32,

    #[serde(default = "default_standard_points")]
    pub standard_points: u32,

    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            admin_points: default_admin_points(),
            standard_points: default_standard_points(),
            store_timeout_ms: default_store_timeout_ms(),
        }
    }
}

impl LimitsSection {
    pub fn validate(&self) -> Result<()> {
        if self.admin_points == 0 {
            return Err(AuthGateError::Config("limits.admin_points must be at least 1".into()));
        }
        if self.standard_points == 0 {
            return Err(AuthGateError::Config(
                "limits.standard_points must be at least 1".into(),
            ));
        }
        if !(1..=10_000).contains(&self.store_timeout_ms) {
            return Err(AuthGateError::Config(
                "limits.store_timeout_ms must be between 1 and 10000".into(),
            ));
        }
        Ok(())
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

fn default_admin_points() -> u32 {
    1000
}
fn default_standard_points() -> u32 {
    100
}
fn default_store_timeout_ms() -> u64 {
    500
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentitySection {
    #[serde(default = "default_forwarded_header")]
    pub forwarded_header: String,

    /// Only safe behind a proxy that overwrites the header.
    #[serde(default = "default_true")]
    pub trust_forwarded_header: bool,
}

impl Default for IdentitySection {
    fn default() -> Self {
        Self {
            forwarded_header: default_forwarded_header(),
            trust_forwarded_header: true,
        }
    }
}

impl IdentitySection {
    pub fn validate(&self) -> Result<()> {
        if self.trust_forwarded_header && self.forwarded_header.trim().is_empty() {
            return Err(AuthGateError::Config(
                "identity.forwarded_header must not be empty when trusted".into(),
            ));
        }
        Ok(())
    }
}

fn default_forwarded_header() -> String {
    "x-real-ip".into()
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenSection {
    #[serde(default = "default_override_header")]
    pub override_header: String,

    #[serde(default = "default_admin_role")]
    pub admin_role: String,
}

impl Default for TokenSection {
    fn default() -> Self {
        Self {
            override_header: default_override_header(),
            admin_role: default_admin_role(),
        }
    }
}

impl TokenSection {
    pub fn validate(&self) -> Result<()> {
        if self.override_header.trim().is_empty() {
            return Err(AuthGateError::Config("tokens.override_header must not be empty".into()));
        }
        if self.override_header.eq_ignore_ascii_case("authorization") {
            return Err(AuthGateError::Config(
                "tokens.override_header must differ from the authorization header".into(),
            ));
        }
        if self.admin_role.trim().is_empty() {
            return Err(AuthGateError::Config("tokens.admin_role must not be empty".into()));
        }
        Ok(())
    }
}

fn default_override_header() -> String {
    "x-override-token".into()
}
fn default_admin_role() -> String {
    "admin".into()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { listen: default_listen() }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
