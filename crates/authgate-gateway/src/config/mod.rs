//! Config loading: strict YAML files or environment-style variables.

pub mod schema;

use std::fs;

use authgate_core::error::{AuthGateError, Result};

pub use schema::{
    AuthGateConfig, FaultPolicy, IdentitySection, LimitsSection, SecretsSection, ServerSection,
    TokenSection,
};

pub const ENV_KILL_SWITCH: &str = "AUTHGATE_KILL_SWITCH";
pub const ENV_ADMIN_POINTS: &str = "AUTHGATE_ADMIN_POINTS";
pub const ENV_STANDARD_POINTS: &str = "AUTHGATE_STANDARD_POINTS";
pub const ENV_OVERRIDE_SECRET: &str = "AUTHGATE_OVERRIDE_SECRET";
pub const ENV_USER_SECRET: &str = "AUTHGATE_USER_SECRET";
pub const ENV_ENVIRONMENT: &str = "AUTHGATE_ENVIRONMENT";
pub const ENV_STORE_TIMEOUT_MS: &str = "AUTHGATE_STORE_TIMEOUT_MS";
pub const ENV_FAULT_POLICY: &str = "AUTHGATE_FAULT_POLICY";
pub const ENV_LISTEN: &str = "AUTHGATE_LISTEN";

pub fn load_from_file(path: &str) -> Result<AuthGateConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| AuthGateError::Config(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<AuthGateConfig> {
    let cfg: AuthGateConfig = serde_yaml::from_str(s)
        .map_err(|e| AuthGateError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Build config from the process environment.
pub fn load_from_env() -> Result<AuthGateConfig> {
    load_from_vars(std::env::vars())
}

/// Build config from `NAME=value` pairs. Unknown names are ignored; every
/// recognised value must parse.
pub fn load_from_vars<I, K, V>(vars: I) -> Result<AuthGateConfig>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let mut cfg = AuthGateConfig::default();
    for (k, v) in vars {
        let v: String = v.into();
        match k.as_ref() {
            ENV_KILL_SWITCH => cfg.kill_switch = parse_bool(ENV_KILL_SWITCH, &v)?,
            ENV_ADMIN_POINTS => cfg.limits.admin_points = parse_num(ENV_ADMIN_POINTS, &v)?,
            ENV_STANDARD_POINTS => cfg.limits.standard_points = parse_num(ENV_STANDARD_POINTS, &v)?,
            ENV_STORE_TIMEOUT_MS => cfg.limits.store_timeout_ms = parse_num(ENV_STORE_TIMEOUT_MS, &v)?,
            ENV_OVERRIDE_SECRET => cfg.secrets.override_secret = v,
            ENV_USER_SECRET => cfg.secrets.user_secret = v,
            ENV_ENVIRONMENT => cfg.environment = v,
            ENV_FAULT_POLICY => cfg.fault_policy = v.parse()?,
            ENV_LISTEN => cfg.server.listen = v,
            _ => {}
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn parse_bool(name: &str, v: &str) -> Result<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(AuthGateError::Config(format!("{name}: not a boolean: {other}"))),
    }
}

fn parse_num<T: std::str::FromStr>(name: &str, v: &str) -> Result<T> {
    v.trim()
        .parse()
        .map_err(|_| AuthGateError::Config(format!("{name}: not a number: {v}")))
}
