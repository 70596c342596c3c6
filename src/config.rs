// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup via
//! [`Config::from_env`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory holding the account database | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `AUTH_SITE_URL` | Canonical site URL, always on the sign-in allow-list | `http://localhost:3000` |
//! | `AUTH_URI_ALLOW_LIST` | Comma-separated extra allowed origins for wallet sign-in | empty |
//! | `AUTH_JWT_AUD` | Audience new accounts are scoped to | `authenticated` |
//! | `AUTH_DISABLE_SIGNUP` | Reject every new-account signup | `false` |
//! | `AUTH_EMAIL_LINKING_ENABLED` | Link sign-ins onto existing accounts by verified email | `true` |
//! | `AUTH_ALLOW_UNVERIFIED_EMAIL_SIGNINS` | Let unverified provider emails become account emails | `false` |
//! | `AUTH_SSO_DOMAINS` | Comma-separated email domains handled by enterprise SSO | empty |
//! | `AUTH_WEB3_SOLANA_ENABLED` | Enable the Solana wallet sign-in provider | `false` |
//! | `AUTH_HOOK_BEFORE_USER_CREATED_ENABLED` | Run the before-user-created hook | `false` |
//! | `AUTH_HOOK_BEFORE_USER_CREATED_NAME` | Registered name of the hook to run | `before_user_created` |
//! | `AUTH_HOOK_BEFORE_USER_CREATED_TIMEOUT_MS` | Per-call hook budget, `0` means the 2000 ms default | `0` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;
use std::path::PathBuf;

use url::Url;

pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const SITE_URL_ENV: &str = "AUTH_SITE_URL";
pub const URI_ALLOW_LIST_ENV: &str = "AUTH_URI_ALLOW_LIST";
pub const JWT_AUD_ENV: &str = "AUTH_JWT_AUD";
pub const DISABLE_SIGNUP_ENV: &str = "AUTH_DISABLE_SIGNUP";
pub const EMAIL_LINKING_ENABLED_ENV: &str = "AUTH_EMAIL_LINKING_ENABLED";
pub const ALLOW_UNVERIFIED_EMAIL_SIGNINS_ENV: &str = "AUTH_ALLOW_UNVERIFIED_EMAIL_SIGNINS";
pub const SSO_DOMAINS_ENV: &str = "AUTH_SSO_DOMAINS";
pub const WEB3_SOLANA_ENABLED_ENV: &str = "AUTH_WEB3_SOLANA_ENABLED";
pub const HOOK_BEFORE_USER_CREATED_ENABLED_ENV: &str = "AUTH_HOOK_BEFORE_USER_CREATED_ENABLED";
pub const HOOK_BEFORE_USER_CREATED_NAME_ENV: &str = "AUTH_HOOK_BEFORE_USER_CREATED_NAME";
pub const HOOK_BEFORE_USER_CREATED_TIMEOUT_MS_ENV: &str =
    "AUTH_HOOK_BEFORE_USER_CREATED_TIMEOUT_MS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL in {var}: {value}")]
    InvalidUrl { var: &'static str, value: String },
}

/// Server configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Directory holding the account database file.
    pub data_dir: PathBuf,
    /// Canonical site URL; always part of the sign-in allow-list.
    pub site_url: Url,
    /// Additional allowed origins for wallet sign-in messages.
    pub uri_allow_list: Vec<Url>,
    /// Audience new accounts are scoped to.
    pub jwt_aud: String,
    /// When set, every new-account signup is rejected.
    pub disable_signup: bool,
    /// Account-linking policy.
    pub linking: LinkingPolicy,
    /// Whether the Solana wallet sign-in provider is enabled.
    pub web3_solana_enabled: bool,
    /// Operator hook configuration.
    pub hooks: HooksConfig,
}

/// Policy inputs of the account-linking decision engine.
#[derive(Debug, Clone)]
pub struct LinkingPolicy {
    /// Link sign-ins onto existing accounts that hold a matching verified
    /// email.
    pub email_linking_enabled: bool,
    /// Accept unverified provider emails as candidate account emails.
    pub allow_unverified_email_sign_ins: bool,
    /// Email domains handled by enterprise SSO; matches tag the linking
    /// decision `sso:<domain>`.
    pub sso_domains: Vec<String>,
}

/// Per-hook configuration.
#[derive(Debug, Clone)]
pub struct HookConfig {
    /// Whether the hook runs at all.
    pub enabled: bool,
    /// Name the hook was registered under.
    pub hook_name: String,
    /// Per-call budget in milliseconds; `0` falls back to the 2000 ms
    /// dispatcher default.
    pub timeout_ms: u64,
}

/// All extension points this server dispatches.
#[derive(Debug, Clone)]
pub struct HooksConfig {
    /// Runs after the linking decision and before a new account is persisted.
    pub before_user_created: HookConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "0.0.0.0".to_string(),
            port: 8080,
            data_dir: PathBuf::from("/data"),
            // unwrap is fine for a fixed literal
            site_url: Url::parse("http://localhost:3000").unwrap(),
            uri_allow_list: Vec::new(),
            jwt_aud: "authenticated".to_string(),
            disable_signup: false,
            linking: LinkingPolicy {
                email_linking_enabled: true,
                allow_unverified_email_sign_ins: false,
                sso_domains: Vec::new(),
            },
            web3_solana_enabled: false,
            hooks: HooksConfig {
                before_user_created: HookConfig {
                    enabled: false,
                    hook_name: "before_user_created".to_string(),
                    timeout_ms: 0,
                },
            },
        }
    }
}

impl Config {
    /// Load configuration from the environment, falling back to defaults for
    /// unset variables. Unparseable URLs are errors; unparseable booleans and
    /// numbers fall back with a warning.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let site_url_value =
            env::var(SITE_URL_ENV).unwrap_or_else(|_| defaults.site_url.to_string());
        let site_url = Url::parse(&site_url_value).map_err(|_| ConfigError::InvalidUrl {
            var: SITE_URL_ENV,
            value: site_url_value.clone(),
        })?;

        let mut uri_allow_list = Vec::new();
        for entry in parse_list(&env::var(URI_ALLOW_LIST_ENV).unwrap_or_default()) {
            let url = Url::parse(&entry).map_err(|_| ConfigError::InvalidUrl {
                var: URI_ALLOW_LIST_ENV,
                value: entry.clone(),
            })?;
            uri_allow_list.push(url);
        }

        Ok(Config {
            host: env::var(HOST_ENV).unwrap_or(defaults.host),
            port: env_parse(PORT_ENV, defaults.port),
            data_dir: env::var(DATA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            site_url,
            uri_allow_list,
            jwt_aud: env::var(JWT_AUD_ENV).unwrap_or(defaults.jwt_aud),
            disable_signup: env_bool(DISABLE_SIGNUP_ENV, false),
            linking: LinkingPolicy {
                email_linking_enabled: env_bool(EMAIL_LINKING_ENABLED_ENV, true),
                allow_unverified_email_sign_ins: env_bool(
                    ALLOW_UNVERIFIED_EMAIL_SIGNINS_ENV,
                    false,
                ),
                sso_domains: parse_list(&env::var(SSO_DOMAINS_ENV).unwrap_or_default()),
            },
            web3_solana_enabled: env_bool(WEB3_SOLANA_ENABLED_ENV, false),
            hooks: HooksConfig {
                before_user_created: HookConfig {
                    enabled: env_bool(HOOK_BEFORE_USER_CREATED_ENABLED_ENV, false),
                    hook_name: env::var(HOOK_BEFORE_USER_CREATED_NAME_ENV)
                        .unwrap_or(defaults.hooks.before_user_created.hook_name),
                    timeout_ms: env_parse(HOOK_BEFORE_USER_CREATED_TIMEOUT_MS_ENV, 0),
                },
            },
        })
    }

    /// Origins wallet sign-in messages may target: the site URL plus the
    /// allow-list.
    pub fn allowed_uris(&self) -> Vec<Url> {
        let mut uris = Vec::with_capacity(1 + self.uri_allow_list.len());
        uris.push(self.site_url.clone());
        uris.extend(self.uri_allow_list.iter().cloned());
        uris
    }
}

/// Split a comma-separated list, trimming whitespace and dropping empties.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_bool(var: &'static str, default: bool) -> bool {
    match env::var(var) {
        Ok(value) => parse_bool(&value).unwrap_or_else(|| {
            tracing::warn!(var, value, "unparseable boolean, using default");
            default
        }),
        Err(_) => default,
    }
}

fn env_parse<T: std::str::FromStr + Copy>(var: &'static str, default: T) -> T {
    match env::var(var) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!(var, value, "unparseable value, using default");
            default
        }),
        Err(_) => default,
    }
}
