use std::env;

use chrono::Duration;
use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use rpg_common::Secret;

use crate::errors::ServerError;

const DEFAULT_RPG_HOST: &str = "127.0.0.1";
const DEFAULT_RPG_PORT: u16 = 3000;
/// Orders that sit in `awaiting_payment` for longer than this without a proof get swept by the auto-cancel worker.
const DEFAULT_PAYMENT_DEADLINE: Duration = Duration::hours(24);
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// How long an order may wait for its first payment proof before the sweep cancels it.
    pub payment_deadline: Duration,
    /// How often the auto-cancel worker runs, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPG_HOST.to_string(),
            port: DEFAULT_RPG_PORT,
            database_url: String::default(),
            auth: AuthConfig::default(),
            payment_deadline: DEFAULT_PAYMENT_DEADLINE,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("RPG_HOST").ok().unwrap_or_else(|| DEFAULT_RPG_HOST.into());
        let port = env::var("RPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for RPG_PORT. {e} Using the default, {DEFAULT_RPG_PORT}, instead."
                    );
                    DEFAULT_RPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_RPG_PORT);
        let database_url = env::var("RPG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ RPG_DATABASE_URL is not set. Please set it to the URL for the RPG database.");
            String::default()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to \
                 the default configuration."
            );
            AuthConfig::default()
        });
        let payment_deadline = env::var("RPG_PAYMENT_DEADLINE_HOURS")
            .map_err(|_| {
                info!(
                    "🪛️ RPG_PAYMENT_DEADLINE_HOURS is not set. Using the default value of {} hrs.",
                    DEFAULT_PAYMENT_DEADLINE.num_hours()
                )
            })
            .and_then(|s| {
                s.parse::<i64>()
                    .map(Duration::hours)
                    .map_err(|e| warn!("🪛️ Invalid configuration value for RPG_PAYMENT_DEADLINE_HOURS. {e}"))
            })
            .ok()
            .unwrap_or(DEFAULT_PAYMENT_DEADLINE);
        let sweep_interval_secs = env::var("RPG_SWEEP_INTERVAL_SECS")
            .map_err(|_| {
                info!(
                    "🪛️ RPG_SWEEP_INTERVAL_SECS is not set. Using the default value of {DEFAULT_SWEEP_INTERVAL_SECS} \
                     seconds."
                )
            })
            .and_then(|s| {
                s.parse::<u64>().map_err(|e| warn!("🪛️ Invalid configuration value for RPG_SWEEP_INTERVAL_SECS. {e}"))
            })
            .ok()
            .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS);
        Self { host, port, database_url, auth, payment_deadline, sweep_interval_secs }
    }
}

//-------------------------------------------------  AuthConfig  ------------------------------------------------------
/// Key material for issuing and verifying the HS256 access tokens.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The JWT signing secret has not been set. I'm using a random value for this session. DO NOT \
             operate on production like this, since every token dies with this process. Set RPG_JWT_SECRET instead. \
             🚨️🚨️🚨️"
        );
        let secret: String = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect();
        Self { jwt_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn new<S: Into<String>>(secret: S) -> Self {
        Self { jwt_secret: Secret::new(secret.into()) }
    }

    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret =
            env::var("RPG_JWT_SECRET").map_err(|e| ServerError::ConfigurationError(format!("{e} [RPG_JWT_SECRET]")))?;
        if secret.len() < 32 {
            return Err(ServerError::ConfigurationError(
                "RPG_JWT_SECRET must be at least 32 characters long.".to_string(),
            ));
        }
        Ok(Self { jwt_secret: Secret::new(secret) })
    }
}
