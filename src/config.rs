use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, str::FromStr};

/// Longest accepted session lifetime: 100 years.
const MAX_SESSION_TTL_SECS: i64 = 100 * 365 * 24 * 60 * 60;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Lifetime of a login session, in seconds.
    pub session_ttl_secs: i64,
    /// Mark the session cookie `Secure` (HTTPS deployments).
    pub secure_cookies: bool,
    /// bcrypt work factor for new password hashes.
    pub password_hash_cost: u32,
    /// Where a successful login lands when no safe `next` was given.
    pub login_redirect_url: String,
    pub logout_redirect_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            database_url: "sqlite://./data/bucket_manager.db".into(),
            session_ttl_secs: 14 * 24 * 60 * 60,
            secure_cookies: false,
            password_hash_cost: bcrypt::DEFAULT_COST,
            login_redirect_url: "/dashboard/".into(),
            logout_redirect_url: "/".into(),
        }
    }
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Bucket management web application")]
pub struct Args {
    /// Host to bind to (overrides BUCKET_MANAGER_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides BUCKET_MANAGER_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides BUCKET_MANAGER_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,

    /// Grant staff privileges to a user and exit
    #[arg(long, value_name = "USERNAME", conflicts_with_all = ["revoke_staff", "delete_user"])]
    pub grant_staff: Option<String>,

    /// Revoke staff privileges from a user and exit
    #[arg(long, value_name = "USERNAME", conflicts_with = "delete_user")]
    pub revoke_staff: Option<String>,

    /// Delete a user together with their buckets and sessions, then exit
    #[arg(long, value_name = "USERNAME")]
    pub delete_user: Option<String>,
}

/// One-shot administrative task requested on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminAction {
    Migrate,
    GrantStaff(String),
    RevokeStaff(String),
    DeleteUser(String),
}

impl Args {
    fn admin_action(&self) -> Option<AdminAction> {
        if let Some(username) = &self.grant_staff {
            Some(AdminAction::GrantStaff(username.clone()))
        } else if let Some(username) = &self.revoke_staff {
            Some(AdminAction::RevokeStaff(username.clone()))
        } else if let Some(username) = &self.delete_user {
            Some(AdminAction::DeleteUser(username.clone()))
        } else if self.migrate {
            Some(AdminAction::Migrate)
        } else {
            None
        }
    }
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and the requested admin action.
    pub fn from_env_and_args() -> Result<(Self, Option<AdminAction>)> {
        // Parse CLI once
        let args = Args::parse();
        let action = args.admin_action();
        let cfg = Self::from_env()?.with_args(args);
        Ok((cfg, action))
    }

    /// Read `BUCKET_MANAGER_*` variables over the defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            host: env::var("BUCKET_MANAGER_HOST").unwrap_or(defaults.host),
            port: env_parse("BUCKET_MANAGER_PORT", defaults.port)?,
            database_url: env::var("BUCKET_MANAGER_DATABASE_URL")
                .unwrap_or(defaults.database_url),
            session_ttl_secs: check_session_ttl(
                "BUCKET_MANAGER_SESSION_TTL_SECS",
                env_parse("BUCKET_MANAGER_SESSION_TTL_SECS", defaults.session_ttl_secs)?,
            )?,
            secure_cookies: env_parse("BUCKET_MANAGER_SECURE_COOKIES", defaults.secure_cookies)?,
            password_hash_cost: env_parse(
                "BUCKET_MANAGER_PASSWORD_HASH_COST",
                defaults.password_hash_cost,
            )?,
            login_redirect_url: env::var("BUCKET_MANAGER_LOGIN_REDIRECT_URL")
                .unwrap_or(defaults.login_redirect_url),
            logout_redirect_url: env::var("BUCKET_MANAGER_LOGOUT_REDIRECT_URL")
                .unwrap_or(defaults.logout_redirect_url),
        })
    }

    fn with_args(self, args: Args) -> Self {
        Self {
            host: args.host.unwrap_or(self.host),
            port: args.port.unwrap_or(self.port),
            database_url: args.database_url.unwrap_or(self.database_url),
            ..self
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => parse_value(key, &value),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", key)),
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse::<T>()
        .with_context(|| format!("parsing {} value `{}`", key, value))
}

fn check_session_ttl(key: &str, secs: i64) -> Result<i64> {
    if !(1..=MAX_SESSION_TTL_SECS).contains(&secs) {
        bail!(
            "{} must be between 1 and {} seconds, got {}",
            key,
            MAX_SESSION_TTL_SECS,
            secs
        );
    }
    Ok(secs)
}
