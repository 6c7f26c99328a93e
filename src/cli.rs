//! CLI argument parsing, validation, and startup helpers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::ServerConfig;
use crate::auth::{AuthSettings, normalize_email};
use crate::db::{Database, UserRole};
use crate::jwt::{KeyMaterial, TokenCodec};
use clap::Parser;
use tracing::{error, info};

/// Upper bound for token and session lifetimes: one year.
const MAX_TTL_MINUTES: u64 = 365 * 24 * 60;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tollgate",
    about = "Session-backed token authentication service"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "7300")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "DATABASE", default_value = "tollgate.db")]
    pub database: String,

    /// Directory containing access_private.pem, access_public.pem,
    /// refresh_private.pem and refresh_public.pem. When omitted, keys are read
    /// base64-encoded from ACCESS_TOKEN_PRIVATE_KEY and friends
    #[arg(long, env = "KEYS_DIR")]
    pub keys_dir: Option<PathBuf>,

    /// Access token lifetime in minutes
    #[arg(long, env = "ACCESS_TOKEN_TTL_MINUTES", default_value = "15", value_parser = clap::value_parser!(u64).range(1..=MAX_TTL_MINUTES))]
    pub access_token_ttl_minutes: u64,

    /// Refresh token lifetime in minutes
    #[arg(long, env = "REFRESH_TOKEN_TTL_MINUTES", default_value = "60", value_parser = clap::value_parser!(u64).range(1..=MAX_TTL_MINUTES))]
    pub refresh_token_ttl_minutes: u64,

    /// Session lifetime in seconds
    #[arg(long, env = "SESSION_TTL_SECONDS", default_value = "3600", value_parser = clap::value_parser!(u64).range(1..=MAX_TTL_MINUTES * 60))]
    pub session_ttl_seconds: u64,

    /// Set the Secure flag on auth cookies (enable when served over HTTPS)
    #[arg(long, env = "SECURE_COOKIES")]
    pub secure_cookies: bool,

    /// Register/login attempts allowed per minute per client IP
    #[arg(long, env = "LOGIN_RATE_PER_MINUTE", default_value = "10")]
    pub login_rate_per_minute: u32,

    /// Give the user with this email the admin role on startup
    #[arg(long)]
    pub promote_admin: Option<String>,

    /// Write a fresh set of key pairs into this directory and exit
    #[arg(long)]
    pub generate_keys: Option<PathBuf>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Handle --generate-keys: write four PEM files. Returns false on failure.
pub fn handle_generate_keys(dir: &Path) -> bool {
    let material = match KeyMaterial::generate() {
        Ok(material) => material,
        Err(e) => {
            error!(error = %e, "Failed to generate keys");
            return false;
        }
    };

    match material.write_to_dir(dir) {
        Ok(()) => {
            info!(dir = %dir.display(), "Key pairs written");
            true
        }
        Err(e) => {
            error!(dir = %dir.display(), error = %e, "Failed to write keys");
            false
        }
    }
}

/// Load key material and build the token codec.
/// Returns None and logs an error if any key is missing, malformed or mismatched.
pub fn load_token_codec(keys_dir: Option<&Path>) -> Option<TokenCodec> {
    let material = match keys_dir {
        Some(dir) => KeyMaterial::from_dir(dir),
        None => KeyMaterial::from_env(),
    };

    let codec = material.and_then(|material| TokenCodec::new(&material));

    match codec {
        Ok(codec) => {
            info!("Signing keys loaded");
            Some(codec)
        }
        Err(e) => {
            error!(error = %e, "Failed to load signing keys");
            None
        }
    }
}

/// Handle the --promote-admin flag.
pub async fn handle_promote_admin(db: &Database, email: &str) -> bool {
    match db
        .users()
        .set_role_by_email(&normalize_email(email), UserRole::Admin)
        .await
    {
        Ok(true) => {
            info!(email = %email, "User promoted to admin");
            true
        }
        Ok(false) => {
            error!(email = %email, "No user with this email");
            false
        }
        Err(e) => {
            error!(email = %email, error = %e, "Failed to promote user");
            false
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database, codec: TokenCodec) -> ServerConfig {
    ServerConfig {
        db,
        jwt: Arc::new(codec),
        settings: AuthSettings::new(
            args.access_token_ttl_minutes,
            args.refresh_token_ttl_minutes,
            args.session_ttl_seconds,
            args.secure_cookies,
        ),
        login_rate_per_minute: args.login_rate_per_minute,
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
