//! CLI argument parsing, validation, and startup helpers.

use std::sync::Arc;
use std::time::Duration;

use crate::ServerConfig;
use crate::auth::{
    ACCESS_COOKIE_MAX_AGE_SECS, CookiePolicy, HttpTokenRefresher, REFRESH_COOKIE_MAX_AGE_SECS,
    SameSite,
};
use clap::Parser;
use tracing::{error, warn};
use url::Url;

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "sessiongate",
    about = "Cookie session gateway with transparent token refresh"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "7292")]
    pub port: u16,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Base URL of the token service used to refresh expired sessions
    #[arg(long, env = "TOKEN_SERVICE_URL", default_value = "http://localhost:4000")]
    pub token_service_url: Url,

    /// Deadline for a single refresh call, in seconds
    #[arg(long, env = "REFRESH_TIMEOUT_SECS", default_value = "10")]
    pub refresh_timeout: u64,

    /// Lifetime of a reissued access token cookie, in seconds
    #[arg(long, env = "ACCESS_COOKIE_MAX_AGE", default_value_t = ACCESS_COOKIE_MAX_AGE_SECS)]
    pub access_cookie_max_age: u64,

    /// Lifetime of a reissued refresh token cookie, in seconds
    #[arg(long, env = "REFRESH_COOKIE_MAX_AGE", default_value_t = REFRESH_COOKIE_MAX_AGE_SECS)]
    pub refresh_cookie_max_age: u64,

    /// SameSite attribute of the session cookies
    #[arg(long, env = "COOKIE_SAME_SITE", default_value = "strict")]
    pub same_site: SameSite,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Install the global tracing subscriber in the requested format.
pub fn init_logging(format: &LogFormat) {
    let builder = tracing_subscriber::fmt().with_target(false);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

const JWT_SECRET_ENV: &str = "JWT_SECRET";

/// Load the token signing secret, preferring the `JWT_SECRET` environment
/// variable over `--jwt-secret-file`. The variable is removed once read.
/// Returns None and logs an error if no usable secret is found.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<Vec<u8>> {
    let secret = match (std::env::var(JWT_SECRET_ENV), jwt_secret_file) {
        (Ok(secret), _) => {
            // SAFETY: called from main before the runtime spawns any task that
            // could read the environment.
            unsafe { std::env::remove_var(JWT_SECRET_ENV) };
            secret
        }
        (Err(_), Some(path)) => match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        },
        (Err(_), None) => {
            error!("No JWT secret: set {} or pass --jwt-secret-file", JWT_SECRET_ENV);
            return None;
        }
    };

    check_secret_length(secret.into_bytes())
}

fn check_secret_length(secret: Vec<u8>) -> Option<Vec<u8>> {
    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            min = MIN_JWT_SECRET_LENGTH,
            actual = secret.len(),
            "JWT secret is too short"
        );
        return None;
    }
    Some(secret)
}

/// Build the cookie policy from arguments.
pub fn cookie_policy(args: &Args) -> CookiePolicy {
    if args.same_site == SameSite::None {
        warn!("Session cookies are sent on cross-site requests (SameSite=None)");
    }
    CookiePolicy {
        access_max_age: args.access_cookie_max_age,
        refresh_max_age: args.refresh_cookie_max_age,
        same_site: args.same_site,
    }
}

/// Build ServerConfig from validated arguments.
/// Returns None and logs an error if the token service client cannot be created.
pub fn build_config(args: &Args, jwt_secret: Vec<u8>) -> Option<ServerConfig> {
    let refresher = match HttpTokenRefresher::new(
        &args.token_service_url,
        Duration::from_secs(args.refresh_timeout),
    ) {
        Ok(refresher) => refresher,
        Err(e) => {
            error!(url = %args.token_service_url, error = %e, "Failed to create token service client");
            return None;
        }
    };

    Some(ServerConfig {
        jwt_secret,
        refresher: Arc::new(refresher),
        cookies: cookie_policy(args),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["sessiongate"]).unwrap();
        assert_eq!(args.port, 7292);
        assert_eq!(args.refresh_timeout, 10);
        assert_eq!(args.token_service_url.as_str(), "http://localhost:4000/");

        let policy = cookie_policy(&args);
        assert_eq!(policy, CookiePolicy::default());
    }

    #[test]
    fn test_cookie_flags() {
        let args = Args::try_parse_from([
            "sessiongate",
            "--access-cookie-max-age",
            "60",
            "--same-site",
            "lax",
        ])
        .unwrap();

        let policy = cookie_policy(&args);
        assert_eq!(policy.access_max_age, 60);
        assert_eq!(policy.refresh_max_age, REFRESH_COOKIE_MAX_AGE_SECS);
        assert_eq!(policy.same_site, SameSite::Lax);
    }

    #[test]
    fn test_invalid_token_service_url_rejected() {
        assert!(Args::try_parse_from(["sessiongate", "--token-service-url", "not a url"]).is_err());
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(check_secret_length(b"short".to_vec()).is_none());
        assert!(check_secret_length(vec![b'x'; MIN_JWT_SECRET_LENGTH]).is_some());
    }
}
