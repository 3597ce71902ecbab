//! Configuration for Stampbook
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use uuid::Uuid;

/// Stampbook - collect stamps, keep the reasons, export the record
#[derive(Parser, Debug, Clone)]
#[command(name = "stampbook")]
#[command(about = "Stamp collection tracker service")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "stampbook")]
    pub mongodb_db: String,

    /// Enable development mode (dev tokens, in-memory store fallback)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// JWT secret shared with the identity provider (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "3600")]
    pub jwt_expiry_seconds: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// How long achievement toasts stay visible, in milliseconds
    #[arg(long, env = "TOAST_DISMISS_MS", default_value = "3000")]
    pub toast_dismiss_ms: u64,

    /// Base font name written into PDF reports
    #[arg(long, env = "REPORT_FONT", default_value = "Helvetica")]
    pub report_font: String,

    /// Maximum accepted JSON request body size in bytes
    #[arg(long, env = "MAX_BODY_BYTES", default_value = "10240")]
    pub max_body_bytes: usize,
}

impl Args {
    pub fn toast_ttl(&self) -> Duration {
        Duration::from_millis(self.toast_dismiss_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            match self.jwt_secret.as_deref() {
                None | Some("") => {
                    return Err("JWT_SECRET is required in production mode".to_string())
                }
                Some(secret) if secret.len() < 32 => {
                    return Err("JWT_SECRET must be at least 32 characters".to_string())
                }
                Some(_) => {}
            }
        }

        if self.toast_dismiss_ms == 0 {
            return Err("TOAST_DISMISS_MS must be greater than zero".to_string());
        }

        if self.max_body_bytes == 0 {
            return Err("MAX_BODY_BYTES must be greater than zero".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["stampbook"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["--dev-mode"]);
        assert_eq!(args.listen.port(), 8080);
        assert_eq!(args.mongodb_db, "stampbook");
        assert_eq!(args.toast_ttl(), Duration::from_millis(3000));
        assert_eq!(args.report_font, "Helvetica");
        assert_eq!(args.max_body_bytes, 10240);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_production_requires_secret() {
        let mut args = parse(&["--dev-mode"]);
        args.dev_mode = false;
        args.jwt_secret = None;
        assert!(args.validate().is_err());

        args.jwt_secret = Some("short".into());
        assert!(args.validate().is_err());

        args.jwt_secret = Some("a-production-secret-of-at-least-32-chars".into());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_zero_toast_delay_rejected() {
        let args = parse(&["--dev-mode", "--toast-dismiss-ms", "0"]);
        assert!(args.validate().is_err());
    }
}
