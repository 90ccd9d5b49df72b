//! Environment-driven runtime configuration.

use std::env;
use std::net::SocketAddr;

use tracing::warn;

/// Environment variable naming the interface the game server binds to.
const TCP_HOST_ENV: &str = "TCP_HOST";
/// Environment variable naming the game server port.
const TCP_PORT_ENV: &str = "TCP_PORT";
/// Environment variable naming the bridge HTTP port.
const HTTP_PORT_ENV: &str = "PORT";
/// Environment variable carrying the token-signing secret.
const JWT_SECRET_ENV: &str = "JWT_SECRET";
/// Environment variable pointing at the user store.
const DATABASE_URL_ENV: &str = "DATABASE_URL";

const DEFAULT_TCP_HOST: &str = "127.0.0.1";
const DEFAULT_TCP_PORT: u16 = 4000;
const DEFAULT_HTTP_PORT: u16 = 8080;
const DEFAULT_DATABASE_URL: &str = "sqlite://quizwire.db?mode=rwc";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Interface the authoritative game server listens on. Loopback unless
    /// explicitly overridden; the TCP channel carries no authentication.
    pub tcp_host: String,
    /// Port for the newline-delimited JSON game protocol.
    pub tcp_port: u16,
    /// Public port for the bridge HTTP surface.
    pub http_port: u16,
    /// HMAC secret used to sign session tokens.
    pub jwt_secret: String,
    /// Connection string for the user store.
    pub database_url: String,
}

impl AppConfig {
    /// Load the configuration from the environment, falling back to loopback
    /// defaults suitable for local development.
    pub fn from_env() -> Self {
        let jwt_secret = env::var(JWT_SECRET_ENV).unwrap_or_else(|_| {
            warn!("{JWT_SECRET_ENV} not set; using an insecure development secret");
            "quizwire-dev-secret".into()
        });

        Self {
            tcp_host: env::var(TCP_HOST_ENV).unwrap_or_else(|_| DEFAULT_TCP_HOST.into()),
            tcp_port: parse_port(TCP_PORT_ENV, DEFAULT_TCP_PORT),
            http_port: parse_port(HTTP_PORT_ENV, DEFAULT_HTTP_PORT),
            jwt_secret,
            database_url: env::var(DATABASE_URL_ENV)
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.into()),
        }
    }

    /// Address the game server binds to and the bridge dials.
    pub fn tcp_addr(&self) -> String {
        format!("{}:{}", self.tcp_host, self.tcp_port)
    }

    /// Address the bridge HTTP server binds to.
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.http_port))
    }
}

/// Parse a port from the environment, keeping the default on absent or
/// unparseable values.
fn parse_port(var: &str, default: u16) -> u16 {
    match env::var(var) {
        Ok(raw) => match raw.parse::<u16>() {
            Ok(port) => port,
            Err(_) => {
                warn!(var, value = %raw, "invalid port value; using default {default}");
                default
            }
        },
        Err(_) => default,
    }
}
