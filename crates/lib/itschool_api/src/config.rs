//! API server configuration.

use itschool_core::email::SmtpConfig;
use itschool_core::seed::AdminSeed;
use tracing::warn;

/// Default listen address.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8081";
/// Default SMTP submission port.
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Configuration for the API server. Built once at startup and passed down.
#[derive(Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "0.0.0.0:8081").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// JWT / refresh-token signing secret. `None` makes token issuance fail.
    pub jwt_secret: Option<String>,
    /// SMTP transport. `None` logs reset emails instead of sending them.
    pub smtp: Option<SmtpConfig>,
    /// First administrator, created by seeding when none exists.
    pub admin: AdminSeed,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database_url", &self.database_url)
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("smtp", &self.smtp)
            .field("admin", &self.admin)
            .finish()
    }
}

impl ApiConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable                      | Default                               |
    /// |-------------------------------|---------------------------------------|
    /// | `BIND_ADDR`                   | `0.0.0.0:8081` (`PORT` sets the port) |
    /// | `DATABASE_URL`                | `postgres://localhost:5432/itschool`  |
    /// | `JWT_SECRET_KEY` / `JWT_SECRET` | none                                |
    /// | `SMTP_HOST`                   | none (emails are logged)              |
    /// | `SMTP_PORT`                   | `587`                                 |
    /// | `SMTP_EMAIL`, `SMTP_PASSWORD` | empty                                 |
    /// | `ADMIN_NAME`                  | `Administrator`                       |
    /// | `ADMIN_MAIL`, `ADMIN_PHONE`   | empty                                 |
    /// | `INITIAL_PASSWORD`            | none                                  |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ApiConfig::from_env`] over an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut bind_addr = var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into());
        if let Some(port) = var("PORT") {
            let host = bind_addr
                .rsplit_once(':')
                .map(|(host, _)| host.to_string())
                .unwrap_or_else(|| bind_addr.clone());
            bind_addr = format!("{host}:{}", port.trim());
        }

        let smtp = var("SMTP_HOST").map(|host| SmtpConfig {
            host,
            port: match var("SMTP_PORT") {
                Some(p) => p.trim().parse().unwrap_or_else(|_| {
                    warn!(value = %p, "invalid SMTP_PORT, using the default");
                    DEFAULT_SMTP_PORT
                }),
                None => DEFAULT_SMTP_PORT,
            },
            username: var("SMTP_EMAIL").unwrap_or_default(),
            password: var("SMTP_PASSWORD").unwrap_or_default(),
        });

        Self {
            bind_addr,
            database_url: var("DATABASE_URL")
                .unwrap_or_else(|| "postgres://localhost:5432/itschool".into()),
            jwt_secret: var("JWT_SECRET_KEY").or_else(|| var("JWT_SECRET")),
            smtp,
            admin: AdminSeed {
                name: var("ADMIN_NAME").unwrap_or_else(|| "Administrator".into()),
                email: var("ADMIN_MAIL").unwrap_or_default(),
                phone: var("ADMIN_PHONE").unwrap_or_default(),
                password: var("INITIAL_PASSWORD"),
            },
        }
    }
}
