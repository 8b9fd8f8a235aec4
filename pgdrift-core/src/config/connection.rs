//! Connection descriptor for one target instance.
//!
//! This module provides the `ConnectionDescriptor` struct, the only place a
//! password lives during a run.

use std::fmt;
use zeroize::Zeroizing;

/// Default PostgreSQL port.
pub const DEFAULT_PORT: u16 = 5432;

/// Host, port, credentials and database name for one target instance.
///
/// # Security
/// The password is held in a `Zeroizing` container and is never part of the
/// `Debug` or `Display` output. Use [`ConnectionDescriptor::redacted_url`] or
/// the `Display` impl whenever a descriptor has to appear in a log line.
///
/// # Example
/// ```rust
/// use pgdrift_core::config::ConnectionDescriptor;
///
/// let descriptor = ConnectionDescriptor::new("db1.internal", 5432, "app", "s3cret", "orders");
///
/// assert_eq!(descriptor.to_string(), "app@db1.internal:5432/orders");
/// assert!(!format!("{:?}", descriptor).contains("s3cret"));
/// assert!(descriptor.validate().is_ok());
/// ```
#[derive(Clone)]
pub struct ConnectionDescriptor {
    host: String,
    port: u16,
    user: String,
    password: Zeroizing<String>,
    database: String,
}

impl ConnectionDescriptor {
    /// Creates a new descriptor. The descriptor is immutable afterwards.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: Zeroizing::new(password.into()),
            database: database.into(),
        }
    }

    /// Database server host name or address
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Database server port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Login role
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Database name on the target instance
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Cleartext password, for handing to the driver only.
    ///
    /// # Security
    /// Never log or format the returned value.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Checks if a password is present without exposing it.
    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }

    /// Connection URL with the password masked as `****`.
    ///
    /// User and database are percent-encoded. Hosts the `url` crate cannot
    /// parse fall back to the masked `Display` form.
    pub fn redacted_url(&self) -> String {
        let Ok(mut url) = url::Url::parse(&format!("postgres://{}:{}", self.host, self.port)) else {
            return format!("postgres://{}", self);
        };
        // Only fails for cannot-be-a-base URLs, which a host:port never is
        let _ = url.set_username(&self.user);
        if self.has_password() {
            let _ = url.set_password(Some("****"));
        }
        url.set_path(&self.database);
        url.to_string()
    }

    /// Validates descriptor fields.
    ///
    /// # Errors
    /// Returns a configuration error for an empty host, user or database, or a
    /// zero port.
    pub fn validate(&self) -> crate::Result<()> {
        if self.host.trim().is_empty() {
            return Err(crate::error::DriftError::configuration(
                "host cannot be empty",
            ));
        }

        if self.port == 0 {
            return Err(crate::error::DriftError::configuration(format!(
                "port for {} must be greater than 0",
                self.host
            )));
        }

        if self.user.trim().is_empty() {
            return Err(crate::error::DriftError::configuration(format!(
                "user for {}:{} cannot be empty",
                self.host, self.port
            )));
        }

        if self.database.trim().is_empty() {
            return Err(crate::error::DriftError::configuration(format!(
                "database name for {}:{} cannot be empty",
                self.host, self.port
            )));
        }

        Ok(())
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Intentionally omit the password
        write!(
            f,
            "{}@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"****")
            .field("database", &self.database)
            .finish()
    }
}
