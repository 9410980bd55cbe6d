//! Resolved connection parameters.
//!
//! Parameters are built with [`ConnectionBuilder`] or deserialized from any
//! serde source (missing fields take their defaults). Connection strings are not
//! parsed here.

use crate::codec::Dialect;
use crate::error::ConnectionError;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Default number of rows requested per page.
pub const DEFAULT_FETCH_SIZE: u32 = 10_000;

/// Default session time zone sent to the standard dialect.
pub const DEFAULT_TIME_ZONE: &str = "UTC";

/// Default port of the cluster's HTTP interface.
pub const DEFAULT_PORT: u16 = 9200;

/// Default request timeout in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Connection parameters for one cluster endpoint.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ConnectionParams {
    /// Cluster host name
    pub host: String,
    /// HTTP port
    pub port: u16,
    /// Use HTTPS
    pub use_tls: bool,
    /// Validate the server certificate when TLS is enabled
    pub validate_server_certificate: bool,
    /// Optional path prefix when the cluster sits behind a proxy
    pub path_prefix: Option<String>,
    /// SQL dialect of the endpoint (static per connection)
    pub dialect: Dialect,
    /// Override for the SQL endpoint path (defaults per dialect)
    pub sql_path: Option<String>,
    /// Rows per page unless a statement overrides it
    pub fetch_size: u32,
    /// Time zone for the standard dialect unless a statement overrides it
    pub time_zone: String,
    /// User name for basic authentication
    pub username: Option<String>,
    /// Password for basic authentication
    password: Option<String>,
    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            use_tls: false,
            validate_server_certificate: true,
            path_prefix: None,
            dialect: Dialect::Standard,
            sql_path: None,
            fetch_size: DEFAULT_FETCH_SIZE,
            time_zone: DEFAULT_TIME_ZONE.to_string(),
            username: None,
            password: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl ConnectionParams {
    /// Start building parameters.
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::new()
    }

    /// Password for basic authentication, if any.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Basic credentials when both user name and password are set.
    pub fn basic_auth(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(password)) => Some((user.as_str(), password.as_str())),
            _ => None,
        }
    }

    /// Base URL of the cluster, including the optional path prefix, without a
    /// trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        let mut url = format!("{scheme}://{}:{}", self.host, self.port);
        if let Some(prefix) = self.path_prefix.as_deref() {
            let prefix = prefix.trim_matches('/');
            if !prefix.is_empty() {
                url.push('/');
                url.push_str(prefix);
            }
        }
        url
    }

    /// SQL endpoint path for the configured dialect.
    #[must_use]
    pub fn resolved_sql_path(&self) -> String {
        self.sql_path
            .as_deref()
            .map(|p| p.trim_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| self.dialect.default_sql_path().to_string())
    }

    /// Request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Check that the parameters describe a usable endpoint.
    ///
    /// # Errors
    /// Returns `ConnectionError::InvalidParameter` naming the first bad field.
    pub fn validate(&self) -> Result<(), ConnectionError> {
        let invalid = |parameter: &str, message: &str| ConnectionError::InvalidParameter {
            parameter: parameter.to_string(),
            message: message.to_string(),
        };

        if self.host.trim().is_empty() {
            return Err(invalid("host", "must not be empty"));
        }
        if self.port == 0 {
            return Err(invalid("port", "must be greater than 0"));
        }
        if self.fetch_size == 0 {
            return Err(invalid("fetch_size", "must be greater than 0"));
        }
        if self.time_zone.trim().is_empty() {
            return Err(invalid("time_zone", "must not be empty"));
        }
        if self.request_timeout_ms == 0 {
            return Err(invalid("request_timeout_ms", "must be greater than 0"));
        }
        if self.password.is_some() && self.username.is_none() {
            return Err(invalid("password", "requires a username"));
        }
        Ok(())
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_tls", &self.use_tls)
            .field("path_prefix", &self.path_prefix)
            .field("dialect", &self.dialect)
            .field("sql_path", &self.resolved_sql_path())
            .field("fetch_size", &self.fetch_size)
            .field("time_zone", &self.time_zone)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

/// Builder for [`ConnectionParams`].
#[derive(Debug, Clone, Default)]
pub struct ConnectionBuilder {
    params: ConnectionParams,
}

impl ConnectionBuilder {
    /// Create a builder with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cluster host.
    #[must_use]
    pub fn host(mut self, host: &str) -> Self {
        self.params.host = host.to_string();
        self
    }

    /// Set the HTTP port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.params.port = port;
        self
    }

    /// Enable or disable HTTPS.
    #[must_use]
    pub fn use_tls(mut self, use_tls: bool) -> Self {
        self.params.use_tls = use_tls;
        self
    }

    /// Enable or disable server certificate validation.
    #[must_use]
    pub fn validate_server_certificate(mut self, validate: bool) -> Self {
        self.params.validate_server_certificate = validate;
        self
    }

    /// Set a path prefix for clusters behind a proxy.
    #[must_use]
    pub fn path_prefix(mut self, prefix: &str) -> Self {
        self.params.path_prefix = Some(prefix.to_string());
        self
    }

    /// Select the SQL dialect of the endpoint.
    #[must_use]
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.params.dialect = dialect;
        self
    }

    /// Override the SQL endpoint path.
    #[must_use]
    pub fn sql_path(mut self, path: &str) -> Self {
        self.params.sql_path = Some(path.to_string());
        self
    }

    /// Set the default page size.
    #[must_use]
    pub fn fetch_size(mut self, fetch_size: u32) -> Self {
        self.params.fetch_size = fetch_size;
        self
    }

    /// Set the default time zone.
    #[must_use]
    pub fn time_zone(mut self, time_zone: &str) -> Self {
        self.params.time_zone = time_zone.to_string();
        self
    }

    /// Set the user name for basic authentication.
    #[must_use]
    pub fn username(mut self, username: &str) -> Self {
        self.params.username = Some(username.to_string());
        self
    }

    /// Set the password for basic authentication.
    #[must_use]
    pub fn password(mut self, password: &str) -> Self {
        self.params.password = Some(password.to_string());
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.params.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Validate and return the parameters.
    ///
    /// # Errors
    /// Returns `ConnectionError::InvalidParameter` if validation fails.
    pub fn build(self) -> Result<ConnectionParams, ConnectionError> {
        self.params.validate()?;
        Ok(self.params)
    }
}
