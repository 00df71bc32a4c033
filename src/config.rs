//! Connection parameters.

use std::time::Duration;

use url::Url;

use crate::error::Kind;

/// Parameters for establishing a connection.
///
/// Immutable for the lifetime of a connect operation.
#[derive(Debug, Clone)]
pub struct ConnectParams {
    /// Server host name or address
    pub hostname: String,
    /// Server TCP port
    pub port: u16,
    /// Database user
    pub username: String,
    /// Password, when the server demands one
    pub password: Option<String>,
    /// Database name; the server defaults it to the username
    pub database: Option<String>,
    /// Additional startup options as key/value pairs
    pub options: Vec<(String, String)>,
    /// Time limit for the whole connect operation
    pub connect_timeout: Option<Duration>,
}

impl Default for ConnectParams {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            port: 5432,
            username: String::new(),
            password: None,
            database: None,
            options: Vec::new(),
            connect_timeout: None,
        }
    }
}

impl TryFrom<&Url> for ConnectParams {
    type Error = Kind;

    /// Parse a PostgreSQL connection URL.
    ///
    /// Format: `postgres://[user[:password]@]host[:port][/database][?k=v&..]`
    ///
    /// The `connect_timeout` query parameter is taken as seconds; all other
    /// query parameters become startup options.
    fn try_from(url: &Url) -> Result<Self, Kind> {
        if url.scheme() != "postgres" && url.scheme() != "postgresql" {
            return Err(Kind::InvalidParams);
        }

        let mut params = ConnectParams::default();
        params.hostname = url.host_str().unwrap_or("localhost").to_string();
        params.port = url.port().unwrap_or(5432);
        params.username = url.username().to_string();
        params.password = url.password().map(|s| s.to_string());
        params.database = url.path().strip_prefix('/').and_then(|s| {
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        });

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "connect_timeout" => {
                    let secs: u64 = value.parse().map_err(|_| Kind::InvalidParams)?;
                    params.connect_timeout = Some(Duration::from_secs(secs));
                }
                _ => params.options.push((key.to_string(), value.to_string())),
            }
        }

        Ok(params)
    }
}

impl TryFrom<&str> for ConnectParams {
    type Error = Kind;

    fn try_from(s: &str) -> Result<Self, Kind> {
        let url = Url::parse(s).map_err(|_| Kind::InvalidParams)?;
        Self::try_from(&url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_full() {
        let params =
            ConnectParams::try_from("postgres://alice:pw@db.example.com:5433/orders?application_name=app")
                .unwrap();
        assert_eq!(params.hostname, "db.example.com");
        assert_eq!(params.port, 5433);
        assert_eq!(params.username, "alice");
        assert_eq!(params.password.as_deref(), Some("pw"));
        assert_eq!(params.database.as_deref(), Some("orders"));
        assert_eq!(
            params.options,
            vec![("application_name".to_string(), "app".to_string())]
        );
    }

    #[test]
    fn test_url_defaults() {
        let params = ConnectParams::try_from("postgres://bob@localhost").unwrap();
        assert_eq!(params.port, 5432);
        assert_eq!(params.database, None);
        assert_eq!(params.password, None);
    }

    #[test]
    fn test_url_connect_timeout() {
        let params = ConnectParams::try_from("postgres://bob@localhost?connect_timeout=10").unwrap();
        assert_eq!(params.connect_timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_bad_scheme() {
        assert_eq!(
            ConnectParams::try_from("mysql://localhost").unwrap_err(),
            Kind::InvalidParams
        );
    }
}
