use std::time::Duration;

use serde::Deserialize;

/// Server settings that don't depend on the route table.
///
/// Every field has a default, so hosts can deserialize a partial document:
///
/// ```
/// use pocket_web::ServerConfig;
///
/// let config: ServerConfig = serde_json::from_str(r#"{ "host": "127.0.0.1" }"#).unwrap();
/// assert_eq!(config.max_connections, 256);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to listen on.
    pub host: String,
    /// Connections served at once; further clients wait in the accept queue.
    pub max_connections: usize,
    /// How long `stop` waits for in-flight responses before aborting them.
    pub shutdown_grace_ms: u64,
}

impl ServerConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_owned(), max_connections: 256, shutdown_grace_ms: 5_000 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_uses_defaults() {
        let config: ServerConfig = serde_json::from_str(r#"{ "max_connections": 8 }"#).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.shutdown_grace(), Duration::from_secs(5));
    }
}
