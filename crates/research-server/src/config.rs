//! Server Configuration

/// Listener settings
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".into(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        std::env::var("BIND_ADDR")
            .map(|bind_addr| Self { bind_addr })
            .unwrap_or_default()
    }
}
