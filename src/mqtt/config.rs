//! Broker connection configuration
//!
//! `BrokerConnectionConfig` is the validated form of the `[mqtt]` settings
//! section. Validation covers the protocol scheme, the presence of a trust
//! store for TLS and the keep-alive floor; TLS files are only read when a
//! connection is opened.

use std::fmt;
use std::time::Duration;

use uuid::Uuid;

use crate::config::MqttSettings;
use crate::utils::error::ConfigurationError;

pub const DEFAULT_PROTOCOL: &str = "tcp";
pub const DEFAULT_HOSTNAME: &str = "localhost";
pub const DEFAULT_PORT: u16 = 1883;

const MIN_KEEP_ALIVE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Tls,
}

impl Protocol {
    pub fn parse(scheme: &str) -> Result<Self, ConfigurationError> {
        match scheme.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "ssl" | "tls" => Ok(Protocol::Tls),
            _ => Err(ConfigurationError::UnsupportedProtocol(scheme.to_string())),
        }
    }

    pub fn scheme(self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Tls => "ssl",
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// A PEM file plus the password it was configured with.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreMaterial {
    pub path: String,
    pub password: Option<String>,
}

impl fmt::Debug for StoreMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreMaterial")
            .field("path", &self.path)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsMaterial {
    /// CA bundle used to verify the broker.
    pub trust_store: Option<StoreMaterial>,
    /// Client certificate chain and private key.
    pub key_store: Option<StoreMaterial>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConnectionConfig {
    pub protocol: Protocol,
    pub hostname: String,
    pub port: u16,
    pub credentials: Option<Credentials>,
    pub tls: TlsMaterial,
    pub client_id: String,
    pub clean_session: bool,
    pub keep_alive: Duration,
    pub connect_timeout: Duration,
}

impl BrokerConnectionConfig {
    /// Plain TCP connection to `hostname:port` with a generated client id.
    pub fn new(hostname: &str, port: u16) -> Self {
        Self {
            protocol: Protocol::Tcp,
            hostname: hostname.to_string(),
            port,
            credentials: None,
            tls: TlsMaterial::default(),
            client_id: generate_client_id(),
            clean_session: true,
            keep_alive: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(30),
        }
    }

    pub fn from_settings(settings: &MqttSettings) -> Result<Self, ConfigurationError> {
        let protocol = Protocol::parse(&settings.protocol)?;

        let credentials = settings.username.as_ref().map(|username| Credentials {
            username: username.clone(),
            password: settings.password.clone(),
        });

        let store = |path: &Option<String>, password: &Option<String>| {
            path.as_ref().map(|path| StoreMaterial {
                path: path.clone(),
                password: password.clone(),
            })
        };
        let tls = TlsMaterial {
            trust_store: store(&settings.trust_store_path, &settings.trust_store_password),
            key_store: store(&settings.key_store_path, &settings.key_store_password),
        };

        let config = Self {
            protocol,
            hostname: settings.hostname.clone(),
            port: settings.port,
            credentials,
            tls,
            client_id: settings
                .client_id
                .clone()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(generate_client_id),
            clean_session: settings.clean_session,
            keep_alive: Duration::from_secs(settings.keep_alive_secs),
            connect_timeout: Duration::from_secs(settings.connect_timeout_secs),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.protocol == Protocol::Tls && self.tls.trust_store.is_none() {
            return Err(ConfigurationError::MissingTrustStore);
        }
        if self.keep_alive < MIN_KEEP_ALIVE {
            return Err(ConfigurationError::KeepAlive(self.keep_alive));
        }
        Ok(())
    }

    /// `scheme://host:port`, for logs.
    pub fn broker_uri(&self) -> String {
        format!("{}://{}:{}", self.protocol.scheme(), self.hostname, self.port)
    }
}

fn generate_client_id() -> String {
    format!("devpub-{}", Uuid::new_v4().simple())
}
