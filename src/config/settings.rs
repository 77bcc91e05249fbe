use serde::Deserialize;

/// Top-level configuration settings for the hub.
///
/// Groups the listener, the per-connection pump timings and the bearer token
/// verification parameters.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub hub: HubSettings,
    pub auth: AuthSettings,
}

/// Configuration settings for the listener.
///
/// Defines the host and port the server will bind to and the single route
/// that accepts websocket upgrades.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub ws_path: String,
    pub log_level: String,
}

/// Per-connection pump parameters.
#[derive(Debug, Deserialize, Clone)]
pub struct HubSettings {
    /// Read liveness window. Refreshed by every pong.
    pub pong_wait_secs: u64,
    /// Deadline applied to each outbound write.
    pub write_wait_secs: u64,
    /// Largest inbound frame a client may send.
    pub max_frame_bytes: usize,
    /// Bounded outbound queue capacity per connection.
    pub outbound_capacity: usize,
}

/// Bearer token verification parameters.
///
/// Exactly one of `jwt_secret` or `jwt_public_key_pem` is expected to be set;
/// the secret wins when both are.
#[derive(Debug, Deserialize, Clone)]
pub struct AuthSettings {
    pub jwt_secret: Option<String>,
    pub jwt_public_key_pem: Option<String>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub username_claim: String,
}

#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub hub: Option<PartialHubSettings>,
    pub auth: Option<PartialAuthSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub ws_path: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialHubSettings {
    pub pong_wait_secs: Option<u64>,
    pub write_wait_secs: Option<u64>,
    pub max_frame_bytes: Option<usize>,
    pub outbound_capacity: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialAuthSettings {
    pub jwt_secret: Option<String>,
    pub jwt_public_key_pem: Option<String>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub username_claim: Option<String>,
}

/// Lower bound for pump timings.
const MIN_TIMING_SECS: u64 = 1;

impl HubSettings {
    pub fn pong_wait(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.pong_wait_secs.max(MIN_TIMING_SECS))
    }

    /// Pings go out at 9/10 of the read window so a healthy peer always
    /// answers before the deadline.
    pub fn ping_interval(&self) -> std::time::Duration {
        self.pong_wait() * 9 / 10
    }

    pub fn write_wait(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.write_wait_secs.max(MIN_TIMING_SECS))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
                ws_path: "/ws".to_string(),
                log_level: "info".to_string(),
            },
            hub: HubSettings {
                pong_wait_secs: 30,
                write_wait_secs: 10,
                max_frame_bytes: 16384,
                outbound_capacity: 64,
            },
            auth: AuthSettings {
                jwt_secret: None,
                jwt_public_key_pem: None,
                issuer: None,
                audience: None,
                username_claim: "preferred_username".to_string(),
            },
        }
    }
}
