mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{AuthSettings, HubSettings, ServerSettings, Settings};

/// Environment variables look like `RELAYHUB__HUB__PONG_WAIT_SECS=15`.
const ENV_PREFIX: &str = "RELAYHUB";

/// Loads `config/default` (if present) and the environment, then fills every
/// missing value from `Settings::default()`.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from("config/default")
}

pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;
    let default = Settings::default();

    let server = partial.server;
    let hub = partial.hub;
    let auth = partial.auth;

    Ok(Settings {
        server: ServerSettings {
            host: server
                .as_ref()
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: server
                .as_ref()
                .and_then(|s| s.port)
                .unwrap_or(default.server.port),
            ws_path: server
                .as_ref()
                .and_then(|s| s.ws_path.clone())
                .unwrap_or(default.server.ws_path),
            log_level: server
                .as_ref()
                .and_then(|s| s.log_level.clone())
                .unwrap_or(default.server.log_level),
        },
        hub: HubSettings {
            pong_wait_secs: hub
                .as_ref()
                .and_then(|h| h.pong_wait_secs)
                .filter(|secs| *secs > 0)
                .unwrap_or(default.hub.pong_wait_secs),
            write_wait_secs: hub
                .as_ref()
                .and_then(|h| h.write_wait_secs)
                .filter(|secs| *secs > 0)
                .unwrap_or(default.hub.write_wait_secs),
            max_frame_bytes: hub
                .as_ref()
                .and_then(|h| h.max_frame_bytes)
                .unwrap_or(default.hub.max_frame_bytes),
            outbound_capacity: hub
                .as_ref()
                .and_then(|h| h.outbound_capacity)
                .filter(|capacity| *capacity > 0)
                .unwrap_or(default.hub.outbound_capacity),
        },
        auth: AuthSettings {
            jwt_secret: auth
                .as_ref()
                .and_then(|a| a.jwt_secret.clone())
                .or(default.auth.jwt_secret),
            jwt_public_key_pem: auth
                .as_ref()
                .and_then(|a| a.jwt_public_key_pem.clone())
                .or(default.auth.jwt_public_key_pem),
            issuer: auth
                .as_ref()
                .and_then(|a| a.issuer.clone())
                .or(default.auth.issuer),
            audience: auth
                .as_ref()
                .and_then(|a| a.audience.clone())
                .or(default.auth.audience),
            username_claim: auth
                .as_ref()
                .and_then(|a| a.username_claim.clone())
                .unwrap_or(default.auth.username_claim),
        },
    })
}
