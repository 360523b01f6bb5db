mod settings;

use config::{Config, Environment, File};

use crate::utils::error::ConfigurationError;

pub use settings::{
    DispatchSettings, FilterSettings, LoggingSettings, MqttSettings, PartialSettings, Settings,
    StorageSettings,
};

const DEFAULT_CONFIG_FILE: &str = "config/default";
const ENV_PREFIX: &str = "DEVPUB";

/// Loads the configuration from `config/default` and the environment.
///
/// A `.env` file in the working directory is read first when present.
/// Environment variables look like `DEVPUB_MQTT__HOSTNAME`; list values are
/// comma separated.
pub fn load_config() -> Result<Settings, ConfigurationError> {
    dotenvy::dotenv().ok();
    load_config_from(DEFAULT_CONFIG_FILE)
}

/// Same as [`load_config`] with an explicit file stem and no `.env` lookup.
pub fn load_config_from(file: &str) -> Result<Settings, ConfigurationError> {
    let builder = Config::builder()
        .add_source(File::with_name(file).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("dispatch.multicast_routes")
                .with_list_parse_key("filters.include_event_types")
                .with_list_parse_key("filters.exclude_event_types"),
        );

    let config = builder.build()?;

    // Deserialize whatever is present, then fill the gaps
    let partial: PartialSettings = config.try_deserialize()?;
    Ok(partial.merge_defaults())
}
