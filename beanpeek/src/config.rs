//! Application configuration is provided by an [ApplicationConfigProvider], which is consulted
//! once, before the component container is built, since it decides where component properties
//! come from and which namespaces get scanned.
//!
//! By default, the config is created with opinionated default values, which can then be overwritten
//! by environment variables prefixed with `BEANPEEK_` or `beanpeek.json` file. Lists (e.g.
//! `BEANPEEK_SCAN_NAMESPACES`) are comma-separated in environment variables.

#[cfg(test)]
use mockall::automock;
use beanpeek_di::config::PROPERTIES_FILE;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const CONFIG_ENV_PREFIX: &str = "BEANPEEK";

/// Name of the default config file.
pub const CONFIG_FILE: &str = "beanpeek.json";

/// Framework configuration which can be provided by an [ApplicationConfigProvider].
#[non_exhaustive]
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ApplicationConfig {
    /// Should a default tracing logger be installed in the scope of the application.
    pub install_tracing_logger: bool,
    /// Path to the property file used for config injection.
    pub properties_file: String,
    /// Namespaces scanned for components when the application starts.
    pub scan_namespaces: Vec<String>,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            install_tracing_logger: true,
            properties_file: PROPERTIES_FILE.to_string(),
            scan_namespaces: vec![],
        }
    }
}

impl From<OptionalApplicationConfig> for ApplicationConfig {
    fn from(value: OptionalApplicationConfig) -> Self {
        let default = Self::default();
        Self {
            install_tracing_logger: value
                .install_tracing_logger
                .unwrap_or(default.install_tracing_logger),
            properties_file: value.properties_file.unwrap_or(default.properties_file),
            scan_namespaces: value.scan_namespaces.unwrap_or(default.scan_namespaces),
        }
    }
}

impl ApplicationConfig {
    /// Loads config from [CONFIG_FILE] and the environment.
    pub fn init_from_environment() -> Result<Self, ConfigError> {
        Self::init_from_file(CONFIG_FILE)
    }

    /// Loads config from given (optional) file and the environment, which takes precedence.
    pub fn init_from_file(file: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(file).required(false))
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("scan_namespaces"),
            )
            .build()
            .and_then(|config| config.try_deserialize::<OptionalApplicationConfig>())
            .map(|config| config.into())
    }

    /// Sets the namespaces to scan.
    pub fn with_scan_namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scan_namespaces = namespaces.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the property file path.
    pub fn with_properties_file<S: Into<String>>(mut self, properties_file: S) -> Self {
        self.properties_file = properties_file.into();
        self
    }

    /// Enables or disables the built-in tracing logger.
    pub fn with_tracing_logger(mut self, install_tracing_logger: bool) -> Self {
        self.install_tracing_logger = install_tracing_logger;
        self
    }
}

/// Provider for [ApplicationConfig] used by the [Application](crate::application::Application)
/// to configure itself.
#[cfg_attr(test, automock)]
pub trait ApplicationConfigProvider {
    fn config(&self) -> Result<ApplicationConfig, ConfigError>;
}

/// Default provider reading [CONFIG_FILE] and `BEANPEEK_` environment variables.
#[derive(Copy, Clone, Default, Debug)]
pub struct EnvironmentConfigProvider;

impl ApplicationConfigProvider for EnvironmentConfigProvider {
    #[inline]
    fn config(&self) -> Result<ApplicationConfig, ConfigError> {
        ApplicationConfig::init_from_environment()
    }
}

impl ApplicationConfigProvider for ApplicationConfig {
    #[inline]
    fn config(&self) -> Result<ApplicationConfig, ConfigError> {
        Ok(self.clone())
    }
}

#[derive(Deserialize)]
struct OptionalApplicationConfig {
    install_tracing_logger: Option<bool>,
    properties_file: Option<String>,
    scan_namespaces: Option<Vec<String>>,
}
