//! Core application framework functionality.

use crate::config::{ApplicationConfig, ApplicationConfigProvider, EnvironmentConfigProvider};
use beanpeek_di::config::ConfigSource;
use beanpeek_di::container::{
    ComponentContainer, ComponentContainerBuilder, ContainerState, ShutdownReport,
};
use beanpeek_di::error::{CatalogError, ConfigSourceError, ContainerError};
use beanpeek_di::resolver::RegistrationReport;
use config::ConfigError;
use derive_more::Constructor;
use thiserror::Error;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Error loading application config: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    ConfigSource(#[from] ConfigSourceError),
    #[error("Error building component catalog: {0}")]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error("Failed to register components from {} namespace(s)", .failures.len())]
    Namespaces {
        failures: Vec<NamespaceError>,
        /// Reports of namespaces which registered fully.
        reports: Vec<RegistrationReport>,
    },
}

/// Scanning or registration of a single namespace failed.
#[derive(Error, Clone, Debug)]
#[error("Error registering namespace {namespace}: {source}")]
pub struct NamespaceError {
    pub namespace: String,
    pub source: ContainerError,
}

/// Main entrypoint for the application. Bootstraps the component container from
/// [ApplicationConfig], registers components from configured namespaces and drains them on
/// [shutdown](Application::shutdown).
#[derive(Constructor)]
pub struct Application {
    config: ApplicationConfig,
    container: ComponentContainer,
}

impl Application {
    /// Creates an application using config from given provider. Installs the tracing logger, if
    /// enabled, and loads component properties, but doesn't register anything yet.
    pub fn create<ACP: ApplicationConfigProvider + ?Sized>(
        config_provider: &ACP,
    ) -> Result<Self, ApplicationError> {
        let config = config_provider.config()?;
        if config.install_tracing_logger {
            install_tracing_logger();
        }

        info!("Loading properties from: {}", config.properties_file);
        let config_source = ConfigSource::load(&config.properties_file)?;
        let container = ComponentContainerBuilder::new()?
            .with_config_source(config_source)
            .build();

        Ok(Self::new(config, container))
    }

    /// Scans all configured namespaces, in order, and registers discovered components. A failing
    /// namespace doesn't stop the remaining ones; all failures are reported together, and every
    /// successfully registered component stays available.
    pub fn run(&mut self) -> Result<Vec<RegistrationReport>, ApplicationError> {
        if self.container.state() == ContainerState::ShutDown {
            return Err(ContainerError::ShutDown.into());
        }

        if self.config.scan_namespaces.is_empty() {
            info!("No namespaces configured for scanning");
        }

        let mut reports = Vec::with_capacity(self.config.scan_namespaces.len());
        let mut failures = vec![];
        for namespace in &self.config.scan_namespaces {
            match self.container.scan_and_register(namespace) {
                Ok(report) => reports.push(report),
                Err(error) => {
                    warn!("Error registering namespace {}: {}", namespace, error);
                    failures.push(NamespaceError {
                        namespace: namespace.clone(),
                        source: error,
                    });
                }
            }
        }

        info!(
            "Application started with {} component(s)",
            self.container.registry().len()
        );

        if failures.is_empty() {
            Ok(reports)
        } else {
            Err(ApplicationError::Namespaces { failures, reports })
        }
    }

    /// Runs pre-destroy hooks of all components. Should be called once the application is done.
    pub fn shutdown(&mut self) -> ShutdownReport {
        info!("Shutting down application");
        self.container.shutdown()
    }

    #[inline]
    pub fn config(&self) -> &ApplicationConfig {
        &self.config
    }

    #[inline]
    pub fn container(&self) -> &ComponentContainer {
        &self.container
    }

    #[inline]
    pub fn container_mut(&mut self) -> &mut ComponentContainer {
        &mut self.container
    }
}

/// Creates an [Application] with config from [EnvironmentConfigProvider].
pub fn create_default() -> Result<Application, ApplicationError> {
    Application::create(&EnvironmentConfigProvider)
}

fn install_tracing_logger() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    // another subscriber might have been installed by the host process
    if let Err(error) = tracing_subscriber::fmt().with_env_filter(filter).try_init() {
        debug!("Tracing logger not installed: {}", error);
    }
}
