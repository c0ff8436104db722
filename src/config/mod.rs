//! Configuration module

mod settings;

pub use settings::{
    LoggingConfig, PollingConfig, ProviderConfig, ServerConfig, Settings, StorageConfig,
    TransportConfig,
};
