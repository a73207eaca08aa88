pub mod settings;

pub use settings::{ConfigOverrides, DownloadConfig, EngineConfig, ProviderConfig, VerifyIdPolicy};
