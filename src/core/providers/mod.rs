pub mod client;
pub mod curseforge;
pub mod github;
pub mod modrinth;

pub use client::{Provider, ProviderClient, ProviderContext};
