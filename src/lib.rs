pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;
pub use config::{RuntimeConfig, Settings};

pub use adapters::{DeepWikiClient, HostedRepoLister, LocalStorage};
pub use core::{engine::ExportEngine, pipeline::WikiExportPipeline};
pub use domain::model::{Artifact, DocumentationRequest, DocumentationResult, OutputFormat};
pub use utils::error::{DeepWikiError, Result};
