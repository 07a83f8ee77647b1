pub mod engine;
pub mod pipeline;
pub mod scaffold;

pub use crate::domain::ports::{Pipeline, Storage, WikiBackend};
pub use crate::utils::error::Result;
