pub mod catalog;
pub mod provider;
pub mod providers;

pub use catalog::{CatalogError, ProviderInfo};
pub use provider::{LlmError, LlmProvider, Message, Role};
pub use providers::create_provider;
