/// Network adapters for external API calls
mod caching_registry_client;
mod npm_registry_client;
mod openai_compatible_client;
mod osv_client;
mod retry;

pub use caching_registry_client::CachingPackageRegistry;
pub use npm_registry_client::NpmRegistryClient;
pub use openai_compatible_client::OpenAiCompatibleClient;
pub use osv_client::{OsvClient, OsvOptions};
pub use retry::{HttpExecutor, RetryPolicy};
