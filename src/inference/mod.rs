pub mod provider;
pub mod providers;
pub mod types;

pub use provider::{CompletionProvider, CompletionRequest, ProviderError, collect_completion};
pub use providers::{LmStudioProvider, OpenRouterProvider};
pub use types::{Context, ContextSegment, Effort, Source, StreamChunk};
