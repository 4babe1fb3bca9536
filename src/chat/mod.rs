pub mod completion;
pub mod pipeline;

pub use completion::{CompletionClient, OpenAiCompletionClient};
pub use pipeline::{ChatError, MessagePipeline};
