//! English conversation bot - LINE messages in, model replies out.

pub mod completion;
pub mod database;
pub mod dispatcher;
pub mod engine;
pub mod line;
pub mod modes;
pub mod prompts;
pub mod quick_reply;
pub mod usage;

#[cfg(test)]
pub(crate) mod fakes;

pub use completion::{ModelSettings, OpenAiClient};
pub use database::SqliteStore;
pub use dispatcher::Dispatcher;
pub use line::LineClient;
pub use usage::UsageGuard;
