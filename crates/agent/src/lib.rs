//! The chat loop of SevaSaathi.
//!
//! Each user question goes through the same steps:
//!
//! 1. **Match** the question against the scheme catalog
//! 2. **Build** a bounded prompt from the best matches and recent turns
//! 3. **Ask** the model through the retrying gateway
//! 4. **Record** the answer, or an apology, in the session history

pub mod context;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use context::{ContextBuilder, ContextLimits};
pub use orchestrator::{APOLOGY, AskResult, ChatOrchestrator};
