//! # SevaSaathi Core
//!
//! Domain types, traits, and error definitions for the SevaSaathi scheme
//! assistant. This crate has **no runtime or HTTP dependencies**; it defines
//! the domain model that all other crates implement against.
//!
//! The language-model backend is a trait here; implementations live in
//! `sevasaathi-providers`. Tests anywhere in the workspace swap in fakes.

pub mod error;
pub mod message;
pub mod prompt;
pub mod provider;
pub mod scheme;

// Re-export key types at crate root for ergonomics
pub use error::{DataError, ProviderError};
pub use message::{ChatTurn, ConversationHistory, Role, SessionId};
pub use prompt::{Prompt, PromptTurn, RenderedRecord};
pub use provider::{Provider, ProviderMessage, ProviderRequest, ProviderResponse, Usage};
pub use scheme::SchemeRecord;
