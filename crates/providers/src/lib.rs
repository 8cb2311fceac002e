//! Language-model access for SevaSaathi.
//!
//! All backends implement the `sevasaathi_core::Provider` trait. The
//! `ModelGateway` wraps one backend with timeout, retry and cancellation;
//! `build_from_config` picks the backend from configuration.

pub mod gateway;
pub mod gemini;
pub mod openai_compat;
pub mod router;
mod status;

pub use gateway::{FailureKind, GatewayFailure, GatewayOutcome, ModelGateway, RetryPolicy, Sampling};
pub use gemini::GeminiProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;

/// Shared HTTP client settings. Per-call deadlines belong to the gateway.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(std::time::Duration::from_secs(10))
        .build()
        .unwrap_or_default()
}
