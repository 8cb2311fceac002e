//! Shared test helpers for orchestrator tests.

use sevasaathi_catalog::Catalog;
use sevasaathi_core::error::ProviderError;
use sevasaathi_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use sevasaathi_core::SchemeRecord;
use std::sync::Mutex;
use std::time::Duration;

/// A mock provider that returns a sequence of scripted results.
///
/// Each call to `complete` returns the next result in the queue and records
/// the request it was given. Panics if more calls are made than results provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
    call_count: Mutex<usize>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
            call_count: Mutex::new(0),
        }
    }

    /// A provider that answers once with `text`.
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![Ok(make_text_response(text))])
    }

    /// A provider that answers every call in order.
    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(make_text_response(t))).collect())
    }

    /// A provider that fails `n` times with `error`.
    pub fn failing(error: ProviderError, n: usize) -> Self {
        Self::new((0..n).map(|_| Err(error.clone())).collect())
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// The request seen by call number `i` (0-based).
    pub fn request(&self, i: usize) -> ProviderRequest {
        self.requests.lock().unwrap()[i].clone()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut count = self.call_count.lock().unwrap();
        let responses = self.responses.lock().unwrap();

        if *count >= responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                *count,
                responses.len()
            );
        }

        let response = responses[*count].clone();
        *count += 1;
        self.requests.lock().unwrap().push(request);
        response
    }
}

/// A provider that never answers.
pub struct HangingProvider;

#[async_trait::async_trait]
impl Provider for HangingProvider {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(ProviderError::Network("unreachable".into()))
    }
}

/// Create a simple text response.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        text: text.into(),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A small catalog covering two categories.
pub fn sample_catalog() -> Catalog {
    Catalog::from_records(vec![
        SchemeRecord::new("Crop Insurance Scheme", "Agriculture")
            .with_description("Insurance cover for farmers against crop loss.")
            .with_benefits(&["Low premium"]),
        SchemeRecord::new("Student Loan Scheme", "Education")
            .with_description("Loans for higher studies.")
            .with_eligibility(&["Indian students admitted to recognised institutions"]),
        SchemeRecord::new("Kisan Credit Card", "Agriculture")
            .with_description("Short-term credit for farmers."),
    ])
    .unwrap()
}
