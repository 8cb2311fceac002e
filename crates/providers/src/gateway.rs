//! Model Gateway — one prompt in, exactly one outcome out.
//!
//! Each call runs a small state machine over a single backend:
//!
//! ```text
//!   Attempt ──ok──────────────────────────────▶ Success
//!      │
//!      ├─retryable, attempts ≤ max_retries──▶ backoff ──▶ Attempt
//!      ├─retryable, budget spent────────────▶ Failure(Exhausted)
//!      └─non-retryable──────────────────────▶ Failure(NonRetryable)
//! ```
//!
//! Every attempt runs under `tokio::time::timeout`. A cancellation token can
//! abandon the loop during an attempt or a backoff wait (`Failure(Cancelled)`).

use sevasaathi_config::AppConfig;
use sevasaathi_core::error::ProviderError;
use sevasaathi_core::provider::{Provider, ProviderRequest};
use sevasaathi_core::Prompt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Timeout and retry settings for one gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Deadline for a single attempt.
    pub timeout: Duration,
    /// Attempts after the first; at most `max_retries + 1` calls are made.
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 2,
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_millis(8000),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            timeout: config.api_timeout(),
            max_retries: config.max_retries,
            backoff_base: Duration::from_millis(config.retry.backoff_base_ms),
            backoff_max: Duration::from_millis(config.retry.backoff_max_ms),
        }
    }

    /// Wait before retry number `retry` (0-based): `base * 2^retry`, capped.
    pub fn backoff_for(&self, retry: u32) -> Duration {
        self.backoff_base
            .saturating_mul(1u32 << retry.min(16))
            .min(self.backoff_max)
    }

    /// Wait after `error`, honouring a rate limit's `Retry-After` up to the cap.
    fn delay_after(&self, retry: u32, error: &ProviderError) -> Duration {
        let backoff = self.backoff_for(retry);
        match error {
            ProviderError::RateLimited { retry_after_secs } => backoff
                .max(Duration::from_secs(*retry_after_secs))
                .min(self.backoff_max),
            _ => backoff,
        }
    }
}

/// Sampling parameters attached to every request.
#[derive(Debug, Clone, PartialEq)]
pub struct Sampling {
    pub temperature: f32,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    pub max_tokens: Option<u32>,
}

impl Default for Sampling {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            top_p: Some(0.8),
            top_k: Some(20),
            max_tokens: Some(1024),
        }
    }
}

/// Why a gateway call gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Retryable failures used up the retry budget.
    Exhausted,
    /// The backend reported an error no retry can fix.
    NonRetryable,
    /// The caller cancelled the call.
    Cancelled,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exhausted => write!(f, "exhausted"),
            Self::NonRetryable => write!(f, "non-retryable"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Terminal failure of one gateway call.
#[derive(Debug, Clone)]
pub struct GatewayFailure {
    pub kind: FailureKind,
    /// Attempts started, including one interrupted by cancellation.
    pub attempts: u32,
    /// The most recent backend error; `None` if cancelled before any failed.
    pub last_error: Option<ProviderError>,
}

impl std::fmt::Display for GatewayFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} after {} attempt(s)", self.kind, self.attempts)?;
        if let Some(e) = &self.last_error {
            write!(f, ": {e}")?;
        }
        Ok(())
    }
}

/// The single result of `ModelGateway::invoke`.
#[derive(Debug, Clone)]
pub enum GatewayOutcome {
    Success { text: String, attempts: u32 },
    Failure(GatewayFailure),
}

impl GatewayOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts, .. } => *attempts,
            Self::Failure(f) => f.attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Mediates every call to the language-model backend.
pub struct ModelGateway {
    provider: Arc<dyn Provider>,
    model: String,
    sampling: Sampling,
    policy: RetryPolicy,
}

impl ModelGateway {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            provider,
            model: model.into(),
            sampling: Sampling::default(),
            policy,
        }
    }

    /// Gateway over `provider` with model, sampling and retry settings from `config`.
    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        Self::new(
            provider,
            config.provider.model.clone(),
            RetryPolicy::from_config(config),
        )
        .with_sampling(Sampling {
            temperature: config.generation.temperature,
            top_p: Some(config.generation.top_p),
            top_k: Some(config.generation.top_k),
            max_tokens: Some(config.generation.max_output_tokens),
        })
    }

    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Ask the backend whether it is reachable with the current credentials.
    pub async fn health_check(&self) -> Result<bool, ProviderError> {
        tokio::time::timeout(self.policy.timeout, self.provider.health_check())
            .await
            .unwrap_or_else(|_| {
                Err(ProviderError::Timeout(format!(
                    "Health check timed out after {:.1}s",
                    self.policy.timeout.as_secs_f64()
                )))
            })
    }

    fn request_for(&self, prompt: &Prompt) -> ProviderRequest {
        let mut request = ProviderRequest::from_prompt(&self.model, prompt);
        request.temperature = self.sampling.temperature;
        request.top_p = self.sampling.top_p;
        request.top_k = self.sampling.top_k;
        request.max_tokens = self.sampling.max_tokens;
        request
    }

    /// Send `prompt` under the retry policy.
    pub async fn invoke(&self, prompt: &Prompt) -> GatewayOutcome {
        self.invoke_cancellable(prompt, &CancellationToken::new()).await
    }

    /// Send `prompt` under the retry policy, giving up early if `cancel` fires.
    pub async fn invoke_cancellable(
        &self,
        prompt: &Prompt,
        cancel: &CancellationToken,
    ) -> GatewayOutcome {
        let request = self.request_for(prompt);
        let provider_name = self.provider.name().to_string();
        let max_attempts = self.policy.max_retries.saturating_add(1);
        let mut attempts: u32 = 0;
        let mut last_error: Option<ProviderError> = None;

        loop {
            if cancel.is_cancelled() {
                return self.cancelled(attempts, last_error);
            }
            attempts += 1;

            info!(
                provider = %provider_name,
                model = %self.model,
                attempt = attempts,
                max_attempts,
                "Gateway: sending prompt"
            );

            let call =
                tokio::time::timeout(self.policy.timeout, self.provider.complete(request.clone()));
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.cancelled(attempts, last_error),
                r = call => r,
            };

            let error = match result {
                Ok(Ok(response)) if !response.text.trim().is_empty() => {
                    if let Some(usage) = &response.usage {
                        debug!(
                            prompt_tokens = usage.prompt_tokens,
                            completion_tokens = usage.completion_tokens,
                            "Gateway: usage"
                        );
                    }
                    info!(provider = %provider_name, attempts, "Gateway: answer received");
                    return GatewayOutcome::Success {
                        text: response.text.trim().to_string(),
                        attempts,
                    };
                }
                Ok(Ok(_)) => ProviderError::MalformedResponse("Empty completion text".into()),
                Ok(Err(e)) => e,
                Err(_) => ProviderError::Timeout(format!(
                    "Provider '{}' timed out after {:.1}s",
                    provider_name,
                    self.policy.timeout.as_secs_f64()
                )),
            };

            if !error.is_retryable() {
                warn!(
                    provider = %provider_name,
                    attempts,
                    error = %error,
                    "Gateway: non-retryable failure"
                );
                return GatewayOutcome::Failure(GatewayFailure {
                    kind: FailureKind::NonRetryable,
                    attempts,
                    last_error: Some(error),
                });
            }

            if attempts >= max_attempts {
                warn!(
                    provider = %provider_name,
                    attempts,
                    error = %error,
                    "Gateway: retries exhausted"
                );
                return GatewayOutcome::Failure(GatewayFailure {
                    kind: FailureKind::Exhausted,
                    attempts,
                    last_error: Some(error),
                });
            }

            let delay = self.policy.delay_after(attempts - 1, &error);
            warn!(
                provider = %provider_name,
                attempt = attempts,
                backoff_ms = delay.as_millis() as u64,
                error = %error,
                "Gateway: attempt failed, retrying"
            );
            last_error = Some(error);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.cancelled(attempts, last_error),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    fn cancelled(&self, attempts: u32, last_error: Option<ProviderError>) -> GatewayOutcome {
        info!(provider = %self.provider.name(), attempts, "Gateway: call cancelled");
        GatewayOutcome::Failure(GatewayFailure {
            kind: FailureKind::Cancelled,
            attempts,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sevasaathi_core::provider::ProviderResponse;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Replays a fixed script of results, then repeats the last one.
    struct ScriptedProvider {
        script: Mutex<VecDeque<Result<String, ProviderError>>>,
        last: Mutex<Option<Result<String, ProviderError>>>,
        call_count: Mutex<usize>,
        requests: Mutex<Vec<ProviderRequest>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<&str, ProviderError>>) -> Self {
            Self {
                script: Mutex::new(
                    script
                        .into_iter()
                        .map(|r| r.map(str::to_string))
                        .collect(),
                ),
                last: Mutex::new(None),
                call_count: Mutex::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing(error: ProviderError) -> Self {
            Self::new(vec![Err(error)])
        }

        fn calls(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            self.requests.lock().unwrap().push(request);

            let next = self.script.lock().unwrap().pop_front();
            let result = match next {
                Some(r) => {
                    *self.last.lock().unwrap() = Some(r.clone());
                    r
                }
                None => self
                    .last
                    .lock()
                    .unwrap()
                    .clone()
                    .unwrap_or_else(|| Err(ProviderError::NotConfigured("empty script".into()))),
            };

            result.map(|text| ProviderResponse {
                text,
                usage: None,
                model: "test-model".into(),
            })
        }
    }

    /// A mock provider that hangs forever (for timeout testing).
    struct HangingProvider {
        call_count: Mutex<usize>,
    }

    #[async_trait]
    impl Provider for HangingProvider {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(ProviderError::Network("unreachable".into()))
        }
    }

    fn prompt() -> Prompt {
        Prompt {
            system_instruction: "Answer only from the schemes listed.".into(),
            record_context: String::new(),
            records: vec![],
            history: vec![],
            question: Some("Any schemes for farmers?".into()),
            no_match: true,
            estimated_tokens: 0,
        }
    }

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            ..RetryPolicy::default()
        }
    }

    fn server_error() -> ProviderError {
        ProviderError::ApiError {
            status_code: 503,
            message: "Service Unavailable".into(),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let p = RetryPolicy::default();
        assert_eq!(p.backoff_for(0), Duration::from_millis(500));
        assert_eq!(p.backoff_for(1), Duration::from_millis(1000));
        assert_eq!(p.backoff_for(3), Duration::from_millis(4000));
        assert_eq!(p.backoff_for(4), Duration::from_millis(8000));
        assert_eq!(p.backoff_for(10), Duration::from_millis(8000));
        assert_eq!(p.backoff_for(u32::MAX), Duration::from_millis(8000));
    }

    #[test]
    fn rate_limit_delay_honours_retry_after_up_to_cap() {
        let p = RetryPolicy::default();
        let short = ProviderError::RateLimited { retry_after_secs: 2 };
        let long = ProviderError::RateLimited { retry_after_secs: 60 };
        assert_eq!(p.delay_after(0, &short), Duration::from_secs(2));
        assert_eq!(p.delay_after(0, &long), Duration::from_millis(8000));
        assert_eq!(p.delay_after(0, &server_error()), Duration::from_millis(500));
    }

    #[test]
    fn policy_from_config() {
        let mut config = AppConfig::default();
        config.max_retries = 4;
        config.api_timeout_seconds = 2.5;
        let p = RetryPolicy::from_config(&config);
        assert_eq!(p.max_retries, 4);
        assert_eq!(p.timeout, Duration::from_millis(2500));
        assert_eq!(p.backoff_base, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn first_attempt_succeeds() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok("  Try PM-KISAN.  ")]));
        let gateway = ModelGateway::new(provider.clone(), "gemini-1.5-flash", policy(2));

        match gateway.invoke(&prompt()).await {
            GatewayOutcome::Success { text, attempts } => {
                assert_eq!(text, "Try PM-KISAN.");
                assert_eq!(attempts, 1);
            }
            other => panic!("Expected success, got: {other:?}"),
        }
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn request_carries_model_and_sampling() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok("ok")]));
        let gateway = ModelGateway::from_config(provider.clone(), &AppConfig::default());
        gateway.invoke(&prompt()).await;

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests[0].model, "gemini-1.5-flash");
        assert_eq!(requests[0].top_k, Some(20));
        assert_eq!(requests[0].max_tokens, Some(1024));
        assert_eq!(requests[0].messages.last().unwrap().content, "Any schemes for farmers?");
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_failures_then_succeeds() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(server_error()),
            Err(ProviderError::Network("connection reset".into())),
            Ok("Here are the schemes."),
        ]));
        let gateway = ModelGateway::new(provider.clone(), "m", policy(2));

        let start = Instant::now();
        let outcome = gateway.invoke(&prompt()).await;
        assert!(matches!(outcome, GatewayOutcome::Success { attempts: 3, .. }));
        assert_eq!(provider.calls(), 3);
        // 500ms + 1000ms of backoff.
        assert!(start.elapsed() >= Duration::from_millis(1500));
        assert!(start.elapsed() < Duration::from_millis(1600));
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_backend_exhausts_after_n_plus_one() {
        for max_retries in [0, 1, 3] {
            let provider = Arc::new(ScriptedProvider::failing(server_error()));
            let gateway = ModelGateway::new(provider.clone(), "m", policy(max_retries));

            match gateway.invoke(&prompt()).await {
                GatewayOutcome::Failure(f) => {
                    assert_eq!(f.kind, FailureKind::Exhausted);
                    assert_eq!(f.attempts, max_retries + 1);
                    assert!(matches!(
                        f.last_error,
                        Some(ProviderError::ApiError { status_code: 503, .. })
                    ));
                }
                other => panic!("Expected failure, got: {other:?}"),
            }
            assert_eq!(provider.calls(), max_retries as usize + 1);
        }
    }

    #[tokio::test]
    async fn auth_error_is_not_retried() {
        let provider = Arc::new(ScriptedProvider::failing(
            ProviderError::AuthenticationFailed("API key not valid".into()),
        ));
        let gateway = ModelGateway::new(provider.clone(), "m", policy(5));

        match gateway.invoke(&prompt()).await {
            GatewayOutcome::Failure(f) => {
                assert_eq!(f.kind, FailureKind::NonRetryable);
                assert_eq!(f.attempts, 1);
            }
            other => panic!("Expected failure, got: {other:?}"),
        }
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_after_transient_stops_immediately() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(ProviderError::RateLimited { retry_after_secs: 1 }),
            Err(ProviderError::QuotaExceeded("daily quota".into())),
            Ok("never reached"),
        ]));
        let gateway = ModelGateway::new(provider.clone(), "m", policy(5));

        match gateway.invoke(&prompt()).await {
            GatewayOutcome::Failure(f) => {
                assert_eq!(f.kind, FailureKind::NonRetryable);
                assert_eq!(f.attempts, 2);
                assert!(matches!(f.last_error, Some(ProviderError::QuotaExceeded(_))));
            }
            other => panic!("Expected failure, got: {other:?}"),
        }
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_text_is_retried_as_malformed() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok("   "), Ok("Real answer")]));
        let gateway = ModelGateway::new(provider.clone(), "m", policy(1));

        let outcome = gateway.invoke(&prompt()).await;
        assert!(matches!(outcome, GatewayOutcome::Success { attempts: 2, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_counts_as_retryable_attempt() {
        let provider = Arc::new(HangingProvider {
            call_count: Mutex::new(0),
        });
        let gateway = ModelGateway::new(
            provider.clone(),
            "m",
            RetryPolicy {
                timeout: Duration::from_secs(30),
                max_retries: 1,
                ..RetryPolicy::default()
            },
        );

        let start = Instant::now();
        match gateway.invoke(&prompt()).await {
            GatewayOutcome::Failure(f) => {
                assert_eq!(f.kind, FailureKind::Exhausted);
                assert_eq!(f.attempts, 2);
                assert!(matches!(f.last_error, Some(ProviderError::Timeout(_))));
            }
            other => panic!("Expected failure, got: {other:?}"),
        }
        assert_eq!(*provider.call_count.lock().unwrap(), 2);
        // Two 30s deadlines plus one 500ms backoff; never unbounded.
        assert!(start.elapsed() >= Duration::from_millis(60_500));
        assert!(start.elapsed() < Duration::from_millis(60_600));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_attempt() {
        let provider = Arc::new(HangingProvider {
            call_count: Mutex::new(0),
        });
        let gateway = ModelGateway::new(provider, "m", policy(3));
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        match gateway.invoke_cancellable(&prompt(), &token).await {
            GatewayOutcome::Failure(f) => {
                assert_eq!(f.kind, FailureKind::Cancelled);
                assert_eq!(f.attempts, 1);
                assert!(f.last_error.is_none());
            }
            other => panic!("Expected cancellation, got: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_backoff_keeps_last_error() {
        let provider = Arc::new(ScriptedProvider::failing(server_error()));
        let gateway = ModelGateway::new(
            provider.clone(),
            "m",
            RetryPolicy {
                backoff_base: Duration::from_secs(5),
                backoff_max: Duration::from_secs(5),
                ..policy(3)
            },
        );
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        match gateway.invoke_cancellable(&prompt(), &token).await {
            GatewayOutcome::Failure(f) => {
                assert_eq!(f.kind, FailureKind::Cancelled);
                assert_eq!(f.attempts, 1);
                assert!(matches!(f.last_error, Some(ProviderError::ApiError { .. })));
            }
            other => panic!("Expected cancellation, got: {other:?}"),
        }
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn already_cancelled_makes_no_call() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok("answer")]));
        let gateway = ModelGateway::new(provider.clone(), "m", policy(2));
        let token = CancellationToken::new();
        token.cancel();

        let outcome = gateway.invoke_cancellable(&prompt(), &token).await;
        assert!(matches!(
            outcome,
            GatewayOutcome::Failure(GatewayFailure {
                kind: FailureKind::Cancelled,
                attempts: 0,
                ..
            })
        ));
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn failure_display() {
        let failure = GatewayFailure {
            kind: FailureKind::Exhausted,
            attempts: 3,
            last_error: Some(server_error()),
        };
        let text = failure.to_string();
        assert!(text.starts_with("exhausted after 3 attempt(s)"));
        assert!(text.contains("Service Unavailable"));
    }
}
