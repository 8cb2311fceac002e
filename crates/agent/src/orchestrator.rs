//! Chat Orchestrator — one user turn through match → build → gateway.
//!
//! # Flow
//!
//! 1. Append the user turn to the session
//! 2. Rank catalog schemes against the question
//! 3. Build the prompt from the ranked schemes and recent turns
//! 4. Call the model gateway
//! 5. Append the answer (citing every matched scheme) or a fixed apology
//!
//! Every call appends exactly two turns. Gateway failures never escape as
//! errors; they come back in `AskResult::failure`.

use crate::context::{ContextBuilder, ContextLimits};
use sevasaathi_catalog::{Catalog, MatchWeights, match_schemes};
use sevasaathi_config::AppConfig;
use sevasaathi_core::message::{ChatTurn, ConversationHistory};
use sevasaathi_providers::{GatewayFailure, GatewayOutcome, ModelGateway};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Shown to the user when the model could not be reached.
pub const APOLOGY: &str =
    "I apologize, but I encountered an error while processing your request. Please try again.";

/// Result of one `ask`.
#[derive(Debug, Clone)]
pub struct AskResult {
    /// The model's answer, or the apology on failure.
    pub answer: String,
    /// Names of the schemes the answer was grounded on. Empty on failure.
    pub cited_schemes: BTreeSet<String>,
    /// Set when the gateway gave up.
    pub failure: Option<GatewayFailure>,
}

impl AskResult {
    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

/// Ties the catalog, matcher, context builder and gateway together.
///
/// Shared by reference between sessions; each session passes its own history.
pub struct ChatOrchestrator {
    catalog: Arc<Catalog>,
    gateway: ModelGateway,
    builder: ContextBuilder,
    top_k: usize,
    weights: MatchWeights,
}

impl ChatOrchestrator {
    /// Create an orchestrator with default retrieval and context settings.
    pub fn new(catalog: Arc<Catalog>, gateway: ModelGateway) -> Self {
        Self {
            catalog,
            gateway,
            builder: ContextBuilder::default(),
            top_k: 5,
            weights: MatchWeights::default(),
        }
    }

    /// Create an orchestrator with `[retrieval]` and `[context]` from `config`.
    pub fn from_config(catalog: Arc<Catalog>, gateway: ModelGateway, config: &AppConfig) -> Self {
        Self::new(catalog, gateway)
            .with_retrieval(
                config.retrieval.top_k,
                MatchWeights {
                    name: config.retrieval.name_weight,
                    category: config.retrieval.category_weight,
                    body: config.retrieval.body_weight,
                },
            )
            .with_limits(ContextLimits {
                max_history_turns: config.context.max_history_turns,
                max_record_chars: config.context.max_record_chars,
            })
    }

    pub fn with_retrieval(mut self, top_k: usize, weights: MatchWeights) -> Self {
        self.top_k = top_k;
        self.weights = weights;
        self
    }

    pub fn with_limits(mut self, limits: ContextLimits) -> Self {
        self.builder = ContextBuilder::new(limits);
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn gateway(&self) -> &ModelGateway {
        &self.gateway
    }

    /// Answer `user_text` within `session`.
    pub async fn ask(
        &self,
        user_text: &str,
        session: &mut ConversationHistory,
        category: Option<&str>,
    ) -> AskResult {
        self.ask_cancellable(user_text, session, category, &CancellationToken::new())
            .await
    }

    /// Answer `user_text` within `session`, abandoning the model call if
    /// `cancel` fires. A cancelled call still records the apology turn.
    pub async fn ask_cancellable(
        &self,
        user_text: &str,
        session: &mut ConversationHistory,
        category: Option<&str>,
        cancel: &CancellationToken,
    ) -> AskResult {
        session.push(ChatTurn::user(user_text));

        let matches = match_schemes(user_text, &self.catalog, category, self.top_k, &self.weights);
        let cited: BTreeSet<String> = matches.iter().map(|m| m.record.name.clone()).collect();
        let prompt = self.builder.build(&matches, session);

        match self.gateway.invoke_cancellable(&prompt, cancel).await {
            GatewayOutcome::Success { text, attempts } => {
                session.push(ChatTurn::assistant(text.clone(), cited.clone()));
                info!(
                    session = %session.id(),
                    cited = cited.len(),
                    attempts,
                    "Turn answered"
                );
                AskResult {
                    answer: text,
                    cited_schemes: cited,
                    failure: None,
                }
            }
            GatewayOutcome::Failure(failure) => {
                session.push(ChatTurn::assistant(APOLOGY, BTreeSet::new()));
                warn!(
                    session = %session.id(),
                    kind = %failure.kind,
                    attempts = failure.attempts,
                    "Turn failed, apology recorded"
                );
                AskResult {
                    answer: APOLOGY.to_string(),
                    cited_schemes: BTreeSet::new(),
                    failure: Some(failure),
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use sevasaathi_core::error::ProviderError;
    use sevasaathi_core::message::Role;
    use sevasaathi_core::provider::Provider;
    use sevasaathi_providers::{FailureKind, RetryPolicy};
    use std::time::Duration;

    fn orchestrator(provider: Arc<dyn Provider>, max_retries: u32) -> ChatOrchestrator {
        let gateway = ModelGateway::new(
            provider,
            "mock-model",
            RetryPolicy {
                max_retries,
                ..RetryPolicy::default()
            },
        );
        ChatOrchestrator::new(Arc::new(sample_catalog()), gateway)
    }

    #[tokio::test]
    async fn answer_cites_matched_schemes() {
        let provider = Arc::new(SequentialMockProvider::single_text(
            "The Crop Insurance Scheme and Kisan Credit Card support farmers.",
        ));
        let orch = orchestrator(provider.clone(), 2);
        let mut session = ConversationHistory::new();

        let result = orch.ask("schemes for farmers", &mut session, None).await;

        assert!(!result.is_failure());
        assert!(result.answer.contains("Crop Insurance"));
        let cited: Vec<&str> = result.cited_schemes.iter().map(String::as_str).collect();
        assert_eq!(cited, vec!["Crop Insurance Scheme", "Kisan Credit Card"]);

        assert_eq!(session.len(), 2);
        assert_eq!(session.turns()[0].role, Role::User);
        assert_eq!(session.turns()[1].cited_scheme_names, result.cited_schemes);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn prompt_carries_records_and_question() {
        let provider = Arc::new(SequentialMockProvider::single_text("ok"));
        let orch = orchestrator(provider.clone(), 0);
        let mut session = ConversationHistory::new();

        orch.ask("student loan", &mut session, None).await;

        let request = provider.request(0);
        assert!(request.system.contains("### Student Loan Scheme"));
        assert!(!request.system.contains("Crop Insurance Scheme"));
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].content, "student loan");
    }

    #[tokio::test]
    async fn no_match_still_asks_model_with_framing() {
        let provider = Arc::new(SequentialMockProvider::single_text(
            "Sorry, no matching scheme was found.",
        ));
        let orch = orchestrator(provider.clone(), 0);
        let mut session = ConversationHistory::new();

        let result = orch.ask("xyzabc123", &mut session, None).await;

        assert!(result.cited_schemes.is_empty());
        assert!(result.answer.contains("no matching scheme"));
        assert!(provider.request(0).system.contains("No matching scheme found"));
    }

    #[tokio::test]
    async fn category_filter_limits_citations() {
        let provider = Arc::new(SequentialMockProvider::single_text("ok"));
        let orch = orchestrator(provider, 0);
        let mut session = ConversationHistory::new();

        let result = orch
            .ask("insurance or loans for farmers and students", &mut session, Some("Education"))
            .await;

        assert!(result.cited_schemes.iter().all(|n| n == "Student Loan Scheme"));
    }

    #[tokio::test]
    async fn auth_failure_records_apology() {
        let provider = Arc::new(SequentialMockProvider::failing(
            ProviderError::AuthenticationFailed("bad key".into()),
            1,
        ));
        let orch = orchestrator(provider.clone(), 3);
        let mut session = ConversationHistory::new();

        let result = orch.ask("crop insurance", &mut session, None).await;

        assert_eq!(result.answer, APOLOGY);
        assert!(result.cited_schemes.is_empty());
        let failure = result.failure.unwrap();
        assert_eq!(failure.kind, FailureKind::NonRetryable);
        assert_eq!(failure.attempts, 1);

        assert_eq!(session.len(), 2);
        assert_eq!(session.turns()[1].text, APOLOGY);
        assert!(session.turns()[1].cited_scheme_names.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_failure_then_recovery_in_same_session() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Err(ProviderError::Network("reset".into())),
            Err(ProviderError::Network("reset".into())),
            Ok(make_text_response("Here is the Student Loan Scheme.")),
        ]));
        let orch = orchestrator(provider.clone(), 1);
        let mut session = ConversationHistory::new();

        let first = orch.ask("student loan", &mut session, None).await;
        assert_eq!(first.failure.as_ref().map(|f| f.kind), Some(FailureKind::Exhausted));

        let second = orch.ask("student loan again", &mut session, None).await;
        assert!(!second.is_failure());
        assert_eq!(session.len(), 4);
        assert_eq!(provider.call_count(), 3);

        // The failed exchange stays in history, apology included.
        let history = &provider.request(2).messages;
        assert_eq!(history.len(), 3);
        assert_eq!(history[1].content, APOLOGY);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_turn_appends_apology_only() {
        let orch = orchestrator(Arc::new(HangingProvider), 2);
        let mut session = ConversationHistory::new();
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            canceller.cancel();
        });

        let result = orch
            .ask_cancellable("crop insurance", &mut session, None, &token)
            .await;

        assert_eq!(result.failure.map(|f| f.kind), Some(FailureKind::Cancelled));
        assert_eq!(session.len(), 2);
        assert_eq!(session.last().unwrap().text, APOLOGY);
    }

    #[tokio::test]
    async fn history_window_follows_config() {
        let provider = Arc::new(SequentialMockProvider::texts(&["a1", "a2", "a3"]));
        let mut config = AppConfig::default();
        config.context.max_history_turns = 2;
        let gateway = ModelGateway::from_config(provider.clone(), &config);
        let orch = ChatOrchestrator::from_config(Arc::new(sample_catalog()), gateway, &config);
        let mut session = ConversationHistory::new();

        orch.ask("q1", &mut session, None).await;
        orch.ask("q2", &mut session, None).await;
        orch.ask("q3", &mut session, None).await;

        let messages = &provider.request(2).messages;
        let texts: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(texts, vec!["q2", "a2", "q3"]);
        assert_eq!(session.len(), 6);
    }

    #[tokio::test]
    async fn sessions_share_catalog_not_history() {
        let provider = Arc::new(SequentialMockProvider::texts(&["one", "two"]));
        let orch = orchestrator(provider, 0);
        let mut alice = ConversationHistory::new();
        let mut bob = ConversationHistory::new();

        orch.ask("crop insurance", &mut alice, None).await;
        orch.ask("student loan", &mut bob, None).await;

        assert_eq!(alice.len(), 2);
        assert_eq!(bob.len(), 2);
        assert_eq!(alice.turns()[0].text, "crop insurance");
        assert_eq!(bob.turns()[0].text, "student loan");
    }
}
