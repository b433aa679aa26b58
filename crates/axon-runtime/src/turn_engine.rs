//! The turn engine — multi-iteration agent loop with abort and busy tracking.
//!
//! State machine per turn:
//! `Idle → CallingLLM → (tool calls?) AwaitingApproval* → ExecutingTools →
//! CallingLLM → … → Completed | Aborted | MaxIterationsReached | Error`.
//!
//! The busy flag guarantees at most one turn per session at a time and is
//! cleared on every exit path (RAII guard, panic included). The abort signal
//! is checked at the top of each iteration and before each tool execution;
//! it propagates into in-flight LLM calls and tool executions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use axon_approval::ApprovalCoordinator;
use axon_context::ContextManager;
use axon_core::events::{AgentEvent, EventSink};
use axon_core::ids::SessionId;
use axon_core::messages::TokenUsage;

use crate::capabilities::{LlmClient, ToolExecutor};
use crate::errors::EngineError;
use crate::turn_runner::{self, accumulate_usage};
use crate::types::{EngineConfig, IterationOutcome, TurnOutcome, TurnStatus};

/// RAII guard that resets the busy flag on drop (even on panic).
struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn new(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Drives user-driven turns for one session.
pub struct TurnEngine {
    config: EngineConfig,
    session_id: SessionId,
    context: ContextManager,
    llm: Arc<dyn LlmClient>,
    tools: Arc<dyn ToolExecutor>,
    approvals: Arc<ApprovalCoordinator>,
    sink: EventSink,
    is_running: AtomicBool,
    abort_token: CancellationToken,
    /// Whether the abort token was provided externally (session owner
    /// controls cancellation).
    external_abort_token: bool,
}

impl TurnEngine {
    /// Create an engine. The session ID comes from the context manager.
    pub fn new(
        config: EngineConfig,
        context: ContextManager,
        llm: Arc<dyn LlmClient>,
        tools: Arc<dyn ToolExecutor>,
        approvals: Arc<ApprovalCoordinator>,
        sink: EventSink,
    ) -> Self {
        let session_id = context.session_id().clone();
        Self {
            config,
            session_id,
            context,
            llm,
            tools,
            approvals,
            sink,
            is_running: AtomicBool::new(false),
            abort_token: CancellationToken::new(),
            external_abort_token: false,
        }
    }

    /// Run one turn: append the user message, loop LLM calls and tool
    /// dispatch until completion, abort, error, or the iteration limit.
    ///
    /// Storage failures on durability-critical writes propagate; LLM and
    /// tool failures become in-band outcomes. Pending history writes are
    /// flushed on every exit path.
    #[instrument(skip_all, fields(session_id = %self.session_id, model = %self.config.model))]
    pub async fn run_turn(&mut self, user_text: &str) -> Result<TurnOutcome, EngineError> {
        let Some(_guard) = RunGuard::new(&self.is_running) else {
            return Err(EngineError::AlreadyRunning);
        };

        // Reset the abort token per run unless the session owner injected one.
        if !self.external_abort_token {
            self.abort_token = CancellationToken::new();
        }

        let _ = self.context.add_user_message(user_text, None, None).await?;
        info!("turn started");

        let mut text = String::new();
        let mut total_usage = TokenUsage::default();
        let mut iterations = 0u32;
        let mut status: Option<TurnStatus> = None;
        let mut error: Option<String> = None;
        let mut warning: Option<String> = None;

        while iterations < self.config.max_iterations {
            iterations += 1;

            if self.abort_token.is_cancelled() {
                status = Some(TurnStatus::Aborted);
                break;
            }

            let result = turn_runner::run_iteration(
                iterations,
                &self.config,
                &self.session_id,
                &mut self.context,
                &self.llm,
                &self.tools,
                &self.approvals,
                &self.sink,
                &self.abort_token,
            )
            .await?;

            accumulate_usage(&mut total_usage, result.token_usage.as_ref());
            if !result.text.is_empty() {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(&result.text);
            }

            match result.outcome {
                IterationOutcome::Continue => {}
                IterationOutcome::Completed => {
                    status = Some(TurnStatus::Completed);
                    break;
                }
                IterationOutcome::Aborted => {
                    status = Some(TurnStatus::Aborted);
                    break;
                }
                IterationOutcome::Failed => {
                    status = Some(TurnStatus::Error);
                    error = result.error;
                    break;
                }
            }
        }

        let status = status.unwrap_or_else(|| {
            warn!(
                max_iterations = self.config.max_iterations,
                "turn stopped at iteration limit"
            );
            TurnStatus::MaxIterationsReached
        });
        if status == TurnStatus::MaxIterationsReached {
            warning = Some(format!(
                "reached max iterations ({}); returning partial output",
                self.config.max_iterations
            ));
        }

        if status == TurnStatus::Aborted {
            // Deliberate termination: retire pending approvals, keep history.
            self.approvals.cancel_all(self.session_id.as_str());
            info!(iterations, "turn aborted");
        } else {
            info!(iterations, ?status, "turn finished");
        }

        // Turn boundary: make pending update writes durable.
        self.context.flush().await?;

        Ok(TurnOutcome {
            status,
            text,
            iterations,
            token_usage: total_usage,
            error,
            warning,
        })
    }

    /// Signal the current run to abort.
    pub fn abort(&self) {
        self.abort_token.cancel();
    }

    /// Inject an external abort token (the session owner controls
    /// cancellation; `run_turn` will not reset it).
    pub fn set_abort_token(&mut self, token: CancellationToken) {
        self.abort_token = token;
        self.external_abort_token = true;
    }

    /// Whether a turn is currently running.
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    /// The session this engine drives.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Subscribe to engine events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<AgentEvent> {
        self.sink.subscribe()
    }

    /// The context manager (read access).
    pub fn context(&self) -> &ContextManager {
        &self.context
    }

    /// The context manager (mutable access, between turns).
    pub fn context_mut(&mut self) -> &mut ContextManager {
        &mut self.context
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axon_context::{HeuristicCounter, JsonFormatter, OverflowCompaction};
    use axon_core::approval::{ApprovalResponse, ApprovalStatus};
    use axon_core::messages::ToolCall;
    use axon_core::tools::ToolDefinition;
    use axon_history::{BackingStore, HistoryStore, MemoryStore};
    use serde_json::{json, Map, Value};
    use std::collections::HashSet;
    use std::sync::atomic::AtomicU32;
    use std::sync::Mutex;

    use crate::capabilities::{
        ChunkStream, LlmChunk, LlmError, LlmRequest, LlmResponse, ToolError,
    };

    // ── Mock LLM clients ──

    struct ScriptedLlm {
        responses: Mutex<Vec<LlmResponse>>,
        calls: AtomicU32,
    }

    impl ScriptedLlm {
        fn new(responses: Vec<LlmResponse>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: AtomicU32::new(0),
            }
        }

        fn text_only(text: &str) -> Self {
            Self::new(vec![LlmResponse {
                text: text.into(),
                usage: Some(TokenUsage {
                    input_tokens: 10,
                    output_tokens: 5,
                    ..Default::default()
                }),
                ..Default::default()
            }])
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(
            &self,
            _request: &LlmRequest,
            _signal: &CancellationToken,
        ) -> Result<LlmResponse, LlmError> {
            let _ = self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(LlmError::Provider {
                    message: "no more scripted responses".into(),
                    retryable: false,
                });
            }
            Ok(responses.remove(0))
        }
    }

    /// Always asks for one tool call, with a fresh call ID per iteration.
    struct AlwaysToolLlm {
        calls: AtomicU32,
    }

    #[async_trait]
    impl LlmClient for AlwaysToolLlm {
        async fn complete(
            &self,
            _request: &LlmRequest,
            _signal: &CancellationToken,
        ) -> Result<LlmResponse, LlmError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(LlmResponse {
                text: String::new(),
                tool_calls: vec![ToolCall::new(format!("c{n}"), "echo", Map::new())],
                usage: Some(TokenUsage {
                    input_tokens: 10,
                    output_tokens: 5,
                    ..Default::default()
                }),
                ..Default::default()
            })
        }
    }

    struct StreamingLlm;

    #[async_trait]
    impl LlmClient for StreamingLlm {
        async fn complete(
            &self,
            _request: &LlmRequest,
            _signal: &CancellationToken,
        ) -> Result<LlmResponse, LlmError> {
            Err(LlmError::Provider {
                message: "streaming only".into(),
                retryable: false,
            })
        }

        async fn stream(
            &self,
            _request: &LlmRequest,
            _signal: &CancellationToken,
        ) -> Result<ChunkStream, LlmError> {
            let response = LlmResponse {
                text: "str eamed".into(),
                reasoning: Some("pondering".into()),
                usage: Some(TokenUsage {
                    input_tokens: 20,
                    output_tokens: 9,
                    ..Default::default()
                }),
                ..Default::default()
            };
            let chunks = vec![
                Ok(LlmChunk::ReasoningDelta {
                    delta: "pondering".into(),
                }),
                Ok(LlmChunk::TextDelta {
                    delta: "str ".into(),
                }),
                Ok(LlmChunk::TextDelta {
                    delta: "eamed".into(),
                }),
                Ok(LlmChunk::Done { response }),
            ];
            Ok(Box::pin(futures::stream::iter(chunks)))
        }
    }

    // ── Mock tool executor ──

    struct MockTools {
        gated: HashSet<String>,
        failing: HashSet<String>,
    }

    impl MockTools {
        fn open() -> Self {
            Self {
                gated: HashSet::new(),
                failing: HashSet::new(),
            }
        }

        fn gating(tool: &str) -> Self {
            let mut gated = HashSet::new();
            let _ = gated.insert(tool.to_owned());
            Self {
                gated,
                failing: HashSet::new(),
            }
        }

        fn failing(tool: &str) -> Self {
            let mut failing = HashSet::new();
            let _ = failing.insert(tool.to_owned());
            Self {
                gated: HashSet::new(),
                failing,
            }
        }
    }

    #[async_trait]
    impl ToolExecutor for MockTools {
        fn definitions(&self) -> Vec<ToolDefinition> {
            vec![ToolDefinition::new(
                "echo",
                "Echo the arguments back",
                json!({"type": "object"}),
            )]
        }

        fn requires_approval(&self, tool_name: &str) -> bool {
            self.gated.contains(tool_name)
        }

        async fn execute(
            &self,
            tool_name: &str,
            arguments: &Map<String, Value>,
            _session_id: &SessionId,
        ) -> Result<Value, ToolError> {
            if self.failing.contains(tool_name) {
                return Err(ToolError::new(tool_name, "injected failure"));
            }
            Ok(json!({ "echo": Value::Object(arguments.clone()) }))
        }
    }

    // ── Harness ──

    struct Harness {
        engine: TurnEngine,
        backing: Arc<MemoryStore>,
    }

    fn make_engine_with(
        config: EngineConfig,
        llm: Arc<dyn LlmClient>,
        tools: Arc<dyn ToolExecutor>,
    ) -> Harness {
        let backing = Arc::new(MemoryStore::new());
        let history = HistoryStore::new(
            "s1".into(),
            Arc::clone(&backing) as Arc<dyn BackingStore>,
        );
        let context = ContextManager::new(
            "s1".into(),
            history,
            Arc::new(HeuristicCounter),
            Arc::new(JsonFormatter),
            Arc::new(OverflowCompaction),
        );
        let sink = EventSink::new();
        let approvals = Arc::new(ApprovalCoordinator::new(sink.clone()));
        let engine = TurnEngine::new(config, context, llm, tools, approvals, sink);
        Harness { engine, backing }
    }

    fn make_engine(llm: Arc<dyn LlmClient>, tools: Arc<dyn ToolExecutor>) -> Harness {
        make_engine_with(
            EngineConfig {
                model: "mock-model".into(),
                ..Default::default()
            },
            llm,
            tools,
        )
    }

    /// Answers every approval request with the given status.
    fn auto_respond(engine: &TurnEngine, status: ApprovalStatus) {
        let approvals = Arc::clone(&engine.approvals);
        let mut rx = engine.subscribe();
        let _ = tokio::spawn(async move {
            while let Ok(event) = rx.recv().await {
                if let AgentEvent::ApprovalRequested { request, .. } = event {
                    let response = match status {
                        ApprovalStatus::Approved => {
                            ApprovalResponse::approved(request.approval_id)
                        }
                        _ => ApprovalResponse::denied(request.approval_id),
                    };
                    let _ = approvals.resolve(request.session_id.as_str(), response);
                }
            }
        });
    }

    // -- single turn, no tools --

    #[tokio::test]
    async fn no_tool_calls_appends_one_assistant_message() {
        let llm = Arc::new(ScriptedLlm::text_only("Hello!"));
        let mut harness = make_engine(Arc::clone(&llm) as Arc<dyn LlmClient>, Arc::new(MockTools::open()));

        let outcome = harness.engine.run_turn("Hi").await.unwrap();

        assert_eq!(outcome.status, TurnStatus::Completed);
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.text, "Hello!");
        assert_eq!(llm.call_count(), 1);

        let messages = harness.engine.context().get_messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].is_user());
        assert_eq!(messages[1].text(), "Hello!");
    }

    #[tokio::test]
    async fn turn_is_durable_in_backing_store() {
        let llm = Arc::new(ScriptedLlm::text_only("Hello!"));
        let mut harness = make_engine(llm, Arc::new(MockTools::open()));

        let _ = harness.engine.run_turn("Hi").await.unwrap();

        let fresh = HistoryStore::new(
            "s1".into(),
            Arc::clone(&harness.backing) as Arc<dyn BackingStore>,
        );
        let history = fresh.get_history().await.unwrap();
        assert_eq!(history.len(), 2);
        // Usage backfill was flushed at the turn boundary.
        assert_eq!(
            history[1].token_usage.as_ref().unwrap().input_tokens,
            10
        );
    }

    // -- iteration limit --

    #[tokio::test]
    async fn max_iterations_returns_partial_outcome() {
        let llm = Arc::new(AlwaysToolLlm {
            calls: AtomicU32::new(0),
        });
        let mut harness = make_engine_with(
            EngineConfig {
                model: "mock-model".into(),
                max_iterations: 2,
                ..Default::default()
            },
            Arc::clone(&llm) as Arc<dyn LlmClient>,
            Arc::new(MockTools::open()),
        );

        let outcome = harness.engine.run_turn("go").await.unwrap();

        assert_eq!(outcome.status, TurnStatus::MaxIterationsReached);
        assert_eq!(outcome.iterations, 2);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
        assert!(outcome.warning.is_some());
        // Usage accumulated across both iterations.
        assert_eq!(outcome.token_usage.input_tokens, 20);
        assert_eq!(outcome.token_usage.output_tokens, 10);
    }

    // -- tool execution --

    #[tokio::test]
    async fn tool_loop_appends_call_and_result_then_completes() {
        let mut args = Map::new();
        let _ = args.insert("q".into(), json!("weather"));
        let llm = Arc::new(ScriptedLlm::new(vec![
            LlmResponse {
                text: "checking".into(),
                tool_calls: vec![ToolCall::new("c1", "echo", args)],
                ..Default::default()
            },
            LlmResponse {
                text: "all done".into(),
                ..Default::default()
            },
        ]));
        let mut harness = make_engine(llm, Arc::new(MockTools::open()));

        let outcome = harness.engine.run_turn("go").await.unwrap();

        assert_eq!(outcome.status, TurnStatus::Completed);
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.text, "checking\nall done");

        let messages = harness.engine.context().get_messages();
        // user, assistant(+call), tool result, assistant
        assert_eq!(messages.len(), 4);
        let result = messages[2].tool_results()[0];
        assert_eq!(result.call_id.as_str(), "c1");
        assert!(result.success);
        assert_eq!(result.payload["echo"]["q"], "weather");
    }

    #[tokio::test]
    async fn failing_tool_becomes_failed_result_and_loop_continues() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            LlmResponse {
                tool_calls: vec![ToolCall::new("c1", "echo", Map::new())],
                ..Default::default()
            },
            LlmResponse {
                text: "recovered".into(),
                ..Default::default()
            },
        ]));
        let mut harness = make_engine(llm, Arc::new(MockTools::failing("echo")));

        let outcome = harness.engine.run_turn("go").await.unwrap();

        assert_eq!(outcome.status, TurnStatus::Completed);
        let messages = harness.engine.context().get_messages();
        let result = messages[2].tool_results()[0];
        assert!(!result.success);
        assert!(result.payload["error"]
            .as_str()
            .unwrap()
            .contains("injected failure"));
    }

    // -- LLM errors --

    #[tokio::test]
    async fn llm_failure_is_in_band_error_outcome() {
        let llm = Arc::new(ScriptedLlm::new(Vec::new()));
        let mut harness = make_engine(llm, Arc::new(MockTools::open()));

        let outcome = harness.engine.run_turn("go").await.unwrap();

        assert_eq!(outcome.status, TurnStatus::Error);
        assert!(outcome.error.unwrap().contains("no more scripted"));
        assert!(!harness.engine.is_running());
    }

    // -- approval gating --

    #[tokio::test]
    async fn approved_tool_call_executes() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            LlmResponse {
                tool_calls: vec![ToolCall::new("c1", "echo", Map::new())],
                ..Default::default()
            },
            LlmResponse {
                text: "done".into(),
                ..Default::default()
            },
        ]));
        let mut harness = make_engine(llm, Arc::new(MockTools::gating("echo")));
        auto_respond(&harness.engine, ApprovalStatus::Approved);

        let outcome = harness.engine.run_turn("go").await.unwrap();

        assert_eq!(outcome.status, TurnStatus::Completed);
        let messages = harness.engine.context().get_messages();
        assert!(messages[2].tool_results()[0].success);
    }

    #[tokio::test]
    async fn denied_tool_call_becomes_failed_result() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            LlmResponse {
                tool_calls: vec![ToolCall::new("c1", "echo", Map::new())],
                ..Default::default()
            },
            LlmResponse {
                text: "understood".into(),
                ..Default::default()
            },
        ]));
        let mut harness = make_engine(llm, Arc::new(MockTools::gating("echo")));
        auto_respond(&harness.engine, ApprovalStatus::Denied);

        let outcome = harness.engine.run_turn("go").await.unwrap();

        assert_eq!(outcome.status, TurnStatus::Completed);
        let messages = harness.engine.context().get_messages();
        let result = messages[2].tool_results()[0];
        assert!(!result.success);
        assert!(result.payload["error"].as_str().unwrap().contains("denied"));
    }

    #[tokio::test(start_paused = true)]
    async fn approval_timeout_is_treated_as_refusal() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            LlmResponse {
                tool_calls: vec![ToolCall::new("c1", "echo", Map::new())],
                ..Default::default()
            },
            LlmResponse {
                text: "moving on".into(),
                ..Default::default()
            },
        ]));
        let mut harness = make_engine_with(
            EngineConfig {
                model: "mock-model".into(),
                approval_timeout_ms: Some(250),
                ..Default::default()
            },
            llm,
            Arc::new(MockTools::gating("echo")),
        );

        // Nobody answers; the timeout resolves the gate.
        let outcome = harness.engine.run_turn("go").await.unwrap();

        assert_eq!(outcome.status, TurnStatus::Completed);
        let messages = harness.engine.context().get_messages();
        let result = messages[2].tool_results()[0];
        assert!(!result.success);
        assert!(result.payload["error"]
            .as_str()
            .unwrap()
            .contains("timed out"));
    }

    // -- abort --

    #[tokio::test]
    async fn pre_cancelled_token_aborts_without_llm_call() {
        let llm = Arc::new(ScriptedLlm::text_only("never"));
        let mut harness = make_engine(Arc::clone(&llm) as Arc<dyn LlmClient>, Arc::new(MockTools::open()));

        let token = CancellationToken::new();
        token.cancel();
        harness.engine.set_abort_token(token);

        let outcome = harness.engine.run_turn("go").await.unwrap();

        assert_eq!(outcome.status, TurnStatus::Aborted);
        assert_eq!(llm.call_count(), 0);
        assert!(!harness.engine.is_running());
        // The user message appended before the loop survives the abort.
        assert_eq!(harness.engine.context().message_count(), 1);
    }

    #[tokio::test]
    async fn abort_during_approval_wait_cancels_turn() {
        let llm = Arc::new(ScriptedLlm::new(vec![LlmResponse {
            tool_calls: vec![ToolCall::new("c1", "echo", Map::new())],
            ..Default::default()
        }]));
        let mut harness = make_engine(llm, Arc::new(MockTools::gating("echo")));

        let token = CancellationToken::new();
        harness.engine.set_abort_token(token.clone());

        // Cancel as soon as the approval request surfaces.
        let mut rx = harness.engine.subscribe();
        let canceller = tokio::spawn(async move {
            while let Ok(event) = rx.recv().await {
                if matches!(event, AgentEvent::ApprovalRequested { .. }) {
                    token.cancel();
                    break;
                }
            }
        });

        let outcome = harness.engine.run_turn("go").await.unwrap();
        canceller.await.unwrap();

        assert_eq!(outcome.status, TurnStatus::Aborted);
        assert!(harness.engine.approvals.pending_ids().is_empty());
        assert!(!harness.engine.is_running());
    }

    // -- busy flag --

    #[test]
    fn run_guard_rejects_second_entry_and_resets() {
        let flag = AtomicBool::new(false);
        let guard = RunGuard::new(&flag).expect("first entry succeeds");
        assert!(RunGuard::new(&flag).is_none(), "second entry rejected");
        drop(guard);
        assert!(!flag.load(Ordering::SeqCst));
        assert!(RunGuard::new(&flag).is_some(), "usable again after drop");
    }

    #[tokio::test]
    async fn busy_flag_clears_after_each_outcome() {
        let llm = Arc::new(ScriptedLlm::text_only("ok"));
        let mut harness = make_engine(llm, Arc::new(MockTools::open()));
        let _ = harness.engine.run_turn("one").await.unwrap();
        assert!(!harness.engine.is_running());

        // A second sequential turn is accepted.
        let outcome = harness.engine.run_turn("two").await.unwrap();
        assert_eq!(outcome.status, TurnStatus::Error); // script exhausted
        assert!(!harness.engine.is_running());
    }

    // -- streaming --

    #[tokio::test]
    async fn streaming_emits_chunks_and_assembles_response() {
        let mut harness = make_engine_with(
            EngineConfig {
                model: "mock-model".into(),
                streaming: true,
                ..Default::default()
            },
            Arc::new(StreamingLlm),
            Arc::new(MockTools::open()),
        );

        let mut rx = harness.engine.subscribe();
        let outcome = harness.engine.run_turn("go").await.unwrap();

        assert_eq!(outcome.status, TurnStatus::Completed);
        assert_eq!(outcome.text, "str eamed");
        assert_eq!(outcome.token_usage.output_tokens, 9);

        let mut chunk_deltas = Vec::new();
        let mut saw_thinking = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                AgentEvent::Chunk { delta, .. } => chunk_deltas.push(delta),
                AgentEvent::Thinking { .. } => saw_thinking = true,
                _ => {}
            }
        }
        assert_eq!(chunk_deltas.concat(), "str eamed");
        assert!(saw_thinking);

        // Reasoning lands on the assistant message.
        let messages = harness.engine.context().get_messages();
        assert_eq!(messages[1].reasoning(), Some("pondering"));
    }

    // -- events --

    #[tokio::test]
    async fn tool_events_are_emitted_in_order() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            LlmResponse {
                tool_calls: vec![ToolCall::new("c1", "echo", Map::new())],
                ..Default::default()
            },
            LlmResponse {
                text: "done".into(),
                ..Default::default()
            },
        ]));
        let mut harness = make_engine(llm, Arc::new(MockTools::open()));

        let mut rx = harness.engine.subscribe();
        let _ = harness.engine.run_turn("go").await.unwrap();

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(match event {
                AgentEvent::Response { .. } => "response",
                AgentEvent::ToolCall { .. } => "toolCall",
                AgentEvent::ToolResult { .. } => "toolResult",
                _ => "other",
            });
        }
        let tool_call_pos = kinds.iter().position(|k| *k == "toolCall").unwrap();
        let tool_result_pos = kinds.iter().position(|k| *k == "toolResult").unwrap();
        assert!(tool_call_pos < tool_result_pos);
        assert_eq!(kinds.iter().filter(|k| **k == "response").count(), 2);
    }
}
