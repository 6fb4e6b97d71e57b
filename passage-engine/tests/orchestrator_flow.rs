//! End-to-end suggestion flows against a scripted model.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ai_llm_service::error_handler::{HttpError, Provider, ProviderError};
use ai_llm_service::{AiLlmError, Completion, LlmClient};
use passage_engine::{
    CodingSession, DefaultPrompts, EngineConfig, InputOutcome, PassageId, PromptSettings,
    SuggestionOrchestrator,
};

/// Replays canned answers in call order and records every prompt.
#[derive(Default)]
struct ScriptedLlm {
    answers: Mutex<VecDeque<(Duration, Result<String, AiLlmError>)>>,
    prompts: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedLlm {
    fn with(answers: Vec<Result<String, AiLlmError>>) -> Arc<Self> {
        Self::delayed(answers.into_iter().map(|a| (Duration::ZERO, a)).collect())
    }

    fn delayed(answers: Vec<(Duration, Result<String, AiLlmError>)>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into()),
            ..Self::default()
        })
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    fn prompt(&self, i: usize) -> String {
        self.prompts.lock().unwrap()[i].clone()
    }

    fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl LlmClient for ScriptedLlm {
    fn complete(
        &self,
        prompt: &str,
        _model: &str,
    ) -> impl Future<Output = Result<Completion, AiLlmError>> + Send {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let (delay, answer) = self
            .answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or((Duration::ZERO, Err(AiLlmError::Timeout(Duration::from_secs(1)))));
        async move {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            answer.map(Completion::new)
        }
    }
}

fn ok(s: &str) -> Result<String, AiLlmError> {
    Ok(s.to_string())
}

fn conflict() -> Result<String, AiLlmError> {
    Err(ProviderError::from_status(
        Provider::OpenAI,
        HttpError {
            status: reqwest::StatusCode::CONFLICT,
            url: "http://localhost/v1/responses".into(),
            snippet: "another request is in progress".into(),
        },
    )
    .into())
}

const TEXT: &str = "Alice said the process was slow. Bob agreed with her.";

fn orchestrator(
    session: CodingSession,
    llm: &Arc<ScriptedLlm>,
    cfg: EngineConfig,
) -> SuggestionOrchestrator<Arc<ScriptedLlm>> {
    SuggestionOrchestrator::new(
        session,
        Arc::clone(llm),
        DefaultPrompts::new(PromptSettings::default()),
        cfg,
    )
}

async fn first_passage(orch: &SuggestionOrchestrator<Arc<ScriptedLlm>>) -> PassageId {
    orch.session().read().await.passages()[0].id()
}

#[tokio::test]
async fn accepted_suggestion_keeps_its_codes_without_a_fetch() {
    let llm = ScriptedLlm::with(vec![ok(
        r#"{"passage": "the process was slow", "codes": ["slowness", "process"]}"#,
    )]);
    let orch = orchestrator(CodingSession::from_text(TEXT), &llm, EngineConfig::default());
    let first = first_passage(&orch).await;

    assert_eq!(orch.fetch_highlight_from(first).await, Some(first));
    {
        let s = orch.session().read().await;
        let suggestion = s.passage(first).unwrap().next_highlight_suggestion().unwrap();
        assert_eq!(suggestion.start_index, 11);
        assert_eq!(suggestion.codes, vec!["slowness", "process"]);
    }

    let id = orch.accept_highlight_suggestion(first).await.unwrap().unwrap();
    let s = orch.session().read().await;
    let passage = s.passage(id).unwrap();
    assert_eq!(passage.text(), "the process was slow");
    assert_eq!(passage.code_suggestions(), ["slowness", "process"]);
    assert_eq!(s.passages().len(), 3);
    assert!(s.active_code().is_some());
    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn rejected_answers_give_up_after_two_attempts() {
    let bad = r#"{"passage": "not in the text", "codes": ["x"]}"#;
    let llm = ScriptedLlm::with(vec![ok(bad), ok(bad)]);
    let orch = orchestrator(CodingSession::from_text(TEXT), &llm, EngineConfig::default());
    let first = first_passage(&orch).await;

    assert_eq!(orch.fetch_highlight_from(first).await, None);
    assert_eq!(llm.calls(), 2);
    assert!(!llm.prompt(0).contains("ERROR MESSAGE"));
    assert!(llm.prompt(1).contains("ERROR MESSAGE"));
    let s = orch.session().read().await;
    assert!(s.passage(first).unwrap().next_highlight_suggestion().is_none());
}

#[tokio::test(start_paused = true)]
async fn stale_code_suggestions_are_discarded() {
    let llm = ScriptedLlm::delayed(vec![
        (Duration::ZERO, ok(r#"["initial"]"#)),
        (Duration::from_millis(1000), ok(r#"["old"]"#)),
        (Duration::from_millis(10), ok(r#"["new"]"#)),
    ]);
    let orch = orchestrator(CodingSession::from_text(TEXT), &llm, EngineConfig::default());
    let first = first_passage(&orch).await;
    let id = orch.create_span(first, 11, 31).await.unwrap();

    tokio::join!(orch.refresh_code_suggestions(id), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        orch.refresh_code_suggestions(id).await;
    });

    let s = orch.session().read().await;
    assert_eq!(s.passage(id).unwrap().code_suggestions(), ["new"]);
    assert_eq!(llm.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn conflicts_are_retried_after_a_delay() {
    let llm = ScriptedLlm::with(vec![
        conflict(),
        conflict(),
        ok(r#"{"passage": "Bob agreed", "codes": ["agreement"]}"#),
    ]);
    let orch = orchestrator(CodingSession::from_text(TEXT), &llm, EngineConfig::default());
    let first = first_passage(&orch).await;

    let started = tokio::time::Instant::now();
    assert_eq!(orch.fetch_highlight_from(first).await, Some(first));
    assert!(started.elapsed() >= Duration::from_millis(1000));
    assert_eq!(llm.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn conflict_budget_runs_out() {
    let llm = ScriptedLlm::with(vec![conflict(), conflict(), conflict(), conflict()]);
    let orch = orchestrator(CodingSession::from_text(TEXT), &llm, EngineConfig::default());
    let first = first_passage(&orch).await;

    assert_eq!(orch.fetch_highlight_from(first).await, None);
    assert_eq!(llm.calls(), 4);
}

#[tokio::test]
async fn queue_waits_for_the_code_edit_to_finish() {
    let llm = ScriptedLlm::with(vec![
        ok(r#"["slowness", "delay"]"#),
        ok(r#"{"passage": "Bob agreed", "codes": ["agreement"]}"#),
    ]);
    let orch = orchestrator(CodingSession::from_text(TEXT), &llm, EngineConfig::default());
    let first = first_passage(&orch).await;
    let id = orch.create_span(first, 11, 31).await.unwrap();

    assert!(!orch.enqueue_highlight_fetch(id).await);
    assert_eq!(orch.pending_highlights(), 0);

    let code = orch.session().read().await.passage(id).unwrap().code_ids()[0];
    assert_eq!(orch.commit_code_edit(code, "slowness").await.unwrap(), Some(id));
    assert_eq!(orch.pending_highlights(), 1);
    assert!(!orch.enqueue_highlight_fetch(id).await);

    let shown = orch.process_pending_highlights().await.unwrap();
    assert_eq!(orch.pending_highlights(), 0);
    assert!(!orch.is_fetching_highlight());

    let s = orch.session().read().await;
    let passage = s.passage(shown).unwrap();
    assert_eq!(passage.text(), ". Bob agreed with her.");
    assert_eq!(passage.next_highlight_suggestion().unwrap().start_index, 2);
    assert_eq!(llm.calls(), 2);
}

#[tokio::test]
async fn declining_searches_past_the_span_then_moves_on() {
    let llm = ScriptedLlm::with(vec![
        ok(r#"{"passage": "first row", "codes": ["a"]}"#),
        ok(r#"{"passage": "", "codes": []}"#),
        ok(r#"{"passage": "second row", "codes": ["b"]}"#),
    ]);
    let session = CodingSession::from_rows(["first row is here", "second row text"]);
    let orch = orchestrator(session, &llm, EngineConfig::default());
    let (row1, row2) = {
        let s = orch.session().read().await;
        (s.passages()[0].id(), s.passages()[1].id())
    };

    assert_eq!(orch.fetch_highlight_from(row1).await, Some(row1));
    assert_eq!(orch.decline_highlight_suggestion(row1).await, Some(row2));

    let s = orch.session().read().await;
    assert!(s.passage(row1).unwrap().next_highlight_suggestion().is_none());
    let suggestion = s.passage(row2).unwrap().next_highlight_suggestion().unwrap();
    assert_eq!(suggestion.passage, "second row");
    assert_eq!(suggestion.start_index, 0);
    assert_eq!(llm.calls(), 3);
}

#[tokio::test]
async fn declining_finds_a_later_span_in_the_same_passage() {
    let text = "Alice said the process was slow. Bob agreed with her. Later it improved.";
    let llm = ScriptedLlm::with(vec![
        ok(r#"{"passage": "the process was slow", "codes": ["slowness"]}"#),
        ok(r#"{"passage": "it improved", "codes": ["improvement"]}"#),
    ]);
    let orch = orchestrator(CodingSession::from_text(text), &llm, EngineConfig::default());
    let first = first_passage(&orch).await;

    orch.fetch_highlight_from(first).await.unwrap();
    assert_eq!(orch.decline_highlight_suggestion(first).await, Some(first));

    let s = orch.session().read().await;
    let suggestion = s.passage(first).unwrap().next_highlight_suggestion().unwrap();
    assert_eq!(suggestion.start_index, text.find("it improved").unwrap());
    assert_eq!(suggestion.codes, vec!["improvement"]);
}

#[tokio::test(start_paused = true)]
async fn autocomplete_waits_for_typing_to_pause() {
    let llm = ScriptedLlm::with(vec![ok(r#"["delay"]"#), ok("slowness")]);
    let orch = orchestrator(CodingSession::from_text(TEXT), &llm, EngineConfig::default());
    let first = first_passage(&orch).await;
    let id = orch.create_span(first, 11, 31).await.unwrap();
    let code = orch.session().read().await.active_code().unwrap();

    let (early, late) = tokio::join!(orch.on_code_input(code, "sl", "slo"), async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        orch.on_code_input(code, "slo", "slow").await
    });
    assert_eq!(early, InputOutcome::Superseded);
    assert_eq!(late, InputOutcome::AutocompleteFetched);
    assert_eq!(llm.calls(), 2);
    assert_eq!(
        orch.session().read().await.passage(id).unwrap().autocomplete_suggestion(),
        Some("slowness")
    );

    // "slowness" already completes the input
    assert_eq!(
        orch.on_code_input(code, "slow", "slowne").await,
        InputOutcome::AutocompleteSkipped
    );
    assert_eq!(
        orch.on_code_input(code, "slowness; ", "slowness;  ").await,
        InputOutcome::AutocompleteSkipped
    );
    assert_eq!(llm.calls(), 2);
}

#[tokio::test]
async fn semicolon_refreshes_code_suggestions() {
    let llm = ScriptedLlm::with(vec![ok(r#"["delay"]"#), ok(r#"["waiting", "delay"]"#)]);
    let orch = orchestrator(CodingSession::from_text(TEXT), &llm, EngineConfig::default());
    let first = first_passage(&orch).await;
    let id = orch.create_span(first, 11, 31).await.unwrap();
    let code = orch.session().read().await.active_code().unwrap();

    assert_eq!(
        orch.on_code_input(code, "slowness", "slowness;").await,
        InputOutcome::CodeSuggestionsRefreshed
    );
    assert_eq!(
        orch.session().read().await.passage(id).unwrap().code_suggestions(),
        ["waiting", "delay"]
    );
    assert!(llm.prompt(1).contains("slowness"));
}

#[tokio::test]
async fn disabled_suggestions_never_call_the_model() {
    let llm = ScriptedLlm::with(vec![]);
    let cfg = EngineConfig {
        enabled: false,
        ..EngineConfig::default()
    };
    let orch = orchestrator(CodingSession::from_text(TEXT), &llm, cfg);
    let first = first_passage(&orch).await;

    assert_eq!(orch.fetch_highlight_from(first).await, None);
    let id = orch.create_span(first, 11, 31).await.unwrap();
    let code = orch.session().read().await.active_code().unwrap();
    assert_eq!(orch.on_code_input(code, "", "s").await, InputOutcome::Disabled);
    assert!(
        orch.session()
            .read()
            .await
            .passage(id)
            .unwrap()
            .code_suggestions()
            .is_empty()
    );
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn deleting_the_last_code_merges_and_requeues() {
    let llm = ScriptedLlm::with(vec![ok(r#"["slowness"]"#)]);
    let orch = orchestrator(CodingSession::from_text(TEXT), &llm, EngineConfig::default());
    let first = first_passage(&orch).await;
    let id = orch.create_span(first, 11, 31).await.unwrap();
    let code = orch.session().read().await.passage(id).unwrap().code_ids()[0];

    let removal = orch.delete_code(code).await.unwrap();
    assert!(removal.demoted);
    assert_eq!(orch.pending_highlights(), 1);

    let s = orch.session().read().await;
    assert_eq!(s.passages().len(), 1);
    assert_eq!(s.passages()[0].text(), TEXT);
    assert_eq!(s.passages()[0].id(), removal.passage_id);
}

#[tokio::test]
async fn blank_highlight_answer_is_retried_as_a_format_error() {
    let llm = ScriptedLlm::with(vec![
        ok("  "),
        ok(r#"{"passage": "Bob agreed", "codes": ["agreement"]}"#),
    ]);
    let orch = orchestrator(CodingSession::from_text(TEXT), &llm, EngineConfig::default());
    let first = first_passage(&orch).await;

    assert_eq!(orch.fetch_highlight_from(first).await, Some(first));
    assert_eq!(llm.calls(), 2);
    assert!(llm.prompt(1).contains("ERROR MESSAGE"));
}

#[tokio::test]
async fn malformed_code_suggestions_degrade_to_empty() {
    let llm = ScriptedLlm::with(vec![ok("slowness, delay"), ok("{\"codes\": []}")]);
    let orch = orchestrator(CodingSession::from_text(TEXT), &llm, EngineConfig::default());
    let first = first_passage(&orch).await;
    let id = orch.create_span(first, 11, 31).await.unwrap();

    assert_eq!(llm.calls(), 2);
    assert!(!llm.prompt(0).contains("ADDITIONAL NOTE"));
    assert!(llm.prompt(1).contains("ADDITIONAL NOTE"));
    let s = orch.session().read().await;
    assert!(s.passage(id).unwrap().code_suggestions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn malformed_autocomplete_degrades_to_empty() {
    let llm = ScriptedLlm::with(vec![ok(r#"["delay"]"#), ok("slow; fast"), ok("  ")]);
    let orch = orchestrator(CodingSession::from_text(TEXT), &llm, EngineConfig::default());
    let first = first_passage(&orch).await;
    let id = orch.create_span(first, 11, 31).await.unwrap();
    let code = orch.session().read().await.active_code().unwrap();

    assert_eq!(
        orch.on_code_input(code, "sl", "slo").await,
        InputOutcome::AutocompleteFetched
    );
    assert_eq!(llm.calls(), 3);
    assert!(!llm.prompt(1).contains("ADDITIONAL NOTE"));
    assert!(llm.prompt(2).contains("ADDITIONAL NOTE"));
    assert_eq!(
        orch.session().read().await.passage(id).unwrap().autocomplete_suggestion(),
        Some("")
    );
}

#[tokio::test(start_paused = true)]
async fn older_highlight_answer_is_discarded_and_fetches_run_one_at_a_time() {
    let llm = ScriptedLlm::delayed(vec![
        (
            Duration::from_millis(1000),
            ok(r#"{"passage": "the process was slow", "codes": ["slowness"]}"#),
        ),
        (
            Duration::from_millis(10),
            ok(r#"{"passage": "Bob agreed", "codes": ["agreement"]}"#),
        ),
    ]);
    let orch = orchestrator(CodingSession::from_text(TEXT), &llm, EngineConfig::default());
    let first = first_passage(&orch).await;

    let (older, newer) = tokio::join!(orch.refresh_highlight_suggestion(first, 0), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(orch.is_fetching_highlight());
        orch.refresh_highlight_suggestion(first, 0).await
    });

    assert_eq!(older, None);
    assert_eq!(newer, Some(first));
    assert_eq!(llm.calls(), 2);
    assert_eq!(llm.peak_in_flight(), 1);
    assert!(!orch.is_fetching_highlight());
    let s = orch.session().read().await;
    let suggestion = s.passage(first).unwrap().next_highlight_suggestion().unwrap();
    assert_eq!(suggestion.passage, "Bob agreed");
}

#[tokio::test(start_paused = true)]
async fn passage_queued_during_a_drain_is_still_fetched() {
    let llm = ScriptedLlm::delayed(vec![
        (Duration::ZERO, ok(r#"["slowness"]"#)),
        (
            Duration::from_millis(1000),
            ok(r#"{"passage": "Bob agreed", "codes": ["agreement"]}"#),
        ),
        (Duration::ZERO, ok(r#"["slowness"]"#)),
        (Duration::ZERO, ok(r#"{"passage": "with her", "codes": ["support"]}"#)),
    ]);
    let orch = orchestrator(CodingSession::from_text(TEXT), &llm, EngineConfig::default());
    let first = first_passage(&orch).await;
    let id = orch.create_span(first, 11, 31).await.unwrap();
    let code = orch.session().read().await.active_code().unwrap();
    orch.commit_code_edit(code, "slowness").await.unwrap();
    assert_eq!(orch.pending_highlights(), 1);

    let (shown, ()) = tokio::join!(orch.process_pending_highlights(), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        orch.activate_code(code).await.unwrap();
        assert_eq!(orch.pending_highlights(), 0);
        orch.commit_code_edit(code, "second; other").await.unwrap();
        assert_eq!(orch.pending_highlights(), 1);
    });

    assert_eq!(llm.calls(), 4);
    assert_eq!(orch.pending_highlights(), 0);
    let shown = shown.unwrap();
    let s = orch.session().read().await;
    assert_eq!(s.codes_of(id), vec!["second", "other"]);
    let suggestion = s.passage(shown).unwrap().next_highlight_suggestion().unwrap();
    assert_eq!(suggestion.passage, "with her");
}
