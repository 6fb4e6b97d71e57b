use std::path::Path;

use ai_llm_service::LlmService;
use ai_llm_service::config::default_config::config_from_env;
use anyhow::{Context, bail};
use passage_engine::{
    CodingSession, DefaultPrompts, EngineConfig, PromptSettings, SuggestionOrchestrator, report,
};
use tracing::{Level, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Upper bound on accepted suggestions per run.
const MAX_ACCEPTED: usize = 200;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is fine; the process environment may already be set.
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            ai_llm_service::telemetry::env_filter_with_level("info", Level::INFO)
                .add_directive(passage_engine::telemetry::level_directive(Level::DEBUG)),
        )
        .with(ai_llm_service::telemetry::layer())
        .with(passage_engine::telemetry::layer())
        .init();

    let Some(path) = std::env::args().nth(1) else {
        bail!("usage: coding-workbench <document.txt|document.csv>");
    };
    let session = load_session(Path::new(&path))?;

    let cfg = EngineConfig::from_env();
    cfg.validate()?;
    let llm = LlmService::new(config_from_env()?);
    let prompts = DefaultPrompts::new(PromptSettings {
        research_questions: std::env::var("RESEARCH_QUESTIONS").unwrap_or_default(),
        context_info: std::env::var("CONTEXT_INFO").unwrap_or_default(),
        coding_guidelines: std::env::var("CODING_GUIDELINES").unwrap_or_default(),
        highlight_guidelines: std::env::var("HIGHLIGHT_GUIDELINES").unwrap_or_default(),
    });
    let orch = SuggestionOrchestrator::new(session, llm, prompts, cfg);

    let accepted = auto_code(&orch).await?;
    info!(accepted, "automatic coding finished");

    let s = orch.session().read().await;
    let cfg = orch.config();
    let rows = report::coded_passages(
        &s,
        cfg.cut_window_chars,
        cfg.export_preceding_words,
        cfg.export_trailing_words,
    );
    println!("{}", serde_json::to_string_pretty(&rows)?);
    print!("{}", report::to_csv(&rows));
    print!("{}", report::codebook_csv(&report::code_frequencies(&s)));
    Ok(())
}

fn load_session(path: &Path) -> anyhow::Result<CodingSession> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    Ok(if is_csv {
        CodingSession::from_rows(raw.lines())
    } else {
        CodingSession::from_text(raw)
    })
}

/// Accepts highlight suggestions front to back, committing the first
/// suggested code of each, until the model has nothing left to propose.
async fn auto_code(orch: &SuggestionOrchestrator<LlmService>) -> anyhow::Result<usize> {
    let Some(mut cursor) = orch.session().read().await.passages().first().map(|p| p.id()) else {
        return Ok(0);
    };

    let mut accepted = 0;
    while accepted < MAX_ACCEPTED {
        let Some(found) = orch.fetch_highlight_from(cursor).await else {
            break;
        };
        let Some(id) = orch.accept_highlight_suggestion(found).await? else {
            break;
        };

        let (code, label) = {
            let s = orch.session().read().await;
            let Some(p) = s.passage(id) else {
                break;
            };
            let label = p.code_suggestions().first().cloned();
            (p.code_ids().first().copied(), label)
        };
        match (code, label) {
            (Some(code), Some(label)) => {
                orch.commit_code_edit(code, &label).await?;
            }
            (Some(code), None) => {
                warn!(passage_id = %id, "no code suggested; dropping highlight");
                orch.delete_code(code).await?;
                break;
            }
            _ => break,
        }
        accepted += 1;

        let next = {
            let s = orch.session().read().await;
            s.passage(id)
                .and_then(|p| s.passages().get(p.order() + 1))
                .map(|p| p.id())
        };
        match next {
            Some(next) => cursor = next,
            None => break,
        }
    }
    Ok(accepted)
}
