//! Suggestion lifecycle around a shared [`CodingSession`].
//!
//! Every fetch captures a per-passage [`Generation`] when it is issued and
//! writes its result back only if that generation is still the latest for
//! the passage. Highlight fetches additionally run one at a time.

use std::sync::Arc;

use ai_llm_service::LlmClient;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::config::EngineConfig;
use crate::context::ContextBuilder;
use crate::errors::StructuralError;
use crate::model::{CodeId, CodingSession, PassageId};
use crate::segmenter::CodeRemoval;
use crate::suggestions::codes::{CodeJob, fetch_autocomplete, fetch_code_suggestions};
use crate::suggestions::generation::{Generation, Generations};
use crate::suggestions::highlight::{HighlightJob, fetch_highlight};
use crate::suggestions::matching::{
    existing_codes_for_input, fragment_after_last_semicolon, has_completion, semicolon_count,
};
use crate::suggestions::prompts::{DefaultPrompts, PromptTemplates};
use crate::suggestions::queue::HighlightQueue;

/// What a keystroke in a code input led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InputOutcome {
    /// Suggestions are switched off.
    Disabled,
    Unchanged,
    /// A label was added or removed; code suggestions were refetched.
    CodeSuggestionsRefreshed,
    /// Nothing to complete, or an existing suggestion already completes it.
    AutocompleteSkipped,
    /// A newer keystroke arrived during the quiet interval.
    Superseded,
    AutocompleteFetched,
}

/// Result of one highlight refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HighlightOutcome {
    /// A suggestion was stored on this passage.
    Found(PassageId),
    Nothing,
    /// A newer request for the passage superseded this one.
    Stale,
}

pub struct SuggestionOrchestrator<L, P = DefaultPrompts> {
    session: Arc<RwLock<CodingSession>>,
    llm: L,
    prompts: P,
    cfg: EngineConfig,
    generations: Generations<PassageId>,
    keystrokes: Generations<CodeId>,
    queue: HighlightQueue,
}

impl<L, P> SuggestionOrchestrator<L, P>
where
    L: LlmClient,
    P: PromptTemplates,
{
    pub fn new(session: CodingSession, llm: L, prompts: P, cfg: EngineConfig) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
            llm,
            prompts,
            cfg,
            generations: Generations::new(),
            keystrokes: Generations::new(),
            queue: HighlightQueue::new(),
        }
    }

    /// Shared session. Hold guards briefly; fetches need the lock to write back.
    pub fn session(&self) -> &Arc<RwLock<CodingSession>> {
        &self.session
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// True while any highlight fetch is waiting or running.
    pub fn is_fetching_highlight(&self) -> bool {
        self.queue.is_fetching()
    }

    pub fn pending_highlights(&self) -> usize {
        self.queue.len()
    }

    /// Drops generation entries of passages and codes that no longer exist.
    fn forget_removed(&self, s: &CodingSession) {
        self.generations.retain(|id| s.passage(*id).is_some());
        self.keystrokes.retain(|id| s.code(*id).is_some());
    }

    fn context_builder(&self, session: &CodingSession) -> ContextBuilder {
        ContextBuilder::new(session.source_kind(), self.cfg.cut_window_chars)
    }

    /* --------------------- Structural edits --------------------- */

    /// Highlights a span and fetches code suggestions for it.
    pub async fn create_span(
        &self,
        source: PassageId,
        start: usize,
        end: usize,
    ) -> Result<PassageId, StructuralError> {
        let (id, code_id) = {
            let mut s = self.session.write().await;
            let id = s.create_span(source, start, end, Vec::new())?;
            self.forget_removed(&s);
            (id, s.active_code())
        };
        self.queue.clear();
        if let Some(code_id) = code_id {
            self.on_activated(id, code_id).await;
        }
        Ok(id)
    }

    /// Turns the stored highlight suggestion of `passage_id` into a span.
    ///
    /// The new passage starts with the suggested codes as code suggestions, so
    /// no code-suggestion fetch is issued. `Ok(None)` when there is nothing to accept.
    pub async fn accept_highlight_suggestion(
        &self,
        passage_id: PassageId,
    ) -> Result<Option<PassageId>, StructuralError> {
        let (id, code_id) = {
            let mut s = self.session.write().await;
            let Some(suggestion) = s
                .passage(passage_id)
                .and_then(|p| p.next_highlight_suggestion())
                .cloned()
            else {
                return Ok(None);
            };
            let id = s.create_span(
                passage_id,
                suggestion.start_index,
                suggestion.end_index(),
                suggestion.codes,
            )?;
            self.forget_removed(&s);
            (id, s.active_code())
        };
        self.queue.clear();
        if let Some(code_id) = code_id {
            self.on_activated(id, code_id).await;
        }
        info!(%passage_id, new_passage = %id, "highlight suggestion accepted");
        Ok(Some(id))
    }

    /// Commits label input and queues a highlight fetch for the affected passage.
    pub async fn commit_code_edit(
        &self,
        code_id: CodeId,
        raw: &str,
    ) -> Result<Option<PassageId>, StructuralError> {
        let affected = {
            let mut s = self.session.write().await;
            let affected = s.update_code(code_id, raw)?;
            self.forget_removed(&s);
            affected
        };
        if let Some(passage_id) = affected {
            self.enqueue_highlight_fetch(passage_id).await;
        }
        Ok(affected)
    }

    /// Deletes a code and queues a highlight fetch for the passage now covering it.
    pub async fn delete_code(&self, code_id: CodeId) -> Result<CodeRemoval, StructuralError> {
        let removal = {
            let mut s = self.session.write().await;
            let removal = s.delete_code(code_id)?;
            self.forget_removed(&s);
            removal
        };
        self.enqueue_highlight_fetch(removal.passage_id).await;
        Ok(removal)
    }

    /* --------------------- Highlight suggestions --------------------- */

    /// Queues a highlight fetch starting at `passage_id`.
    ///
    /// Already queued passages are not added twice. While a code is being
    /// edited the queue is cleared instead.
    pub async fn enqueue_highlight_fetch(&self, passage_id: PassageId) -> bool {
        if self.session.read().await.active_code().is_some() {
            self.queue.clear();
            return false;
        }
        self.queue.push(passage_id)
    }

    /// Drains the pending queue head by head. Returns the last passage that
    /// received a suggestion. A concurrent call returns `None` immediately.
    pub async fn process_pending_highlights(&self) -> Option<PassageId> {
        let _drain = self.queue.try_drain()?;
        let mut shown = None;
        // Entries queued while a head is being fetched must survive it.
        while let Some(head) = self.queue.pop_front() {
            let (active, exists) = {
                let s = self.session.read().await;
                (s.active_code().is_some(), s.passage(head).is_some())
            };
            if active {
                self.queue.clear();
                break;
            }
            if !exists {
                debug!(passage_id = %head, "queued passage no longer exists");
                continue;
            }
            if let Some(found) = self.fetch_highlight_from(head).await {
                shown = Some(found);
            }
        }
        shown
    }

    /// Walks forward from `passage_id` (inclusive) over unhighlighted passages
    /// long enough to be worth coding, until one receives a suggestion.
    #[instrument(skip_all, fields(passage_id = %passage_id))]
    pub async fn fetch_highlight_from(&self, passage_id: PassageId) -> Option<PassageId> {
        if !self.cfg.enabled {
            return None;
        }
        let candidates: Vec<PassageId> = {
            let s = self.session.read().await;
            let Some(start) = s.passage(passage_id) else {
                warn!("highlight walk start no longer exists");
                return None;
            };
            let order = start.order();
            s.passages()
                .iter()
                .filter(|p| p.order() >= order && !p.is_highlighted())
                .filter(|p| p.text().trim().chars().count() > self.cfg.min_candidate_chars)
                .map(|p| p.id())
                .collect()
        };

        for id in candidates {
            let generation = self.generations.issue(id);
            match self.refresh_highlight(id, 0, generation).await {
                HighlightOutcome::Found(found) => return Some(found),
                HighlightOutcome::Stale => return None,
                HighlightOutcome::Nothing => {}
            }
        }
        debug!("no passage produced a highlight suggestion");
        None
    }

    /// Fetches a new suggestion for one passage from `search_start` on.
    pub async fn refresh_highlight_suggestion(
        &self,
        passage_id: PassageId,
        search_start: usize,
    ) -> Option<PassageId> {
        let generation = self.generations.issue(passage_id);
        match self.refresh_highlight(passage_id, search_start, generation).await {
            HighlightOutcome::Found(found) => Some(found),
            _ => None,
        }
    }

    /// Drops the stored suggestion and searches again after it, then moves on
    /// to the following passages if nothing is found.
    #[instrument(skip_all, fields(passage_id = %passage_id))]
    pub async fn decline_highlight_suggestion(&self, passage_id: PassageId) -> Option<PassageId> {
        let (search_start, next) = {
            let mut s = self.session.write().await;
            let passage = s.passage(passage_id)?;
            let suggestion = passage.next_highlight_suggestion()?;
            let search_start = suggestion.end_index();
            let next = s
                .passages()
                .get(passage.order() + 1)
                .map(|p| p.id());
            if let Some(p) = s.passage_mut(passage_id) {
                p.set_next_highlight_suggestion(None);
            }
            (search_start, next)
        };

        let generation = self.generations.issue(passage_id);
        match self.refresh_highlight(passage_id, search_start, generation).await {
            HighlightOutcome::Found(found) => Some(found),
            HighlightOutcome::Stale => None,
            HighlightOutcome::Nothing => match next {
                Some(next) => self.fetch_highlight_from(next).await,
                None => None,
            },
        }
    }

    async fn refresh_highlight(
        &self,
        passage_id: PassageId,
        search_start: usize,
        generation: Generation,
    ) -> HighlightOutcome {
        if !self.cfg.enabled {
            return HighlightOutcome::Nothing;
        }
        let _slot = self.queue.begin_fetch().await;

        let job = {
            let s = self.session.read().await;
            let Some(start) = s.passage(passage_id).filter(|p| !p.is_highlighted()) else {
                return HighlightOutcome::Nothing;
            };
            if search_start >= start.text().len() {
                None
            } else {
                match self.context_builder(&s).highlight_search(
                    start,
                    s.passages(),
                    search_start,
                    self.cfg.highlight_context_words,
                ) {
                    Ok(context) => Some(HighlightJob {
                        row_structured: s.is_row_structured(),
                        context,
                        tail: s
                            .passages()
                            .iter()
                            .skip(start.order())
                            .take_while(|p| !p.is_highlighted())
                            .map(|p| (p.id(), p.text().to_string()))
                            .collect(),
                        search_start,
                        codebook: s.prompt_codebook(),
                    }),
                    Err(e) => {
                        warn!(%passage_id, error = %e, "cannot build highlight search area");
                        None
                    }
                }
            }
        };

        let located = match &job {
            Some(job) => fetch_highlight(&self.llm, &self.prompts, &self.cfg, job).await,
            None => None,
        };

        let mut s = self.session.write().await;
        if !self.generations.is_current(passage_id, generation) {
            debug!(%passage_id, generation = generation.get(), "stale highlight result discarded");
            return HighlightOutcome::Stale;
        }

        let Some(found) = located else {
            if let Some(p) = s.passage_mut(passage_id) {
                p.set_next_highlight_suggestion(None);
            }
            return HighlightOutcome::Nothing;
        };

        let target = found.passage_id;
        let Some(p) = s.passage_mut(target) else {
            return HighlightOutcome::Nothing;
        };
        let still_there = !p.is_highlighted()
            && p.text()
                .get(found.suggestion.start_index..)
                .is_some_and(|rest| rest.starts_with(&found.suggestion.passage));
        if !still_there {
            debug!(passage_id = %target, "passage changed while fetching; suggestion dropped");
            return HighlightOutcome::Nothing;
        }
        p.set_next_highlight_suggestion(Some(found.suggestion));
        debug!(passage_id = %target, "highlight suggestion stored");
        HighlightOutcome::Found(target)
    }

    /* --------------------- Code suggestions --------------------- */

    /// Selects a code for editing and fetches code suggestions for its passage.
    pub async fn activate_code(&self, code_id: CodeId) -> Result<PassageId, StructuralError> {
        let passage_id = self.session.write().await.activate_code(code_id)?;
        self.queue.clear();
        self.on_activated(passage_id, code_id).await;
        Ok(passage_id)
    }

    async fn on_activated(&self, passage_id: PassageId, code_id: CodeId) {
        if !self.cfg.enabled {
            return;
        }
        let existing = {
            let s = self.session.read().await;
            let Some(p) = s.passage(passage_id) else {
                return;
            };
            let fresh_from_suggestion = p.code_ids().len() == 1
                && s.code(p.code_ids()[0]).is_some_and(|c| c.code.is_empty())
                && !p.code_suggestions().is_empty();
            if fresh_from_suggestion {
                debug!(%passage_id, "passage created from a suggestion; keeping its codes");
                return;
            }
            let current = s.code(code_id).map(|c| c.code.clone()).unwrap_or_default();
            existing_codes_for_input(&s, code_id, &current)
        };
        self.refresh_codes_with(passage_id, existing).await;
    }

    /// Fetches code suggestions using all current labels of the passage.
    pub async fn refresh_code_suggestions(&self, passage_id: PassageId) {
        let existing = {
            let s = self.session.read().await;
            s.codes_of(passage_id).into_iter().map(str::to_string).collect()
        };
        self.refresh_codes_with(passage_id, existing).await;
    }

    fn code_job(&self, s: &CodingSession, passage_id: PassageId, existing: Vec<String>) -> Option<CodeJob> {
        let passage = s.passage(passage_id).filter(|p| p.is_highlighted())?;
        let ctx = self.context_builder(s).surrounding(
            passage,
            s.passages(),
            self.cfg.code_context_words,
            0,
        );
        Some(CodeJob {
            row_structured: s.is_row_structured(),
            preceding_text: ctx.preceding,
            passage_text: ctx.passage_text,
            existing_codes: existing,
            codebook: s.prompt_codebook(),
        })
    }

    #[instrument(skip_all, fields(passage_id = %passage_id))]
    async fn refresh_codes_with(&self, passage_id: PassageId, existing: Vec<String>) {
        if !self.cfg.enabled {
            return;
        }
        let generation = self.generations.issue(passage_id);
        let Some(job) = self.code_job(&*self.session.read().await, passage_id, existing) else {
            return;
        };

        let Some(codes) = fetch_code_suggestions(&self.llm, &self.prompts, &self.cfg, &job).await else {
            return;
        };

        let mut s = self.session.write().await;
        if !self.generations.is_current(passage_id, generation) {
            debug!(generation = generation.get(), "stale code suggestions discarded");
            return;
        }
        if let Some(p) = s.passage_mut(passage_id) {
            debug!(count = codes.len(), "code suggestions stored");
            p.set_code_suggestions(codes);
        }
    }

    /// Reacts to a change of a code's input text.
    ///
    /// Adding or removing a `;` refreshes code suggestions right away. Other
    /// edits wait for the quiet interval and then fetch an autocompletion of
    /// the last label, unless the input is an existing code of the passage or
    /// a known label already completes it.
    pub async fn on_code_input(&self, code_id: CodeId, previous: &str, current: &str) -> InputOutcome {
        if !self.cfg.enabled {
            return InputOutcome::Disabled;
        }
        if previous == current {
            return InputOutcome::Unchanged;
        }

        if semicolon_count(previous) != semicolon_count(current) {
            let target = {
                let mut s = self.session.write().await;
                let Some(passage_id) = s.code(code_id).map(|c| c.passage_id) else {
                    return InputOutcome::Unchanged;
                };
                if let Some(p) = s.passage_mut(passage_id) {
                    p.set_code_suggestions(Vec::new());
                }
                (passage_id, existing_codes_for_input(&s, code_id, current))
            };
            self.refresh_codes_with(target.0, target.1).await;
            return InputOutcome::CodeSuggestionsRefreshed;
        }

        let fragment = fragment_after_last_semicolon(current);
        if fragment.trim().is_empty() {
            return InputOutcome::AutocompleteSkipped;
        }
        let passage_id = {
            let s = self.session.read().await;
            let Some(passage_id) = s.code(code_id).map(|c| c.passage_id) else {
                return InputOutcome::Unchanged;
            };
            let typed = current.trim();
            let is_existing = s
                .codes()
                .iter()
                .any(|c| c.passage_id == passage_id && c.code == typed);
            let passage = s.passage(passage_id);
            let mut candidates: Vec<&str> = s.codebook().entries().collect();
            if let Some(p) = passage {
                candidates.extend(p.code_suggestions().iter().map(String::as_str));
                candidates.extend(p.autocomplete_suggestion());
            }
            if is_existing || has_completion(fragment, current, candidates) {
                return InputOutcome::AutocompleteSkipped;
            }
            passage_id
        };

        let ticket = self.keystrokes.issue(code_id);
        tokio::time::sleep(self.cfg.autocomplete_quiet).await;
        if !self.keystrokes.is_current(code_id, ticket) {
            return InputOutcome::Superseded;
        }

        let existing = existing_codes_for_input(&*self.session.read().await, code_id, current);
        self.refresh_autocomplete(passage_id, existing, fragment.trim()).await;
        InputOutcome::AutocompleteFetched
    }

    #[instrument(skip_all, fields(passage_id = %passage_id))]
    async fn refresh_autocomplete(&self, passage_id: PassageId, existing: Vec<String>, input: &str) {
        let generation = self.generations.issue(passage_id);
        let Some(job) = self.code_job(&*self.session.read().await, passage_id, existing) else {
            return;
        };

        let text = fetch_autocomplete(&self.llm, &self.prompts, &self.cfg, &job, input).await;

        let mut s = self.session.write().await;
        if !self.generations.is_current(passage_id, generation) {
            debug!(generation = generation.get(), "stale autocomplete discarded");
            return;
        }
        if let Some(p) = s.passage_mut(passage_id) {
            p.set_autocomplete_suggestion(text);
        }
    }
}
