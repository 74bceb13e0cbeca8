use crate::context::{
    ranked_context, slide_context, EXPLAIN_BODY, EXPLAIN_BULLETS, EXPLAIN_SHORT_BODY,
};
use crate::error::{IngestError, StoreError};
use crate::extractor::{is_deck_file, DeckExtractor};
use crate::ingest::ingest_deck;
use crate::models::{ChatReply, ChatRequest, SummaryOptions};
use crate::ranker::rank_slides;
use crate::session::{SessionHandle, SessionStore};
use crate::traits::{DurableStore, Generate};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

const RANK_TOP_K: usize = 3;

/// Bodies shorter than this are explained through bullets or title instead.
const MIN_DIRECT_CONTENT_WORDS: usize = 10;

/// Running summaries at or past this length are too large to ship as a
/// fallback context.
const SUMMARY_CONTEXT_MAX_CHARS: usize = 3000;

pub const MISSING_SESSION: &str = "Session not found. Upload a deck first.";
pub const INVALID_SESSION: &str = "Invalid session ID.";
pub const WRONG_FORMAT: &str = "Please upload a .pptx file";
pub const DECK_READY: &str = "Presentation summarized! Ask me about any slide.";

const NO_MATCH_REPLY: &str =
    "I couldn't find specific information matching your question in the slides.";
const GENERATION_UNAVAILABLE: &str =
    "I could not generate a response right now. Please try again.";

static STRICT_SLIDE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:slide|page)\s*(?:no\.?|number|#)?\s*[:.\-]?\s*(\d+)")
        .expect("strict slide regex is valid")
});
static LOOSE_SLIDE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:slide|page).*?(\d+)").expect("loose slide regex is valid")
});

/// Pull an explicit slide reference out of a chat message. Matchers run in
/// priority order, first match wins; only values in `[1, 999]` count as a
/// reference. Pure function, no hidden state.
pub fn extract_slide_number(message: &str) -> Option<u32> {
    if message.is_empty() {
        return None;
    }

    for pattern in [&STRICT_SLIDE_RE, &LOOSE_SLIDE_RE] {
        if let Some(capture) = pattern.captures(message) {
            let number = capture[1].parse::<u32>().ok()?;
            return (1..=999).contains(&number).then_some(number);
        }
    }
    None
}

/// Routes one chat turn: a deck upload starts a session, an explicit slide
/// reference terminates in a direct lookup, anything else goes through
/// relevance-ranked retrieval. Generation failures degrade to a fixed
/// reply; only session-store unavailability escalates.
pub struct ChatRouter<E, G, D>
where
    E: DeckExtractor,
    G: Generate,
    D: DurableStore,
{
    extractor: E,
    generator: G,
    store: Arc<SessionStore<D>>,
    options: SummaryOptions,
}

impl<E, G, D> ChatRouter<E, G, D>
where
    E: DeckExtractor,
    G: Generate,
    D: DurableStore,
{
    pub fn new(extractor: E, generator: G, store: Arc<SessionStore<D>>) -> Self {
        Self {
            extractor,
            generator,
            store,
            options: SummaryOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SummaryOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, StoreError> {
        if let Some(deck) = request.deck.as_deref() {
            return self.ingest_turn(deck, request.owner.clone()).await;
        }

        let Some(session_id) = request.session_id.as_deref() else {
            return Ok(ChatReply::error(MISSING_SESSION));
        };
        let Some(handle) = self.store.get(session_id).await? else {
            return Ok(ChatReply::error(INVALID_SESSION));
        };

        if let Some(page) = extract_slide_number(&request.message) {
            debug!(session_id, page, "explicit slide reference");
            return Ok(self
                .slide_turn(&handle, session_id, page, &request.message)
                .await);
        }

        Ok(self
            .question_turn(&handle, session_id, &request.message)
            .await)
    }

    async fn ingest_turn(
        &self,
        deck: &std::path::Path,
        owner: Option<String>,
    ) -> Result<ChatReply, StoreError> {
        if !is_deck_file(deck) {
            return Ok(ChatReply::error(WRONG_FORMAT));
        }

        match ingest_deck(
            &self.extractor,
            &self.generator,
            self.store.as_ref(),
            deck,
            &self.options,
            owner,
        )
        .await
        {
            Ok(ingested) => Ok(ChatReply::Answer {
                response: DECK_READY.to_string(),
                session_id: ingested.session_id,
            }),
            Err(IngestError::Store(error)) => Err(error),
            Err(error) => {
                warn!(%error, "deck ingestion failed");
                Ok(ChatReply::error(format!("Could not read the deck: {error}")))
            }
        }
    }

    /// Direct slide lookup. Always terminates here: an explicit reference
    /// never falls through to retrieval, and a missing page short-circuits
    /// without touching the generative capability.
    async fn slide_turn(
        &self,
        handle: &SessionHandle,
        session_id: &str,
        page: u32,
        message: &str,
    ) -> ChatReply {
        // Snapshot under the lock; the lock is never held across generation.
        let snapshot = {
            let session = handle.lock().await;
            match session.slide_by_page(page) {
                Some(slide) => Ok((
                    slide.title.clone(),
                    slide.text.trim().to_string(),
                    slide.bullets.clone(),
                )),
                None => Err(session.slides.len()),
            }
        };

        let (title, content, bullets) = match snapshot {
            Ok(parts) => parts,
            Err(slide_count) => {
                let response =
                    format!("Slide {page} not found. This deck has {slide_count} slides.");
                handle.lock().await.record_turn(message, response.clone());
                return ChatReply::Answer {
                    response,
                    session_id: session_id.to_string(),
                };
            }
        };

        let words = content.split_whitespace().count();
        let response = if words >= MIN_DIRECT_CONTENT_WORDS {
            self.explained(page, &title, &slide_context(&title, &content), EXPLAIN_BODY)
                .await
        } else if !bullets.is_empty() {
            let combined = format!("{title}\n\n{}", bullets.join("\n"));
            self.explained(
                page,
                &title,
                &slide_context(&title, &combined),
                EXPLAIN_BULLETS,
            )
            .await
        } else if !content.is_empty() {
            let combined = format!("{title}\n{content}");
            self.explained(
                page,
                &title,
                &slide_context(&title, &combined),
                EXPLAIN_SHORT_BODY,
            )
            .await
        } else {
            format!("Slide {page}: {title}\n\n(This slide appears to be empty or contains only images.)")
        };

        handle.lock().await.record_turn(message, response.clone());
        ChatReply::Answer {
            response,
            session_id: session_id.to_string(),
        }
    }

    async fn explained(
        &self,
        page: u32,
        title: &str,
        context: &str,
        instruction: &str,
    ) -> String {
        match self.generator.explain(context, instruction).await {
            Ok(explanation) => format!("Slide {page}: {title}\n\n{explanation}"),
            Err(error) => {
                warn!(page, %error, "slide explanation failed");
                GENERATION_UNAVAILABLE.to_string()
            }
        }
    }

    /// Broad question: ranked retrieval first, the running summary as a
    /// bounded fallback, a fixed reply when neither is usable.
    async fn question_turn(
        &self,
        handle: &SessionHandle,
        session_id: &str,
        message: &str,
    ) -> ChatReply {
        let context = {
            let session = handle.lock().await;
            let ranked = rank_slides(message, &session.slides, RANK_TOP_K);
            if !ranked.is_empty() {
                debug!(session_id, matches = ranked.len(), "ranked retrieval hit");
                Some(ranked_context(&ranked))
            } else if session.running_summary.chars().count() < SUMMARY_CONTEXT_MAX_CHARS {
                debug!(session_id, "falling back to running summary context");
                Some(session.running_summary.clone())
            } else {
                None
            }
        };

        let Some(context) = context else {
            let response = NO_MATCH_REPLY.to_string();
            handle.lock().await.record_turn(message, response.clone());
            return ChatReply::Answer {
                response,
                session_id: session_id.to_string(),
            };
        };

        let response = match self.generator.answer(&context, message).await {
            Ok(answer) => answer,
            Err(error) => {
                warn!(%error, "answer generation failed");
                GENERATION_UNAVAILABLE.to_string()
            }
        };

        handle.lock().await.record_turn(message, response.clone());
        ChatReply::Answer {
            response,
            session_id: session_id.to_string(),
        }
    }
}
