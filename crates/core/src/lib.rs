pub mod context;
pub mod error;
pub mod extractor;
pub mod generate;
pub mod ingest;
pub mod models;
pub mod ranker;
pub mod router;
pub mod segment;
pub mod session;
pub mod stores;
pub mod summarize;
pub mod traits;

pub use context::{clean_slide_text, ranked_context, slide_context};
pub use error::{GenerateError, IngestError, StoreError};
pub use extractor::{is_deck_file, DeckExtractor, PptxExtractor, RawSlide};
pub use generate::{HttpGenerator, SummaryConstraints};
pub use ingest::{
    discover_deck_files, ingest_deck, ingest_folder_best_effort, summarize_session_slide,
    IngestedDeck, IngestionReport, SkippedDeck,
};
pub use models::{
    summary_section, ChatReply, ChatRequest, ChatTurn, Session, SessionRecord, Slide,
    SummaryOptions,
};
pub use ranker::rank_slides;
pub use router::{extract_slide_number, ChatRouter};
pub use segment::segment;
pub use session::{SessionHandle, SessionStore};
pub use stores::SqliteSessionStore;
pub use summarize::{normalize_text, summarize_slide, NO_TEXT_SENTINEL};
pub use traits::{DurableStore, Generate};
