use crate::error::IngestError;
use crate::extractor::DeckExtractor;
use crate::models::{summary_section, Slide, SummaryOptions};
use crate::segment::segment;
use crate::session::SessionStore;
use crate::summarize::summarize_slide;
use crate::traits::{DurableStore, Generate};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Bodies with fewer words than this skip the generative step; the slide
/// title stands in as the only bullet.
const MIN_SUMMARIZABLE_WORDS: usize = 12;

pub fn discover_deck_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        if crate::extractor::is_deck_file(entry.path()) {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub struct IngestedDeck {
    pub session_id: String,
    pub slides: Vec<Slide>,
    pub summary: String,
}

pub struct SkippedDeck {
    pub path: PathBuf,
    pub reason: String,
}

pub struct IngestionReport {
    pub decks: Vec<IngestedDeck>,
    pub skipped_files: Vec<SkippedDeck>,
}

/// Ingest one deck end to end: extract, segment, summarize every slide,
/// and create the session. Summarization failures degrade to title-only
/// bullets; only extraction, segmentation, and store failures error out.
pub async fn ingest_deck<E, G, D>(
    extractor: &E,
    generator: &G,
    store: &SessionStore<D>,
    path: &Path,
    options: &SummaryOptions,
    owner: Option<String>,
) -> Result<IngestedDeck, IngestError>
where
    E: DeckExtractor + ?Sized,
    G: Generate + ?Sized,
    D: DurableStore,
{
    let raw_slides = extractor.extract_slides(path)?;
    let mut slides = segment(&raw_slides)?;

    for slide in &mut slides {
        slide.bullets = slide_bullets(generator, slide, options).await;
    }

    let summary = slides
        .iter()
        .map(|slide| summary_section(slide.page, &slide.title, &slide.bullets))
        .collect::<Vec<_>>()
        .join("\n\n");
    let raw_text = slides
        .iter()
        .map(|slide| slide.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let session_id = store
        .create(raw_text, summary.clone(), slides.clone(), owner)
        .await?;
    info!(
        deck = %path.display(),
        session_id = %session_id,
        slide_count = slides.len(),
        "deck ingested"
    );

    Ok(IngestedDeck {
        session_id,
        slides,
        summary,
    })
}

async fn slide_bullets<G>(generator: &G, slide: &Slide, options: &SummaryOptions) -> Vec<String>
where
    G: Generate + ?Sized,
{
    if slide.text.split_whitespace().count() < MIN_SUMMARIZABLE_WORDS {
        return vec![slide.title.clone()];
    }

    match summarize_slide(generator, &slide.text, options).await {
        Ok(bullets) => bullets,
        Err(error) => {
            warn!(page = slide.page, %error, "slide summarization failed; keeping title bullet");
            vec![slide.title.clone()]
        }
    }
}

/// Ingest every deck under a folder, skipping unreadable files and
/// reporting them with reasons. Store failures still escalate.
pub async fn ingest_folder_best_effort<E, G, D>(
    extractor: &E,
    generator: &G,
    store: &SessionStore<D>,
    folder: &Path,
    options: &SummaryOptions,
    owner: Option<String>,
) -> Result<IngestionReport, IngestError>
where
    E: DeckExtractor + ?Sized,
    G: Generate + ?Sized,
    D: DurableStore,
{
    let files = discover_deck_files(folder);

    if files.is_empty() {
        return Err(IngestError::InvalidArgument(format!(
            "no pptx files found in {}",
            folder.display()
        )));
    }

    let mut decks = Vec::new();
    let mut skipped_files = Vec::new();

    for path in files {
        match ingest_deck(extractor, generator, store, &path, options, owner.clone()).await {
            Ok(deck) => decks.push(deck),
            Err(IngestError::Store(error)) => return Err(IngestError::Store(error)),
            Err(error) => skipped_files.push(SkippedDeck {
                path,
                reason: error.to_string(),
            }),
        }
    }

    Ok(IngestionReport {
        decks,
        skipped_files,
    })
}

/// Re-summarize one slide of an existing session, updating its bullets in
/// place and growing the running summary. Returns `None` when the session
/// or the page does not exist. The session lock is not held across the
/// generative call.
pub async fn summarize_session_slide<G, D>(
    generator: &G,
    store: &SessionStore<D>,
    session_id: &str,
    page: u32,
    options: &SummaryOptions,
) -> Result<Option<Vec<String>>, IngestError>
where
    G: Generate + ?Sized,
    D: DurableStore,
{
    let Some(handle) = store.get(session_id).await? else {
        return Ok(None);
    };

    let text = {
        let session = handle.lock().await;
        let Some(slide) = session.slide_by_page(page) else {
            return Ok(None);
        };
        slide.text.clone()
    };

    let bullets = summarize_slide(generator, &text, options).await?;
    handle.lock().await.apply_slide_summary(page, bullets.clone());
    Ok(Some(bullets))
}

#[cfg(test)]
mod tests {
    use super::{
        discover_deck_files, ingest_deck, ingest_folder_best_effort, summarize_session_slide,
    };
    use crate::error::GenerateError;
    use crate::extractor::{DeckExtractor, PptxExtractor, RawSlide};
    use crate::generate::SummaryConstraints;
    use crate::models::SummaryOptions;
    use crate::session::SessionStore;
    use crate::stores::SqliteSessionStore;
    use crate::traits::Generate;
    use async_trait::async_trait;
    use std::fs::{self, File};
    use std::io::Write;
    use std::path::Path;
    use tempfile::tempdir;

    struct FakeExtractor {
        slides: Vec<RawSlide>,
    }

    impl DeckExtractor for FakeExtractor {
        fn extract_slides(&self, _path: &Path) -> Result<Vec<RawSlide>, crate::IngestError> {
            Ok(self.slides.clone())
        }
    }

    struct FakeGenerator {
        reply: Result<String, ()>,
    }

    #[async_trait]
    impl Generate for FakeGenerator {
        async fn summarize(
            &self,
            _text: &str,
            _constraints: &SummaryConstraints,
        ) -> Result<String, GenerateError> {
            self.reply.clone().map_err(|_| GenerateError::EmptyOutput)
        }

        async fn answer(&self, _context: &str, _question: &str) -> Result<String, GenerateError> {
            Ok(String::new())
        }

        async fn explain(
            &self,
            _context: &str,
            _instruction: &str,
        ) -> Result<String, GenerateError> {
            Ok(String::new())
        }
    }

    fn store() -> SessionStore<SqliteSessionStore> {
        SessionStore::new(SqliteSessionStore::open_in_memory().expect("in-memory store"))
    }

    fn line(text: &str) -> String {
        text.to_string()
    }

    fn long_body_deck() -> FakeExtractor {
        FakeExtractor {
            slides: vec![
                RawSlide {
                    lines: vec![
                        line("Memory Hierarchies"),
                        line(
                            "caches exploit locality of reference to hide the widening gap \
                             between processor speed and memory latency and the cost of a \
                             miss grows with every level of the hierarchy we add",
                        ),
                    ],
                },
                RawSlide {
                    lines: vec![line("Questions"), line("thanks")],
                },
            ],
        }
    }

    #[tokio::test]
    async fn ingestion_builds_bullets_summary_and_session() {
        let extractor = long_body_deck();
        let generator = FakeGenerator {
            reply: Ok("Caches exploit locality of reference effectively. \
                       Processor speed outpaces memory latency growth."
                .to_string()),
        };
        let store = store();

        let deck = ingest_deck(
            &extractor,
            &generator,
            &store,
            Path::new("deck.pptx"),
            &SummaryOptions::default(),
            None,
        )
        .await
        .expect("ingestion should succeed");

        assert_eq!(deck.slides.len(), 2);
        assert_eq!(
            deck.slides[0].bullets,
            vec![
                "Caches exploit locality of reference effectively.".to_string(),
                "Processor speed outpaces memory latency growth.".to_string(),
            ]
        );
        // Second slide is too thin to summarize: title bullet only.
        assert_eq!(deck.slides[1].bullets, vec!["Questions".to_string()]);

        assert!(deck.summary.contains("Slide 1: Memory Hierarchies"));
        assert!(deck.summary.contains("Slide 2: Questions"));

        let handle = store
            .get(&deck.session_id)
            .await
            .expect("get should succeed")
            .expect("session should exist");
        let session = handle.lock().await;
        assert_eq!(session.slides, deck.slides);
        assert!(session.raw_text.contains("caches exploit locality"));
    }

    #[tokio::test]
    async fn failed_generation_degrades_to_title_bullets() {
        let extractor = long_body_deck();
        let generator = FakeGenerator { reply: Err(()) };
        let store = store();

        let deck = ingest_deck(
            &extractor,
            &generator,
            &store,
            Path::new("deck.pptx"),
            &SummaryOptions::default(),
            None,
        )
        .await
        .expect("ingestion should still succeed");

        assert_eq!(
            deck.slides[0].bullets,
            vec!["Memory Hierarchies".to_string()]
        );
    }

    #[tokio::test]
    async fn summarize_session_slide_updates_the_session() {
        let extractor = long_body_deck();
        let generator = FakeGenerator {
            reply: Ok("Caches exploit locality of reference effectively.".to_string()),
        };
        let store = store();
        let deck = ingest_deck(
            &extractor,
            &generator,
            &store,
            Path::new("deck.pptx"),
            &SummaryOptions::default(),
            None,
        )
        .await
        .expect("ingestion should succeed");

        let bullets = summarize_session_slide(
            &generator,
            &store,
            &deck.session_id,
            1,
            &SummaryOptions::default(),
        )
        .await
        .expect("summarize should succeed")
        .expect("slide should exist");
        assert!(!bullets.is_empty());

        let missing = summarize_session_slide(
            &generator,
            &store,
            &deck.session_id,
            99,
            &SummaryOptions::default(),
        )
        .await
        .expect("summarize should succeed");
        assert!(missing.is_none());
    }

    #[test]
    fn discover_deck_files_is_recursive_and_sorted() {
        let dir = tempdir().expect("tempdir");
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).expect("nested dir");

        File::create(dir.path().join("b.pptx"))
            .and_then(|mut file| file.write_all(b"fake"))
            .expect("file b");
        File::create(nested.join("a.pptx"))
            .and_then(|mut file| file.write_all(b"fake"))
            .expect("file a");
        File::create(dir.path().join("notes.txt"))
            .and_then(|mut file| file.write_all(b"fake"))
            .expect("file txt");

        let files = discover_deck_files(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("b.pptx"));
        assert!(files[1].ends_with("nested/a.pptx"));
    }

    #[tokio::test]
    async fn folder_ingestion_fails_without_decks() {
        let dir = tempdir().expect("tempdir");
        let generator = FakeGenerator { reply: Err(()) };
        let store = store();

        let result = ingest_folder_best_effort(
            &PptxExtractor,
            &generator,
            &store,
            dir.path(),
            &SummaryOptions::default(),
            None,
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn best_effort_skips_unreadable_decks() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("broken.pptx"), b"not a zip").expect("broken deck");

        let generator = FakeGenerator { reply: Err(()) };
        let store = store();

        let report = ingest_folder_best_effort(
            &PptxExtractor,
            &generator,
            &store,
            dir.path(),
            &SummaryOptions::default(),
            None,
        )
        .await
        .expect("best effort should succeed");

        assert!(report.decks.is_empty());
        assert_eq!(report.skipped_files.len(), 1);
        assert!(report.skipped_files[0].path.ends_with("broken.pptx"));
    }
}
