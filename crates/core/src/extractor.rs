use crate::error::IngestError;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use std::fs::File;
use std::io::Read as _;
use std::path::Path;
use zip::ZipArchive;

/// Textual runs of one structural unit, one entry per paragraph, in
/// document order. Segmentation turns these into titled slides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSlide {
    pub lines: Vec<String>,
}

pub trait DeckExtractor {
    fn extract_slides(&self, path: &Path) -> Result<Vec<RawSlide>, IngestError>;
}

pub fn is_deck_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pptx"))
}

/// Reads Office Open XML presentations. Each `ppt/slides/slideN.xml` part
/// is one unit; text frames, nested groups, and table cells all reduce to
/// `<a:p>`/`<a:t>` elements, so a streaming walk over the part yields every
/// run in document order.
#[derive(Default)]
pub struct PptxExtractor;

impl DeckExtractor for PptxExtractor {
    fn extract_slides(&self, path: &Path) -> Result<Vec<RawSlide>, IngestError> {
        if !is_deck_file(path) {
            return Err(IngestError::DeckParse(format!(
                "not a .pptx file: {}",
                path.display()
            )));
        }

        let file = File::open(path)?;
        let mut archive = ZipArchive::new(file)
            .map_err(|error| IngestError::DeckParse(error.to_string()))?;

        let slide_part_re = Regex::new(r"^ppt/slides/slide(\d+)\.xml$")?;
        let mut parts: Vec<(u32, String)> = Vec::new();
        for name in archive.file_names() {
            if let Some(capture) = slide_part_re.captures(name) {
                if let Ok(number) = capture[1].parse::<u32>() {
                    parts.push((number, name.to_string()));
                }
            }
        }
        parts.sort_unstable_by_key(|(number, _)| *number);

        if parts.is_empty() {
            return Err(IngestError::DeckParse(format!(
                "no slide parts found in {}",
                path.display()
            )));
        }

        let mut slides = Vec::new();
        for (_, part_name) in parts {
            let mut xml = String::new();
            archive
                .by_name(&part_name)
                .map_err(|error| IngestError::DeckParse(error.to_string()))?
                .read_to_string(&mut xml)?;

            slides.push(RawSlide {
                lines: paragraph_texts(&xml)?,
            });
        }

        Ok(slides)
    }
}

fn paragraph_texts(xml: &str) -> Result<Vec<String>, IngestError> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    let mut lines = Vec::new();
    let mut paragraph = String::new();
    let mut in_text = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref element)) => match element.local_name().as_ref() {
                b"p" => paragraph.clear(),
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::End(ref element)) => match element.local_name().as_ref() {
                b"p" => {
                    let line = paragraph.trim();
                    if !line.is_empty() {
                        lines.push(line.to_string());
                    }
                    paragraph.clear();
                }
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Text(ref text)) => {
                if in_text {
                    let unescaped = text
                        .unescape()
                        .map_err(|error| IngestError::DeckParse(error.to_string()))?;
                    paragraph.push_str(&unescaped);
                }
            }
            Ok(Event::Eof) => break,
            Err(error) => {
                return Err(IngestError::DeckParse(format!("xml parse error: {error}")))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(lines)
}
