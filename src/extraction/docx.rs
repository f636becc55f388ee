use std::io::{Cursor, Read};

use quick_xml::{Reader as XmlReader, events::Event};
use zip::ZipArchive;

use super::ExtractionError;

const DOCUMENT_PART: &str = "word/document.xml";

/// Extract non-empty paragraphs from a DOCX archive, joined with newlines.
pub(super) fn read_docx(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|error| corrupt(format!("failed to open DOCX archive: {error}")))?;

    let mut xml = String::new();
    let mut part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|error| corrupt(format!("missing {DOCUMENT_PART}: {error}")))?;
    part.read_to_string(&mut xml)
        .map_err(|error| corrupt(format!("failed to read {DOCUMENT_PART}: {error}")))?;

    let paragraphs = collect_paragraphs(&xml)?;
    Ok(paragraphs
        .into_iter()
        .filter(|paragraph| !paragraph.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Walk WordprocessingML and return the text of every `w:p` in the order each one closes.
///
/// Paragraphs nested in text boxes close before their enclosing paragraph, so they are
/// emitted first and the outer paragraph keeps the text on both sides of the box.
fn collect_paragraphs(xml: &str) -> Result<Vec<String>, ExtractionError> {
    let mut reader = XmlReader::from_str(xml);
    let mut buf = Vec::new();
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut enclosing: Vec<String> = Vec::new();
    let mut in_text_node = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"w:p" => enclosing.push(std::mem::take(&mut current)),
                b"w:t" => in_text_node = true,
                b"w:tab" => current.push('\t'),
                b"w:br" | b"w:cr" => current.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"w:p" => paragraphs.push(String::new()),
                b"w:tab" => current.push('\t'),
                b"w:br" | b"w:cr" => current.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text_node {
                    let value = e
                        .unescape()
                        .map_err(|error| corrupt(format!("invalid DOCX text: {error}")))?;
                    current.push_str(&value);
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"w:t" => in_text_node = false,
                b"w:p" => {
                    paragraphs.push(std::mem::take(&mut current));
                    current = enclosing.pop().unwrap_or_default();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(error) => return Err(corrupt(format!("failed to parse DOCX XML: {error}"))),
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}

fn corrupt(message: String) -> ExtractionError {
    ExtractionError::CorruptDocument(message)
}
