//! Text extraction for the supported document formats.
//!
//! Dispatch is by file extension: `pdf` goes through pdf-extract, `docx`
//! is unzipped and its `word/document.xml` text runs collected, and
//! `txt`/`md` are read verbatim. Extraction failures are per-file; the
//! loader logs them and leaves the file pending.

use std::io::Read;
use std::path::Path;

use thiserror::Error;

/// Maximum decompressed bytes read from a single ZIP entry (zip-bomb guard).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported file extension: {0}")]
    UnsupportedExtension(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("DOCX extraction failed: {0}")]
    Docx(String),
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

/// Extract plain UTF-8 text from the file at `path`.
pub fn extract_text(path: &Path) -> Result<String, ExtractError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => {
            let bytes = std::fs::read(path)?;
            extract_pdf(&bytes)
        }
        "docx" => {
            let bytes = std::fs::read(path)?;
            extract_docx(&bytes)
        }
        "txt" | "md" => Ok(std::fs::read_to_string(path)?),
        other => Err(ExtractError::UnsupportedExtension(other.to_string())),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| ExtractError::Docx("word/document.xml not found".to_string()))?;
    let mut doc_xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut doc_xml)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Docx(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }
    extract_text_runs(&doc_xml)
}

/// Collect the `w:t` text runs, separating paragraphs with newlines.
fn extract_text_runs(xml: &[u8]) -> Result<String, ExtractError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        out.push_str(te.unescape().unwrap_or_default().as_ref());
                    }
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"p" && !out.ends_with('\n') && !out.is_empty() {
                    out.push('\n');
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn unsupported_extension_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slides.pptx");
        std::fs::write(&path, b"irrelevant").unwrap();
        let err = extract_text(&path).unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedExtension(_)));
    }

    #[test]
    fn reads_plain_text_and_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("note.txt");
        std::fs::write(&txt, "plain body").unwrap();
        assert_eq!(extract_text(&txt).unwrap(), "plain body");

        let md = dir.path().join("note.md");
        std::fs::write(&md, "# heading").unwrap();
        assert_eq!(extract_text(&md).unwrap(), "# heading");
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();
        let err = extract_text(&path).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn invalid_zip_returns_error_for_docx() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.docx");
        std::fs::write(&path, b"not a zip").unwrap();
        let err = extract_text(&path).unwrap_err();
        assert!(matches!(err, ExtractError::Docx(_)));
    }

    #[test]
    fn docx_text_runs_are_collected_per_paragraph() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.docx");
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file(
                "word/document.xml",
                zip::write::SimpleFileOptions::default(),
            )
            .unwrap();
        writer
            .write_all(
                br#"<w:document xmlns:w="ns"><w:body>
                    <w:p><w:r><w:t>first run</w:t></w:r></w:p>
                    <w:p><w:r><w:t>second run</w:t></w:r></w:p>
                </w:body></w:document>"#,
            )
            .unwrap();
        writer.finish().unwrap();

        let text = extract_text(&path).unwrap();
        assert_eq!(text, "first run\nsecond run");
    }
}
