//! Text extraction for uploaded files.
//!
//! Documents are reduced to plain text; audio and video files are read
//! whole so they can be transcribed by the model.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;

use scraper::{Html, Node, Selector};
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;
use zip::ZipArchive;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported file type: {0}")]
    Unsupported(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("{tool} not available (install {package})")]
    ToolMissing { tool: String, package: String },

    #[error("{0}")]
    Command(String),

    #[error("File is {size} bytes, over the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },
}

impl From<zip::result::ZipError> for ExtractionError {
    fn from(e: zip::result::ZipError) -> Self {
        ExtractionError::Archive(e.to_string())
    }
}

/// What an uploaded file yields.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    Text(String),
    Media { bytes: Vec<u8>, mime_type: String },
}

static PARAGRAPH_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r"w\:p").expect("valid selector"));

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Clone, PartialEq)]
enum FileKind {
    PlainText,
    Docx,
    Pdf,
    Media(String),
}

/// Classify by sniffed content first, then by extension.
fn detect_kind(path: &Path) -> Result<FileKind, ExtractionError> {
    let sniffed = infer::get_from_path(path)?.map(|t| t.mime_type().to_string());
    let guessed = mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str().to_string());
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    for mime in [sniffed.as_deref(), guessed.as_deref()].into_iter().flatten() {
        match mime {
            "application/pdf" => return Ok(FileKind::Pdf),
            DOCX_MIME => return Ok(FileKind::Docx),
            // .docx sniffs as a plain zip container
            "application/zip" if ext == "docx" => return Ok(FileKind::Docx),
            m if m.starts_with("audio/") || m.starts_with("video/") => {
                return Ok(FileKind::Media(m.to_string()))
            }
            m if m.starts_with("text/") => return Ok(FileKind::PlainText),
            _ => {}
        }
    }

    match ext.as_str() {
        "txt" | "md" | "markdown" | "text" | "srt" | "vtt" => Ok(FileKind::PlainText),
        _ => Err(ExtractionError::Unsupported(
            guessed.unwrap_or_else(|| format!(".{}", ext)),
        )),
    }
}

/// Text runs of `word/document.xml`, one line per paragraph.
fn docx_text(path: &Path) -> Result<String, ExtractionError> {
    let file = std::fs::File::open(path)?;
    let mut archive = ZipArchive::new(file)?;
    let mut xml = String::new();
    archive.by_name("word/document.xml")?.read_to_string(&mut xml)?;
    Ok(document_xml_text(&xml))
}

/// Paragraph text of a WordprocessingML body, one line per `w:p`.
fn document_xml_text(xml: &str) -> String {
    let document = Html::parse_fragment(xml);
    let mut lines = Vec::new();

    for paragraph in document.select(&PARAGRAPH_SELECTOR) {
        let mut line = String::new();
        for node in paragraph.descendants() {
            match node.value() {
                Node::Text(text) => {
                    let in_run_text = node
                        .parent()
                        .and_then(|p| p.value().as_element())
                        .is_some_and(|e| e.name() == "w:t");
                    if in_run_text {
                        line.push_str(text);
                    }
                }
                Node::Element(e) if e.name() == "w:tab" => line.push('\t'),
                Node::Element(e) if e.name() == "w:br" => line.push('\n'),
                _ => {}
            }
        }
        lines.extend(
            line.lines()
                .map(str::trim_end)
                .filter(|l| !l.trim().is_empty())
                .map(str::to_string),
        );
    }

    lines.join("\n")
}

async fn pdf_text(path: &Path) -> Result<String, ExtractionError> {
    if which::which("pdftotext").is_err() {
        return Err(ExtractionError::ToolMissing {
            tool: "pdftotext".to_string(),
            package: "poppler-utils".to_string(),
        });
    }

    let output = Command::new("pdftotext")
        .args(["-layout", "-enc", "UTF-8"])
        .arg(path)
        .arg("-")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(ExtractionError::Command(format!(
            "pdftotext failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Extract text (or media bytes) from an uploaded file.
pub async fn extract(path: &Path, media_cap: u64) -> Result<Extracted, ExtractionError> {
    let kind = detect_kind(path)?;
    debug!(path = %path.display(), ?kind, "extracting uploaded file");

    match kind {
        FileKind::PlainText => {
            let bytes = tokio::fs::read(path).await?;
            Ok(Extracted::Text(String::from_utf8_lossy(&bytes).into_owned()))
        }
        FileKind::Docx => {
            let owned: PathBuf = path.to_path_buf();
            let text = tokio::task::spawn_blocking(move || docx_text(&owned))
                .await
                .map_err(|e| ExtractionError::Command(format!("docx task failed: {}", e)))??;
            Ok(Extracted::Text(text))
        }
        FileKind::Pdf => Ok(Extracted::Text(pdf_text(path).await?)),
        FileKind::Media(mime_type) => {
            let size = tokio::fs::metadata(path).await?.len();
            if size > media_cap {
                return Err(ExtractionError::TooLarge {
                    size,
                    limit: media_cap,
                });
            }
            let bytes = tokio::fs::read(path).await?;
            Ok(Extracted::Media { bytes, mime_type })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_plain_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "# Lecture 3\nMitochondria.").unwrap();

        let extracted = extract(&path, 1024).await.unwrap();
        assert_eq!(extracted, Extracted::Text("# Lecture 3\nMitochondria.".to_string()));
    }

    #[tokio::test]
    async fn test_docx_paragraph_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lecture.docx");
        let file = std::fs::File::create(&path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(
            br#"<?xml version="1.0"?><w:document><w:body>
            <w:p><w:r><w:t>Cells &amp; tissues</w:t></w:r></w:p>
            <w:p><w:r><w:t xml:space="preserve">Organs </w:t></w:r><w:r><w:t>form systems</w:t></w:r></w:p>
            </w:body></w:document>"#,
        )
        .unwrap();
        zip.finish().unwrap();

        let extracted = extract(&path, 1024).await.unwrap();
        assert_eq!(
            extracted,
            Extracted::Text("Cells & tissues\nOrgans form systems".to_string())
        );
    }

    #[test]
    fn test_document_xml_empty_runs_tabs_and_breaks() {
        let xml = r#"<w:document><w:body>
            <w:p><w:r><w:t/></w:r><w:r><w:t>Heat</w:t><w:tab/><w:t>&lt;Q&gt; &amp;amp; work</w:t></w:r></w:p>
            <w:p><w:r><w:t></w:t></w:r></w:p>
            <w:p><w:r><w:t>Line one</w:t><w:br/><w:t>line two</w:t></w:r></w:p>
            </w:body></w:document>"#;
        assert_eq!(
            document_xml_text(xml),
            "Heat\t<Q> &amp; work\nLine one\nline two"
        );
    }

    #[tokio::test]
    async fn test_media_over_cap_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lecture.mp3");
        std::fs::write(&path, vec![0u8; 64]).unwrap();

        let err = extract(&path, 16).await.unwrap_err();
        assert!(matches!(err, ExtractionError::TooLarge { size: 64, limit: 16 }));

        let ok = extract(&path, 1024).await.unwrap();
        assert!(matches!(ok, Extracted::Media { ref mime_type, .. } if mime_type == "audio/mpeg"));
    }

    #[tokio::test]
    async fn test_unknown_binary_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        std::fs::write(&path, [0x00u8, 0x01, 0x02]).unwrap();
        assert!(matches!(
            extract(&path, 1024).await,
            Err(ExtractionError::Unsupported(_))
        ));
    }
}
