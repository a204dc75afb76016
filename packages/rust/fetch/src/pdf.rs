//! PDF fetch: binary download plus text extraction.
//!
//! Two independent extractors are tried in order: poppler's layout-aware
//! `pdftotext -layout`, then MuPDF's plainer `mutool draw -F txt`. Document
//! information comes from `pdfinfo` when it is installed.

use std::io::Write;
use std::path::Path;
use std::process::Output;
use std::time::Duration;

use serde_json::json;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, instrument, warn};
use url::Url;

use webacquire_shared::{
    DocumentBody, FetchError, FetchMethod, HttpConfig, ParsedDocument, PdfDocument, PdfInfo,
};

use crate::http::{ACCEPT_PDF, download};

/// Text extractors, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfExtractor {
    /// `pdftotext -layout` (poppler-utils); keeps column layout.
    PdfToText,
    /// `mutool draw -F txt` (MuPDF); plain reading order.
    MuTool,
}

impl PdfExtractor {
    pub const ORDER: [PdfExtractor; 2] = [PdfExtractor::PdfToText, PdfExtractor::MuTool];

    pub fn name(&self) -> &'static str {
        match self {
            Self::PdfToText => "pdftotext",
            Self::MuTool => "mutool",
        }
    }

    fn install_hint(&self) -> &'static str {
        match self {
            Self::PdfToText => "pdftotext (install poppler-utils)",
            Self::MuTool => "mutool (install mupdf-tools)",
        }
    }

    fn command(&self, file: &Path) -> Command {
        let mut cmd = match self {
            Self::PdfToText => {
                let mut cmd = Command::new("pdftotext");
                cmd.args(["-layout", "-enc", "UTF-8"]).arg(file).arg("-");
                cmd
            }
            Self::MuTool => {
                let mut cmd = Command::new("mutool");
                cmd.args(["draw", "-F", "txt", "-o", "-"]).arg(file);
                cmd
            }
        };
        cmd.kill_on_drop(true);
        cmd
    }

    /// Run the extractor on `file`; empty output counts as failure.
    async fn extract(&self, file: &Path, limit: Duration) -> Result<String, ExtractorError> {
        let output = tokio::time::timeout(limit, self.command(file).output())
            .await
            .map_err(|_| ExtractorError::Failed(format!("{} timed out", self.name())))?;
        if let Err(e) = &output {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(ExtractorError::NotInstalled(format!(
                    "external tool not found: {}",
                    self.install_hint()
                )));
            }
        }
        let text = handle_cmd_output(output, self.install_hint(), self.name())
            .map_err(ExtractorError::Failed)?;
        if text.trim().is_empty() {
            return Err(ExtractorError::Failed(format!("{} produced no text", self.name())));
        }
        Ok(text)
    }
}

/// Why one extractor produced no text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractorError {
    /// The binary is not on `PATH`.
    #[error("{0}")]
    NotInstalled(String),
    /// The binary ran and failed, timed out, or printed nothing.
    #[error("{0}")]
    Failed(String),
}

/// Every extractor failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", join_causes(.causes))]
pub struct ExtractionFailure {
    pub causes: Vec<ExtractorError>,
}

impl ExtractionFailure {
    /// No extractor is installed at all, as opposed to one failing on this file.
    pub fn tools_missing(&self) -> bool {
        self.causes
            .iter()
            .all(|c| matches!(c, ExtractorError::NotInstalled(_)))
    }
}

fn join_causes(causes: &[ExtractorError]) -> String {
    causes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<ExtractionFailure> for FetchError {
    /// Missing tools hand over to another strategy; a bad file is retried.
    fn from(failure: ExtractionFailure) -> Self {
        let message = format!("PDF processing failed: {failure}");
        if failure.tools_missing() {
            FetchError::unavailable(message)
        } else {
            FetchError::failed(message)
        }
    }
}

/// Handle command output, extracting stdout on success or describing the failure.
fn handle_cmd_output(
    result: std::io::Result<Output>,
    tool_name: &str,
    error_prefix: &str,
) -> Result<String, String> {
    match result {
        Ok(output) if output.status.success() => {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(format!("{error_prefix} failed: {}", stderr.trim()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("external tool not found: {tool_name}"))
        }
        Err(e) => Err(format!("{error_prefix} failed: {e}")),
    }
}

/// Download a PDF and extract its text.
#[instrument(skip_all, fields(url = %url, attempt = attempt))]
pub async fn fetch_pdf(
    config: &HttpConfig,
    url: &Url,
    attempt: u32,
) -> Result<ParsedDocument, FetchError> {
    let downloaded = download(config, url, attempt, ACCEPT_PDF).await?;
    let file = write_temp_pdf(&downloaded.bytes)?;

    let (text, extractor) = extract_text(file.path(), config.timeout()).await?;
    let info = read_info(file.path(), config.timeout()).await.unwrap_or_default();
    debug!(extractor = extractor.name(), chars = text.len(), "PDF text extracted");

    let mut metadata = downloaded.metadata();
    metadata.insert("extractor".into(), json!(extractor.name()));
    metadata.insert("page_count".into(), json!(info.page_count.unwrap_or(0)));
    metadata.insert(
        "pdf_metadata".into(),
        serde_json::to_value(&info).unwrap_or_else(|_| json!({})),
    );

    Ok(ParsedDocument {
        url: url.clone(),
        final_url: Some(downloaded.final_url),
        method: FetchMethod::Pdf,
        body: DocumentBody::Pdf(PdfDocument {
            bytes: downloaded.bytes,
            text,
            info,
        }),
        metadata,
    })
}

/// Try each extractor in order; the error lists every cause.
pub async fn extract_text(
    file: &Path,
    limit: Duration,
) -> Result<(String, PdfExtractor), ExtractionFailure> {
    let mut causes = Vec::new();
    for extractor in PdfExtractor::ORDER {
        match extractor.extract(file, limit).await {
            Ok(text) => return Ok((text, extractor)),
            Err(e) => {
                warn!(extractor = extractor.name(), error = %e, "PDF extractor failed");
                causes.push(e);
            }
        }
    }
    Err(ExtractionFailure { causes })
}

/// Write downloaded bytes to a temporary file removed when the handle drops.
fn write_temp_pdf(bytes: &[u8]) -> Result<NamedTempFile, FetchError> {
    let mut file = tempfile::Builder::new()
        .prefix("webacquire-")
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| FetchError::failed(format!("cannot create temporary file: {e}")))?;
    file.write_all(bytes)
        .and_then(|_| file.flush())
        .map_err(|e| FetchError::failed(format!("cannot write temporary file: {e}")))?;
    Ok(file)
}

/// Read document information with `pdfinfo`, if installed.
async fn read_info(file: &Path, limit: Duration) -> Option<PdfInfo> {
    let mut cmd = Command::new("pdfinfo");
    cmd.arg(file).kill_on_drop(true);
    let output = tokio::time::timeout(limit, cmd.output()).await.ok()?;
    match handle_cmd_output(output, "pdfinfo (install poppler-utils)", "pdfinfo") {
        Ok(stdout) => Some(parse_pdfinfo(&stdout)),
        Err(e) => {
            debug!(error = %e, "no PDF metadata");
            None
        }
    }
}

/// Parse `pdfinfo` output (`Key:   value` lines).
pub fn parse_pdfinfo(stdout: &str) -> PdfInfo {
    let mut info = PdfInfo::default();
    for line in stdout.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        let value = Some(value.to_string());
        match key.trim() {
            "Title" => info.title = value,
            "Author" => info.author = value,
            "Subject" => info.subject = value,
            "Creator" => info.creator = value,
            "Producer" => info.producer = value,
            "CreationDate" => info.creation_date = value,
            "ModDate" => info.modification_date = value,
            "Pages" => info.page_count = value.and_then(|v| v.parse().ok()),
            _ => {}
        }
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::path;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn parses_pdfinfo_output() {
        let stdout = "\
Title:          UGC Regulations, 2018
Author:         University Grants Commission
Creator:        Microsoft Word
Producer:       Acrobat PDFMaker
CreationDate:   Mon Jul 16 10:01:02 2018 IST
Tagged:         no
Pages:          42
Page size:      595 x 842 pts (A4)
";
        let info = parse_pdfinfo(stdout);
        assert_eq!(info.title.as_deref(), Some("UGC Regulations, 2018"));
        assert_eq!(info.author.as_deref(), Some("University Grants Commission"));
        assert_eq!(info.creation_date.as_deref(), Some("Mon Jul 16 10:01:02 2018 IST"));
        assert_eq!(info.page_count, Some(42));
        assert_eq!(info.subject, None);
    }

    #[test]
    fn missing_tool_is_reported() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "nope");
        let msg = handle_cmd_output(Err(err), "mutool (install mupdf-tools)", "mutool").unwrap_err();
        assert!(msg.contains("external tool not found: mutool"));
    }

    #[test]
    fn missing_extractors_are_unavailable() {
        let failure = ExtractionFailure {
            causes: vec![
                ExtractorError::NotInstalled("external tool not found: pdftotext".into()),
                ExtractorError::NotInstalled("external tool not found: mutool".into()),
            ],
        };
        assert!(failure.tools_missing());
        let err = FetchError::from(failure);
        assert!(err.is_unavailable());
        assert!(err.to_string().contains("pdftotext") && err.to_string().contains("mutool"));
    }

    #[test]
    fn extractor_failing_on_the_file_is_retryable() {
        let failure = ExtractionFailure {
            causes: vec![
                ExtractorError::Failed("pdftotext failed: Syntax Error: Couldn't find trailer".into()),
                ExtractorError::NotInstalled("external tool not found: mutool".into()),
            ],
        };
        assert!(!failure.tools_missing());
        assert!(!FetchError::from(failure).is_unavailable());
    }

    #[tokio::test]
    async fn undecodable_pdf_fails_both_extractors() {
        let server = MockServer::start().await;
        Mock::given(path("/broken.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(b"this is not a PDF".to_vec()),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/broken.pdf", server.uri())).unwrap();
        let err = fetch_pdf(&HttpConfig::default(), &url, 0).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("PDF processing failed"), "{msg}");
        assert!(msg.contains("pdftotext") && msg.contains("mutool"), "{msg}");
    }

    #[tokio::test]
    async fn download_errors_surface_before_extraction() {
        let server = MockServer::start().await;
        Mock::given(path("/gone.pdf"))
            .respond_with(ResponseTemplate::new(410))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/gone.pdf", server.uri())).unwrap();
        let err = fetch_pdf(&HttpConfig::default(), &url, 0).await.unwrap_err();
        assert!(err.to_string().contains("410"));
    }
}
