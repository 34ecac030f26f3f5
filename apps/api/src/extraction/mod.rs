//! Resume text extraction, dispatched on the uploaded file's extension.
//!
//! The dispatch table is built once at startup and shared through `AppState`.

use std::collections::HashMap;
use std::fmt;

use docx_rs::{DocumentChild, Paragraph, ParagraphChild, RunChild};
use thiserror::Error;

mod rtf;

pub use rtf::rtf_to_text;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Failed to read PDF: {0}")]
    Pdf(String),

    #[error("Failed to read DOCX: {0}")]
    Docx(String),

    #[error("No text could be extracted from the document")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Pdf,
    Docx,
    Txt,
    Rtf,
}

impl FileType {
    pub const ALL: [FileType; 4] = [FileType::Pdf, FileType::Docx, FileType::Txt, FileType::Rtf];

    pub fn extension(self) -> &'static str {
        match self {
            FileType::Pdf => ".pdf",
            FileType::Docx => ".docx",
            FileType::Txt => ".txt",
            FileType::Rtf => ".rtf",
        }
    }

    /// Matches an extension including its leading dot, ignoring case.
    pub fn from_extension(extension: &str) -> Result<Self, ExtractionError> {
        Self::ALL
            .into_iter()
            .find(|t| t.extension().eq_ignore_ascii_case(extension))
            .ok_or_else(|| ExtractionError::UnsupportedFileType(extension.to_string()))
    }

    /// Takes the extension from the last `.` of `file_name`. A leading dot alone
    /// (`.pdf`) is a hidden file name, not an extension.
    pub fn from_file_name(file_name: &str) -> Result<Self, ExtractionError> {
        match file_name.rfind('.') {
            Some(i) if i > 0 => Self::from_extension(&file_name[i..]),
            _ => Err(ExtractionError::UnsupportedFileType(file_name.to_string())),
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

type ExtractFn = fn(&[u8]) -> Result<String, ExtractionError>;

/// Maps every supported [`FileType`] to its extraction routine.
pub struct TextExtractor {
    extractors: HashMap<FileType, ExtractFn>,
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor {
    pub fn new() -> Self {
        let extractors: HashMap<FileType, ExtractFn> = HashMap::from([
            (FileType::Pdf, extract_pdf as ExtractFn),
            (FileType::Docx, extract_docx as ExtractFn),
            (FileType::Txt, extract_txt as ExtractFn),
            (FileType::Rtf, extract_rtf as ExtractFn),
        ]);
        Self { extractors }
    }

    /// Extracts plain text from `bytes`, choosing the parser by `file_name`'s extension.
    /// Blocking: PDF parsing is CPU-bound, call from `spawn_blocking`.
    pub fn extract_text(&self, bytes: &[u8], file_name: &str) -> Result<String, ExtractionError> {
        let file_type = FileType::from_file_name(file_name)?;
        let extract = self
            .extractors
            .get(&file_type)
            .ok_or_else(|| ExtractionError::UnsupportedFileType(file_type.to_string()))?;

        let text = extract(bytes)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ExtractionError::Empty);
        }
        Ok(text.to_string())
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractionError::Pdf(format!("{e:?}")))
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractionError> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| ExtractionError::Docx(e.to_string()))?;

    let paragraphs: Vec<String> = docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(paragraph) => Some(paragraph_text(paragraph)),
            _ => None,
        })
        .collect();

    Ok(paragraphs.join("\n"))
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        if let ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                match run_child {
                    RunChild::Text(t) => text.push_str(&t.text),
                    RunChild::Tab(_) => text.push('\t'),
                    RunChild::Break(_) => text.push('\n'),
                    _ => {}
                }
            }
        }
    }
    text
}

fn extract_txt(bytes: &[u8]) -> Result<String, ExtractionError> {
    let text = String::from_utf8_lossy(bytes);
    Ok(text.trim_start_matches('\u{feff}').to_string())
}

fn extract_rtf(bytes: &[u8]) -> Result<String, ExtractionError> {
    Ok(rtf_to_text(&String::from_utf8_lossy(bytes)))
}
