//! Document parser (C1): normalizes heterogeneous source files into a
//! uniform [`ParsedSource`], then checks the resulting corpus for
//! sufficiency before compilation proceeds.
//!
//! Grounded in `data_validator.py` from the original implementation: the
//! `MIN_ENTRIES`/`MIN_CHARACTERS` thresholds, the per-format parsing rules,
//! and the "proceed with a warning rather than fail" sufficiency policy are
//! carried over unchanged (see SPEC_FULL.md §4.1, §9).

mod traits;

pub use traits::{DocxTextExtractor, NullDocxTextExtractor, NullPdfTextExtractor, PdfTextExtractor};

use std::collections::BTreeMap;

use crate::config::EngineConfig;
use crate::error::{ParsingError, Result};

/// The recognized source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Comma-separated values, header row becomes field names.
    Csv,
    /// JSON array, or object wrapping one under `data`/`items`/`records`/`entries`.
    Json,
    /// PDF, text extracted via an injected [`PdfTextExtractor`].
    Pdf,
    /// DOCX, text extracted via an injected [`DocxTextExtractor`].
    Docx,
    /// Plain text, split into lines.
    Txt,
}

impl SourceFormat {
    /// Maps a file extension (case-insensitive, no leading dot) to a format.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }
}

/// A single structured record, e.g. one CSV row or one JSON array element.
pub type Entry = BTreeMap<String, String>;

/// A uniformly-shaped view of one parsed source file.
#[derive(Debug, Clone)]
pub struct ParsedSource {
    /// Detected format.
    pub format: SourceFormat,
    /// Structured records, when the format carries them (CSV/JSON).
    pub entries: Option<Vec<Entry>>,
    /// Flattened text representation, used by the chunker for unstructured
    /// sources and as a per-entry fallback description.
    pub text: String,
    /// Count of structured entries, or paragraph count for unstructured text.
    pub entries_count: usize,
    /// Originating file name.
    pub file_name: String,
}

impl ParsedSource {
    /// True when this source carries structured entries rather than free text.
    #[must_use]
    pub const fn is_structured(&self) -> bool {
        matches!(self.format, SourceFormat::Csv | SourceFormat::Json)
    }
}

/// Parses heterogeneous document bytes into a [`ParsedSource`].
///
/// PDF/DOCX extraction is delegated to injected trait objects since no
/// production-grade extraction crate sits in the teacher's or pack's
/// dependency stack (see DESIGN.md); callers without a real extractor can
/// pass [`traits::NullPdfTextExtractor`]/[`traits::NullDocxTextExtractor`]
/// and accept that those formats degrade to empty text.
pub struct DocumentParser {
    pdf_extractor: Box<dyn PdfTextExtractor>,
    docx_extractor: Box<dyn DocxTextExtractor>,
}

impl DocumentParser {
    /// Creates a parser with the given PDF/DOCX text extractors.
    #[must_use]
    pub fn new(pdf_extractor: Box<dyn PdfTextExtractor>, docx_extractor: Box<dyn DocxTextExtractor>) -> Self {
        Self {
            pdf_extractor,
            docx_extractor,
        }
    }

    /// Parses `bytes` named `file_name`, dispatching on its extension.
    ///
    /// # Errors
    ///
    /// Returns [`ParsingError::UnknownExtension`] for an unrecognized
    /// extension, or a format-specific parse error.
    pub fn parse(&self, bytes: &[u8], file_name: &str) -> Result<ParsedSource> {
        let ext = file_name.rsplit('.').next().unwrap_or("");
        let format = SourceFormat::from_extension(ext).ok_or_else(|| ParsingError::UnknownExtension {
            extension: ext.to_string(),
        })?;

        match format {
            SourceFormat::Csv => self.parse_csv(bytes, file_name),
            SourceFormat::Json => self.parse_json(bytes, file_name),
            SourceFormat::Pdf => self.parse_pdf(bytes, file_name),
            SourceFormat::Docx => self.parse_docx(bytes, file_name),
            SourceFormat::Txt => self.parse_txt(bytes, file_name),
        }
    }

    fn parse_csv(&self, bytes: &[u8], file_name: &str) -> Result<ParsedSource> {
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(bytes);
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| ParsingError::Csv {
                source: file_name.to_string(),
                reason: e.to_string(),
            })?
            .iter()
            .map(str::to_string)
            .collect();

        let mut entries = Vec::new();
        let mut text_parts = Vec::new();

        for (i, record) in reader.records().enumerate() {
            let record = record.map_err(|e| ParsingError::Csv {
                source: file_name.to_string(),
                reason: e.to_string(),
            })?;

            let mut entry = Entry::new();
            let mut parts = Vec::new();
            for (key, value) in headers.iter().zip(record.iter()) {
                if !value.trim().is_empty() {
                    entry.insert(key.clone(), value.to_string());
                    parts.push(format!("{key}={value}"));
                }
            }
            text_parts.push(format!("Entry {}: {}", i + 1, parts.join(", ")));
            entries.push(entry);
        }

        let entries_count = entries.len();
        Ok(ParsedSource {
            format: SourceFormat::Csv,
            entries: Some(entries),
            text: text_parts.join("\n"),
            entries_count,
            file_name: file_name.to_string(),
        })
    }

    fn parse_json(&self, bytes: &[u8], file_name: &str) -> Result<ParsedSource> {
        let value: serde_json::Value = serde_json::from_slice(bytes).map_err(|e| ParsingError::Csv {
            source: file_name.to_string(),
            reason: e.to_string(),
        })?;

        let records = extract_json_records(&value).ok_or_else(|| ParsingError::UnrecognizedJsonShape {
            source: file_name.to_string(),
        })?;

        let mut entries = Vec::with_capacity(records.len());
        let mut text_parts = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let entry = json_object_to_entry(record);
            let parts: Vec<String> = entry.iter().map(|(k, v)| format!("{k}={v}")).collect();
            text_parts.push(format!("Entry {}: {}", i + 1, parts.join(", ")));
            entries.push(entry);
        }

        let entries_count = entries.len();
        Ok(ParsedSource {
            format: SourceFormat::Json,
            entries: Some(entries),
            text: text_parts.join("\n"),
            entries_count,
            file_name: file_name.to_string(),
        })
    }

    fn parse_txt(&self, bytes: &[u8], file_name: &str) -> Result<ParsedSource> {
        let text = String::from_utf8_lossy(bytes).to_string();
        let entries_count = text.lines().filter(|l| !l.trim().is_empty()).count();
        Ok(ParsedSource {
            format: SourceFormat::Txt,
            entries: None,
            text,
            entries_count,
            file_name: file_name.to_string(),
        })
    }

    fn parse_pdf(&self, bytes: &[u8], file_name: &str) -> Result<ParsedSource> {
        let text = self.pdf_extractor.extract(bytes)?;
        let entries_count = text.split("\n\n").filter(|p| !p.trim().is_empty()).count();
        Ok(ParsedSource {
            format: SourceFormat::Pdf,
            entries: None,
            text,
            entries_count,
            file_name: file_name.to_string(),
        })
    }

    fn parse_docx(&self, bytes: &[u8], file_name: &str) -> Result<ParsedSource> {
        let text = self.docx_extractor.extract(bytes)?;
        let entries_count = text.split("\n\n").filter(|p| !p.trim().is_empty()).count();
        Ok(ParsedSource {
            format: SourceFormat::Docx,
            entries: None,
            text,
            entries_count,
            file_name: file_name.to_string(),
        })
    }
}

fn extract_json_records(value: &serde_json::Value) -> Option<Vec<serde_json::Value>> {
    match value {
        serde_json::Value::Array(arr) => Some(arr.clone()),
        serde_json::Value::Object(obj) => {
            for key in ["data", "items", "records", "entries"] {
                if let Some(serde_json::Value::Array(arr)) = obj.get(key) {
                    return Some(arr.clone());
                }
            }
            Some(vec![value.clone()])
        }
        _ => None,
    }
}

fn json_object_to_entry(value: &serde_json::Value) -> Entry {
    let mut entry = Entry::new();
    if let serde_json::Value::Object(obj) = value {
        for (k, v) in obj {
            let rendered = match v {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => continue,
                other => other.to_string(),
            };
            if !rendered.trim().is_empty() {
                entry.insert(k.clone(), rendered);
            }
        }
    }
    entry
}

/// Per-source parse statistics rolled up for sufficiency reporting.
#[derive(Debug, Clone, Default)]
pub struct SufficiencyStats {
    /// Sum of `entries_count` across all sources.
    pub total_entries: usize,
    /// Sum of text/entry character counts across all sources.
    pub total_characters: usize,
    /// Number of sources processed.
    pub source_count: usize,
}

/// Result of checking a compiled corpus against the sufficiency bar.
#[derive(Debug, Clone)]
pub struct SufficiencyReport {
    /// True when the corpus meets the entries-or-characters bar and every
    /// source parsed non-empty.
    pub sufficient: bool,
    /// Hard problems (empty source, parse failure already surfaced upstream).
    pub issues: Vec<String>,
    /// Soft problems (below threshold, but compilation still proceeds).
    pub warnings: Vec<String>,
    /// Rolled-up counts.
    pub stats: SufficiencyStats,
}

/// Checks parsed sources for sufficiency per `config`.
///
/// Sufficient iff `total_entries >= min_entries` OR
/// `total_characters >= min_characters`, and no source is empty.
#[must_use]
pub fn validate(sources: &[ParsedSource], config: &EngineConfig) -> SufficiencyReport {
    let mut issues = Vec::new();
    let mut warnings = Vec::new();
    let mut stats = SufficiencyStats {
        source_count: sources.len(),
        ..Default::default()
    };

    for source in sources {
        let chars = source.entries.as_ref().map_or(source.text.len(), |entries| {
            entries
                .iter()
                .map(|e| e.values().map(String::len).sum::<usize>())
                .sum()
        });
        stats.total_entries += source.entries_count;
        stats.total_characters += chars;

        if source.entries_count == 0 && chars == 0 {
            issues.push(format!("{} produced no usable content", source.file_name));
        }
    }

    let meets_bar = stats.total_entries >= config.min_entries || stats.total_characters >= config.min_characters;
    if !meets_bar {
        warnings.push(format!(
            "corpus has only {} entries and {} characters (need {} entries or {} characters)",
            stats.total_entries, stats.total_characters, config.min_entries, config.min_characters
        ));
    }

    SufficiencyReport {
        sufficient: issues.is_empty() && meets_bar,
        issues,
        warnings,
        stats,
    }
}
