//! Survey-file field extraction.
//!
//! A survey file carries a flat extended-data section of
//! `<Data name="..."><value>...</value></Data>` entries (tags may be
//! namespace-prefixed). Exactly two facts are needed from it: the sprayed
//! height and the flight identifier. When no flight entry is present, the
//! identifier is derived from the trailing underscore-delimited segment of
//! the file's base name (`SITE_20240101_R99.ext` → `R99`).
//!
//! Extraction failures are per-file: callers report and skip, they never
//! abort a batch.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// The two fields a survey file contributes to a height update.
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyFields {
    pub height: f64,
    pub flight_id: String,
}

/// All errors that can arise from extracting one survey file.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Underlying I/O failure reading the file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No height entry in the extended-data section.
    #[error("no height entry in extended data")]
    MissingHeight,

    /// A height entry was present but did not parse as a number.
    #[error("height value '{value}' is not a number")]
    BadHeight { value: String },

    /// Neither an extended-data entry nor the file name yields a flight id.
    #[error("cannot determine flight id from payload or file name")]
    MissingFlightId,
}

/// Extract `(height, flight_id)` from the survey file at `path`.
pub fn extract(path: &Path) -> Result<SurveyFields, ExtractError> {
    let payload = std::fs::read_to_string(path).map_err(|e| ExtractError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    extract_from_payload(&payload, &file_name)
}

/// Extract from an already-read payload; `file_name` feeds the fallback.
pub fn extract_from_payload(
    payload: &str,
    file_name: &str,
) -> Result<SurveyFields, ExtractError> {
    let entries = data_entries(payload);

    let height_raw = entries
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("height"))
        .map(|(_, value)| value.as_str())
        .ok_or(ExtractError::MissingHeight)?;
    let height: f64 = height_raw
        .trim()
        .parse()
        .map_err(|_| ExtractError::BadHeight {
            value: height_raw.to_string(),
        })?;

    let flight_id = entries
        .iter()
        .find(|(name, value)| is_flight_entry(name) && !value.trim().is_empty())
        .map(|(_, value)| value.trim().to_string())
        .or_else(|| flight_id_from_file_name(file_name))
        .ok_or(ExtractError::MissingFlightId)?;

    Ok(SurveyFields { height, flight_id })
}

fn is_flight_entry(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.contains("flightid") || lower.contains("flight_controller_id")
}

/// Trailing underscore-delimited segment of the base name, if any.
fn flight_id_from_file_name(file_name: &str) -> Option<String> {
    let base = file_name
        .rsplit_once('.')
        .map(|(base, _ext)| base)
        .unwrap_or(file_name);
    let segment = base.rsplit('_').next().unwrap_or(base).trim();
    if segment.is_empty() {
        None
    } else {
        Some(segment.to_string())
    }
}

// ---------------------------------------------------------------------------
// Extended-data scan
// ---------------------------------------------------------------------------

/// Collect `(name, value)` pairs from every `<Data name="...">` element.
///
/// The grammar is flat and fixed, so this is a tag scan rather than a full
/// XML parse. Namespace prefixes on `Data` and `value` are tolerated.
fn data_entries(payload: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut pos = 0;
    while let Some(open) = payload[pos..].find('<') {
        let tag_start = pos + open + 1;
        let Some(close) = payload[tag_start..].find('>') else {
            break;
        };
        let tag_end = tag_start + close;
        let tag = &payload[tag_start..tag_end];
        pos = tag_end + 1;

        let Some((elem, attrs)) = split_tag(tag) else {
            continue;
        };
        if !is_element(elem, "Data") {
            continue;
        }
        let Some(name) = attr_value(attrs, "name") else {
            continue;
        };
        if let Some(value) = value_text(&payload[pos..]) {
            out.push((name, value));
        }
    }
    out
}

/// First child element named `value` inside the current `Data` element.
fn value_text(rest: &str) -> Option<String> {
    let mut pos = 0;
    while let Some(open) = rest[pos..].find('<') {
        let tag_start = pos + open + 1;
        let close = rest[tag_start..].find('>')?;
        let tag_end = tag_start + close;
        let tag = &rest[tag_start..tag_end];
        pos = tag_end + 1;

        let elem = tag.split(char::is_whitespace).next().unwrap_or(tag);
        if let Some(closing) = elem.strip_prefix('/') {
            if is_element(closing, "Data") {
                return None;
            }
            continue;
        }
        if is_element(elem, "Data") {
            // next entry began without a value child
            return None;
        }
        if is_element(elem, "value") {
            let text_end = pos + rest[pos..].find('<')?;
            return Some(rest[pos..text_end].trim().to_string());
        }
    }
    None
}

fn is_element(elem: &str, name: &str) -> bool {
    elem == name || (elem.ends_with(name) && elem[..elem.len() - name.len()].ends_with(':'))
}

fn split_tag(tag: &str) -> Option<(&str, &str)> {
    let idx = tag.find(char::is_whitespace)?;
    Some((&tag[..idx], &tag[idx + 1..]))
}

fn attr_value(attrs: &str, key: &str) -> Option<String> {
    let needle = format!("{key}=\"");
    let start = attrs.find(&needle)? + needle.len();
    let rest = &attrs[start..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
