// --- File: src/ingest/csv.rs
//! Reader for uploaded word files.
//!
//! The first line names the columns. Recognised columns are `grapheme`,
//! `phoneme`, `organized_grapheme`, `waw_o_exception_idx`, `silent_waw_idx`,
//! `unwritten_A_phone_idx`, `spoken_A_grapheme_idx`, `is_variant`,
//! `variant_num` and `variant_of_index`; anything else is ignored.

use crate::core::types::{BatchRecord, OrthographyHints, Variant};
use crate::error::{EngineError, Result};
use std::collections::HashMap;
use std::io::BufRead;

const GRAPHEME: &str = "grapheme";
const ORGANIZED: &str = "organized_grapheme";

/// Rows read from one file, before they reach the batch store.
#[derive(Debug, Default)]
pub struct ParsedFile {
    /// Valid rows with `row_index` assigned 1-based in file order.
    pub records: Vec<BatchRecord>,
    /// Rows dropped for lacking a grapheme or organized grapheme.
    pub invalid_rows: usize,
}

pub fn read_records<R: BufRead>(reader: R) -> Result<ParsedFile> {
    let mut lines = reader.lines();
    let mut header_lines = 0;

    let header = loop {
        match lines.next() {
            Some(line) => {
                let line = line?;
                header_lines += 1;
                if !line.trim().is_empty() {
                    break line;
                }
            }
            None => {
                return Err(EngineError::Csv { line: 1, reason: "missing header row".into() });
            }
        }
    };
    let columns: Vec<String> = split_line(header.trim_start_matches('\u{feff}'))
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();
    for required in [GRAPHEME, ORGANIZED] {
        if !columns.iter().any(|c| c == required) {
            return Err(EngineError::Csv {
                line: 1,
                reason: format!("missing required column '{required}'"),
            });
        }
    }

    let mut parsed = ParsedFile::default();
    // A quoted field may run over several physical lines.
    let mut pending = String::new();
    let mut started_at = 0;
    for (number, line) in lines.enumerate() {
        let line = line?;
        if pending.is_empty() {
            if line.trim().is_empty() {
                continue;
            }
            started_at = header_lines + number + 1;
            pending = line;
        } else {
            pending.push('\n');
            pending.push_str(&line);
        }
        if !quotes_balanced(&pending) {
            continue;
        }
        let line = std::mem::take(&mut pending);
        let values = split_line(&line);
        let row: HashMap<&str, &str> = columns
            .iter()
            .zip(values.iter())
            .map(|(c, v)| (c.as_str(), v.trim()))
            .collect();
        match to_record(&row, parsed.records.len() + 1) {
            Some(record) => parsed.records.push(record),
            None => parsed.invalid_rows += 1,
        }
    }
    if !pending.is_empty() {
        return Err(EngineError::Csv {
            line: started_at,
            reason: "quoted field is never closed".into(),
        });
    }
    Ok(parsed)
}

fn quotes_balanced(text: &str) -> bool {
    text.chars().filter(|&c| c == '"').count() % 2 == 0
}

fn to_record(row: &HashMap<&str, &str>, row_index: usize) -> Option<BatchRecord> {
    let field = |name: &str| row.get(name).copied().unwrap_or("");
    let grapheme = field(GRAPHEME);
    let organized = field(ORGANIZED);
    if grapheme.is_empty() || organized.is_empty() {
        return None;
    }

    let hints = OrthographyHints {
        exception_waw: OrthographyHints::parse_list(field("waw_o_exception_idx")),
        silent_waw: OrthographyHints::parse_list(field("silent_waw_idx")),
        spoken_a: OrthographyHints::parse_list(field("spoken_A_grapheme_idx")),
    };
    let mut record = BatchRecord::new(grapheme, organized, row_index).with_hints(hints);
    record.reference_phonemes = parse_phoneme_tuple(field("phoneme"));
    record.unwritten_a_phone_idx = OrthographyHints::parse_list(field("unwritten_A_phone_idx"));
    if field("is_variant").eq_ignore_ascii_case("true") {
        record.variant = Some(Variant {
            num: field("variant_num").parse().ok(),
            of_index: field("variant_of_index").parse().ok(),
        });
    }
    Some(record)
}

/// Splits one row on commas outside double quotes. A doubled quote inside a
/// quoted field is a literal quote; line breaks inside quotes are kept.
pub fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.trim_end_matches('\r').chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Reads a tuple literal such as `('k', 'A', 's', 'e')`.
pub fn parse_phoneme_tuple(text: &str) -> Vec<String> {
    let Some(open) = text.find('(') else {
        return Vec::new();
    };
    let Some(close) = text[open..].find(')') else {
        return Vec::new();
    };
    text[open + 1..open + close]
        .split(',')
        .map(|p| p.trim().replace('\'', ""))
        .filter(|p| !p.is_empty())
        .collect()
}
