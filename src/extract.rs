// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Belief Diffusion Simulation Suite - Structured Payload Extraction
//
// Agent messages are free text with zero or more embedded JSON objects.
// Candidates are balanced `{...}` spans (braces inside strings count, as in
// a recursive-brace pattern). Only objects whose key set and value types
// match the schema exactly survive.

use serde_json::{Map, Value};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::belief::Schema;

/// Why a candidate payload was dropped. Never surfaced as an error: the
/// receiving agent simply keeps its belief.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionMismatch {
    #[error("could not parse a JSON string")]
    Unparseable,
    #[error("JSON value is not an object")]
    NotAnObject,
    #[error("received unexpected keys")]
    UnexpectedKeys,
    #[error("incorrect type for key '{0}'")]
    WrongType(String),
}

/// All well-typed payloads in `message`, in order of appearance.
pub fn extract_payloads(message: &str, schema: &Schema) -> Vec<Map<String, Value>> {
    brace_spans(message)
        .into_iter()
        .filter_map(|candidate| match check_payload(candidate, schema) {
            Ok(payload) => Some(payload),
            Err(reason) => {
                tracing::debug!(%reason, candidate, "dropped payload candidate");
                None
            }
        })
        .collect()
}

/// Validate one candidate against the schema.
pub fn check_payload(candidate: &str, schema: &Schema) -> Result<Map<String, Value>, ExtractionMismatch> {
    let value: Value = serde_json::from_str(candidate).map_err(|_| ExtractionMismatch::Unparseable)?;
    let Value::Object(map) = value else {
        return Err(ExtractionMismatch::NotAnObject);
    };
    let expected: BTreeSet<&str> = schema.iter().map(|(k, _)| k.as_str()).collect();
    let received: BTreeSet<&str> = map.keys().map(String::as_str).collect();
    if expected != received {
        return Err(ExtractionMismatch::UnexpectedKeys);
    }
    for (key, field_type) in schema {
        if !field_type.matches(&map[key]) {
            return Err(ExtractionMismatch::WrongType(key.clone()));
        }
    }
    Ok(map)
}

/// Leftmost balanced brace spans, non-overlapping. An unclosed `{` is skipped
/// and scanning resumes at the next character.
fn brace_spans(message: &str) -> Vec<&str> {
    let bytes = message.as_bytes();
    let mut spans = Vec::new();
    let mut start = 0;
    while start < bytes.len() {
        if bytes[start] != b'{' {
            start += 1;
            continue;
        }
        match closing_brace(bytes, start) {
            Some(end) => {
                spans.push(&message[start..=end]);
                start = end + 1;
            }
            None => start += 1,
        }
    }
    spans
}

fn closing_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, &b) in bytes[open..].iter().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}
