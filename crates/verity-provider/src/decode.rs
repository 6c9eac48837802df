//! Typed decoder for the provider's verification response format
//!
//! The fact-check endpoint frequently answers with newline-delimited JSON
//! fragments emitted as the server works: progress notes, `verifying source`
//! announcements, and eventually a fragment whose `final` field holds a
//! JSON-*encoded* verdict object (a JSON string containing JSON). A trailing
//! fragment may carry the `task_id` assigned to the run.
//!
//! Fallback behavior, in order:
//! - a body that parses as one JSON value is treated as a single fragment
//! - fragments that do not parse are skipped with a debug log
//! - a body with no `final` fragment yields no verdict; the raw payload is
//!   preserved on the outcome either way

use serde_json::Value;
use tracing::debug;
use verity_domain::{Rating, Verdict};

/// The structured content recovered from one verification response
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedCheck {
    /// Verdict from the last `final` fragment, when one was present
    pub verdict: Option<Verdict>,

    /// `verifying source` values in arrival order
    pub verifying_sources: Vec<String>,

    /// Task identifier from the trailing fragment, when present
    pub task_id: Option<String>,

    /// The payload as parsed: one value, an array of fragments, or the raw
    /// body string when nothing parsed
    pub raw: Value,
}

/// Decode a verification response body
pub fn decode_check_response(body: &str) -> DecodedCheck {
    let fragments = parse_fragments(body);

    let raw = match fragments.len() {
        0 => Value::String(body.to_string()),
        1 => fragments[0].clone(),
        _ => Value::Array(fragments.clone()),
    };

    let mut verdict = None;
    let mut verifying_sources = Vec::new();

    for fragment in &fragments {
        if let Some(final_value) = fragment.get("final") {
            match parse_verdict(final_value) {
                Ok(parsed) => verdict = Some(parsed),
                Err(reason) => debug!("Skipping unusable final fragment: {}", reason),
            }
        }

        if let Some(source) = fragment.get("verifying source").and_then(Value::as_str) {
            verifying_sources.push(source.to_string());
        }
    }

    // The task id rides on the trailing fragment when the provider assigns one
    let task_id = fragments
        .iter()
        .rev()
        .find_map(|f| f.get("task_id").and_then(Value::as_str))
        .map(String::from);

    DecodedCheck {
        verdict,
        verifying_sources,
        task_id,
        raw,
    }
}

/// Split a body into parsed JSON fragments
fn parse_fragments(body: &str) -> Vec<Value> {
    let mut fragments = Vec::new();

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(value) => fragments.push(value),
            Err(e) => debug!("Skipping unparseable fragment: {}", e),
        }
    }

    // Pretty-printed single-object bodies span lines and parse as zero
    // fragments above; retry on the whole body before giving up.
    if fragments.is_empty() {
        if let Ok(value) = serde_json::from_str::<Value>(body.trim()) {
            fragments.push(value);
        }
    }

    fragments
}

/// Interpret a `final` field: either a JSON-encoded string or a plain object
fn parse_verdict(final_value: &Value) -> Result<Verdict, String> {
    let object = match final_value {
        Value::String(encoded) => {
            serde_json::from_str::<Value>(encoded).map_err(|e| format!("inner JSON: {}", e))?
        }
        Value::Object(_) => final_value.clone(),
        other => return Err(format!("unexpected final value type: {}", other)),
    };

    let map = object
        .as_object()
        .ok_or_else(|| "final payload is not an object".to_string())?;

    let classification = map
        .get("Classification")
        .or_else(|| map.get("classification"))
        .and_then(Value::as_str)
        .ok_or_else(|| "missing classification".to_string())?;

    let assessment = map
        .get("overall_assessment")
        .or_else(|| map.get("assessment"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let sources = map
        .get("sources")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(url) => Some(url.clone()),
                    Value::Object(fields) => fields
                        .get("url")
                        .and_then(Value::as_str)
                        .map(String::from),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(Verdict {
        rating: Rating::parse(classification),
        assessment,
        sources,
    })
}
