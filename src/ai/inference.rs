use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{types::clamp_confidence, WasteImage};

pub const TRASH_TYPES: &[&str] = &[
    "plastic",
    "paper",
    "glass",
    "metal",
    "organic",
    "battery",
    "electronic",
    "textile",
    "hazardous",
    "other",
];

const FALLBACK_TYPE: &str = "other";
const KEYWORD_MATCH_CONFIDENCE: f32 = 0.6;
const NO_MATCH_CONFIDENCE: f32 = 0.5;
const DESCRIPTION_MAX_CHARS: usize = 280;

const CLASSIFY_PROMPT: &str = r#"You are a waste sorting assistant for a litter-collection app. Look at the photo and identify the single most prominent piece of trash.
Answer with ONLY a JSON object, no markdown, in exactly this shape:
{"trash_type": "<one of: plastic, paper, glass, metal, organic, battery, electronic, textile, hazardous, other>", "confidence": <number between 0 and 1>, "description": "<one short sentence describing the item and how to dispose of it>"}
If you cannot recognise any trash, use "other" with a low confidence."#;

/// Checked in order; hazardous types come first so "battery in a plastic bag"
/// is not filed as plastic.
const KEYWORDS: &[(&str, &[&str])] = &[
    ("battery", &["battery", "batteries", "baterai", "accumulator"]),
    (
        "electronic",
        &["electronic", "e-waste", "circuit", "phone", "cable", "charger"],
    ),
    (
        "hazardous",
        &["hazardous", "chemical", "syringe", "medicine", "paint", "toxic", "b3"],
    ),
    (
        "plastic",
        &["plastic", "bottle", "plastik", "straw", "wrapper", "styrofoam", "sachet"],
    ),
    ("glass", &["glass", "jar", "kaca", "beling"]),
    (
        "metal",
        &["metal", "cans", "tin can", "soda can", "aluminium", "aluminum", "tin", "logam", "kaleng"],
    ),
    ("paper", &["paper", "cardboard", "carton", "kertas", "kardus", "newspaper"]),
    ("textile", &["textile", "cloth", "fabric", "shirt", "shoe", "kain"]),
    (
        "organic",
        &["organic", "food", "fruit", "vegetable", "leaf", "leaves", "peel", "organik", "daun"],
    ),
];

/// Short keywords must match a whole word; longer ones also match as a prefix
/// ("bottle" matches "bottles").
static KEYWORD_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    KEYWORDS
        .iter()
        .map(|(trash_type, keywords)| {
            let alternatives = keywords
                .iter()
                .map(|keyword| {
                    let escaped = regex::escape(keyword);
                    if keyword.len() > 3 {
                        format!("{escaped}[\\w-]*")
                    } else {
                        escaped
                    }
                })
                .collect::<Vec<_>>()
                .join("|");
            let pattern = Regex::new(&format!(r"(?i)\b(?:{alternatives})\b"))
                .expect("valid keyword regex");
            (*trash_type, pattern)
        })
        .collect()
});

/// The cloud classifier's answer, already normalised.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteClassification {
    pub trash_type: String,
    pub confidence: f32,
    pub description: Option<String>,
}

pub fn build_request(image: &WasteImage) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![
                Part::Text {
                    text: CLASSIFY_PROMPT.to_string(),
                },
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: image.mime_type.clone(),
                        data: STANDARD.encode(&image.bytes),
                    },
                },
            ],
        }],
        generation_config: GenerationConfig {
            temperature: 0.2,
            max_output_tokens: 256,
            response_mime_type: "application/json".into(),
        },
    }
}

pub fn response_text(response: GenerateContentResponse) -> Result<String> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .context("generative response did not contain any candidates")?;

    let text = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .filter(|text| !text.trim().is_empty())
        .context("generative response missing text content")?;
    Ok(text)
}

/// Never fails: malformed answers degrade to a keyword guess.
pub fn parse_classification(text: &str) -> RemoteClassification {
    if let Some(parsed) = extract_json_object(text).and_then(parse_json_answer) {
        return parsed;
    }

    tracing::warn!(
        target: "ai",
        response = %truncate(text, 120),
        "classifier response was not valid JSON; falling back to keyword matching"
    );
    let description = Some(truncate(text.trim(), DESCRIPTION_MAX_CHARS)).filter(|d| !d.is_empty());
    match keyword_guess(text) {
        Some(trash_type) => RemoteClassification {
            trash_type: trash_type.to_string(),
            confidence: KEYWORD_MATCH_CONFIDENCE,
            description,
        },
        None => RemoteClassification {
            trash_type: FALLBACK_TYPE.to_string(),
            confidence: NO_MATCH_CONFIDENCE,
            description,
        },
    }
}

fn parse_json_answer(raw: &str) -> Option<RemoteClassification> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;

    let label = ["trash_type", "type", "category", "label"]
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))?;

    let confidence = match object.get("confidence") {
        Some(Value::Number(n)) => n.as_f64().map(|v| v as f32),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').parse::<f32>().ok(),
        _ => None,
    }
    .map(normalize_confidence)
    .unwrap_or(NO_MATCH_CONFIDENCE);

    let description = object
        .get("description")
        .and_then(Value::as_str)
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    Some(RemoteClassification {
        trash_type: validate_trash_type(label),
        confidence,
        description,
    })
}

fn normalize_confidence(value: f32) -> f32 {
    if value > 1.0 && value <= 100.0 {
        clamp_confidence(value / 100.0)
    } else {
        clamp_confidence(value)
    }
}

fn validate_trash_type(label: &str) -> String {
    let normalized = label.trim().to_lowercase();
    if TRASH_TYPES.contains(&normalized.as_str()) {
        normalized
    } else {
        tracing::info!(target: "ai", label = %label, "unexpected trash_type; using \"other\"");
        FALLBACK_TYPE.to_string()
    }
}

fn keyword_guess(text: &str) -> Option<&'static str> {
    KEYWORD_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(text))
        .map(|(trash_type, _)| *trash_type)
}

/// Returns the first balanced `{...}` span, ignoring braces inside string
/// literals.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub response_mime_type: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
pub struct CandidatePart {
    pub text: Option<String>,
}
