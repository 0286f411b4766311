//! Bullet extraction from model output.
//!
//! Strategies are tried in a fixed order: strict JSON, then salvage of
//! truncated or misshapen JSON, then line splitting. The first strategy that
//! yields a result wins.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::warn;

/// One way of turning raw model output into bullets.
pub trait BulletStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `None` means this strategy does not recognise the output.
    fn parse(&self, raw: &str) -> Option<Vec<String>>;
}

/// Strict `{"bullets": ["..."]}` output, optionally inside a code fence.
pub struct JsonBullets;

#[derive(Deserialize)]
struct BulletsPayload {
    bullets: Vec<String>,
}

impl BulletStrategy for JsonBullets {
    fn name(&self) -> &'static str {
        "json"
    }

    fn parse(&self, raw: &str) -> Option<Vec<String>> {
        let payload: BulletsPayload = serde_json::from_str(strip_code_fence(raw)).ok()?;
        let bullets: Vec<String> = payload
            .bullets
            .into_iter()
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .collect();
        (!bullets.is_empty()).then_some(bullets)
    }
}

/// JSON-looking output that does not parse, usually cut off by the token
/// limit. Keeps the complete string values and drops object keys, so JSON
/// syntax never leaks into a bullet.
pub struct PartialJson;

static STRING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""((?:[^"\\]|\\.)*)"(\s*:)?"#).unwrap());

impl BulletStrategy for PartialJson {
    fn name(&self) -> &'static str {
        "partial-json"
    }

    fn parse(&self, raw: &str) -> Option<Vec<String>> {
        let body = strip_code_fence(raw);
        let start = if body.starts_with('[') {
            0
        } else {
            body.find('{')?
        };
        let body = &body[start..];
        if !body.starts_with('[') && !body.contains("\"bullets\"") {
            return None;
        }

        let bullets = STRING_RE
            .captures_iter(body)
            .filter(|cap| cap.get(2).is_none())
            .filter_map(|cap| {
                let literal = cap.get(0)?.as_str();
                serde_json::from_str::<String>(literal).ok()
            })
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .collect();
        Some(bullets)
    }
}

/// One bullet per non-blank line, with list markers removed.
pub struct LineSplit;

static MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-•*]+|\d{1,3}[.)])\s*").unwrap());

impl BulletStrategy for LineSplit {
    fn name(&self) -> &'static str {
        "lines"
    }

    fn parse(&self, raw: &str) -> Option<Vec<String>> {
        let bullets = raw
            .lines()
            .map(|line| MARKER_RE.replace(line.trim(), "").trim().to_string())
            .filter(|line| !line.is_empty() && !line.ends_with(':'))
            .collect();
        Some(bullets)
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.strip_prefix("json").unwrap_or(body);
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parse `raw` with the default strategy order and keep at most `max` bullets.
///
/// Never pads: a short answer stays short. Returns the bullets and the name of
/// the strategy that produced them.
pub fn extract_bullets(raw: &str, max: usize) -> (Vec<String>, &'static str) {
    let strategies: [&dyn BulletStrategy; 3] = [&JsonBullets, &PartialJson, &LineSplit];
    for (i, strategy) in strategies.iter().enumerate() {
        if let Some(mut bullets) = strategy.parse(raw) {
            if i > 0 {
                warn!("Structured bullet output unparseable, used {} fallback", strategy.name());
            }
            bullets.truncate(max);
            return (bullets, strategy.name());
        }
    }
    (Vec::new(), "none")
}
