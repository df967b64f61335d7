//! Multi-pass secret scrubbing for free text.
//!
//! Every detected secret is replaced by `[REDACTED_LEN:<n>]` and recorded in a
//! [`RedactionReport`] by length and SHA-256 only. The passes run in a fixed
//! order, each over the previous pass's output:
//!
//! 1. URL user-info (`scheme://user:pass@`)
//! 2. bearer tokens
//! 3. JSON `"key": "value"` pairs with a sensitive key
//! 4. header-like `Key: value` lines with a sensitive key
//! 5. generic `key=value` / `key:value` pairs with a sensitive key

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::hash::sha256_hex;

const PLACEHOLDER_PREFIX: &str = "[REDACTED_LEN:";

static SENSITIVE_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(token|secret|password|key|bearer|authorization)").unwrap());

static URL_USERINFO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([a-zA-Z][a-zA-Z0-9+.-]*://)([^/@\s:]+):([^@\s/]+)@").unwrap()
});

static BEARER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bbearer\s+([A-Za-z0-9._-]+)").unwrap());

static JSON_PAIR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)("?(?:token|secret|password|key|bearer|authorization)"?\s*:\s*)"([^"]*)""#)
        .unwrap()
});

static HEADER_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mR)^([ \t]*[A-Za-z0-9_.-]+):[ \t]*(.+)$").unwrap());

static KEY_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(token|secret|password|key|bearer|authorization)\s*[:=]\s*([^\s"'\]]+)"#)
        .unwrap()
});

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[REDACTED_LEN:\d+\]").unwrap());

/// Which pass caught a secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedactionType {
    UrlUserinfo,
    Bearer,
    JsonValue,
    Header,
    KeyValue,
}

/// Plaintext-free record of one redaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionExample {
    pub field: String,
    pub redaction_type: RedactionType,
    pub length: usize,
    pub hash: String,
}

/// Accumulates across every field redacted during one run. Never reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionReport {
    pub redacted_fields: BTreeSet<String>,
    pub counts: BTreeMap<String, usize>,
    pub examples: Vec<RedactionExample>,
}

impl RedactionReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Total redactions across all fields.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    fn record(&mut self, field: &str, redaction_type: RedactionType, secret: &str) {
        self.redacted_fields.insert(field.to_string());
        *self.counts.entry(field.to_string()).or_insert(0) += 1;
        self.examples.push(RedactionExample {
            field: field.to_string(),
            redaction_type,
            length: secret.chars().count(),
            hash: sha256_hex(secret),
        });
    }
}

/// Length-preserving, content-free stand-in for a secret.
pub fn placeholder(secret: &str) -> String {
    format!("{PLACEHOLDER_PREFIX}{}]", secret.chars().count())
}

/// Scrub `text`, recording every redaction under `field` in `report`.
pub fn redact(text: &str, field: &str, report: &mut RedactionReport) -> String {
    let out = redact_url_userinfo(text, field, report);
    let out = redact_bearer_tokens(&out, field, report);
    let out = redact_json_pairs(&out, field, report);
    let out = redact_header_lines(&out, field, report);
    let out = redact_key_values(&out, field, report);
    out.into_owned()
}

/// True when `value` holds nothing but placeholders (plus quoting and an
/// optional `bearer` scheme word), i.e. an earlier pass already scrubbed it.
fn is_redacted(value: &str) -> bool {
    if !value.contains(PLACEHOLDER_PREFIX) {
        return false;
    }
    let rest = PLACEHOLDER_RE.replace_all(value, "");
    let rest = rest.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, '"' | '\'' | ',' | '{' | '}' | '[')
    });
    rest.is_empty() || rest.eq_ignore_ascii_case("bearer")
}

fn redact_url_userinfo<'t>(
    text: &'t str,
    field: &str,
    report: &mut RedactionReport,
) -> Cow<'t, str> {
    URL_USERINFO_RE.replace_all(text, |caps: &Captures| {
        let userinfo = format!("{}:{}", &caps[2], &caps[3]);
        report.record(field, RedactionType::UrlUserinfo, &userinfo);
        format!("{}[REDACTED]@", &caps[1])
    })
}

fn redact_bearer_tokens<'t>(
    text: &'t str,
    field: &str,
    report: &mut RedactionReport,
) -> Cow<'t, str> {
    BEARER_RE.replace_all(text, |caps: &Captures| {
        let token = &caps[1];
        if token.starts_with(PLACEHOLDER_PREFIX) {
            return caps[0].to_string();
        }
        report.record(field, RedactionType::Bearer, token);
        format!("bearer {}", placeholder(token))
    })
}

fn redact_json_pairs<'t>(
    text: &'t str,
    field: &str,
    report: &mut RedactionReport,
) -> Cow<'t, str> {
    JSON_PAIR_RE.replace_all(text, |caps: &Captures| {
        let value = &caps[2];
        if is_redacted(value) {
            return caps[0].to_string();
        }
        report.record(field, RedactionType::JsonValue, value);
        format!("{}\"{}\"", &caps[1], placeholder(value))
    })
}

fn redact_header_lines<'t>(
    text: &'t str,
    field: &str,
    report: &mut RedactionReport,
) -> Cow<'t, str> {
    HEADER_LINE_RE.replace_all(text, |caps: &Captures| {
        let key = &caps[1];
        let value = &caps[2];
        if !SENSITIVE_KEY_RE.is_match(key) || is_redacted(value) {
            return caps[0].to_string();
        }
        report.record(field, RedactionType::Header, value);
        format!("{key}: {}", placeholder(value))
    })
}

fn redact_key_values<'t>(
    text: &'t str,
    field: &str,
    report: &mut RedactionReport,
) -> Cow<'t, str> {
    KEY_VALUE_RE.replace_all(text, |caps: &Captures| {
        let value = &caps[2];
        if value.starts_with(PLACEHOLDER_PREFIX) || is_redacted(value) {
            return caps[0].to_string();
        }
        // `Authorization: bearer [REDACTED_LEN:n]` was scrubbed by the bearer pass.
        let rest = &text[caps.get(0).map_or(text.len(), |m| m.end())..];
        if value.eq_ignore_ascii_case("bearer") && rest.trim_start().starts_with(PLACEHOLDER_PREFIX)
        {
            return caps[0].to_string();
        }
        report.record(field, RedactionType::KeyValue, value);
        format!("{}={}", &caps[1], placeholder(value))
    })
}
