/*!
 * Reversible protection of fragile substrings.
 *
 * Before text is handed to a translator, substrings that must come back
 * byte-for-byte (asset markers, URLs, email addresses, formatted numbers)
 * are swapped for `<ph id="ID" />` tags. The mapping from id to literal
 * travels with the text and restores the literals after translation.
 *
 * Detection scans left to right. At each position every category looks for
 * its next match; the earliest one wins, then the longer, then the
 * higher-priority category, and the scan resumes where the winner ends.
 * Everything outside a span, including whitespace and newlines, is copied
 * untouched.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use url::Url;

use crate::errors::PlaceholderCodecError;
use crate::markers::MARKER_REGEX;

/// Placeholder id to original literal
pub type PlaceholderMap = BTreeMap<String, String>;

/// Prefix of placeholders standing for asset markers
pub const ASSET_PREFIX: &str = "ASSET_";

/// Prefix of sequential placeholders
pub const SEQUENTIAL_PREFIX: &str = "PH";

/// Placeholder tags, also matched when already present in source text.
/// Only spaces and tabs are allowed inside a tag so a tag never spans lines.
static PLACEHOLDER_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<ph[ \t]+id="([A-Za-z0-9_-]+)"[ \t]*/>"#).expect("Invalid placeholder tag regex")
});

static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https?://[^\s<>"]+"#).expect("Invalid URL regex")
});

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("Invalid email regex")
});

/// Numbers with at least one thousands or decimal separator.
/// A match that continues a digit run is rejected during the scan.
static NUMBER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d+(?:[.,]\d+)+").expect("Invalid number regex")
});

/// Category of a protected substring, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum FragileKind {
    /// Literal text that already looks like a placeholder tag
    Tag,
    AssetMarker,
    Url,
    Email,
    Number,
}

#[derive(Debug, Clone)]
struct Span {
    start: usize,
    end: usize,
    kind: FragileKind,
}

/// Text with its fragile substrings replaced by placeholder tags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectedText {
    /// Encoded text
    pub text: String,
    /// Placeholder id to original literal
    pub mapping: PlaceholderMap,
}

impl ProtectedText {
    /// Whether any substring was protected
    pub fn has_placeholders(&self) -> bool {
        !self.mapping.is_empty()
    }
}

/// Placeholder consistency of a translated string against its mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceholderCheck {
    /// Mapping ids that no longer appear in the text
    pub missing: Vec<String>,
    /// Ids in the text that the mapping does not know
    pub unknown: Vec<String>,
}

impl PlaceholderCheck {
    /// Check if every placeholder survived and none was invented
    pub fn passed(&self) -> bool {
        self.missing.is_empty() && self.unknown.is_empty()
    }
}

/// Encoder/decoder for placeholder-protected text.
///
/// Stateless; sequential ids restart at `PH001` on every `encode` call.
pub struct PlaceholderCodec;

impl PlaceholderCodec {
    /// Render the tag for a placeholder id
    pub fn tag(id: &str) -> String {
        format!("<ph id=\"{}\" />", id)
    }

    /// Placeholder id standing for an asset marker's asset id
    pub fn asset_placeholder_id(asset_id: &str) -> String {
        format!("{}{}", ASSET_PREFIX, asset_id.to_uppercase())
    }

    /// Replace fragile substrings with placeholder tags.
    ///
    /// `decode(encode(text))` always gives back `text`. Identical literals
    /// within one string share a single placeholder id.
    pub fn encode(text: &str) -> ProtectedText {
        let spans = Self::detect_spans(text);
        if spans.is_empty() {
            return ProtectedText {
                text: text.to_string(),
                mapping: PlaceholderMap::new(),
            };
        }

        let mut mapping = PlaceholderMap::new();
        let mut ids_by_literal: HashMap<&str, String> = HashMap::new();
        let mut next_sequential = 1usize;
        let mut encoded = String::with_capacity(text.len());
        let mut cursor = 0;

        for span in &spans {
            let literal = &text[span.start..span.end];
            let id = match ids_by_literal.get(literal) {
                Some(id) => id.clone(),
                None => {
                    let id = match span.kind {
                        FragileKind::AssetMarker => {
                            let asset_id = literal.trim_start_matches("[[").trim_end_matches("]]");
                            Self::asset_placeholder_id(asset_id)
                        }
                        _ => {
                            let id = format!("{}{:03}", SEQUENTIAL_PREFIX, next_sequential);
                            next_sequential += 1;
                            id
                        }
                    };
                    ids_by_literal.insert(literal, id.clone());
                    mapping.insert(id.clone(), literal.to_string());
                    id
                }
            };

            encoded.push_str(&text[cursor..span.start]);
            encoded.push_str(&Self::tag(&id));
            cursor = span.end;
        }
        encoded.push_str(&text[cursor..]);

        debug!("Protected {} substring(s) with {} placeholder(s)", spans.len(), mapping.len());

        ProtectedText {
            text: encoded,
            mapping,
        }
    }

    /// Restore the literals behind every placeholder tag.
    ///
    /// Fails on the first tag whose id is absent from the mapping rather than
    /// leave a raw tag in the output.
    pub fn decode(text: &str, mapping: &PlaceholderMap) -> Result<String, PlaceholderCodecError> {
        let mut decoded = String::with_capacity(text.len());
        let mut cursor = 0;

        for cap in PLACEHOLDER_TAG_REGEX.captures_iter(text) {
            let (Some(whole), Some(id)) = (cap.get(0), cap.get(1)) else {
                continue;
            };
            let literal = mapping.get(id.as_str()).ok_or_else(|| {
                PlaceholderCodecError::UnknownPlaceholder {
                    placeholder_id: id.as_str().to_string(),
                    segment_id: None,
                }
            })?;

            decoded.push_str(&text[cursor..whole.start()]);
            decoded.push_str(literal);
            cursor = whole.end();
        }
        decoded.push_str(&text[cursor..]);

        Ok(decoded)
    }

    /// Compare the placeholders of a translated string with its mapping
    pub fn verify(translated: &str, mapping: &PlaceholderMap) -> PlaceholderCheck {
        let found: BTreeSet<String> = Self::placeholder_ids(translated).into_iter().collect();

        PlaceholderCheck {
            missing: mapping
                .keys()
                .filter(|id| !found.contains(*id))
                .cloned()
                .collect(),
            unknown: found
                .iter()
                .filter(|id| !mapping.contains_key(*id))
                .cloned()
                .collect(),
        }
    }

    /// Placeholder ids in order of appearance, repeats included
    pub fn placeholder_ids(text: &str) -> Vec<String> {
        PLACEHOLDER_TAG_REGEX
            .captures_iter(text)
            .map(|cap| cap[1].to_string())
            .collect()
    }

    /// Apply `f` to the text between placeholder tags, leaving tags as they are
    pub fn map_unprotected<F>(text: &str, mut f: F) -> String
    where
        F: FnMut(&str) -> String,
    {
        let mut result = String::with_capacity(text.len());
        let mut cursor = 0;
        for tag in PLACEHOLDER_TAG_REGEX.find_iter(text) {
            result.push_str(&f(&text[cursor..tag.start()]));
            result.push_str(tag.as_str());
            cursor = tag.end();
        }
        result.push_str(&f(&text[cursor..]));
        result
    }

    /// Non-overlapping fragile spans, ordered by position
    fn detect_spans(text: &str) -> Vec<Span> {
        const KINDS: [FragileKind; 5] = [
            FragileKind::Tag,
            FragileKind::AssetMarker,
            FragileKind::Url,
            FragileKind::Email,
            FragileKind::Number,
        ];

        let mut spans: Vec<Span> = Vec::new();
        let mut pos = 0;
        while pos < text.len() {
            let next = KINDS
                .iter()
                .filter_map(|&kind| Self::next_match(text, pos, kind))
                .min_by(|a, b| {
                    a.start
                        .cmp(&b.start)
                        .then((b.end - b.start).cmp(&(a.end - a.start)))
                        .then(a.kind.cmp(&b.kind))
                });
            let Some(span) = next else {
                break;
            };
            pos = span.end;
            spans.push(span);
        }
        spans
    }

    /// First acceptable match of one category at or after `from`
    fn next_match(text: &str, mut from: usize, kind: FragileKind) -> Option<Span> {
        let regex: &Regex = match kind {
            FragileKind::Tag => &*PLACEHOLDER_TAG_REGEX,
            FragileKind::AssetMarker => &*MARKER_REGEX,
            FragileKind::Url => &*URL_REGEX,
            FragileKind::Email => &*EMAIL_REGEX,
            FragileKind::Number => &*NUMBER_REGEX,
        };

        while from <= text.len() {
            let m = regex.find_at(text, from)?;
            match kind {
                FragileKind::Url => {
                    let trimmed = trim_url(m.as_str());
                    if Url::parse(trimmed).is_ok() {
                        return Some(Span {
                            start: m.start(),
                            end: m.start() + trimmed.len(),
                            kind,
                        });
                    }
                    from = m.start() + 1;
                }
                FragileKind::Number if continues_digit_run(&text[..m.start()]) => {
                    from = m.end();
                }
                _ => {
                    return Some(Span {
                        start: m.start(),
                        end: m.end(),
                        kind,
                    });
                }
            }
        }
        None
    }
}

/// Whether text ending here leaves a number unfinished: a trailing digit,
/// or a separator right after a digit.
fn continues_digit_run(before: &str) -> bool {
    let mut tail = before.chars().rev();
    match tail.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('.' | ',') => tail.next().is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    }
}

/// Drop sentence punctuation that trails a URL. A closing parenthesis is kept
/// when the URL opens one itself.
fn trim_url(url: &str) -> &str {
    let mut trimmed = url;
    loop {
        let Some(last) = trimmed.chars().last() else {
            return trimmed;
        };
        let strip = match last {
            '.' | ',' | ';' | ':' | '!' | '?' | '\'' => true,
            ')' => trimmed.matches('(').count() < trimmed.matches(')').count(),
            _ => false,
        };
        if !strip {
            return trimmed;
        }
        trimmed = &trimmed[..trimmed.len() - last.len_utf8()];
    }
}
