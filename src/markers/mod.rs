/*!
 * Asset markers embedded in block text.
 *
 * A marker `[[asset_id]]` on its own line records that an asset is anchored
 * to the block holding it. This module provides:
 * - `injector`: writes markers into blocks and validates the whole document
 * - read-only helpers to find and count markers, used by validation and
 *   by reporting
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::document::Document;

pub mod injector;

pub use injector::MarkerInjector;

/// Regex for well-formed markers, capturing the asset id
pub static MARKER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\[([a-z]+(?:-[a-z0-9]+)*-p\d+-occ\d+)\]\]").expect("Invalid marker regex")
});

/// Regex for the exact marker format
static MARKER_FORMAT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[\[[a-z]+(-[a-z0-9]+)*-p\d+-occ\d+\]\]$").expect("Invalid marker format regex")
});

/// Regex for anything that looks like a marker, well-formed or not
static MARKER_CANDIDATE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\[[^\[\]\n]*\]\]").expect("Invalid marker candidate regex")
});

/// Whether a marker text follows the `[[type-hash-pN-occN]]` format
pub fn is_valid_marker(marker: &str) -> bool {
    MARKER_FORMAT_REGEX.is_match(marker)
}

/// Asset ids of the well-formed markers in a block text, in order of first appearance
pub fn extract_existing_markers(text: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for cap in MARKER_REGEX.captures_iter(text) {
        let id = &cap[1];
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
    }
    ids
}

/// All marker-like tokens in a text, including malformed ones
pub fn marker_candidates(text: &str) -> Vec<&str> {
    MARKER_CANDIDATE_REGEX.find_iter(text).map(|m| m.as_str()).collect()
}

/// Number of well-formed marker occurrences across the whole document
pub fn count_markers(document: &Document) -> usize {
    document
        .blocks()
        .map(|b| MARKER_REGEX.find_iter(&b.text).count())
        .sum()
}

/// Marker statistics for reporting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerStats {
    /// Total well-formed marker occurrences
    pub total_markers: usize,
    /// Marker occurrences per block, only blocks holding at least one
    pub per_block: BTreeMap<String, usize>,
}

impl MarkerStats {
    /// Collect marker statistics for a document.
    pub fn collect(document: &Document) -> Self {
        let per_block: BTreeMap<String, usize> = document
            .blocks()
            .map(|b| (b.id.clone(), MARKER_REGEX.find_iter(&b.text).count()))
            .filter(|(_, count)| *count > 0)
            .collect();

        Self {
            total_markers: per_block.values().sum(),
            per_block,
        }
    }

    pub fn blocks_with_markers(&self) -> usize {
        self.per_block.len()
    }
}
