/*!
 * Marker injection and full-document marker validation.
 *
 * Injection never edits the caller's document: it works on a copy and hands
 * it back only when the whole document validates.
 */

use log::{debug, info, warn};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::document::{Asset, AssetLedger, BlockKind, Document};
use crate::errors::MarkerInjectionError;
use crate::markers::{MARKER_REGEX, MarkerStats, extract_existing_markers, is_valid_marker, marker_candidates};

/// Writes `[[asset_id]]` markers for anchored assets into block text.
#[derive(Debug, Clone, Default)]
pub struct MarkerInjector;

impl MarkerInjector {
    pub fn new() -> Self {
        Self
    }

    /// Inject a marker for every anchored asset into its block.
    ///
    /// Markers already present in a block are kept and not inserted again, so
    /// injecting twice yields the same document. The result is validated as a
    /// whole and no document is returned when any marker is missing, duplicated
    /// across blocks, malformed or unknown to the ledger.
    pub fn inject(&self, document: &Document, ledger: &AssetLedger) -> Result<Document, MarkerInjectionError> {
        let mut by_block: BTreeMap<&str, Vec<&Asset>> = BTreeMap::new();
        for asset in ledger.anchored() {
            if let Some(block_id) = asset.anchor_to.as_deref() {
                by_block.entry(block_id).or_default().push(asset);
            }
        }

        let mut injected = document.clone();
        let mut rewritten = 0usize;

        for (block_id, mut assets) in by_block {
            assets.sort_by(|a, b| compare_marker_order(a, b));

            let Some(block) = injected.block_mut(block_id) else {
                warn!(
                    "{} asset(s) anchored to unknown block '{}'",
                    assets.len(),
                    block_id
                );
                continue;
            };

            let markers: Vec<String> = assets.iter().map(|a| a.marker()).collect();
            if let Some(text) = compose_text(block.kind, &block.text, &assets, &markers) {
                debug!("Injected {} marker(s) into block '{}'", markers.len(), block.id);
                block.text = text;
                rewritten += 1;
            }
        }

        let stats = self.validate(&injected, ledger)?;
        info!(
            "Marker injection complete: {} block(s) rewritten, {} marker(s) in {} block(s)",
            rewritten,
            stats.total_markers,
            stats.blocks_with_markers()
        );

        Ok(injected)
    }

    /// Check the marker invariants of a document against its ledger.
    ///
    /// Checks run in this order: malformed marker text, the same asset marked
    /// in two blocks, markers for assets absent from the ledger, anchored
    /// assets with no marker.
    pub fn validate(&self, document: &Document, ledger: &AssetLedger) -> Result<MarkerStats, MarkerInjectionError> {
        let mut locations: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for block in document.blocks() {
            for candidate in marker_candidates(&block.text) {
                if !is_valid_marker(candidate) {
                    return Err(MarkerInjectionError::MalformedMarker {
                        marker: candidate.to_string(),
                        block_id: block.id.clone(),
                    });
                }
            }

            for asset_id in extract_existing_markers(&block.text) {
                locations.entry(asset_id).or_default().push(block.id.clone());
            }
        }

        if let Some((asset_id, block_ids)) = locations.iter().find(|(_, blocks)| blocks.len() > 1) {
            return Err(MarkerInjectionError::DuplicateMarker {
                asset_id: asset_id.clone(),
                block_ids: block_ids.clone(),
            });
        }

        for (asset_id, block_ids) in &locations {
            if !ledger.contains(asset_id) {
                return Err(MarkerInjectionError::UnknownAsset {
                    asset_id: asset_id.clone(),
                    block_id: block_ids[0].clone(),
                });
            }
        }

        for asset in ledger.anchored() {
            let block_id = asset.anchor_to.clone().unwrap_or_default();
            let marked_in_anchor = locations
                .get(&asset.id)
                .is_some_and(|blocks| blocks.iter().any(|b| *b == block_id));
            if !marked_in_anchor {
                return Err(MarkerInjectionError::MissingMarker {
                    asset_id: asset.id.clone(),
                    block_id,
                });
            }
        }

        Ok(MarkerStats::collect(document))
    }
}

/// Top of page first, then left to right; ids keep the order total.
fn compare_marker_order(a: &Asset, b: &Asset) -> Ordering {
    a.rectangle
        .y0()
        .total_cmp(&b.rectangle.y0())
        .then(a.rectangle.x0().total_cmp(&b.rectangle.x0()))
        .then_with(|| a.id.cmp(&b.id))
}

/// Build the new text of a block, or `None` when every marker is already present.
fn compose_text(kind: BlockKind, text: &str, assets: &[&Asset], markers: &[String]) -> Option<String> {
    let present: BTreeSet<String> = extract_existing_markers(text).into_iter().collect();
    if assets.iter().all(|a| present.contains(&a.id)) {
        return None;
    }

    if kind == BlockKind::Figure {
        return Some(markers.join("\n"));
    }

    // Marker lines for these assets are rebuilt so the full set stays ordered.
    let own: BTreeSet<&str> = markers.iter().map(String::as_str).collect();
    let body = text
        .split('\n')
        .filter(|line| !own.contains(line.trim()))
        .collect::<Vec<_>>()
        .join("\n");

    let inline: BTreeSet<String> = MARKER_REGEX
        .captures_iter(&body)
        .map(|cap| cap[1].to_string())
        .collect();
    let lines: Vec<&str> = assets
        .iter()
        .zip(markers)
        .filter(|(asset, _)| !inline.contains(&asset.id))
        .map(|(_, marker)| marker.as_str())
        .collect();
    let marker_block = lines.join("\n");

    let composed = match kind {
        _ if body.is_empty() => marker_block,
        _ if marker_block.is_empty() => body,
        BlockKind::Heading => {
            let body = body.strip_suffix('\n').unwrap_or(&body);
            format!("{}\n{}", body, marker_block)
        }
        BlockKind::Paragraph | BlockKind::List | BlockKind::Table | BlockKind::Figure => {
            format!("{}\n{}", marker_block, body)
        }
    };

    Some(composed)
}
