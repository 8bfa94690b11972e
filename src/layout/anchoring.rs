/*!
 * Asset anchoring.
 *
 * Binds every visual asset to the content block it belongs with, so that
 * the asset can be re-placed next to the same text after translation.
 * The search is constrained to the asset's column:
 * 1. the column containing the asset's horizontal centre, or the column
 *    sharing the most horizontal extent with it when it straddles a gutter
 * 2. inside that column, the block sharing the most vertical extent wins
 * 3. without vertical overlap, the vertically closest block wins, a block
 *    below the asset beating an equally distant block above it
 *
 * When the column holds no block the search widens to every block and uses
 * plain distance, so an asset is never left unanchored while blocks exist.
 */

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::document::{Asset, AssetLedger, ContentBlock, Document};
use crate::errors::{AnchorError, GeometryError};
use crate::geometry::{NormalizedRect, Rect};
use crate::layout::columns::{Column, ColumnLayout};

/// Default absolute tolerance for geometry preservation, in points
pub const DEFAULT_TOLERANCE_PT: f64 = 2.0;

/// Default tolerance relative to the asset width
pub const DEFAULT_TOLERANCE_PCT: f64 = 0.01;

/// Distances closer than this are treated as equal
const TIE_EPSILON: f64 = 1e-9;

/// Express a rectangle relative to the bounds of a column.
///
/// Components may fall outside `[0, 1]` for a rectangle reaching past the
/// column edges; they are left unclamped so deviations stay measurable.
pub fn normalize(rect: &Rect, column: &Column) -> Result<NormalizedRect, GeometryError> {
    let width = column.width();
    let height = column.height();
    if !(width > 0.0) || !(height > 0.0) {
        return Err(GeometryError::ZeroAreaColumn {
            column_id: column.id.clone(),
            width,
            height,
        });
    }

    Ok(NormalizedRect {
        x: (rect.x0() - column.x_min) / width,
        y: (rect.y0() - column.y_min) / height,
        w: rect.width() / width,
        h: rect.height() / height,
    })
}

/// Check that a placed rectangle keeps the original's position within a column.
///
/// The deviation between both normalized positions is scaled back to points
/// and accepted when it stays within the more lenient of `tolerance_pt` and
/// `tolerance_pct` of the original width.
pub fn check_geometry_preserved(
    original: &Rect,
    placed: &Rect,
    column: &Column,
    tolerance_pt: f64,
    tolerance_pct: f64,
) -> Result<bool, GeometryError> {
    let before = normalize(original, column)?;
    let after = normalize(placed, column)?;
    let deviation = before.deviation_pt(&after, column.width(), column.height());
    let allowed = tolerance_pt.max(tolerance_pct * original.width());

    debug!(
        "Geometry deviation {:.3}pt against allowed {:.3}pt in column {}",
        deviation, allowed, column.id
    );

    Ok(deviation <= allowed)
}

/// How an anchor was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorMethod {
    /// Same-column block sharing vertical extent with the asset
    VerticalOverlap,
    /// Same-column block closest vertically
    VerticalDistance,
    /// No same-column block, closest block on the page
    Widened,
    /// No placed block on the page, nearest block by page and reading order
    ReadingOrder,
}

/// Result of an anchor search
#[derive(Debug, Clone, Copy)]
pub struct AnchorChoice<'a> {
    pub block: &'a ContentBlock,
    pub column: Option<&'a Column>,
    pub method: AnchorMethod,
}

/// One asset-to-block binding, as recorded in the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorRecord {
    pub asset_id: String,
    pub block_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_id: Option<String>,
    pub method: AnchorMethod,
    /// Asset position relative to its column
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized: Option<NormalizedRect>,
}

/// Statistics of an anchoring run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnchorReport {
    pub records: Vec<AnchorRecord>,
    /// Assets anchored outside their column
    pub fallback_count: usize,
    /// Pages of the ledger that carry no asset
    pub pages_without_assets: Vec<u32>,
    /// Assets left unanchored because the document has no block
    pub unanchored: Vec<String>,
}

impl AnchorReport {
    pub fn anchored_count(&self) -> usize {
        self.records.len()
    }

    pub fn record(&self, asset_id: &str) -> Option<&AnchorRecord> {
        self.records.iter().find(|r| r.asset_id == asset_id)
    }
}

/// Assigns assets to content blocks.
#[derive(Debug, Clone)]
pub struct AssetAnchorer {
    tolerance_pt: f64,
    tolerance_pct: f64,
}

impl Default for AssetAnchorer {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE_PT, DEFAULT_TOLERANCE_PCT)
    }
}

impl AssetAnchorer {
    pub fn new(tolerance_pt: f64, tolerance_pct: f64) -> Self {
        Self {
            tolerance_pt,
            tolerance_pct,
        }
    }

    /// Geometry check using this anchorer's tolerances.
    pub fn geometry_preserved(&self, original: &Rect, placed: &Rect, column: &Column) -> Result<bool, GeometryError> {
        check_geometry_preserved(original, placed, column, self.tolerance_pt, self.tolerance_pct)
    }

    /// Pick the column an asset belongs to.
    ///
    /// A centre lying on the shared edge of two columns goes to the lower index.
    pub fn select_column<'c>(rect: &Rect, columns: &'c [Column]) -> Option<&'c Column> {
        let center = rect.center_x();
        if let Some(column) = columns.iter().find(|c| c.contains_x(center)) {
            return Some(column);
        }

        let mut best: Option<(&Column, f64)> = None;
        for column in columns {
            let overlap = column.horizontal_overlap(rect);
            if overlap <= 0.0 {
                continue;
            }
            match best {
                Some((_, best_overlap)) if overlap <= best_overlap + TIE_EPSILON => {}
                _ => best = Some((column, overlap)),
            }
        }
        best.map(|(column, _)| column)
    }

    /// Find the block an asset should be anchored to.
    ///
    /// `candidates` are the blocks of the document and `columns` the columns
    /// of the asset's page. Returns `None` only when there is no candidate.
    pub fn find_anchor<'a>(
        &self,
        asset: &Asset,
        candidates: &[&'a ContentBlock],
        columns: &'a [Column],
    ) -> Option<AnchorChoice<'a>> {
        if candidates.is_empty() {
            return None;
        }

        let rect = &asset.rectangle;
        let column = Self::select_column(rect, columns);

        if let Some(column) = column {
            let in_column: Vec<(&'a ContentBlock, Rect)> = candidates
                .iter()
                .filter(|b| b.page == asset.page && column.contains_block(&b.id))
                .filter_map(|b| b.rectangle.map(|r| (*b, r)))
                .collect();

            if let Some(choice) = Self::best_in_column(rect, &in_column) {
                return Some(AnchorChoice {
                    block: choice.0,
                    column: Some(column),
                    method: choice.1,
                });
            }
            debug!("Column {} holds no placed block for asset {}", column.id, asset.id);
        }

        let on_page: Vec<(&'a ContentBlock, Rect)> = candidates
            .iter()
            .filter(|b| b.page == asset.page)
            .filter_map(|b| b.rectangle.map(|r| (*b, r)))
            .collect();

        if let Some(block) = Self::closest(rect, &on_page) {
            return Some(AnchorChoice {
                block,
                column,
                method: AnchorMethod::Widened,
            });
        }

        Self::nearest_in_reading_order(asset.page, candidates).map(|block| AnchorChoice {
            block,
            column,
            method: AnchorMethod::ReadingOrder,
        })
    }

    /// Write the anchor of an asset; an asset can only be anchored once.
    pub fn anchor(asset: &mut Asset, block_id: &str) -> Result<(), AnchorError> {
        if let Some(existing) = &asset.anchor_to {
            return Err(AnchorError::AlreadyAnchored {
                asset_id: asset.id.clone(),
                block_id: existing.clone(),
            });
        }
        asset.anchor_to = Some(block_id.to_string());
        Ok(())
    }

    /// Anchor every asset of a ledger against a document.
    ///
    /// All anchors are computed before any asset is written, so a failure
    /// leaves the ledger untouched.
    pub fn anchor_all(
        &self,
        document: &Document,
        ledger: &mut AssetLedger,
        layout: &ColumnLayout,
    ) -> Result<AnchorReport, AnchorError> {
        if let Some(asset) = ledger.anchored().next() {
            return Err(AnchorError::AlreadyAnchored {
                asset_id: asset.id.clone(),
                block_id: asset.anchor_to.clone().unwrap_or_default(),
            });
        }

        let candidates: Vec<&ContentBlock> = document.blocks().collect();
        let mut report = AnchorReport::default();

        for asset in &ledger.assets {
            let columns = layout.columns_on_page(asset.page);
            match self.find_anchor(asset, &candidates, columns) {
                Some(choice) => {
                    let normalized = match choice.column {
                        Some(column) => Some(normalize(&asset.rectangle, column).map_err(|e| {
                            warn!("Asset {} cannot be normalized: {}", asset.id, e);
                            GeometryError::NotNormalizable {
                                asset_id: asset.id.clone(),
                                reason: e.to_string(),
                            }
                        })?),
                        None => None,
                    };
                    if matches!(choice.method, AnchorMethod::Widened | AnchorMethod::ReadingOrder) {
                        report.fallback_count += 1;
                    }
                    debug!(
                        "Asset {} anchored to {} ({:?})",
                        asset.id, choice.block.id, choice.method
                    );
                    report.records.push(AnchorRecord {
                        asset_id: asset.id.clone(),
                        block_id: choice.block.id.clone(),
                        column_id: choice.column.map(|c| c.id.clone()),
                        method: choice.method,
                        normalized,
                    });
                }
                None => report.unanchored.push(asset.id.clone()),
            }
        }

        if !candidates.is_empty() && !report.unanchored.is_empty() {
            return Err(AnchorError::Incomplete {
                asset_ids: report.unanchored.clone(),
            });
        }
        if !report.unanchored.is_empty() {
            warn!(
                "Document has no blocks, {} asset(s) left unanchored",
                report.unanchored.len()
            );
        }

        for record in &report.records {
            if let Some(asset) = ledger.assets.iter_mut().find(|a| a.id == record.asset_id) {
                Self::anchor(asset, &record.block_id)?;
            }
        }

        let missing = ledger.unanchored().map(|a| a.id.clone()).collect::<Vec<_>>();
        if !candidates.is_empty() && !missing.is_empty() {
            return Err(AnchorError::Incomplete { asset_ids: missing });
        }

        report.pages_without_assets = ledger
            .assets_per_page()
            .into_iter()
            .filter(|(_, count)| *count == 0)
            .map(|(page, _)| page)
            .collect();
        if !report.pages_without_assets.is_empty() {
            warn!("{} page(s) carry no asset", report.pages_without_assets.len());
        }

        info!(
            "Anchored {} asset(s), {} outside their column",
            report.anchored_count(),
            report.fallback_count
        );
        Ok(report)
    }

    fn best_in_column<'a>(rect: &Rect, blocks: &[(&'a ContentBlock, Rect)]) -> Option<(&'a ContentBlock, AnchorMethod)> {
        let overlapping: Vec<&(&'a ContentBlock, Rect)> =
            blocks.iter().filter(|(_, r)| r.vertical_overlap(rect) > 0.0).collect();

        if !overlapping.is_empty() {
            return overlapping
                .into_iter()
                .min_by(|a, b| {
                    compare_desc(a.1.vertical_overlap(rect), b.1.vertical_overlap(rect))
                        .then_with(|| prefer_below(rect, &a.1, &b.1))
                        .then_with(|| a.0.reading_order.cmp(&b.0.reading_order))
                })
                .map(|(block, _)| (*block, AnchorMethod::VerticalOverlap));
        }

        blocks
            .iter()
            .min_by(|a, b| {
                compare_asc(a.1.vertical_gap(rect), b.1.vertical_gap(rect))
                    .then_with(|| prefer_below(rect, &a.1, &b.1))
                    .then_with(|| a.0.reading_order.cmp(&b.0.reading_order))
            })
            .map(|(block, _)| (*block, AnchorMethod::VerticalDistance))
    }

    fn closest<'a>(rect: &Rect, blocks: &[(&'a ContentBlock, Rect)]) -> Option<&'a ContentBlock> {
        blocks
            .iter()
            .min_by(|a, b| {
                compare_asc(a.1.distance(rect), b.1.distance(rect))
                    .then_with(|| prefer_below(rect, &a.1, &b.1))
                    .then_with(|| a.0.reading_order.cmp(&b.0.reading_order))
            })
            .map(|(block, _)| *block)
    }

    /// Nearest page first (earlier page on ties); on an earlier page the last
    /// block in reading order is nearest, on the same or a later page the first.
    fn nearest_in_reading_order<'a>(page: u32, candidates: &[&'a ContentBlock]) -> Option<&'a ContentBlock> {
        candidates.iter().copied().min_by(|a, b| {
            let da = a.page.abs_diff(page);
            let db = b.page.abs_diff(page);
            da.cmp(&db).then(a.page.cmp(&b.page)).then_with(|| {
                if a.page < page {
                    b.reading_order.cmp(&a.reading_order)
                } else {
                    a.reading_order.cmp(&b.reading_order)
                }
            })
        })
    }
}

fn compare_asc(a: f64, b: f64) -> Ordering {
    if (a - b).abs() <= TIE_EPSILON {
        Ordering::Equal
    } else {
        a.total_cmp(&b)
    }
}

fn compare_desc(a: f64, b: f64) -> Ordering {
    compare_asc(b, a)
}

/// Blocks below the asset sort before blocks above it
fn prefer_below(asset: &Rect, a: &Rect, b: &Rect) -> Ordering {
    let a_below = a.center_y() >= asset.center_y();
    let b_below = b.center_y() >= asset.center_y();
    b_below.cmp(&a_below)
}
