/*!
 * Column detection.
 *
 * Groups the content blocks of a page into vertical column bands. Blocks
 * are clustered by the horizontal position of their left edge: two blocks
 * belong to the same cluster when their left edges are at most `epsilon`
 * points apart (chained, so a cluster is a density-connected run of left
 * edges). Clusters with fewer than `min_points` blocks are not accepted as
 * columns; their blocks join the closest accepted column instead. A run
 * that sits inside the run to its left (an indented list) is folded into it.
 *
 * Blocks that reach into the next column (a full-width heading over a
 * two-column body, for instance) are placed by their horizontal centre
 * and never widen the column they end up in.
 */

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::document::{ContentBlock, Document};
use crate::errors::GeometryError;
use crate::geometry::Rect;

/// Default maximum distance between left edges of blocks in one column
pub const DEFAULT_EPSILON: f64 = 30.0;

/// Default minimum number of blocks for a distinct column
pub const DEFAULT_MIN_POINTS: usize = 3;

/// A vertical band of a page holding a cluster of blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column identifier
    pub id: String,
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    /// Ids of the blocks assigned to this column
    pub block_ids: Vec<String>,
}

impl Column {
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Whether `x` lies within the column band, both edges included
    pub fn contains_x(&self, x: f64) -> bool {
        x >= self.x_min && x <= self.x_max
    }

    /// Length of the horizontal extent shared with a rectangle
    pub fn horizontal_overlap(&self, rect: &Rect) -> f64 {
        (self.x_max.min(rect.x1()) - self.x_min.max(rect.x0())).max(0.0)
    }

    /// Horizontal distance from `x` to the band (0 inside it)
    pub fn distance_x(&self, x: f64) -> f64 {
        if x < self.x_min {
            self.x_min - x
        } else if x > self.x_max {
            x - self.x_max
        } else {
            0.0
        }
    }

    pub fn contains_block(&self, block_id: &str) -> bool {
        self.block_ids.iter().any(|id| id == block_id)
    }

    /// The column bounds as a rectangle, failing for a zero-area column.
    pub fn bounds(&self) -> Result<Rect, GeometryError> {
        Rect::new(self.x_min, self.y_min, self.x_max, self.y_max).map_err(|_| {
            GeometryError::ZeroAreaColumn {
                column_id: self.id.clone(),
                width: self.width(),
                height: self.height(),
            }
        })
    }
}

/// Columns of every page of a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnLayout {
    /// Columns per page, left to right
    pub pages: BTreeMap<u32, Vec<Column>>,
}

impl ColumnLayout {
    /// Columns on a page (empty when the page has none).
    pub fn columns_on_page(&self, page: u32) -> &[Column] {
        self.pages.get(&page).map(|c| c.as_slice()).unwrap_or(&[])
    }

    /// The column a block was assigned to.
    pub fn column_of(&self, block_id: &str) -> Option<&Column> {
        self.pages
            .values()
            .flat_map(|cols| cols.iter())
            .find(|c| c.contains_block(block_id))
    }

    /// Total number of columns over all pages.
    pub fn total_columns(&self) -> usize {
        self.pages.values().map(|c| c.len()).sum()
    }
}

/// Working cluster used during detection
struct Cluster {
    members: Vec<usize>,
    /// Members whose interval stays inside the cluster's band
    core: Vec<usize>,
    x_min: f64,
    x_max: f64,
}

/// Clusters blocks into columns.
#[derive(Debug, Clone)]
pub struct ColumnDetector {
    epsilon: f64,
    min_points: usize,
}

impl Default for ColumnDetector {
    fn default() -> Self {
        Self::new(DEFAULT_EPSILON, DEFAULT_MIN_POINTS)
    }
}

impl ColumnDetector {
    /// Create a detector with the given density parameters.
    pub fn new(epsilon: f64, min_points: usize) -> Self {
        Self {
            epsilon,
            min_points: min_points.max(1),
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn min_points(&self) -> usize {
        self.min_points
    }

    /// Detect the columns formed by a set of blocks.
    ///
    /// Blocks without a rectangle are ignored. The result is ordered left to
    /// right and every placed block belongs to exactly one column.
    pub fn detect(&self, blocks: &[&ContentBlock]) -> Vec<Column> {
        let placed: Vec<(&ContentBlock, Rect)> = blocks
            .iter()
            .filter_map(|b| b.rectangle.map(|r| (*b, r)))
            .collect();

        if placed.is_empty() {
            return Vec::new();
        }

        let mut order: Vec<usize> = (0..placed.len()).collect();
        order.sort_by(|&a, &b| {
            placed[a]
                .1
                .x0()
                .total_cmp(&placed[b].1.x0())
                .then(placed[a].0.reading_order.cmp(&placed[b].0.reading_order))
                .then(placed[a].0.id.cmp(&placed[b].0.id))
        });

        // Chain left edges into density runs
        let mut runs: Vec<Vec<usize>> = Vec::new();
        for idx in order {
            match runs.last_mut() {
                Some(run)
                    if placed[idx].1.x0() - placed[run[run.len() - 1]].1.x0() <= self.epsilon =>
                {
                    run.push(idx)
                }
                _ => runs.push(vec![idx]),
            }
        }

        let (accepted, leftover): (Vec<Vec<usize>>, Vec<Vec<usize>>) =
            runs.into_iter().partition(|run| run.len() >= self.min_points);

        if accepted.is_empty() {
            debug!(
                "No cluster reaches {} blocks, using a single column for {} block(s)",
                self.min_points,
                placed.len()
            );
            let all: Vec<usize> = (0..placed.len()).collect();
            let bounds = Self::x_extent(&placed, &all);
            return vec![Self::build_column(0, &placed, &all, bounds)];
        }

        let clusters = Self::core_clusters(&placed, Self::merge_indented(&placed, accepted));

        // Bands split each gutter at its midpoint so columns never overlap
        let bands: Vec<(f64, f64)> = (0..clusters.len())
            .map(|i| {
                let left = if i == 0 {
                    f64::NEG_INFINITY
                } else {
                    (clusters[i - 1].x_max + clusters[i].x_min) / 2.0
                };
                let right = if i + 1 == clusters.len() {
                    f64::INFINITY
                } else {
                    (clusters[i].x_max + clusters[i + 1].x_min) / 2.0
                };
                (left, right)
            })
            .collect();

        let mut stray: Vec<usize> = leftover.into_iter().flatten().collect();
        for cluster in &clusters {
            stray.extend(cluster.members.iter().filter(|m| !cluster.core.contains(m)));
        }
        stray.sort_unstable();

        let mut assigned: Vec<(usize, usize, bool)> = Vec::new();
        for idx in stray {
            let rect = &placed[idx].1;
            let target = Self::column_for_center(&clusters, rect.center_x());
            let (band_left, band_right) = bands[target];
            let widens = rect.x0() >= band_left && rect.x1() <= band_right;
            debug!(
                "Block {} placed by centre {:.1} into cluster {}",
                placed[idx].0.id,
                rect.center_x(),
                target
            );
            assigned.push((idx, target, widens));
        }

        let mut extent_members: Vec<Vec<usize>> = clusters.iter().map(|c| c.core.clone()).collect();
        let mut all_members: Vec<Vec<usize>> = clusters.iter().map(|c| c.core.clone()).collect();
        for (idx, target, widens) in assigned {
            all_members[target].push(idx);
            if widens {
                extent_members[target].push(idx);
            }
        }

        let mut columns = Vec::new();
        let per_cluster = all_members.iter().zip(extent_members.iter()).zip(&clusters);
        for ((members, extent), cluster) in per_cluster {
            if members.is_empty() {
                continue;
            }
            let mut sorted = members.clone();
            sorted.sort_by(|&a, &b| {
                placed[a]
                    .0
                    .reading_order
                    .cmp(&placed[b].0.reading_order)
                    .then(placed[a].0.id.cmp(&placed[b].0.id))
            });
            // Only crossing blocks: the band stops where the next cluster starts
            let bounds = if extent.is_empty() {
                (cluster.x_min, cluster.x_max)
            } else {
                Self::x_extent(&placed, extent)
            };
            columns.push(Self::build_column(columns.len(), &placed, &sorted, bounds));
        }

        columns.sort_by(|a, b| a.x_min.total_cmp(&b.x_min));
        for (i, column) in columns.iter_mut().enumerate() {
            column.id = format!("col{}", i);
        }

        debug!("Detected {} column(s) from {} block(s)", columns.len(), placed.len());
        columns
    }

    /// Detect columns page by page for a whole document.
    ///
    /// Column ids are qualified with the page (`p{page}-col{i}`). Blocks
    /// without a rectangle join the column of the closest preceding placed
    /// block in reading order, or the first column of their page.
    pub fn detect_layout(&self, document: &Document) -> ColumnLayout {
        let mut layout = ColumnLayout::default();

        for page in document.pages() {
            let mut blocks = document.blocks_on_page(page);
            blocks.sort_by_key(|b| b.reading_order);

            let mut columns = self.detect(&blocks);
            for (i, column) in columns.iter_mut().enumerate() {
                column.id = format!("p{}-col{}", page, i);
            }

            if !columns.is_empty() {
                let mut current = 0;
                for block in &blocks {
                    if block.rectangle.is_some() {
                        let owner = columns.iter().position(|c| c.contains_block(&block.id));
                        if let Some(pos) = owner {
                            current = pos;
                        }
                    } else {
                        columns[current].block_ids.push(block.id.clone());
                    }
                }
            }

            layout.pages.insert(page, columns);
        }

        layout
    }

    /// Fold a run into the run before it when most of that run's blocks
    /// already reach its right edge (an indented list inside a column).
    fn merge_indented(
        placed: &[(&ContentBlock, Rect)],
        accepted: Vec<Vec<usize>>,
    ) -> Vec<Vec<usize>> {
        let mut merged: Vec<Vec<usize>> = Vec::new();
        for run in accepted {
            let right = run.iter().map(|&m| placed[m].1.x1()).fold(f64::NEG_INFINITY, f64::max);
            let covers = |prev: &[usize]| {
                prev.iter().filter(|&&m| placed[m].1.x1() >= right).count() * 2 > prev.len()
            };
            if let Some(prev) = merged.last_mut().filter(|prev| covers(prev.as_slice())) {
                debug!("Run of {} block(s) nested in the previous run, merging", run.len());
                prev.extend(run);
            } else {
                merged.push(run);
            }
        }
        merged
    }

    /// Split accepted runs into core members and crossing members.
    fn core_clusters(placed: &[(&ContentBlock, Rect)], accepted: Vec<Vec<usize>>) -> Vec<Cluster> {
        let next_left: Vec<Option<f64>> = (0..accepted.len())
            .map(|i| {
                accepted.get(i + 1).map(|run| {
                    run.iter()
                        .map(|&m| placed[m].1.x0())
                        .fold(f64::INFINITY, f64::min)
                })
            })
            .collect();

        accepted
            .into_iter()
            .zip(next_left)
            .map(|(members, limit)| {
                let x_min = members
                    .iter()
                    .map(|&m| placed[m].1.x0())
                    .fold(f64::INFINITY, f64::min);
                let core: Vec<usize> = members
                    .iter()
                    .copied()
                    .filter(|&m| limit.is_none_or(|l| placed[m].1.x1() <= l))
                    .collect();
                let x_max = if core.is_empty() {
                    limit.unwrap_or(x_min)
                } else {
                    core.iter().map(|&m| placed[m].1.x1()).fold(f64::NEG_INFINITY, f64::max)
                };
                Cluster {
                    members,
                    core,
                    x_min,
                    x_max,
                }
            })
            .collect()
    }

    /// Cluster containing `center` (lowest index on shared edges), else the nearest one.
    fn column_for_center(clusters: &[Cluster], center: f64) -> usize {
        if let Some(pos) = clusters
            .iter()
            .position(|c| center >= c.x_min && center <= c.x_max)
        {
            return pos;
        }

        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (i, c) in clusters.iter().enumerate() {
            let distance = if center < c.x_min { c.x_min - center } else { center - c.x_max };
            if distance < best_distance {
                best = i;
                best_distance = distance;
            }
        }
        best
    }

    fn x_extent(placed: &[(&ContentBlock, Rect)], members: &[usize]) -> (f64, f64) {
        let x_min = members.iter().map(|&m| placed[m].1.x0()).fold(f64::INFINITY, f64::min);
        let x_max = members.iter().map(|&m| placed[m].1.x1()).fold(f64::NEG_INFINITY, f64::max);
        (x_min, x_max)
    }

    fn build_column(
        index: usize,
        placed: &[(&ContentBlock, Rect)],
        members: &[usize],
        (x_min, x_max): (f64, f64),
    ) -> Column {
        let y_min = members.iter().map(|&m| placed[m].1.y0()).fold(f64::INFINITY, f64::min);
        let y_max = members.iter().map(|&m| placed[m].1.y1()).fold(f64::NEG_INFINITY, f64::max);

        Column {
            id: format!("col{}", index),
            x_min,
            x_max,
            y_min,
            y_max,
            block_ids: members.iter().map(|&m| placed[m].0.id.clone()).collect(),
        }
    }
}
