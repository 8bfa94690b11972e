/*!
 * Page layout analysis.
 *
 * - `columns`: clusters blocks into vertical column bands per page
 * - `anchoring`: binds visual assets to blocks within their column
 */

pub mod anchoring;
pub mod columns;

pub use anchoring::{
    check_geometry_preserved, normalize, AnchorMethod, AnchorRecord, AnchorReport, AssetAnchorer,
};
pub use columns::{Column, ColumnDetector, ColumnLayout};
