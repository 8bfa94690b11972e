/*!
 * # docweave - geometry-aware document preparation for translation
 *
 * A Rust library that turns paginated documents (prose with images,
 * diagrams and tables placed alongside) into translation units, and puts
 * the translated text back without losing track of where each visual
 * asset belongs.
 *
 * ## Features
 *
 * - Detect vertical columns on every page
 * - Anchor each visual asset to the closest block of its column
 * - Record anchors as `[[asset_id]]` markers inside block text
 * - Protect markers, URLs, emails and formatted numbers behind
 *   reversible `<ph id="..." />` placeholders
 * - One translation segment per block, merged back by segment id
 * - JSON persistence of every stage so a run can resume from disk
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `geometry`: rectangles and column-relative rectangles
 * - `document`: document model and asset ledger
 * - `layout`: column detection and asset anchoring
 * - `markers`: marker injection and validation
 * - `translation`: placeholder codec, segmenter and translator seam
 * - `pipeline`: stage orchestration and run reports
 * - `app_config`: configuration management
 * - `file_utils`: file system operations
 * - `language_utils`: ISO language code utilities
 * - `errors`: error types for every stage
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod document;
pub mod errors;
pub mod file_utils;
pub mod geometry;
pub mod language_utils;
pub mod layout;
pub mod markers;
pub mod pipeline;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use document::{Asset, AssetKind, AssetLedger, BlockKind, ContentBlock, Document, Section};
pub use errors::{
    AnchorError, AppError, GeometryError, MarkerInjectionError, PipelineError, PlaceholderCodecError,
    SegmentAlignmentError,
};
pub use geometry::{NormalizedRect, Rect};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use layout::{AssetAnchorer, Column, ColumnDetector, ColumnLayout};
pub use markers::{MarkerInjector, count_markers, extract_existing_markers};
pub use pipeline::{Pipeline, PipelineConfig, PipelineReport};
pub use translation::{PlaceholderCodec, SegmentBatch, Segmenter, TranslationSegment};
