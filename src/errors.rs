/*!
 * Error types for the docweave pipeline.
 *
 * Each pipeline stage has its own error family so that a failure can be
 * traced back to the asset, block, segment or placeholder that caused it.
 * All of them are fatal for the document being processed; none is retried.
 */

use thiserror::Error;

/// Errors raised by geometric computations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Rectangle coordinates are not finite or not strictly ordered
    #[error("Invalid rectangle ({x0}, {y0}, {x1}, {y1}): expected finite x0 < x1 and y0 < y1")]
    InvalidRect { x0: f64, y0: f64, x1: f64, y1: f64 },

    /// Column has zero width or height and cannot be used as a reference frame
    #[error("Column {column_id} has zero area ({width} x {height})")]
    ZeroAreaColumn {
        column_id: String,
        width: f64,
        height: f64,
    },

    /// Asset could not be expressed relative to its column
    #[error("Asset {asset_id} cannot be normalized: {reason}")]
    NotNormalizable { asset_id: String, reason: String },
}

/// Errors raised while binding assets to content blocks
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnchorError {
    /// Attempt to anchor an asset that already has an anchor
    #[error("Asset {asset_id} is already anchored to {block_id}")]
    AlreadyAnchored { asset_id: String, block_id: String },

    /// Some assets were left without an anchor although blocks exist
    #[error("{} asset(s) left unanchored: {}", .asset_ids.len(), .asset_ids.join(", "))]
    Incomplete { asset_ids: Vec<String> },

    /// Geometry failure during anchoring
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),
}

/// Errors raised by marker injection and its document-wide validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarkerInjectionError {
    /// Anchored asset has no marker anywhere in the document
    #[error("Asset {asset_id} anchored to {block_id} has no marker in the document")]
    MissingMarker { asset_id: String, block_id: String },

    /// The same asset marker appears in more than one block
    #[error("Marker for asset {asset_id} appears in several blocks: {}", .block_ids.join(", "))]
    DuplicateMarker {
        asset_id: String,
        block_ids: Vec<String>,
    },

    /// Marker text does not follow the `[[type-hash-pN-occN]]` format
    #[error("Malformed marker {marker:?} in block {block_id}")]
    MalformedMarker { marker: String, block_id: String },

    /// A block carries a marker for an asset missing from the ledger
    #[error("Block {block_id} references unknown asset {asset_id}")]
    UnknownAsset { asset_id: String, block_id: String },
}

/// Errors raised when merging translated text back into a document
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SegmentAlignmentError {
    /// Translated text count does not match the segment count
    #[error("Expected {expected} translated texts, got {actual}")]
    CountMismatch { expected: usize, actual: usize },

    /// Segment id does not resolve to a block of the document
    #[error("Segment {segment_id} does not match any block in the document")]
    UnknownBlock { segment_id: String },

    /// Segment id is not of the `{block_id}.seg0` form
    #[error("Segment id {segment_id} is malformed")]
    MalformedSegmentId { segment_id: String },
}

/// Errors raised while restoring protected substrings
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaceholderCodecError {
    /// A placeholder tag references an id absent from the mapping
    #[error("Placeholder {placeholder_id} not found in mapping{}", segment_suffix(.segment_id))]
    UnknownPlaceholder {
        placeholder_id: String,
        segment_id: Option<String>,
    },
}

fn segment_suffix(segment_id: &Option<String>) -> String {
    match segment_id {
        Some(id) => format!(" (segment {})", id),
        None => String::new(),
    }
}

impl PlaceholderCodecError {
    /// Attach the segment the failing text belongs to
    pub fn in_segment(self, segment: &str) -> Self {
        match self {
            Self::UnknownPlaceholder { placeholder_id, .. } => Self::UnknownPlaceholder {
                placeholder_id,
                segment_id: Some(segment.to_string()),
            },
        }
    }
}

/// Any stage failure of the pipeline
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Anchoring error: {0}")]
    Anchor(#[from] AnchorError),

    #[error("Marker injection error: {0}")]
    MarkerInjection(#[from] MarkerInjectionError),

    #[error("Segment alignment error: {0}")]
    SegmentAlignment(#[from] SegmentAlignmentError),

    #[error("Placeholder codec error: {0}")]
    PlaceholderCodec(#[from] PlaceholderCodecError),

    /// Post-condition on the segment list failed
    #[error("Segmentation invariant violated: {0}")]
    Segmentation(String),

    /// The external translator failed
    #[error("Translator failed: {0}")]
    Translator(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error while reading or writing JSON
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from a pipeline stage
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}
