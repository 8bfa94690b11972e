/*!
 * One translation segment per content block.
 *
 * Segmentation walks the document in traversal order and protects each
 * block's text with the placeholder codec. Merging writes translated text
 * back by segment id and leaves placeholders encoded; `decode_document`
 * restores the literals afterwards using each segment's own mapping.
 */

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::document::Document;
use crate::errors::{PipelineError, SegmentAlignmentError};
use crate::translation::placeholders::{PlaceholderCodec, PlaceholderMap};

/// Suffix appended to a block id to form its segment id
pub const SEGMENT_SUFFIX: &str = ".seg0";

/// A translation unit covering one whole block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationSegment {
    /// `{block_id}.seg0`
    pub segment_id: String,

    /// Placeholder-protected block text
    pub text: String,

    /// Placeholder id to original literal
    #[serde(default)]
    pub mapping: PlaceholderMap,
}

impl TranslationSegment {
    /// Segment id for a block
    pub fn id_for_block(block_id: &str) -> String {
        format!("{}{}", block_id, SEGMENT_SUFFIX)
    }

    /// Id of the block this segment was cut from
    pub fn block_id(&self) -> Result<&str, SegmentAlignmentError> {
        self.segment_id
            .strip_suffix(SEGMENT_SUFFIX)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SegmentAlignmentError::MalformedSegmentId {
                segment_id: self.segment_id.clone(),
            })
    }
}

/// Segments of one document together with the language pair of the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentBatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_document_ref: Option<String>,

    pub source_language: String,

    pub target_language: String,

    pub segments: Vec<TranslationSegment>,
}

impl SegmentBatch {
    pub fn new(segments: Vec<TranslationSegment>, source_language: &str, target_language: &str) -> Self {
        Self {
            source_document_ref: None,
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            segments,
        }
    }

    pub fn with_source_document_ref(mut self, source_ref: Option<&str>) -> Self {
        self.source_document_ref = source_ref.map(str::to_string);
        self
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Protected texts in segment order, as sent to a translator
    pub fn texts(&self) -> Vec<&str> {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Splits documents into segments and merges translations back
#[derive(Debug, Clone, Default)]
pub struct Segmenter;

impl Segmenter {
    pub fn new() -> Self {
        Self
    }

    /// One protected segment per block, in document traversal order.
    pub fn segment(&self, document: &Document) -> Vec<TranslationSegment> {
        let segments: Vec<TranslationSegment> = document
            .blocks()
            .map(|block| {
                let protected = PlaceholderCodec::encode(&block.text);
                TranslationSegment {
                    segment_id: TranslationSegment::id_for_block(&block.id),
                    text: protected.text,
                    mapping: protected.mapping,
                }
            })
            .collect();

        let protected_count = segments.iter().filter(|s| !s.mapping.is_empty()).count();
        info!(
            "Segmented {} block(s), {} with protected substrings",
            segments.len(),
            protected_count
        );

        segments
    }

    /// Segment a document into a batch tagged with the run's languages.
    pub fn segment_batch(&self, document: &Document, source_language: &str, target_language: &str) -> SegmentBatch {
        SegmentBatch::new(self.segment(document), source_language, target_language)
            .with_source_document_ref(document.source_ref.as_deref())
    }

    /// Write translated texts into the blocks their segments came from.
    ///
    /// `translated` is aligned by position with `segments`; a count mismatch
    /// is refused rather than guessed. Only block text changes and
    /// placeholders stay encoded.
    pub fn merge(
        &self,
        document: &Document,
        segments: &[TranslationSegment],
        translated: &[String],
    ) -> Result<Document, SegmentAlignmentError> {
        if segments.len() != translated.len() {
            return Err(SegmentAlignmentError::CountMismatch {
                expected: segments.len(),
                actual: translated.len(),
            });
        }

        let mut merged = document.clone();
        for (segment, text) in segments.iter().zip(translated) {
            let block_id = segment.block_id()?;
            let block = merged
                .block_mut(block_id)
                .ok_or_else(|| SegmentAlignmentError::UnknownBlock {
                    segment_id: segment.segment_id.clone(),
                })?;
            block.text = text.clone();
        }

        debug!("Merged {} translated segment(s)", segments.len());
        Ok(merged)
    }
}

/// Check that a segment list covers a document one segment per block,
/// with pairwise distinct ids.
pub fn check_segmentation(document: &Document, segments: &[TranslationSegment]) -> Result<(), PipelineError> {
    let block_count = document.total_block_count();
    if segments.len() != block_count {
        return Err(PipelineError::Segmentation(format!(
            "{} segment(s) for {} block(s)",
            segments.len(),
            block_count
        )));
    }

    let mut seen = HashSet::with_capacity(segments.len());
    for segment in segments {
        if !seen.insert(segment.segment_id.as_str()) {
            return Err(PipelineError::Segmentation(format!(
                "duplicate segment id {}",
                segment.segment_id
            )));
        }
    }

    Ok(())
}

/// Restore protected literals in every block covered by `segments`.
pub fn decode_document(document: &Document, segments: &[TranslationSegment]) -> Result<Document, PipelineError> {
    let mut decoded = document.clone();

    for segment in segments {
        let block_id = segment.block_id()?;
        let block = decoded
            .block_mut(block_id)
            .ok_or_else(|| SegmentAlignmentError::UnknownBlock {
                segment_id: segment.segment_id.clone(),
            })?;
        block.text = PlaceholderCodec::decode(&block.text, &segment.mapping)
            .map_err(|e| e.in_segment(&segment.segment_id))?;
    }

    Ok(decoded)
}
