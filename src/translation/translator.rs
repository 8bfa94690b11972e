/*!
 * Seam to the external translation service.
 *
 * The pipeline only needs protected texts in and protected texts out, in the
 * same order. The in-process translators here serve dry runs and tests.
 */

use anyhow::Result;

use crate::translation::placeholders::PlaceholderCodec;
use crate::translation::segmenter::SegmentBatch;

/// Something that turns a batch of protected segments into translated texts.
///
/// Implementations must return exactly one text per segment, in segment
/// order, and must leave `<ph id="..." />` tags intact.
pub trait SegmentTranslator {
    /// Short name used in logs and reports
    fn name(&self) -> &str;

    /// Translate every segment of the batch
    fn translate(&self, batch: &SegmentBatch) -> Result<Vec<String>>;
}

/// Returns every segment unchanged
#[derive(Debug, Clone, Default)]
pub struct IdentityTranslator;

impl SegmentTranslator for IdentityTranslator {
    fn name(&self) -> &str {
        "identity"
    }

    fn translate(&self, batch: &SegmentBatch) -> Result<Vec<String>> {
        Ok(batch.segments.iter().map(|s| s.text.clone()).collect())
    }
}

/// Pseudo-localisation: accents vowels outside placeholder tags so untranslated
/// or damaged text stands out while placeholders still round-trip
#[derive(Debug, Clone, Default)]
pub struct PseudoTranslator;

impl PseudoTranslator {
    pub fn new() -> Self {
        Self
    }

    /// Pseudo-translate one protected text
    pub fn pseudo_translate(text: &str) -> String {
        PlaceholderCodec::map_unprotected(text, |plain| plain.chars().map(accent).collect())
    }
}

fn accent(c: char) -> char {
    match c {
        'a' => 'á',
        'e' => 'é',
        'i' => 'í',
        'o' => 'ó',
        'u' => 'ú',
        'A' => 'Á',
        'E' => 'É',
        'I' => 'Í',
        'O' => 'Ó',
        'U' => 'Ú',
        other => other,
    }
}

impl SegmentTranslator for PseudoTranslator {
    fn name(&self) -> &str {
        "pseudo"
    }

    fn translate(&self, batch: &SegmentBatch) -> Result<Vec<String>> {
        Ok(batch
            .segments
            .iter()
            .map(|s| Self::pseudo_translate(&s.text))
            .collect())
    }
}
