/*!
 * Translation units and their protection.
 *
 * - `placeholders`: reversible protection of fragile substrings
 * - `segmenter`: one segment per block, merge and decode back
 * - `translator`: the seam to whatever produces translated text
 */

pub use self::placeholders::{PlaceholderCheck, PlaceholderCodec, PlaceholderMap, ProtectedText};
pub use self::segmenter::{
    SegmentBatch, Segmenter, TranslationSegment, check_segmentation, decode_document,
};
pub use self::translator::{IdentityTranslator, PseudoTranslator, SegmentTranslator};

pub mod placeholders;
pub mod segmenter;
pub mod translator;
