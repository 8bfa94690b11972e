/*!
 * Document and asset ledger model.
 *
 * This module provides the two flat collections the pipeline works on:
 * - `model`: sections of typed content blocks supplied by page extraction
 * - `ledger`: visual assets supplied by asset extraction
 *
 * Cross references between them are plain string ids (an asset stores the
 * id of the block it is anchored to), never pointers.
 */

pub mod ledger;
pub mod model;

pub use ledger::{content_hash, Asset, AssetKind, AssetLedger};
pub use model::{BlockKind, ContentBlock, Document, Section};
