/*!
 * Asset ledger produced by visual-asset extraction.
 *
 * Every image, vector drawing or table snapshot found on a page becomes an
 * `Asset` whose id encodes its kind, content hash, page and occurrence.
 * The `anchor_to` field is empty until the anchoring stage binds the asset
 * to a content block.
 */

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::geometry::Rect;

/// Number of hash characters embedded in an asset id
const HASH_PREFIX_LEN: usize = 8;

/// Kind of visual asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetKind {
    Image,
    Vector,
    TableSnapshot,
}

impl AssetKind {
    /// Prefix used in asset ids and markers
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Self::Image => "img",
            Self::Vector => "vec",
            Self::TableSnapshot => "tbl",
        }
    }

    /// Parse an id prefix back into a kind.
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "img" => Some(Self::Image),
            "vec" => Some(Self::Vector),
            "tbl" => Some(Self::TableSnapshot),
            _ => None,
        }
    }
}

/// Compute the lowercase hex SHA-256 of raw asset bytes.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// A visual asset placed on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Identifier of the form `{type-prefix}-{hash8}-p{page}-occ{N}`
    pub id: String,

    /// Asset kind
    pub kind: AssetKind,

    /// Hex content hash of the asset bytes
    pub content_hash: String,

    /// Page the asset appears on
    pub page: u32,

    /// Bounding box on the page
    pub rectangle: Rect,

    /// Disambiguates identical content appearing several times
    pub occurrence: u32,

    /// Id of the block the asset is anchored to, written once by anchoring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_to: Option<String>,
}

impl Asset {
    /// Create an unanchored asset, deriving its id from the other fields.
    pub fn new(kind: AssetKind, content_hash: &str, page: u32, rectangle: Rect, occurrence: u32) -> Self {
        Self {
            id: Self::build_id(kind, content_hash, page, occurrence),
            kind,
            content_hash: content_hash.to_string(),
            page,
            rectangle,
            occurrence,
            anchor_to: None,
        }
    }

    /// Build an asset id from its identifying fields.
    ///
    /// The hash is lower-cased and cut to its first eight characters.
    pub fn build_id(kind: AssetKind, content_hash: &str, page: u32, occurrence: u32) -> String {
        let prefix: String = content_hash
            .chars()
            .take(HASH_PREFIX_LEN)
            .collect::<String>()
            .to_lowercase();
        format!("{}-{}-p{}-occ{}", kind.id_prefix(), prefix, page, occurrence)
    }

    /// Whether the asset has been bound to a block.
    pub fn is_anchored(&self) -> bool {
        self.anchor_to.is_some()
    }

    /// The marker text recording this asset in block content.
    pub fn marker(&self) -> String {
        format!("[[{}]]", self.id)
    }
}

/// Ordered list of assets extracted from one source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetLedger {
    /// Reference to the source document
    pub source_document_ref: String,

    /// Page count of the source document
    pub total_pages: u32,

    /// Assets in extraction order
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl AssetLedger {
    /// Create an empty ledger.
    pub fn new(source_document_ref: &str, total_pages: u32) -> Self {
        Self {
            source_document_ref: source_document_ref.to_string(),
            total_pages,
            assets: Vec::new(),
        }
    }

    /// Append an asset.
    pub fn with_asset(mut self, asset: Asset) -> Self {
        self.assets.push(asset);
        self
    }

    /// Find an asset by id.
    pub fn asset(&self, id: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == id)
    }

    /// Whether an asset with this id is present.
    pub fn contains(&self, id: &str) -> bool {
        self.asset(id).is_some()
    }

    /// Assets that have an anchor.
    pub fn anchored(&self) -> impl Iterator<Item = &Asset> {
        self.assets.iter().filter(|a| a.is_anchored())
    }

    /// Assets still lacking an anchor.
    pub fn unanchored(&self) -> impl Iterator<Item = &Asset> {
        self.assets.iter().filter(|a| !a.is_anchored())
    }

    /// Number of assets per page, covering every page of the document
    /// (pages without assets map to zero).
    pub fn assets_per_page(&self) -> BTreeMap<u32, usize> {
        let mut counts: BTreeMap<u32, usize> = (1..=self.total_pages).map(|p| (p, 0)).collect();
        for asset in &self.assets {
            *counts.entry(asset.page).or_insert(0) += 1;
        }
        counts
    }
}
