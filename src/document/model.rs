/*!
 * Core document model types.
 *
 * A document is an ordered list of sections, each an ordered list of
 * content blocks carrying text, an optional bounding box, a page number
 * and a reading-order index. All of it is JSON-serializable so the pipeline
 * can be resumed from disk between stages.
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::geometry::Rect;

/// Paginated document as delivered by page-structure extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Reference to the source file the document was extracted from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,

    /// Sections in document order
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl Document {
    /// Create a document from its sections.
    pub fn new(sections: Vec<Section>) -> Self {
        Self {
            source_ref: None,
            sections,
        }
    }

    /// Set the source reference.
    pub fn with_source_ref(mut self, source_ref: &str) -> Self {
        self.source_ref = Some(source_ref.to_string());
        self
    }

    /// Iterate over all blocks in traversal order (section, then block).
    pub fn blocks(&self) -> impl Iterator<Item = &ContentBlock> {
        self.sections.iter().flat_map(|s| s.blocks.iter())
    }

    /// Mutable traversal over all blocks.
    pub fn blocks_mut(&mut self) -> impl Iterator<Item = &mut ContentBlock> {
        self.sections.iter_mut().flat_map(|s| s.blocks.iter_mut())
    }

    /// Total number of blocks across all sections.
    pub fn total_block_count(&self) -> usize {
        self.sections.iter().map(|s| s.blocks.len()).sum()
    }

    /// Find a block by id.
    pub fn block(&self, id: &str) -> Option<&ContentBlock> {
        self.blocks().find(|b| b.id == id)
    }

    /// Find a block by id for in-place mutation.
    pub fn block_mut(&mut self, id: &str) -> Option<&mut ContentBlock> {
        self.blocks_mut().find(|b| b.id == id)
    }

    /// Blocks located on the given page.
    pub fn blocks_on_page(&self, page: u32) -> Vec<&ContentBlock> {
        self.blocks().filter(|b| b.page == page).collect()
    }

    /// Distinct page numbers carrying at least one block, ascending.
    pub fn pages(&self) -> Vec<u32> {
        self.blocks()
            .map(|b| b.page)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Whether the document contains no block at all.
    pub fn is_empty(&self) -> bool {
        self.total_block_count() == 0
    }
}

/// A section of the document owning its blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Section identifier, also used inside block ids
    pub id: String,

    /// Optional section heading
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Blocks in section order
    #[serde(default)]
    pub blocks: Vec<ContentBlock>,
}

impl Section {
    /// Create an empty section.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            title: None,
            blocks: Vec::new(),
        }
    }

    /// Set the section title.
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    /// Append a block.
    pub fn with_block(mut self, block: ContentBlock) -> Self {
        self.blocks.push(block);
        self
    }
}

/// Kind of content block, which decides where asset markers are injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Paragraph,
    Heading,
    List,
    Table,
    Figure,
}

impl BlockKind {
    /// Prefix used when building block ids
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Self::Paragraph => "para",
            Self::Heading => "head",
            Self::List => "list",
            Self::Table => "table",
            Self::Figure => "fig",
        }
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Paragraph => "paragraph",
            Self::Heading => "heading",
            Self::List => "list",
            Self::Table => "table",
            Self::Figure => "figure",
        };
        write!(f, "{}", name)
    }
}

/// A typed unit of page content.
///
/// The text is rewritten in place by marker injection and later replaced by
/// the translated text on merge; every other field stays as extracted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    /// Identifier of the form `{type-prefix}.{section}.{NNN}`
    pub id: String,

    /// Block kind
    pub kind: BlockKind,

    /// Literal text content
    #[serde(default)]
    pub text: String,

    /// Bounding box on the page, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rectangle: Option<Rect>,

    /// Page number
    pub page: u32,

    /// Position in reading order
    pub reading_order: u32,
}

impl ContentBlock {
    /// Create a block without a bounding box.
    pub fn new(id: &str, kind: BlockKind, text: &str, page: u32, reading_order: u32) -> Self {
        Self {
            id: id.to_string(),
            kind,
            text: text.to_string(),
            rectangle: None,
            page,
            reading_order,
        }
    }

    /// Attach a bounding box.
    pub fn with_rectangle(mut self, rectangle: Rect) -> Self {
        self.rectangle = Some(rectangle);
        self
    }

    /// Build a block id from its kind, section and 1-based index.
    pub fn build_id(kind: BlockKind, section: &str, index: usize) -> String {
        format!("{}.{}.{:03}", kind.id_prefix(), section, index)
    }
}
