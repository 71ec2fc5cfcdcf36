//! Model behavior documents: the `ModelInfo` + `ModelBehaviors` fragment files
//! that describe cockpit interactions for one aircraft model.

mod loader;
mod mutator;
mod serializer;
mod tree;

pub use loader::{load_file, load_str};
pub use mutator::{KNOB_TEMPLATE_NAME, apply_catalog, apply_entry};
pub use serializer::{XML_DECLARATION, serialize};
pub use tree::{Attribute, ElementTree, ID_ATTRIBUTE, NodeId, NodeKind};

pub const MODEL_INFO_TAG: &str = "ModelInfo";
pub const MODEL_BEHAVIORS_TAG: &str = "ModelBehaviors";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// One behavior file held in memory between load and serialization.
///
/// `header` is the `ModelInfo` element exactly as it appeared in the source
/// text and is written back untouched; only `tree` is ever mutated.
#[derive(Debug, Clone)]
pub struct BehaviorDocument {
    header: String,
    header_range: ByteRange,
    pub tree: ElementTree,
}

impl BehaviorDocument {
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Location of the header in the text the document was loaded from.
    pub fn header_range(&self) -> ByteRange {
        self.header_range
    }
}
