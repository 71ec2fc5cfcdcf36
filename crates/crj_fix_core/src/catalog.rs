use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreErrorCode};

const EMBEDDED_CATALOG: &str = include_str!("../resources/model_behavior_modifications.json");

/// One edit directive: remove the push-button component `button_id` and turn
/// the knob component `knob_id` into an infinite knob with an integrated push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModificationEntry {
    pub button_id: String,
    pub knob_id: String,
    pub knob_anim_name: String,
    pub knob_change_name: String,
    pub push_anim_name: String,
    pub push_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    modifications: Vec<ModificationEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModificationCatalog {
    entries: Vec<ModificationEntry>,
}

impl ModificationCatalog {
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let file: CatalogFile = serde_json::from_str(json).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Catalog,
                format!("malformed modification catalog: {e}"),
            )
        })?;
        Ok(Self {
            entries: file.modifications,
        })
    }

    pub fn from_entries(entries: Vec<ModificationEntry>) -> Self {
        Self { entries }
    }

    /// The catalog shipped with the tool, parsed once per process.
    pub fn embedded() -> Result<&'static Self, CoreError> {
        static EMBEDDED: OnceLock<Result<ModificationCatalog, CoreError>> = OnceLock::new();
        EMBEDDED
            .get_or_init(|| Self::from_json(EMBEDDED_CATALOG))
            .as_ref()
            .map_err(Clone::clone)
    }

    pub fn entries(&self) -> &[ModificationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
