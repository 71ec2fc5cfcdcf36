use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreErrorCode};

pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// `manifest.json` of a simulator package. Fields the tool does not use are
/// ignored when reading the original package's manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(default)]
    pub package_version: String,
    #[serde(default)]
    pub minimum_game_version: String,
    #[serde(default)]
    pub release_notes: ReleaseNotes,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub package_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseNotes {
    #[serde(default)]
    pub neutral: ReleaseNote,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseNote {
    #[serde(rename = "LastUpdate", default)]
    pub last_update: String,
    #[serde(rename = "OlderHistory", default)]
    pub older_history: String,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let text = fs::read_to_string(path).map_err(|e| CoreError::io("read", path, e))?;
        Self::from_json(&text).map_err(|e| {
            CoreError::new(e.code, format!("{}: {}", path.display(), e.message))
        })
    }

    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        // Some packages are shipped with a UTF-8 BOM.
        let json = json.trim_start_matches('\u{feff}');
        serde_json::from_str(json).map_err(|e| {
            CoreError::new(CoreErrorCode::Parse, format!("invalid package manifest: {e}"))
        })
    }

    pub fn to_json_string(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(self).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Parse,
                format!("failed to render package manifest: {e}"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Dependency, Manifest};
    use crate::error::CoreErrorCode;

    #[test]
    fn reads_original_manifest_ignoring_unknown_fields() {
        let json = "\u{feff}{\n  \"dependencies\": [],\n  \"content_type\": \"AIRCRAFT\",\n  \"title\": \"CRJ 550/700\",\n  \"manufacturer\": \"Bombardier\",\n  \"creator\": \"Aerosoft\",\n  \"package_version\": \"1.0.6\",\n  \"minimum_game_version\": \"1.17.3\",\n  \"total_package_size\": \"00000000001234567890\"\n}";
        let manifest = Manifest::from_json(json).expect("manifest should parse");
        assert_eq!(manifest.package_version, "1.0.6");
        assert_eq!(manifest.minimum_game_version, "1.17.3");
        assert_eq!(manifest.creator.as_deref(), Some("Aerosoft"));
        assert_eq!(manifest.release_notes.neutral.last_update, "");
    }

    #[test]
    fn writes_release_note_keys_in_pascal_case_and_omits_empty_optionals() {
        let manifest = Manifest {
            dependencies: vec![Dependency {
                name: "aerosoft-crj".to_string(),
                package_version: "1.0.6".to_string(),
            }],
            content_type: "CORE".to_string(),
            package_version: "1.0.0".to_string(),
            ..Manifest::default()
        };
        let json = manifest.to_json_string().expect("manifest should render");
        assert!(json.contains("\"LastUpdate\": \"\""));
        assert!(json.contains("\"OlderHistory\": \"\""));
        assert!(!json.contains("manufacturer"));
        assert!(!json.contains("creator"));

        let value: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");
        assert_eq!(value["dependencies"][0]["name"], "aerosoft-crj");
        assert_eq!(value["dependencies"][0]["package_version"], "1.0.6");
    }

    #[test]
    fn rejects_non_json_manifest() {
        let err = Manifest::from_json("not json").expect_err("invalid manifest");
        assert_eq!(err.code, CoreErrorCode::Parse);
    }
}
