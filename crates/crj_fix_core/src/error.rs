use std::error::Error;
use std::fmt;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreErrorCode {
    Io,
    Parse,
    Catalog,
    Config,
    MissingRequiredNode,
    NodeNotFound,
    DuplicateNodeId,
    MissingTemplateNode,
    ZeroModelsProcessed,
    SourceNotFound,
    MissingManifest,
    UnsupportedVersion,
}

impl CoreErrorCode {
    /// Codes that make a single behavior file unusable without aborting the run.
    pub fn skips_file(self) -> bool {
        matches!(
            self,
            Self::Parse | Self::MissingRequiredNode | Self::NodeNotFound
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreError {
    pub code: CoreErrorCode,
    pub message: String,
}

impl CoreError {
    pub fn new(code: CoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub(crate) fn io(action: &str, path: &Path, err: io::Error) -> Self {
        Self::new(
            CoreErrorCode::Io,
            format!("failed to {action} {}: {err}", path.display()),
        )
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl Error for CoreError {}
