//! The overlay package written into the simulator's Community folder.

pub mod files;
mod layout;
mod manifest;

pub use layout::{ContentEntry, LAYOUT_FILE_NAME, PackageLayout, file_time_utc};
pub use manifest::{Dependency, MANIFEST_FILE_NAME, Manifest, ReleaseNote, ReleaseNotes};
