use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreErrorCode};

pub const LAYOUT_FILE_NAME: &str = "layout.json";

// 100 ns ticks between 1601-01-01 and 1970-01-01.
const FILETIME_UNIX_EPOCH: i64 = 116_444_736_000_000_000;
const FILETIME_TICKS_PER_SECOND: i64 = 10_000_000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageLayout {
    pub content: Vec<ContentEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub path: String,
    pub size: u64,
    pub date: i64,
}

impl PackageLayout {
    /// Lists every file under `root`, sorted by package-relative path.
    pub fn scan(root: &Path) -> Result<Self, CoreError> {
        let mut files = Vec::new();
        collect_files(root, &mut files)?;

        let mut content = Vec::with_capacity(files.len());
        for file in files {
            let metadata = fs::metadata(&file).map_err(|e| CoreError::io("inspect", &file, e))?;
            let modified = metadata
                .modified()
                .map_err(|e| CoreError::io("read modification time of", &file, e))?;
            content.push(ContentEntry {
                path: package_path(root, &file)?,
                size: metadata.len(),
                date: file_time_utc(modified),
            });
        }
        content.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(Self { content })
    }

    /// Pretty JSON with LF line endings; non-ASCII text is left unescaped.
    pub fn to_json_string(&self) -> Result<String, CoreError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Parse,
                format!("failed to render package layout: {e}"),
            )
        })?;
        Ok(json.replace("\r\n", "\n"))
    }
}

/// Converts a timestamp to a Windows FILETIME value (UTC).
pub fn file_time_utc(time: SystemTime) -> i64 {
    let ticks = match time.duration_since(UNIX_EPOCH) {
        Ok(after) => duration_ticks(after),
        Err(before) => -duration_ticks(before.duration()),
    };
    FILETIME_UNIX_EPOCH + ticks
}

fn duration_ticks(duration: std::time::Duration) -> i64 {
    duration.as_secs() as i64 * FILETIME_TICKS_PER_SECOND + i64::from(duration.subsec_nanos() / 100)
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), CoreError> {
    let entries = fs::read_dir(dir).map_err(|e| CoreError::io("read directory", dir, e))?;
    for entry_result in entries {
        let entry = entry_result.map_err(|e| CoreError::io("read entry in", dir, e))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|e| CoreError::io("inspect", &path, e))?;
        if file_type.is_dir() {
            collect_files(&path, out)?;
        } else if file_type.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn package_path(root: &Path, file: &Path) -> Result<String, CoreError> {
    let relative = file.strip_prefix(root).map_err(|_| {
        CoreError::new(
            CoreErrorCode::Io,
            format!("{} is outside {}", file.display(), root.display()),
        )
    })?;
    let parts: Vec<String> = relative
        .components()
        .map(|part| part.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}
