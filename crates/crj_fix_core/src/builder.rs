//! Builds the overlay package: template definitions, patched behavior files for
//! every airframe, then `layout.json` and `manifest.json`.

use std::fs;
use std::path::{Path, PathBuf};

use log::{error, info, warn};

use crate::behavior;
use crate::catalog::ModificationCatalog;
use crate::error::{CoreError, CoreErrorCode};
use crate::install::{ORIGINAL_PACKAGE_NAME, SourcePackage};
use crate::package::{
    Dependency, LAYOUT_FILE_NAME, MANIFEST_FILE_NAME, Manifest, PackageLayout, files,
};

pub const PATCH_PACKAGE_NAME: &str = "aerosoft-crj-interaction-fix";
pub const PATCH_PACKAGE_VERSION: &str = "1.0.0";
pub const PATCH_PACKAGE_TITLE: &str = "Aerosoft CRJ Cockpit Interaction Fix";

const BEHAVIOR_DEFS_DIR: &str = "ModelBehaviorDefs";
const TEMPLATES_FILE_NAME: &str = "ASCRJ_Templates.xml";
const KNOB_PUSH_TEMPLATE: &str = include_str!("../resources/ASCRJ_Knob_Infinite_Push_Template.xml");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Airframe {
    pub id: &'static str,
    pub behavior_file: &'static str,
    /// Optional airframes are only processed when their directory exists.
    pub required: bool,
}

pub const AIRFRAMES: &[Airframe] = &[
    Airframe {
        id: "Aerosoft_CRJ_550",
        behavior_file: "CRJ550_Interior.xml",
        required: true,
    },
    Airframe {
        id: "Aerosoft_CRJ_700",
        behavior_file: "CRJ700_Interior.xml",
        required: true,
    },
    Airframe {
        id: "Aerosoft_CRJ_900",
        behavior_file: "CRJ900_Interior.xml",
        required: false,
    },
    Airframe {
        id: "Aerosoft_CRJ_1000",
        behavior_file: "CRJ1000_Interior.xml",
        required: false,
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedModel {
    pub model: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AirframeReport {
    pub airframe_id: String,
    pub processed: Vec<String>,
    pub skipped: Vec<SkippedModel>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    pub output_root: PathBuf,
    pub source_version: String,
    pub airframes: Vec<AirframeReport>,
    pub layout_entries: usize,
}

#[derive(Debug)]
pub struct PatchBuilder<'a> {
    source: &'a SourcePackage,
    output_root: PathBuf,
    catalog: &'a ModificationCatalog,
    airframes: &'a [Airframe],
}

impl<'a> PatchBuilder<'a> {
    pub fn new(
        source: &'a SourcePackage,
        output_root: impl Into<PathBuf>,
        catalog: &'a ModificationCatalog,
    ) -> Self {
        Self {
            source,
            output_root: output_root.into(),
            catalog,
            airframes: AIRFRAMES,
        }
    }

    pub fn with_airframes(mut self, airframes: &'a [Airframe]) -> Self {
        self.airframes = airframes;
        self
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Recreates the output package from scratch. On failure nothing is left
    /// behind at the output location.
    pub fn build(&self) -> Result<PatchReport, CoreError> {
        self.ensure_output_outside_source()?;
        if self.output_root.exists() {
            info!(
                "Removing existing instance of package at '{}'",
                self.output_root.display()
            );
        }
        files::delete_dir(&self.output_root)?;

        let result = files::create_dir(&self.output_root).and_then(|()| self.build_contents());
        if let Err(err) = &result {
            error!("{err}");
            if let Err(cleanup) = files::delete_dir(&self.output_root) {
                error!("failed to remove partial package: {cleanup}");
            }
        }
        result
    }

    /// The output directory is wiped before every run, so it must never be the
    /// source package or one of its parent directories.
    fn ensure_output_outside_source(&self) -> Result<(), CoreError> {
        let source = comparable_path(self.source.root());
        let output = comparable_path(&self.output_root);
        if source.starts_with(&output) {
            return Err(CoreError::new(
                CoreErrorCode::Config,
                format!(
                    "output directory {} would replace source package {}",
                    self.output_root.display(),
                    self.source.root().display()
                ),
            ));
        }
        Ok(())
    }

    fn build_contents(&self) -> Result<PatchReport, CoreError> {
        info!("Processing Model Behavior Defs");
        self.patch_templates()?;

        let mut airframes = Vec::new();
        for airframe in self.airframes {
            if let Some(report) = self.process_airframe(airframe)? {
                airframes.push(report);
            }
        }

        let layout_entries = self.write_layout()?;
        self.write_manifest()?;

        Ok(PatchReport {
            output_root: self.output_root.clone(),
            source_version: self.source.version().to_string(),
            airframes,
            layout_entries,
        })
    }

    fn patch_templates(&self) -> Result<(), CoreError> {
        let source = self
            .source
            .root()
            .join(BEHAVIOR_DEFS_DIR)
            .join(TEMPLATES_FILE_NAME);
        if !source.is_file() {
            return Err(CoreError::new(
                CoreErrorCode::SourceNotFound,
                format!("required file {} could not be found", source.display()),
            ));
        }

        let defs_dir = self.output_root.join(BEHAVIOR_DEFS_DIR);
        files::create_dir(&defs_dir)?;
        let destination = defs_dir.join(TEMPLATES_FILE_NAME);
        files::copy_file(&source, &destination)?;
        files::append_file(&destination, KNOB_PUSH_TEMPLATE)
    }

    fn process_airframe(&self, airframe: &Airframe) -> Result<Option<AirframeReport>, CoreError> {
        let relative = Path::new("SimObjects").join("Airplanes").join(airframe.id);
        let source_dir = self.source.root().join(&relative);
        if !source_dir.is_dir() {
            if airframe.required {
                return Err(CoreError::new(
                    CoreErrorCode::SourceNotFound,
                    format!(
                        "airplane directory {} could not be found",
                        source_dir.display()
                    ),
                ));
            }
            info!("Airplane '{}' is not installed, skipping", airframe.id);
            return Ok(None);
        }

        info!("Processing '{}' files", airframe.behavior_file);
        let mut report = AirframeReport {
            airframe_id: airframe.id.to_string(),
            processed: Vec::new(),
            skipped: Vec::new(),
        };

        for model in model_directories(&source_dir)? {
            info!("Processing model '{model}'");
            let behavior_path = source_dir.join(&model).join(airframe.behavior_file);
            if !behavior_path.is_file() {
                let reason = format!(
                    "required file {} could not be found",
                    behavior_path.display()
                );
                warn!("{reason}");
                report.skipped.push(SkippedModel { model, reason });
                continue;
            }

            let document = match self.patch_document(&behavior_path) {
                Ok(document) => document,
                Err(err) if err.code.skips_file() => {
                    warn!("Skipping model '{model}': {err}");
                    report.skipped.push(SkippedModel {
                        model,
                        reason: err.to_string(),
                    });
                    continue;
                }
                Err(err) => return Err(err),
            };

            let output_dir = self.output_root.join(&relative).join(&model);
            files::create_dir(&output_dir)?;
            files::write_file(
                &output_dir.join(airframe.behavior_file),
                &behavior::serialize(&document),
            )?;
            report.processed.push(model);
        }

        if report.processed.is_empty() {
            return Err(CoreError::new(
                CoreErrorCode::ZeroModelsProcessed,
                format!("failed to process any models for airplane '{}'", airframe.id),
            ));
        }
        Ok(Some(report))
    }

    fn patch_document(&self, path: &Path) -> Result<behavior::BehaviorDocument, CoreError> {
        let mut document = behavior::load_file(path)?;
        behavior::apply_catalog(&mut document.tree, self.catalog).map_err(|e| {
            CoreError::new(e.code, format!("{}: {}", path.display(), e.message))
        })?;
        Ok(document)
    }

    fn write_layout(&self) -> Result<usize, CoreError> {
        info!("Creating package layout");
        let layout = PackageLayout::scan(&self.output_root)?;
        files::write_file(
            &self.output_root.join(LAYOUT_FILE_NAME),
            &layout.to_json_string()?,
        )?;
        Ok(layout.content.len())
    }

    fn write_manifest(&self) -> Result<(), CoreError> {
        info!("Creating package manifest");
        let manifest = patch_manifest(self.source.manifest());
        files::write_file(
            &self.output_root.join(MANIFEST_FILE_NAME),
            &manifest.to_json_string()?,
        )
    }
}

/// Manifest for the overlay package, pinned to the detected original version.
pub fn patch_manifest(original: &Manifest) -> Manifest {
    Manifest {
        dependencies: vec![Dependency {
            name: ORIGINAL_PACKAGE_NAME.to_string(),
            package_version: original.package_version.clone(),
        }],
        content_type: "CORE".to_string(),
        title: PATCH_PACKAGE_TITLE.to_string(),
        package_version: PATCH_PACKAGE_VERSION.to_string(),
        minimum_game_version: original.minimum_game_version.clone(),
        ..Manifest::default()
    }
}

// A missing path cannot contain the source package, so it is compared as given.
fn comparable_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Names of the `model*` directories under an airframe, sorted.
fn model_directories(airframe_dir: &Path) -> Result<Vec<String>, CoreError> {
    let entries =
        fs::read_dir(airframe_dir).map_err(|e| CoreError::io("read directory", airframe_dir, e))?;

    let mut models = Vec::new();
    for entry_result in entries {
        let entry = entry_result.map_err(|e| CoreError::io("read entry in", airframe_dir, e))?;
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.to_ascii_lowercase().starts_with("model") {
            models.push(name);
        }
    }
    models.sort();
    Ok(models)
}
