use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser};
use crj_fix_core::builder::PATCH_PACKAGE_NAME;
use crj_fix_core::install::{ORIGINAL_PACKAGE_NAME, SUPPORTED_SOURCE_VERSIONS};
use crj_fix_core::{
    CoreError, CoreErrorCode, ModificationCatalog, PackageLocator, PackageSource, PatchBuilder,
    PatchReport, SourcePackage,
};
use log::{LevelFilter, info};
use serde_json::{Map as JsonMap, Value as JsonValue};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Simulator packages folder (the one holding Community and Official).
    #[arg(long, value_name = "DIR", conflicts_with = "user_config")]
    packages_path: Option<PathBuf>,
    /// UserCfg.opt to read InstalledPackagesPath from.
    #[arg(long, value_name = "UserCfg.opt")]
    user_config: Option<PathBuf>,
    /// Installed aerosoft-crj package to patch.
    #[arg(long, value_name = "DIR")]
    source: Option<PathBuf>,
    /// Where to write the patch package (replaced on every run).
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,
    #[arg(long)]
    json: bool,
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(&cli) {
        Ok(report) => {
            if cli.json {
                let rendered = serde_json::to_string_pretty(&JsonValue::Object(report_to_json(
                    &report,
                )))
                .unwrap_or_else(|e| {
                    eprintln!("Error rendering JSON output: {e}");
                    process::exit(1);
                });
                println!("{rendered}");
                return;
            }
            println!("Package generated successfully!");
            println!("Wrote {}", report.output_root.display());
        }
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!();
            eprintln!("Package generation failed");
            process::exit(1);
        }
    }
}

fn init_logging(cli: &Cli) {
    let level = if cli.quiet {
        LevelFilter::Warn
    } else {
        match cli.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<PatchReport, CoreError> {
    // Only touch the simulator install when a path was not given explicitly.
    let locator = match (&cli.source, &cli.output) {
        (Some(_), Some(_)) => None,
        _ => Some(resolve_locator(cli)?),
    };

    info!("Locating package '{ORIGINAL_PACKAGE_NAME}'");
    let source_root = match &cli.source {
        Some(path) => path.clone(),
        None => {
            let locator = require_locator(locator.as_ref())?;
            locator.find_package(ORIGINAL_PACKAGE_NAME).ok_or_else(|| {
                CoreError::new(
                    CoreErrorCode::SourceNotFound,
                    format!(
                        "failed to locate package '{ORIGINAL_PACKAGE_NAME}' under {}; install the Aerosoft CRJ before running this tool",
                        locator.packages_root().display()
                    ),
                )
            })?
        }
    };

    info!("Checking package dependencies");
    let source = SourcePackage::open(&source_root)?;
    source.ensure_supported_version(SUPPORTED_SOURCE_VERSIONS)?;

    let output_root = match &cli.output {
        Some(path) => path.clone(),
        None => require_locator(locator.as_ref())?
            .package_path(PackageSource::Community, PATCH_PACKAGE_NAME),
    };

    let catalog = ModificationCatalog::embedded()?;
    PatchBuilder::new(&source, output_root, catalog).build()
}

fn resolve_locator(cli: &Cli) -> Result<PackageLocator, CoreError> {
    if let Some(path) = &cli.packages_path {
        return Ok(PackageLocator::new(path));
    }
    if let Some(path) = &cli.user_config {
        return PackageLocator::from_user_config(path);
    }
    PackageLocator::detect()
}

fn require_locator(locator: Option<&PackageLocator>) -> Result<&PackageLocator, CoreError> {
    locator.ok_or_else(|| {
        CoreError::new(
            CoreErrorCode::Config,
            "simulator packages folder was not resolved",
        )
    })
}

fn report_to_json(report: &PatchReport) -> JsonMap<String, JsonValue> {
    let mut out = JsonMap::new();
    out.insert(
        "output".to_string(),
        JsonValue::String(report.output_root.display().to_string()),
    );
    out.insert(
        "source_version".to_string(),
        JsonValue::String(report.source_version.clone()),
    );
    out.insert(
        "layout_entries".to_string(),
        JsonValue::from(report.layout_entries),
    );

    let airframes = report
        .airframes
        .iter()
        .map(|airframe| {
            let mut obj = JsonMap::new();
            obj.insert(
                "id".to_string(),
                JsonValue::String(airframe.airframe_id.clone()),
            );
            obj.insert(
                "processed".to_string(),
                JsonValue::Array(
                    airframe
                        .processed
                        .iter()
                        .cloned()
                        .map(JsonValue::String)
                        .collect(),
                ),
            );
            obj.insert(
                "skipped".to_string(),
                JsonValue::Array(
                    airframe
                        .skipped
                        .iter()
                        .map(|skip| {
                            let mut s = JsonMap::new();
                            s.insert("model".to_string(), JsonValue::String(skip.model.clone()));
                            s.insert("reason".to_string(), JsonValue::String(skip.reason.clone()));
                            JsonValue::Object(s)
                        })
                        .collect(),
                ),
            );
            JsonValue::Object(obj)
        })
        .collect();
    out.insert("airframes".to_string(), JsonValue::Array(airframes));
    out
}
