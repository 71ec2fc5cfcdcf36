//! Patch engine for the Aerosoft CRJ cockpit interaction fix.
//!
//! Reads the CRJ's model behavior files, swaps separate knob and push-button
//! components for a single knob-with-push template, and writes the result as
//! an overlay package next to the original.

pub mod behavior;
pub mod builder;
pub mod catalog;
pub mod error;
pub mod install;
pub mod package;

pub use builder::{AIRFRAMES, Airframe, AirframeReport, PatchBuilder, PatchReport, SkippedModel};
pub use catalog::{ModificationCatalog, ModificationEntry};
pub use error::{CoreError, CoreErrorCode};
pub use install::{PackageLocator, PackageSource, SourcePackage};
