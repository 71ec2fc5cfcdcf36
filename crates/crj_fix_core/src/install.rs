//! Locating the simulator's package folders and the original CRJ package.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{CoreError, CoreErrorCode};
use crate::package::{MANIFEST_FILE_NAME, Manifest};

pub const ORIGINAL_PACKAGE_NAME: &str = "aerosoft-crj";

/// Original package versions whose behavior files the catalog was written against.
pub const SUPPORTED_SOURCE_VERSIONS: &[&str] = &["1.0.6", "1.0.7"];

const INSTALLED_PACKAGES_KEY: &str = "InstalledPackagesPath";

const STORE_USER_CFG: &[&str] = &[
    "AppData",
    "Local",
    "Packages",
    "Microsoft.FlightSimulator_8wekyb3d8bbwe",
    "LocalCache",
    "UserCfg.opt",
];
const STEAM_USER_CFG: &[&str] = &[
    "AppData",
    "Roaming",
    "Microsoft Flight Simulator",
    "UserCfg.opt",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageSource {
    Community,
    Official,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLocator {
    packages_root: PathBuf,
}

impl PackageLocator {
    pub fn new(packages_root: impl Into<PathBuf>) -> Self {
        Self {
            packages_root: packages_root.into(),
        }
    }

    /// Reads `InstalledPackagesPath` from a `UserCfg.opt` file.
    pub fn from_user_config(path: &Path) -> Result<Self, CoreError> {
        let contents = fs::read_to_string(path).map_err(|e| CoreError::io("read", path, e))?;
        let packages_root = parse_installed_packages_path(&contents).ok_or_else(|| {
            CoreError::new(
                CoreErrorCode::Config,
                format!(
                    "failed to find '{INSTALLED_PACKAGES_KEY}' in user config {}",
                    path.display()
                ),
            )
        })?;
        debug!(
            "{} points at packages folder '{}'",
            path.display(),
            packages_root.display()
        );
        Ok(Self::new(packages_root))
    }

    /// Tries the Microsoft Store install's config first, then the Steam one.
    pub fn from_profile_dir(profile: &Path) -> Result<Self, CoreError> {
        for parts in [STORE_USER_CFG, STEAM_USER_CFG] {
            let candidate = parts.iter().fold(profile.to_path_buf(), |acc, p| acc.join(p));
            if candidate.is_file() {
                info!("Using user config '{}'", candidate.display());
                return Self::from_user_config(&candidate);
            }
        }
        Err(CoreError::new(
            CoreErrorCode::Config,
            format!("failed to resolve UserCfg.opt under {}", profile.display()),
        ))
    }

    pub fn detect() -> Result<Self, CoreError> {
        let profile = env::var_os("USERPROFILE")
            .or_else(|| env::var_os("HOME"))
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                CoreError::new(CoreErrorCode::Config, "failed to resolve user profile path")
            })?;
        Self::from_profile_dir(Path::new(&profile))
    }

    pub fn packages_root(&self) -> &Path {
        &self.packages_root
    }

    pub fn package_path(&self, source: PackageSource, name: &str) -> PathBuf {
        match source {
            PackageSource::Community => self.packages_root.join("Community").join(name),
            PackageSource::Official => self
                .packages_root
                .join("Official")
                .join("OneStore")
                .join(name),
        }
    }

    /// Community installs shadow official ones, so they are checked first.
    pub fn find_package(&self, name: &str) -> Option<PathBuf> {
        [PackageSource::Community, PackageSource::Official]
            .into_iter()
            .map(|source| self.package_path(source, name))
            .find(|path| path.is_dir())
    }
}

pub fn parse_installed_packages_path(contents: &str) -> Option<PathBuf> {
    contents
        .lines()
        .find_map(|line| line.trim_start().strip_prefix(INSTALLED_PACKAGES_KEY))
        .map(|rest| rest.trim().trim_matches('"'))
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// The installed package being patched, with its manifest already read.
#[derive(Debug, Clone)]
pub struct SourcePackage {
    root: PathBuf,
    manifest: Manifest,
}

impl SourcePackage {
    pub fn open(root: &Path) -> Result<Self, CoreError> {
        if !root.is_dir() {
            return Err(CoreError::new(
                CoreErrorCode::SourceNotFound,
                format!("failed to locate package at {}", root.display()),
            ));
        }

        let manifest_path = root.join(MANIFEST_FILE_NAME);
        if !manifest_path.is_file() {
            return Err(CoreError::new(
                CoreErrorCode::MissingManifest,
                format!(
                    "unable to locate the package manifest file at {}",
                    manifest_path.display()
                ),
            ));
        }

        Ok(Self {
            root: root.to_path_buf(),
            manifest: Manifest::load(&manifest_path)?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn version(&self) -> &str {
        &self.manifest.package_version
    }

    pub fn ensure_supported_version(&self, supported: &[&str]) -> Result<(), CoreError> {
        if supported.contains(&self.version()) {
            return Ok(());
        }
        Err(CoreError::new(
            CoreErrorCode::UnsupportedVersion,
            format!(
                "package version {} is installed; supported versions: {}",
                self.version(),
                supported.join(", ")
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::{
        PackageLocator, PackageSource, STEAM_USER_CFG, SUPPORTED_SOURCE_VERSIONS, SourcePackage,
        parse_installed_packages_path,
    };
    use crate::error::CoreErrorCode;

    #[test]
    fn parses_installed_packages_path_line() {
        let cfg = "Version 54\r\n{Graphics\r\n}\r\nInstalledPackagesPath \"D:\\MSFS Packages\"\r\n";
        assert_eq!(
            parse_installed_packages_path(cfg),
            Some(PathBuf::from("D:\\MSFS Packages"))
        );
        assert_eq!(parse_installed_packages_path("Version 54\n"), None);
        assert_eq!(parse_installed_packages_path("InstalledPackagesPath \"\"\n"), None);
    }

    #[test]
    fn package_paths_follow_community_and_official_layout() {
        let locator = PackageLocator::new("/packages");
        assert_eq!(
            locator.package_path(PackageSource::Community, "aerosoft-crj"),
            Path::new("/packages").join("Community").join("aerosoft-crj")
        );
        assert_eq!(
            locator.package_path(PackageSource::Official, "aerosoft-crj"),
            Path::new("/packages")
                .join("Official")
                .join("OneStore")
                .join("aerosoft-crj")
        );
    }

    #[test]
    fn profile_lookup_reads_steam_config_and_prefers_community() {
        let root = temp_test_dir("install_profile");
        let packages = root.join("Packages Root");
        let cfg = STEAM_USER_CFG.iter().fold(root.clone(), |acc, p| acc.join(p));
        fs::create_dir_all(cfg.parent().expect("cfg has a parent"))
            .expect("failed to create config dir");
        fs::write(
            &cfg,
            format!("InstalledPackagesPath \"{}\"\n", packages.display()),
        )
        .expect("failed to write config");

        let official = packages.join("Official").join("OneStore").join("aerosoft-crj");
        fs::create_dir_all(&official).expect("failed to create official package");

        let locator = PackageLocator::from_profile_dir(&root).expect("config should resolve");
        assert_eq!(locator.packages_root(), packages.as_path());
        assert_eq!(locator.find_package("aerosoft-crj"), Some(official));

        let community = packages.join("Community").join("aerosoft-crj");
        fs::create_dir_all(&community).expect("failed to create community package");
        assert_eq!(locator.find_package("aerosoft-crj"), Some(community));
        assert_eq!(locator.find_package("missing"), None);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn missing_user_config_is_a_config_error() {
        let root = temp_test_dir("install_no_cfg");
        let err = PackageLocator::from_profile_dir(&root).expect_err("nothing to find");
        assert_eq!(err.code, CoreErrorCode::Config);
    }

    #[test]
    fn source_package_requires_directory_and_manifest() {
        let root = temp_test_dir("install_source");
        let err = SourcePackage::open(&root).expect_err("directory missing");
        assert_eq!(err.code, CoreErrorCode::SourceNotFound);

        fs::create_dir_all(&root).expect("failed to create package dir");
        let err = SourcePackage::open(&root).expect_err("manifest missing");
        assert_eq!(err.code, CoreErrorCode::MissingManifest);

        fs::write(
            root.join("manifest.json"),
            r#"{"package_version": "1.0.2", "minimum_game_version": "1.17.3"}"#,
        )
        .expect("failed to write manifest");
        let package = SourcePackage::open(&root).expect("package should open");
        assert_eq!(package.version(), "1.0.2");
        let err = package
            .ensure_supported_version(SUPPORTED_SOURCE_VERSIONS)
            .expect_err("1.0.2 is not supported");
        assert_eq!(err.code, CoreErrorCode::UnsupportedVersion);
        assert!(package.ensure_supported_version(&["1.0.2"]).is_ok());

        let _ = fs::remove_dir_all(&root);
    }

    fn temp_test_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "crj_fix_{}_{}_{}",
            prefix,
            std::process::id(),
            nanos
        ))
    }
}
