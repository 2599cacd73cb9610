//! Project loading and script discovery.
//!
//! A project directory contains `driftway.yml` plus one or more package
//! paths; every immediate subdirectory of a package path is a package. A
//! package may carry a `package.yml` manifest declaring its name and its
//! dependencies on other packages; both default (directory name, no
//! dependencies) when the manifest is absent.
//!
//! Scripts are `.sql` files anywhere under a package directory. Their
//! relative path is the intra-package ordering key under natural sort; the
//! path plays no role in identity, which belongs to the tag inside the file.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::graph::PackageGraph;
use crate::natsort::natural_cmp;
use crate::package_name::PackageName;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Name of the optional per-package manifest file.
pub const PACKAGE_MANIFEST: &str = "package.yml";

/// A discovered package directory.
#[derive(Debug, Clone)]
pub struct Package {
    /// Package name from the manifest, or the directory name
    pub name: PackageName,

    /// Absolute path of the package directory
    pub root: PathBuf,

    /// Names of packages this package depends on
    pub depends_on: Vec<PackageName>,
}

/// A discovered migration script file, not yet parsed.
#[derive(Debug, Clone)]
pub struct ScriptFile {
    /// Owning package
    pub package: PackageName,

    /// Absolute path of the script file
    pub path: PathBuf,

    /// Path relative to the package root, normalized to `/` separators.
    /// Used only for ordering and reporting, never for identity.
    pub rel_path: String,

    /// Raw script text
    pub source: String,
}

/// Per-package manifest contents.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PackageManifest {
    /// Override for the package name (defaults to the directory name)
    #[serde(default)]
    name: Option<String>,

    /// Packages that must run before this one
    #[serde(default)]
    depends_on: Vec<String>,
}

/// A loaded Driftway project.
#[derive(Debug)]
pub struct Project {
    /// Absolute project root
    pub root: PathBuf,

    /// Parsed configuration (already target-resolved by the caller)
    pub config: Config,

    /// Discovered packages
    pub packages: Vec<Package>,
}

impl Project {
    /// Load a project from a directory using an already-resolved config.
    pub fn load_with_config(path: &Path, config: Config) -> CoreResult<Self> {
        let root = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };

        if !root.exists() {
            return Err(CoreError::ProjectNotFound {
                path: root.display().to_string(),
            });
        }

        let packages = discover_packages(&root, &config)?;

        Ok(Self {
            root,
            config,
            packages,
        })
    }

    /// Load a project from a directory, reading `driftway.yml` from it.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let config = Config::load_from_dir(path)?;
        Self::load_with_config(path, config)
    }

    /// Build the package dependency graph, validating that every declared
    /// dependency names a discovered package.
    pub fn package_graph(&self) -> CoreResult<PackageGraph> {
        let mut dependencies: BTreeMap<PackageName, Vec<PackageName>> = BTreeMap::new();
        for package in &self.packages {
            dependencies.insert(package.name.clone(), package.depends_on.clone());
        }

        for package in &self.packages {
            for dep in &package.depends_on {
                if !dependencies.contains_key(dep) {
                    return Err(CoreError::UnknownDependency {
                        package: package.name.to_string(),
                        depends_on: dep.to_string(),
                    });
                }
            }
        }

        PackageGraph::build(&dependencies)
    }

    /// Packages in execution order.
    pub fn ordered_packages(&self) -> CoreResult<Vec<PackageName>> {
        self.package_graph()?.topological_order()
    }

    /// All scripts across all packages in execution order: package
    /// topological order first, natural path order within each package.
    pub fn ordered_scripts(&self) -> CoreResult<Vec<ScriptFile>> {
        let order = self.ordered_packages()?;

        let mut scripts = Vec::new();
        for name in &order {
            let Some(package) = self.packages.iter().find(|p| &p.name == name) else {
                continue;
            };

            let mut files = Vec::new();
            collect_sql_files(&package.root, &package.root, &mut files)?;
            files.sort_by(|a, b| natural_cmp(&a.1, &b.1));

            for (path, rel_path) in files {
                let source = std::fs::read_to_string(&path).map_err(|e| CoreError::IoWithPath {
                    path: path.display().to_string(),
                    source: e,
                })?;
                scripts.push(ScriptFile {
                    package: package.name.clone(),
                    path,
                    rel_path,
                    source,
                });
            }
        }

        Ok(scripts)
    }
}

/// Discover packages under every configured package path.
fn discover_packages(root: &Path, config: &Config) -> CoreResult<Vec<Package>> {
    let mut packages: Vec<Package> = Vec::new();

    for package_path in &config.package_paths {
        let dir = root.join(package_path);
        if !dir.exists() {
            log::warn!("Package path does not exist, skipping: {}", dir.display());
            continue;
        }

        let mut entries: Vec<PathBuf> = std::fs::read_dir(&dir)
            .map_err(|e| CoreError::IoWithPath {
                path: dir.display().to_string(),
                source: e,
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_dir())
            .collect();
        entries.sort();

        for package_dir in entries {
            let package = load_package(&package_dir)?;
            if let Some(existing) = packages.iter().find(|p| p.name == package.name) {
                return Err(CoreError::DuplicatePackage {
                    name: package.name.to_string(),
                    path1: existing.root.display().to_string(),
                    path2: package.root.display().to_string(),
                });
            }
            packages.push(package);
        }
    }

    Ok(packages)
}

/// Load a single package directory, reading its manifest when present.
fn load_package(dir: &Path) -> CoreResult<Package> {
    let manifest_path = dir.join(PACKAGE_MANIFEST);
    let manifest: PackageManifest = if manifest_path.exists() {
        let content =
            std::fs::read_to_string(&manifest_path).map_err(|e| CoreError::IoWithPath {
                path: manifest_path.display().to_string(),
                source: e,
            })?;
        serde_yaml::from_str(&content)?
    } else {
        PackageManifest::default()
    };

    let dir_name = dir
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| CoreError::InvalidName {
            context: format!("package directory {}", dir.display()),
            reason: "directory name is not valid UTF-8".to_string(),
        })?;

    let raw_name = manifest.name.unwrap_or(dir_name);
    let name = PackageName::try_new(raw_name.clone()).ok_or_else(|| CoreError::InvalidName {
        context: format!("package manifest {}", manifest_path.display()),
        reason: format!("'{}' is not a valid package name", raw_name),
    })?;

    let mut depends_on = Vec::new();
    for dep in manifest.depends_on {
        let dep_name = PackageName::try_new(dep.clone()).ok_or_else(|| CoreError::InvalidName {
            context: format!("depends_on in {}", manifest_path.display()),
            reason: format!("'{}' is not a valid package name", dep),
        })?;
        depends_on.push(dep_name);
    }

    Ok(Package {
        name,
        root: dir.to_path_buf(),
        depends_on,
    })
}

/// Recursively collect `.sql` files under `dir`, returning absolute paths
/// paired with `/`-normalized paths relative to `base`.
fn collect_sql_files(
    dir: &Path,
    base: &Path,
    files: &mut Vec<(PathBuf, String)>,
) -> CoreResult<()> {
    for entry in std::fs::read_dir(dir).map_err(|e| CoreError::IoWithPath {
        path: dir.display().to_string(),
        source: e,
    })? {
        let entry = entry.map_err(|e| CoreError::IoWithPath {
            path: dir.display().to_string(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_sql_files(&path, base, files)?;
            continue;
        }
        if !path.extension().is_some_and(|e| e == "sql") {
            continue;
        }
        let rel_path = path
            .strip_prefix(base)
            .unwrap_or(&path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push((path, rel_path));
    }
    Ok(())
}

#[cfg(test)]
#[path = "project_test.rs"]
mod tests;
