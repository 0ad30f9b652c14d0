use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const STORE_ENV: &str = "FILMSHELF_STORE";
const DEFAULT_FILE_NAME: &str = "movies.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Json,
    Csv,
}

impl StoreKind {
    /// Pick the backend from the file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("csv") => Ok(Self::Csv),
            other => Err(Error::Config(format!(
                "unsupported store extension '{}', use a .json or .csv file",
                other.unwrap_or("(none)")
            ))),
        }
    }
}

/// Where the catalog lives and which backend reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub kind: StoreKind,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let kind = StoreKind::from_path(&path)?;
        Ok(Self { path, kind })
    }

    /// Resolve the store file from, in order of priority:
    /// 1. An explicit path (from --store)
    /// 2. The FILMSHELF_STORE environment variable
    /// 3. `movies.csv` in the XDG data directory (~/.local/share/filmshelf/)
    ///
    /// The parent directory is created when missing.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let path = if let Some(path) = explicit {
            path.to_path_buf()
        } else if let Ok(val) = std::env::var(STORE_ENV) {
            PathBuf::from(val)
        } else {
            xdg::BaseDirectories::with_prefix("filmshelf")
                .get_data_home()
                .ok_or_else(|| {
                    Error::Config(
                        "could not determine XDG data home directory".into(),
                    )
                })?
                .join(DEFAULT_FILE_NAME)
        };

        let config = Self::new(path)?;
        if let Some(parent) = config.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Config(format!(
                    "cannot create store directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_extension() {
        assert_eq!(
            StoreKind::from_path(Path::new("a/movies.json")).unwrap(),
            StoreKind::Json
        );
        assert_eq!(
            StoreKind::from_path(Path::new("movies.CSV")).unwrap(),
            StoreKind::Csv
        );
    }

    #[test]
    fn unsupported_extension_is_config_error() {
        for bad in ["movies.txt", "movies"] {
            assert!(matches!(
                StoreKind::from_path(Path::new(bad)),
                Err(Error::Config(_))
            ));
        }
    }

    #[test]
    fn resolve_with_explicit_path_creates_parent() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/dir/john.json");
        let config = StoreConfig::resolve(Some(&path)).unwrap();

        assert_eq!(config.path, path);
        assert_eq!(config.kind, StoreKind::Json);
        assert!(tmp.path().join("nested/dir").is_dir());
    }
}
