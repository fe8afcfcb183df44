use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

pub const EVALUATION_MODE_MESSAGE: &str = "Warning: Running in evaluation mode";

/// Whether a license file was found. A missing license never blocks conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseState {
    path: PathBuf,
    licensed: bool,
}

/// Relative paths are taken from `base` (the executable's directory), absolute ones as is.
pub fn resolve_license_path(path: &Path, base: Option<&Path>) -> PathBuf {
    match base {
        Some(base) if path.is_relative() => base.join(path),
        _ => path.to_path_buf(),
    }
}

impl LicenseState {
    pub fn load(path: &Path) -> Self {
        let exe_dir = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        Self::load_from(&resolve_license_path(path, exe_dir.as_deref()))
    }

    /// Checks an already resolved path: an existing, readable, non-empty file licenses.
    pub fn load_from(path: &Path) -> Self {
        let licensed = match fs::read(path) {
            Ok(bytes) if !bytes.is_empty() => {
                info!("License loaded from {}", path.display());
                true
            }
            Ok(_) => {
                warn!("License file {} is empty. Running in evaluation mode.", path.display());
                false
            }
            Err(e) => {
                warn!("License file not found at {} ({e}). Running in evaluation mode.", path.display());
                false
            }
        };
        Self {
            path: path.to_path_buf(),
            licensed,
        }
    }

    pub fn evaluation() -> Self {
        Self {
            path: PathBuf::new(),
            licensed: false,
        }
    }

    pub fn is_licensed(&self) -> bool {
        self.licensed
    }

    pub fn evaluation_mode(&self) -> bool {
        !self.licensed
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_relative_paths_resolve_against_base() {
        let base = Path::new("/opt/reportmerge/bin");
        assert_eq!(
            resolve_license_path(Path::new("../reportmerge.lic"), Some(base)),
            PathBuf::from("/opt/reportmerge/bin/../reportmerge.lic")
        );
        assert_eq!(
            resolve_license_path(Path::new("/etc/reportmerge.lic"), Some(base)),
            PathBuf::from("/etc/reportmerge.lic")
        );
    }

    #[test]
    fn test_license_states() {
        let dir = TempDir::new().unwrap();
        let missing = LicenseState::load_from(&dir.path().join("none.lic"));
        assert!(missing.evaluation_mode());

        let empty = dir.path().join("empty.lic");
        fs::write(&empty, "").unwrap();
        assert!(LicenseState::load_from(&empty).evaluation_mode());

        let valid = dir.path().join("valid.lic");
        fs::write(&valid, "<License/>").unwrap();
        let state = LicenseState::load_from(&valid);
        assert!(state.is_licensed());
        assert_eq!(state.path(), valid.as_path());
    }
}
