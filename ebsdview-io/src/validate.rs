//! Master-file path validation.

use std::path::Path;

use crate::{Error, Result};

/// Accepted master-file suffixes.
pub const MASTER_FILE_SUFFIXES: [&str; 2] = ["h5", "dream3d"];

/// Everything after the first `.` of the file name (`"a.tar.h5"` -> `"tar.h5"`).
#[must_use]
pub fn complete_suffix(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy();
    name.split_once('.').map(|(_, suffix)| suffix.to_string())
}

/// Checks that `path` is set, exists and names an HDF5 master file.
///
/// # Errors
/// Returns [`Error::MissingPath`], [`Error::NotFound`] or [`Error::NotHdf5`];
/// their messages are meant to be shown to the user as-is.
pub fn validate_master_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(Error::MissingPath);
    }
    if !path.exists() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    match complete_suffix(path) {
        Some(suffix) if MASTER_FILE_SUFFIXES.contains(&suffix.as_str()) => Ok(()),
        _ => Err(Error::NotHdf5(path.to_path_buf())),
    }
}

/// Human-readable description of a master-file path, one line per field.
#[must_use]
pub fn path_summary(path: &Path) -> Vec<String> {
    let parent = path
        .parent()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    vec![
        format!("Full Path: {}", path.display()),
        format!("Path: {parent}"),
        format!("Data File: {file_name}"),
        format!("Suffix: {}\n", complete_suffix(path).unwrap_or_default()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_complete_suffix() {
        assert_eq!(complete_suffix(Path::new("/a/b/Ni.h5")).as_deref(), Some("h5"));
        assert_eq!(
            complete_suffix(Path::new("Ni.master.h5")).as_deref(),
            Some("master.h5")
        );
        assert_eq!(complete_suffix(Path::new("README")), None);
    }

    #[test]
    fn test_validate_missing_and_nonexistent() {
        assert!(matches!(
            validate_master_path(Path::new("")),
            Err(Error::MissingPath)
        ));
        let err = validate_master_path(Path::new("/definitely/not/here.h5")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_validate_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("Ni.h5");
        let dream = dir.path().join("Ni.dream3d");
        let bad = dir.path().join("Ni.txt");
        let double = dir.path().join("Ni.old.h5");
        for p in [&good, &dream, &bad, &double] {
            std::fs::write(p, b"").unwrap();
        }
        assert!(validate_master_path(&good).is_ok());
        assert!(validate_master_path(&dream).is_ok());
        assert!(matches!(validate_master_path(&bad), Err(Error::NotHdf5(_))));
        assert!(matches!(
            validate_master_path(&double),
            Err(Error::NotHdf5(_))
        ));
    }

    #[test]
    fn test_path_summary() {
        let lines = path_summary(&PathBuf::from("/data/Ni-master.h5"));
        assert_eq!(lines[0], "Full Path: /data/Ni-master.h5");
        assert_eq!(lines[1], "Path: /data");
        assert_eq!(lines[2], "Data File: Ni-master.h5");
        assert_eq!(lines[3], "Suffix: h5\n");
    }
}
