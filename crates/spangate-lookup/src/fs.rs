use std::io::ErrorKind;

use anyhow::{Context, Result};

use spangate_validate::FileCheck;

/// Real filesystem existence check. Distinguishes "not there" from "could
/// not look": permission and I/O errors propagate so the strict validator
/// can treat the claim as unverifiable instead of silently absent.
pub struct FsFileCheck;

impl FileCheck for FsFileCheck {
    fn exists(&self, path: &str) -> Result<bool> {
        match std::fs::metadata(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("stat {path}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn reports_real_and_missing_paths() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("app.py");
        std::fs::write(&file, "print('ok')").unwrap();

        let check = FsFileCheck;
        assert!(check.exists(file.to_str().unwrap()).unwrap());
        assert!(!check
            .exists(dir.path().join("gone.py").to_str().unwrap())
            .unwrap());
    }
}
