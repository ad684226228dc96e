// src/write/mod.rs
pub mod json;
pub mod xlsx;

pub use json::write_json;
pub use xlsx::write_xlsx;

use anyhow::{anyhow, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Hidden sibling that output is staged in before being renamed into place.
pub fn tmp_path_for(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("output path {} has no file name", path.display()))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok(dir.join(format!(".{}.tmp", file_name.to_string_lossy())))
}

/// Run `write` against a tmp file, then rename it over `path`.
///
/// A failing `write` leaves `path` as it was and removes the tmp file.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
{
    let tmp_path = tmp_path_for(path)?;

    if let Err(err) = write(&tmp_path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err).with_context(|| format!("renaming {:?} -> {:?}", tmp_path, path));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn tmp_path_is_hidden_sibling() -> Result<()> {
        let tmp = tmp_path_for(Path::new("out/ride.json"))?;
        assert_eq!(tmp, PathBuf::from("out/.ride.json.tmp"));
        let tmp = tmp_path_for(Path::new("ride.json"))?;
        assert_eq!(tmp, PathBuf::from("./.ride.json.tmp"));
        Ok(())
    }

    #[test]
    fn failed_write_keeps_existing_output() -> Result<()> {
        let dir = tempdir()?;
        let target = dir.path().join("ride.json");
        fs::write(&target, "previous")?;

        let res = write_atomic(&target, |tmp| {
            fs::write(tmp, "half")?;
            Err(anyhow!("boom"))
        });

        assert!(res.is_err());
        assert_eq!(fs::read_to_string(&target)?, "previous");
        assert!(!tmp_path_for(&target)?.exists());
        Ok(())
    }

    #[test]
    fn successful_write_replaces_output() -> Result<()> {
        let dir = tempdir()?;
        let target = dir.path().join("ride.json");
        fs::write(&target, "previous")?;

        write_atomic(&target, |tmp| Ok(fs::write(tmp, "fresh")?))?;

        assert_eq!(fs::read_to_string(&target)?, "fresh");
        Ok(())
    }
}
