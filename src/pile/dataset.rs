//! On-disk layout of count and result datasets.
//!
//! ```text
//! <dataset>/info.json
//! <dataset>/<region>/data.parquet               merged pile
//! <dataset>/<region>/<file_stem>/data.parquet   per-file pile, removed after merging
//! <final>/<region>/result.parquet
//! ```

use crate::utils::{Region, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const PILE_FILE: &str = "data.parquet";
pub const RESULT_FILE: &str = "result.parquet";

pub fn region_dir(dataset: &Path, region: &Region) -> PathBuf {
    dataset.join(region.to_string())
}

pub fn merged_pile_path(dataset: &Path, region: &Region) -> PathBuf {
    region_dir(dataset, region).join(PILE_FILE)
}

pub fn file_pile_path(dataset: &Path, region: &Region, file_stem: &str) -> PathBuf {
    region_dir(dataset, region).join(file_stem).join(PILE_FILE)
}

pub fn result_path(dataset: &Path, region: &Region) -> PathBuf {
    region_dir(dataset, region).join(RESULT_FILE)
}

/// Replaces whatever exists at `path` with an empty directory.
pub fn recreate_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        log::debug!("Removing existing output directory {}", path.display());
        fs::remove_dir_all(path)
            .map_err(|e| format!("Failed to remove {}: {}", path.display(), e))?;
    } else if path.exists() {
        fs::remove_file(path).map_err(|e| format!("Failed to remove {}: {}", path.display(), e))?;
    }
    fs::create_dir_all(path).map_err(|e| format!("Failed to create {}: {}", path.display(), e))?;
    Ok(())
}

/// Regions of a dataset, one per subdirectory named after a region, sorted by name.
pub fn list_regions(dataset: &Path) -> Result<Vec<Region>> {
    let entries = fs::read_dir(dataset)
        .map_err(|e| format!("Failed to read dataset {}: {}", dataset.display(), e))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();

    let mut regions = Vec::with_capacity(names.len());
    for name in names {
        match Region::from_string(&name) {
            Ok(region) => regions.push(region),
            Err(e) => log::warn!("Ignoring directory {} in {}: {}", name, dataset.display(), e),
        }
    }
    Ok(regions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_layout_paths() -> Result<()> {
        let region = Region::from_string("chrX:100-200")?;
        let root = Path::new("/data/run");
        assert_eq!(merged_pile_path(root, &region), Path::new("/data/run/chrX:100-200/data.parquet"));
        assert_eq!(
            file_pile_path(root, &region, "batch1"),
            Path::new("/data/run/chrX:100-200/batch1/data.parquet")
        );
        assert_eq!(result_path(root, &region), Path::new("/data/run/chrX:100-200/result.parquet"));
        Ok(())
    }

    #[test]
    fn test_list_regions_skips_files_and_foreign_dirs() -> Result<()> {
        let dir = tempdir()?;
        for name in ["chr2", "chr1:5-10", "not a region", "chrM"] {
            fs::create_dir(dir.path().join(name))?;
        }
        fs::write(dir.path().join("info.json"), "{}")?;

        let regions: Vec<String> = list_regions(dir.path())?
            .iter()
            .map(|r| r.to_string())
            .collect();
        assert_eq!(regions, vec!["chr1:5-10", "chr2", "chrM"]);
        Ok(())
    }

    #[test]
    fn test_recreate_dir_clears_content() -> Result<()> {
        let dir = tempdir()?;
        let out = dir.path().join("out");
        fs::create_dir(&out)?;
        fs::write(out.join("stale.parquet"), b"x")?;
        recreate_dir(&out)?;
        assert!(out.is_dir());
        assert_eq!(fs::read_dir(&out)?.count(), 0);

        let file = dir.path().join("file");
        fs::write(&file, b"x")?;
        recreate_dir(&file)?;
        assert!(file.is_dir());
        Ok(())
    }
}
