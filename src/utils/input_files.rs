use crate::utils::Result;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Only bgzipped VCF and BCF can carry a random-access index.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = [".vcf.gz", ".vcf.bgz", ".bcf"];

pub fn is_vcf(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| SUPPORTED_EXTENSIONS.iter().any(|ext| name.ends_with(ext)))
}

/// Expands directories into the variant files they directly contain, keeping explicit files as given.
pub fn find_input_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut input_files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let entries = fs::read_dir(path)
                .map_err(|e| format!("Failed to list directory {}: {}", path.display(), e))?;
            let mut found = Vec::new();
            for entry in entries {
                let entry = entry
                    .map_err(|e| format!("Failed to list directory {}: {}", path.display(), e))?;
                let file = entry.path();
                if file.is_file() && is_vcf(&file) {
                    found.push(file);
                }
            }
            found.sort();
            log::debug!("Found {} variant files in {}", found.len(), path.display());
            input_files.extend(found);
        } else {
            input_files.push(path.clone());
        }
    }
    Ok(input_files)
}

/// File name with the variant file extension removed; names the per-file pile directory.
pub fn vcf_file_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    for ext in SUPPORTED_EXTENSIONS {
        if let Some(stem) = name.strip_suffix(ext) {
            return stem.to_string();
        }
    }
    log::warn!("Unknown VCF extension '{}'", name);
    name
}
