//! Run metadata persisted as `info.json` next to the region directories.

use crate::{pile::chrom::Sex, utils::Result};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::{fs, ops::AddAssign, path::Path};

pub const INFO_FILE: &str = "info.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleCounts {
    #[serde(rename = "XX")]
    pub xx: u64,
    #[serde(rename = "XY")]
    pub xy: u64,
}

impl SampleCounts {
    pub fn from_sexes<'a>(sexes: impl IntoIterator<Item = &'a Sex>) -> Self {
        let mut counts = Self::default();
        for sex in sexes {
            match sex {
                Sex::XX => counts.xx += 1,
                Sex::XY => counts.xy += 1,
            }
        }
        counts
    }
}

impl AddAssign for SampleCounts {
    fn add_assign(&mut self, other: Self) {
        self.xx += other.xx;
        self.xy += other.xy;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInfo {
    pub version: String,
    #[serde(rename = "min_DP")]
    pub min_dp: i32,
    pub sample_number: SampleCounts,
}

impl RunInfo {
    pub fn new(min_dp: i32, sample_number: SampleCounts) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            min_dp,
            sample_number,
        }
    }

    pub fn write(&self, dir: &Path) -> Result<()> {
        let path = dir.join(INFO_FILE);
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json).map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
        Ok(())
    }

    /// Reads `info.json` from a dataset directory and checks that this build can use it.
    pub fn read(dir: &Path) -> Result<Self> {
        let path = dir.join(INFO_FILE);
        let text = fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        let info: RunInfo = serde_json::from_str(&text)
            .map_err(|e| format!("Invalid run metadata in {}: {}", path.display(), e))?;
        info.check_version()
            .map_err(|e| format!("Dataset {}: {}", dir.display(), e))?;
        Ok(info)
    }

    /// Datasets are readable across releases sharing the major version.
    pub fn check_version(&self) -> Result<()> {
        let current = Version::parse(env!("CARGO_PKG_VERSION"))?;
        let found = Version::parse(&self.version)?;
        if found.major != current.major {
            return Err(format!(
                "Dataset version {} is incompatible with version {}",
                found, current
            )
            .into());
        }
        Ok(())
    }

    /// Metadata of a dataset combining `infos`, which must share the depth threshold.
    pub fn combine(infos: &[RunInfo]) -> Result<Self> {
        let Some(first) = infos.first() else {
            return Err("No datasets to combine".into());
        };
        let mut sample_number = SampleCounts::default();
        for info in infos {
            if info.min_dp != first.min_dp {
                return Err(format!(
                    "Datasets were counted with different min_DP values ({} and {})",
                    first.min_dp, info.min_dp
                )
                .into());
            }
            sample_number += info.sample_number;
        }
        Ok(Self::new(first.min_dp, sample_number))
    }
}
