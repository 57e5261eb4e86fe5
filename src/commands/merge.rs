use super::{initialize_thread_pool, progress_bar};
use crate::{
    cli::MergeArgs,
    pile::{
        dataset::{list_regions, merged_pile_path, recreate_dir, region_dir},
        merger::PileAggregator,
        metadata::RunInfo,
    },
    utils::{Region, Result},
};
use rayon::prelude::*;
use std::{fs, path::Path, path::PathBuf};

pub fn merge(args: MergeArgs) -> Result<()> {
    let infos = args
        .datasets
        .iter()
        .map(|dataset| RunInfo::read(dataset))
        .collect::<Result<Vec<_>>>()?;
    let info = RunInfo::combine(&infos)?;
    log::info!(
        "Merging {} datasets with {} XX and {} XY samples",
        args.datasets.len(),
        info.sample_number.xx,
        info.sample_number.xy
    );

    let mut regions = Vec::new();
    for dataset in &args.datasets {
        regions.extend(list_regions(dataset)?);
    }
    regions.sort_by_key(|region| region.to_string());
    regions.dedup();

    recreate_dir(&args.output)?;
    info.write(&args.output)?;

    let pool = initialize_thread_pool(args.threads)?;
    pool.install(|| {
        let pb = progress_bar(regions.len(), "Merging datasets");
        let result = regions.par_iter().try_for_each(|region| -> Result<()> {
            merge_region(&args.datasets, region, &args.output)?;
            pb.inc(1);
            Ok(())
        });
        pb.finish_and_clear();
        result
    })
}

/// Regions absent from a dataset contribute nothing.
fn merge_region(datasets: &[PathBuf], region: &Region, output: &Path) -> Result<usize> {
    let mut aggregator = PileAggregator::new();
    for dataset in datasets {
        let pile = merged_pile_path(dataset, region);
        if pile.is_file() {
            aggregator.add_merged_file(&pile)?;
        } else {
            log::debug!("{} has no pile for {}", dataset.display(), region);
        }
    }
    let dir = region_dir(output, region);
    fs::create_dir_all(&dir).map_err(|e| format!("Failed to create {}: {}", dir.display(), e))?;
    aggregator.write(&merged_pile_path(output, region))
}
