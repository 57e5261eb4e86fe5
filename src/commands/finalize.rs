use super::{initialize_thread_pool, progress_bar};
use crate::{
    cli::FinalizeArgs,
    pile::{
        dataset::{list_regions, merged_pile_path, recreate_dir, region_dir, result_path},
        finalize::Finalizer,
        metadata::{RunInfo, SampleCounts, INFO_FILE},
    },
    utils::{Region, Result},
};
use rayon::prelude::*;
use std::{fs, path::Path};

pub fn finalize(args: FinalizeArgs) -> Result<()> {
    let info = RunInfo::read(&args.dataset)?;
    let regions = list_regions(&args.dataset)?;
    log::info!(
        "Finalizing {} regions for {} XX and {} XY samples",
        regions.len(),
        info.sample_number.xx,
        info.sample_number.xy
    );

    recreate_dir(&args.output)?;
    let info_src = args.dataset.join(INFO_FILE);
    fs::copy(&info_src, args.output.join(INFO_FILE))
        .map_err(|e| format!("Failed to copy {}: {}", info_src.display(), e))?;

    let pool = initialize_thread_pool(args.threads)?;
    pool.install(|| {
        let pb = progress_bar(regions.len(), "Finalizing dataset");
        let result = regions.par_iter().try_for_each(|region| -> Result<()> {
            finalize_region(&args.dataset, region, info.sample_number, &args.output)?;
            pb.inc(1);
            Ok(())
        });
        pb.finish_and_clear();
        result
    })
}

fn finalize_region(
    dataset: &Path,
    region: &Region,
    counts: SampleCounts,
    output: &Path,
) -> Result<usize> {
    let merged = merged_pile_path(dataset, region);
    if !merged.is_file() {
        return Err(format!("Missing merged pile {}", merged.display()).into());
    }
    let dir = region_dir(output, region);
    fs::create_dir_all(&dir).map_err(|e| format!("Failed to create {}: {}", dir.display(), e))?;

    let n_rows = Finalizer::for_contig(counts, &region.contig)
        .finalize_file(&merged, &result_path(output, region))?;
    log::debug!("{}: {} variant alleles", region, n_rows);
    Ok(n_rows)
}
