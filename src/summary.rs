use crate::distance::{DistanceMatrix, FeatureMatrix};
use crate::error::SummaryError;
use crate::output;
use crate::report;
use crate::rows::{self, SampleRow};
use crate::schema::UnifiedSchema;
use crate::tree::{RemoveOnDrop, TreeBuilder};
use crate::types::Sample;
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Options for a summary run
#[derive(Debug, Clone)]
pub struct SummaryConfig {
    pub filenames: Vec<String>,
    /// File listing one report path per line
    pub fofn: Option<PathBuf>,
    pub include_all_variant_columns: bool,
    pub min_id: f64,
    pub outfile: PathBuf,
    pub phandango_prefix: Option<String>,
    pub quiet: bool,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            filenames: Vec::new(),
            fofn: None,
            include_all_variant_columns: false,
            min_id: 90.0,
            outfile: PathBuf::from("summary.csv"),
            phandango_prefix: None,
            quiet: false,
        }
    }
}

/// Counts reported at the end of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub samples: usize,
    pub clusters: usize,
    pub variant_columns: usize,
}

pub struct Summary {
    config: SummaryConfig,
    filenames: Vec<String>,
}

/// Read a file of filenames, one per line.
pub fn load_fofn(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file of filenames: {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect())
}

/// Fail on the first input that does not exist.
pub fn check_files_exist(filenames: &[String]) -> Result<()> {
    for name in filenames {
        if !Path::new(name).exists() {
            return Err(SummaryError::MissingFile(PathBuf::from(name)).into());
        }
    }
    Ok(())
}

/// Load every report in parallel; the result keeps input order.
pub fn load_samples(filenames: &[String], min_id: f64, pb: Option<&ProgressBar>) -> Result<Vec<Sample>> {
    filenames
        .par_iter()
        .map(|name| {
            let sample = report::load_sample(Path::new(name), min_id);
            if let Some(pb) = pb {
                pb.inc(1);
            }
            sample
        })
        .collect()
}

/// Write `<prefix>.distance_matrix` (removed afterwards), `<prefix>.tre` and
/// the annotated `<prefix>.csv`.
pub fn write_comparison_files(rows: &[SampleRow], prefix: &str, tree_builder: &dyn TreeBuilder) -> Result<()> {
    let distance_file = PathBuf::from(format!("{}.distance_matrix", prefix));
    let tree_file = PathBuf::from(format!("{}.tre", prefix));
    let csv_file = PathBuf::from(format!("{}.csv", prefix));

    let matrix = DistanceMatrix::compute(&FeatureMatrix::from_rows(rows))?;
    {
        let _cleanup = RemoveOnDrop(vec![distance_file.clone()]);
        matrix.write(&distance_file)?;
        tree_builder.build_tree(&distance_file, &tree_file)?;
    }
    output::write_phandango_csv(rows, &csv_file)
}

impl Summary {
    pub fn new(config: SummaryConfig) -> Result<Self> {
        if config.filenames.is_empty() && config.fofn.is_none() {
            return Err(SummaryError::Configuration(
                "must supply filenames or a file of filenames".to_string(),
            )
            .into());
        }

        let mut filenames = config.filenames.clone();
        if let Some(fofn) = &config.fofn {
            if !fofn.exists() {
                return Err(SummaryError::MissingFile(fofn.clone()).into());
            }
            filenames.extend(load_fofn(fofn)?);
        }
        if filenames.is_empty() {
            return Err(SummaryError::Configuration("no input files listed".to_string()).into());
        }

        Ok(Self { config, filenames })
    }

    pub fn filenames(&self) -> &[String] {
        &self.filenames
    }

    /// Load, unify, build rows, then write every requested output.
    pub fn run(&self, tree_builder: &dyn TreeBuilder, pb: Option<&ProgressBar>) -> Result<RunStats> {
        let quiet = self.config.quiet;
        check_files_exist(&self.filenames)?;

        progress!(quiet, "Loading {} report(s)...", self.filenames.len());
        let samples = load_samples(&self.filenames, self.config.min_id, pb)?;
        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        let schema = UnifiedSchema::from_samples(&samples);
        progress!(
            quiet,
            "  {} cluster(s), {} variant column(s)",
            schema.n_clusters(),
            schema.n_variant_columns()
        );

        let rows = rows::build_rows(&schema, &samples, self.config.include_all_variant_columns);

        progress!(quiet, "Writing table to {}", self.config.outfile.display());
        output::write_table(&rows, &self.config.outfile)?;

        if let Some(prefix) = &self.config.phandango_prefix {
            progress!(quiet, "Writing comparison files with prefix {}", prefix);
            write_comparison_files(&rows, prefix, tree_builder)?;
        }

        Ok(RunStats {
            samples: samples.len(),
            clusters: schema.n_clusters(),
            variant_columns: if self.config.include_all_variant_columns {
                schema.n_variant_columns()
            } else {
                0
            },
        })
    }
}
