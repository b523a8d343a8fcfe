use anyhow::Result;
use clap::Parser;
use cluster_summary::summary::{Summary, SummaryConfig};
use cluster_summary::tree::RTreeBuilder;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cluster-summary")]
#[command(version)]
#[command(about = "Summarise per-sample cluster reports into one matrix", long_about = None)]
struct Args {
    /// Per-sample report files
    infiles: Vec<String>,

    /// File of report filenames, one per line
    #[arg(long)]
    fofn: Option<PathBuf>,

    /// Output table (.csv, or .xls/.xlsx for a spreadsheet)
    #[arg(short, long)]
    output: PathBuf,

    /// Also write <prefix>.csv and <prefix>.tre for phandango
    #[arg(long)]
    phandango_prefix: Option<String>,

    /// Add a yes/no column for every variant
    #[arg(long)]
    all_variant_columns: bool,

    /// Minimum percent identity for a cluster to count as assembled
    #[arg(long, default_value = "90.0")]
    min_id: f64,

    /// Number of threads for loading reports
    #[arg(long, default_value_t = num_cpus())]
    threads: usize,

    /// R executable used to build the tree
    #[arg(long, default_value = "R")]
    r_executable: String,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

macro_rules! progress {
    ($quiet:expr) => {
        if !$quiet {
            eprintln!();
        }
    };
    ($quiet:expr, $($arg:tt)*) => {
        if !$quiet {
            eprintln!($($arg)*);
        }
    };
}

fn make_progress_bar(quiet: bool, len: u64) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template("  [{elapsed_precise}/{eta_precise}] {bar:40} {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=> "),
    );
    pb
}

fn main() -> Result<()> {
    let args = Args::parse();

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()?;

    let summary = Summary::new(SummaryConfig {
        filenames: args.infiles.clone(),
        fofn: args.fofn.clone(),
        include_all_variant_columns: args.all_variant_columns,
        min_id: args.min_id,
        outfile: args.output.clone(),
        phandango_prefix: args.phandango_prefix.clone(),
        quiet: args.quiet,
    })?;

    progress!(args.quiet, "Cluster Summary");
    progress!(args.quiet, "=========================================");
    progress!(args.quiet, "Input reports: {}", summary.filenames().len());
    progress!(args.quiet, "Output table: {}", args.output.display());
    progress!(args.quiet, "Min identity: {}", args.min_id);
    progress!(args.quiet, "Variant columns: {}", args.all_variant_columns);
    progress!(args.quiet, "Threads: {}", args.threads);
    if let Some(ref prefix) = args.phandango_prefix {
        progress!(args.quiet, "Phandango prefix: {}", prefix);
    }
    progress!(args.quiet);

    let pb = make_progress_bar(args.quiet, summary.filenames().len() as u64);
    pb.set_message("reports loaded");
    let tree_builder = RTreeBuilder::new(args.r_executable.clone());
    let stats = summary.run(&tree_builder, Some(&pb))?;

    progress!(args.quiet);
    progress!(
        args.quiet,
        "Done! {} sample(s), {} cluster(s), {} variant column(s) written to: {}",
        stats.samples,
        stats.clusters,
        stats.variant_columns,
        args.output.display()
    );
    if let Some(ref prefix) = args.phandango_prefix {
        progress!(args.quiet, "Phandango files: {}.csv, {}.tre", prefix, prefix);
    }

    Ok(())
}
