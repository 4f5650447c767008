use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{self, File};
use std::path::PathBuf;
use std::process::ExitCode;

use hybrid_classifier::config::{require_file, HybridConfig, DEFAULT_OUTPUT_DIR, OUTPUT_FILE_NAME};
use hybrid_classifier::error::Result;
use hybrid_classifier::engine::SequenceFilter;
use hybrid_classifier::fasta::FastaFilter;
use hybrid_classifier::qiime::{write_id_metadata, QiimeCli, DEFAULT_QIIME_BIN};
use hybrid_classifier::router::route;
use hybrid_classifier::table::ClassificationTable;
use hybrid_classifier::{merge_exported_tables, run_hybrid_classification};

#[derive(Parser)]
#[command(
    name = "hybrid-classifier",
    version,
    about = "Hybrid taxonomy classifier: consensus BLAST with sklearn fallback for low-resolution calls"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run BLAST and sklearn through QIIME 2 and write the hybrid table
    Run(RunArgs),
    /// Merge already exported BLAST and sklearn taxonomy tables
    Merge(MergeArgs),
    /// List features whose BLAST call is below genus level
    Candidates(CandidatesArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Path to representative sequences artifact (.qza)
    #[arg(long = "rep-seqs")]
    rep_seqs: PathBuf,

    /// Path to database taxonomy file (.qza)
    #[arg(long = "database-taxonomy")]
    database_taxonomy: PathBuf,

    /// Path to database sequences file (.qza)
    #[arg(long = "database-sequences")]
    database_sequences: PathBuf,

    /// Path to pre-trained sklearn classifier (.qza)
    #[arg(long)]
    classifier: PathBuf,

    /// Maximum number of hits to keep for each query
    #[arg(long = "max_accepts", default_value_t = 10)]
    max_accepts: u32,

    /// Rejects if percent identity to query is lower
    #[arg(long = "perc_identity", default_value_t = 1.0)]
    perc_identity: f64,

    /// Rejects if alignment coverage is lower
    #[arg(long = "query_cov", default_value_t = 0.95)]
    query_cov: f64,

    /// Confidence threshold for sklearn
    #[arg(long = "classifier_confidence", default_value_t = 0.7)]
    classifier_confidence: f64,

    /// Number of threads (CPUs) used for both classifiers
    #[arg(long = "num_threads", default_value_t = 5)]
    num_threads: u32,

    /// Directory to save outputs
    #[arg(long = "output-dir", default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// QIIME 2 executable
    #[arg(long = "qiime-bin", env = "HYBRID_QIIME_BIN", default_value = DEFAULT_QIIME_BIN)]
    qiime_bin: PathBuf,
}

#[derive(Args, Debug)]
struct MergeArgs {
    /// Exported BLAST taxonomy.tsv
    #[arg(long)]
    blast: PathBuf,

    /// Exported sklearn taxonomy.tsv
    #[arg(long)]
    sklearn: Option<PathBuf>,

    /// Directory to save outputs
    #[arg(long = "output-dir", default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,
}

#[derive(Args, Debug)]
struct CandidatesArgs {
    /// Exported BLAST taxonomy.tsv
    #[arg(long)]
    blast: PathBuf,

    /// Where to write the id list (QIIME metadata, `feature id` header)
    #[arg(long, default_value = "low_resolution_ids.tsv")]
    output: PathBuf,

    /// FASTA (optionally .gz) of representative sequences to subset
    #[arg(long)]
    fasta: Option<PathBuf>,

    /// Where to write the FASTA subset
    #[arg(long = "fasta-output", default_value = "low_resolution_seqs.fasta")]
    fasta_output: PathBuf,
}

fn spinner(color: &str, msg: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let template = format!("{{spinner:.{}}} {{msg}}", color);
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template(&template)
    {
        spinner.set_style(style);
    }
    spinner.set_message(msg.to_string());
    spinner
}

fn run(args: RunArgs) -> Result<()> {
    let mut config = HybridConfig::new(
        args.rep_seqs,
        args.database_taxonomy,
        args.database_sequences,
        args.classifier,
    );
    config.max_accepts = args.max_accepts;
    config.perc_identity = args.perc_identity;
    config.query_cov = args.query_cov;
    config.classifier_confidence = args.classifier_confidence;
    config.num_threads = args.num_threads;
    config.output_dir = args.output_dir;

    log::info!("Loading input files...");
    config.validate()?;
    let qiime = QiimeCli::new(args.qiime_bin, config.output_dir.join("intermediate"))?;

    let sp = spinner("green", "Classifying features...");
    let results = run_hybrid_classification(&config, &qiime, &qiime, &qiime);
    match &results {
        Ok(_) => sp.finish_with_message("Classification finished."),
        Err(_) => sp.abandon_with_message("Classification failed."),
    }
    let results = results?;

    if let Some(secondary) = &results.secondary {
        if secondary.lost_scores() {
            log::warn!("sklearn output had no Confidence column; scores left empty");
        }
    }
    log::info!("{}", results.summary());
    Ok(())
}

fn merge(args: MergeArgs) -> Result<()> {
    let sp = spinner("blue", "Loading taxonomy tables...");
    require_file(&args.blast)?;
    let blast = ClassificationTable::read_tsv(&args.blast)?;
    let sklearn = match &args.sklearn {
        Some(path) => {
            require_file(path)?;
            Some(ClassificationTable::read_tsv(path)?)
        }
        None => None,
    };
    sp.finish_with_message(format!("Loaded {} BLAST rows.", blast.len()));

    let sp = spinner("yellow", "Writing hybrid table...");
    let results = merge_exported_tables(&blast, sklearn.as_ref());
    fs::create_dir_all(&args.output_dir)?;
    let path = args.output_dir.join(OUTPUT_FILE_NAME);
    results.table.save(&path)?;
    sp.finish_with_message("Output file created.");

    log::info!("{}", results.summary());
    log::info!("Hybrid classification complete. Results saved to: {}", path.display());
    Ok(())
}

fn candidates(args: CandidatesArgs) -> Result<()> {
    require_file(&args.blast)?;
    let blast = ClassificationTable::read_tsv(&args.blast)?;
    let routed = route(&blast);

    write_id_metadata(File::create(&args.output)?, &routed.low_res_ids)?;
    log::info!(
        "{} of {} features need secondary classification; ids written to {}",
        routed.low_res_ids.len(),
        routed.total(),
        args.output.display()
    );

    if let Some(fasta) = &args.fasta {
        let sp = spinner("cyan", "Extracting sequences for low-resolution ASVs...");
        let subset = FastaFilter::new(&args.fasta_output).filter(fasta, &routed.low_res_ids)?;
        sp.finish_with_message(format!("Sequence subset written to {}.", subset.display()));
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Run(args) => run(args),
        Commands::Merge(args) => merge(args),
        Commands::Candidates(args) => candidates(args),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
