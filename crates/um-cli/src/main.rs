//! Utterance merge CLI
//!
//! Command-line tool for comparing two utterance documents, resolving
//! conflicts and exporting the merged result.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use um_core::{
    parse_document, Category, ClassificationReport, DecisionFile, DiffOp, MergeConfig, Partition,
    Session, Side,
};

#[derive(Parser)]
#[command(name = "utter-merge")]
#[command(about = "Compare and merge utterance JSON documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify every condition of two documents
    Compare {
        /// Left document
        #[arg(short, long)]
        left: PathBuf,

        /// Right document
        #[arg(short, long)]
        right: PathBuf,

        /// List the conditions in each category
        #[arg(long)]
        list: bool,
    },

    /// Show a line diff of one conflicting condition
    Diff {
        /// Left document
        #[arg(short, long)]
        left: PathBuf,

        /// Right document
        #[arg(short, long)]
        right: PathBuf,

        /// Condition to show
        #[arg(short, long)]
        condition: String,
    },

    /// Merge two documents and write the result
    Merge {
        /// Left document
        #[arg(short, long)]
        left: PathBuf,

        /// Right document
        #[arg(short, long)]
        right: PathBuf,

        /// Decisions file with resolutions and exclusions
        #[arg(short, long)]
        decisions: Option<PathBuf>,

        /// Resolve every conflict not covered by the decisions file to this side
        #[arg(long, value_enum)]
        prefer: Option<SideArg>,

        /// Conditions to leave out (repeatable)
        #[arg(short, long)]
        exclude: Vec<String>,

        /// Output file (defaults to the configured output file)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Create a decisions file listing every conflict
    CreateDecisions {
        /// Left document
        #[arg(short, long)]
        left: PathBuf,

        /// Right document
        #[arg(short, long)]
        right: PathBuf,

        /// Output path for the decisions file
        #[arg(short, long)]
        output: PathBuf,

        /// Pre-resolve every conflict to this side
        #[arg(long, value_enum)]
        prefer: Option<SideArg>,
    },

    /// Write a per-condition classification report
    Report {
        /// Left document
        #[arg(short, long)]
        left: PathBuf,

        /// Right document
        #[arg(short, long)]
        right: PathBuf,

        /// Report format
        #[arg(long, value_enum, default_value = "csv")]
        format: ReportFormat,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Parse and summarize a single document
    Validate {
        /// Path to the document
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SideArg {
    Left,
    Right,
}

impl From<SideArg> for Side {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Left => Side::Left,
            SideArg::Right => Side::Right,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFormat {
    Csv,
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> um_core::Result<()> {
    let config = MergeConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Compare { left, right, list } => cmd_compare(config, &left, &right, list),
        Commands::Diff {
            left,
            right,
            condition,
        } => cmd_diff(config, &left, &right, &condition),
        Commands::Merge {
            left,
            right,
            decisions,
            prefer,
            exclude,
            output,
        } => cmd_merge(
            config,
            &left,
            &right,
            decisions.as_deref(),
            prefer.map(Side::from),
            &exclude,
            output,
        ),
        Commands::CreateDecisions {
            left,
            right,
            output,
            prefer,
        } => cmd_create_decisions(config, &left, &right, &output, prefer.map(Side::from)),
        Commands::Report {
            left,
            right,
            format,
            output,
        } => cmd_report(config, &left, &right, format, &output),
        Commands::Validate { file } => cmd_validate(&file),
    }
}

/// Load both documents into a fresh session
fn open_session(config: MergeConfig, left: &Path, right: &Path) -> um_core::Result<Session> {
    let mut session = Session::new(config);
    session.load_file(Side::Left, left)?;
    session.load_file(Side::Right, right)?;
    Ok(session)
}

fn cmd_compare(config: MergeConfig, left: &Path, right: &Path, list: bool) -> um_core::Result<()> {
    let session = open_session(config, left, right)?;
    let partition = session.require_partition()?;
    let summary = partition.summary();

    println!("Left:  {}", left.display());
    println!("Right: {}", right.display());
    println!();
    println!("Only in left:  {}", summary.left_only);
    println!("Only in right: {}", summary.right_only);
    println!("Identical:     {}", summary.identical);
    println!("Conflicts:     {}", summary.conflicts);
    println!("Total:         {}", summary.total());

    if !partition.duplicates.is_empty() {
        println!();
        println!("Duplicate conditions (last occurrence used):");
        for dup in &partition.duplicates {
            println!("  [{}] {} x{}", dup.side, dup.condition, dup.count);
        }
    }

    if list {
        print_category(partition, Category::LeftOnly, "Only in left");
        print_category(partition, Category::RightOnly, "Only in right");
        print_category(partition, Category::Identical, "Identical");
        print_category(partition, Category::Conflict, "Conflicts");
    }

    Ok(())
}

fn print_category(partition: &Partition, category: Category, title: &str) {
    let conditions = partition.conditions(category);
    if conditions.is_empty() {
        return;
    }
    println!();
    println!("{} ({}):", title, conditions.len());
    for condition in conditions {
        println!("  {}", condition);
    }
}

fn cmd_diff(config: MergeConfig, left: &Path, right: &Path, condition: &str) -> um_core::Result<()> {
    let session = open_session(config, left, right)?;
    let partition = session.require_partition()?;

    if partition.find_conflict(condition).is_none() {
        match partition.category(condition) {
            Some(category) => println!("'{}' is not a conflict ({})", condition, category),
            None => println!("'{}' not found in either document", condition),
        }
        return Ok(());
    }

    let lines = session.conflict_diff(condition)?;

    println!("--- {}", left.display());
    println!("+++ {}", right.display());
    for line in &lines {
        println!("{}", line);
    }

    let removed = lines.iter().filter(|l| l.op == DiffOp::Removed).count();
    let added = lines.iter().filter(|l| l.op == DiffOp::Added).count();
    println!();
    println!("{} line(s) removed, {} line(s) added", removed, added);

    Ok(())
}

fn cmd_merge(
    config: MergeConfig,
    left: &Path,
    right: &Path,
    decisions: Option<&Path>,
    prefer: Option<Side>,
    exclude: &[String],
    output: Option<PathBuf>,
) -> um_core::Result<()> {
    let output = output.unwrap_or_else(|| config.output_file.clone());
    let mut session = open_session(config, left, right)?;

    if let Some(path) = decisions {
        let file = DecisionFile::load(path)?;
        let outcome = session.apply_decisions(&file)?;
        println!(
            "Applied {} resolution(s) and {} exclusion(s) from {}",
            outcome.resolutions_applied,
            outcome.exclusions_applied,
            path.display()
        );
        if outcome.ignored > 0 {
            println!(
                "Warning: {} decision(s) did not match the current documents",
                outcome.ignored
            );
        }
    }

    if let Some(side) = prefer {
        let pending: Vec<String> = session.unresolved().into_iter().map(str::to_string).collect();
        for condition in &pending {
            session.resolve(condition, side)?;
        }
        if !pending.is_empty() {
            println!("Resolved {} remaining conflict(s) to {}", pending.len(), side);
        }
    }

    let excluded: Vec<&String> = exclude
        .iter()
        .filter(|c| {
            session
                .partition()
                .and_then(|p| p.category(c))
                .is_some_and(|cat| cat != Category::Conflict)
        })
        .collect();
    for condition in &excluded {
        // toggle twice would re-include, so only flip keys still included
        if session.inclusions().is_included(condition) {
            session.toggle(condition)?;
        }
    }
    if excluded.len() < exclude.len() {
        println!(
            "Warning: {} --exclude value(s) are not toggleable conditions",
            exclude.len() - excluded.len()
        );
    }

    let merged = session.export_to(&output)?;

    println!(
        "Wrote {} utterances and {} trains to {}",
        merged.utterances.len(),
        merged.trains.len(),
        output.display()
    );

    Ok(())
}

fn cmd_create_decisions(
    config: MergeConfig,
    left: &Path,
    right: &Path,
    output: &Path,
    prefer: Option<Side>,
) -> um_core::Result<()> {
    let session = open_session(config, left, right)?;
    let partition = session.require_partition()?;

    let file = DecisionFile::template(
        partition,
        session.document(Side::Left).map(|d| d.name.clone()),
        session.document(Side::Right).map(|d| d.name.clone()),
        prefer,
    );
    file.save(output)?;

    println!("Created decisions file: {}", output.display());
    println!("Conflicts: {}", partition.conflicts.len());
    if !file.pending.is_empty() {
        println!("Pending:   {}", file.pending.len());
    }
    println!();
    println!("Edit the file to choose a side per conflict, then run:");
    println!(
        "  utter-merge merge --left {} --right {} --decisions {}",
        left.display(),
        right.display(),
        output.display()
    );

    Ok(())
}

fn cmd_report(
    config: MergeConfig,
    left: &Path,
    right: &Path,
    format: ReportFormat,
    output: &Path,
) -> um_core::Result<()> {
    let session = open_session(config, left, right)?;
    let report = ClassificationReport::from_session(&session)?;

    match format {
        ReportFormat::Csv => report.write_csv(output)?,
        ReportFormat::Json => report.write_json(output)?,
    }

    println!("Wrote {} rows to {}", report.rows.len(), output.display());

    Ok(())
}

fn cmd_validate(file: &Path) -> um_core::Result<()> {
    let document = parse_document(file)?;

    println!("File: {}", file.display());
    println!("Utterances: {}", document.utterances.len());
    println!("Trains: {}", document.trains.len());

    // Partitioning a document against nothing surfaces its duplicate keys
    let partition = um_core::partition(&document.utterances, &[]);
    if partition.duplicates.is_empty() {
        println!("Conditions: all unique");
    } else {
        println!("Duplicate conditions:");
        for dup in &partition.duplicates {
            println!("  {} x{}", dup.condition, dup.count);
        }
    }

    Ok(())
}
