use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{CommandFactory, Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use merge_classifications::merge_order::{DEFAULT_CHUNK_SIZE, DEFAULT_MERGE_ORDER};
use merge_classifications::{merge_classifications, InputPaths, MergeConfig, MergeError};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    #[value(name = "DEBUG")]
    Debug,
    #[value(name = "INFO")]
    Info,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
        }
    }
}

#[derive(Parser)]
#[command(name = "merge-classifications")]
#[command(version)]
#[command(about = "Merge outputs from Kaiju, Kraken, and CLARK-S", long_about = None)]
struct Cli {
    /// Kaiju output file (tab)
    #[arg(short = 'k', long)]
    kaiju: Option<PathBuf>,

    /// Kraken output file (tab)
    #[arg(short = 'K', long)]
    kraken: Option<PathBuf>,

    /// CLARK-S output file (csv)
    #[arg(short = 'c', long)]
    clarks: Option<PathBuf>,

    /// Merge order, highest priority first, e.g. kraken,kaiju,clarks
    #[arg(short = 'm', long, default_value = DEFAULT_MERGE_ORDER)]
    merge_order: String,

    /// Keep the intermediary merge table in this SQLite file instead of memory
    #[arg(short = 'd', long)]
    dbfile: Option<PathBuf>,

    /// Output filename (use - for stdout)
    #[arg(short = 'o', long, default_value = "merged_classifications.tab")]
    output: PathBuf,

    /// Records per bulk write into the merge table
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Report pairwise overlaps between sources (keeps read ids in memory)
    #[arg(long)]
    overlaps: bool,

    /// Log level
    #[arg(long, value_enum, ignore_case = true, default_value = "DEBUG")]
    loglevel: LogLevel,

    /// Log to LOGFILE instead of stderr
    #[arg(long)]
    logfile: Option<PathBuf>,
}

fn init_logging(level: LogLevel, logfile: Option<&Path>) -> io::Result<()> {
    let env = env_logger::Env::default().default_filter_or(level.as_filter());
    let mut builder = env_logger::Builder::from_env(env);
    builder.format(|buf, record| {
        writeln!(buf, "{} {}: {}", buf.timestamp(), record.level(), record.args())
    });
    if let Some(path) = logfile {
        builder.target(env_logger::Target::Pipe(Box::new(File::create(path)?)));
    }
    builder.init();
    Ok(())
}

fn spinner(color: &str, message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&[
                "⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏",
            ])
            .template(&format!("{{spinner:.{color}}} {{msg}}"))
            .expect("Invalid spinner template"),
    );
    spinner.set_message(message.to_string());
    spinner
}

fn run(cli: Cli) -> Result<(), MergeError> {
    let config = MergeConfig {
        merge_order: cli.merge_order,
        inputs: InputPaths {
            kaiju: cli.kaiju,
            kraken: cli.kraken,
            clarks: cli.clarks,
        },
        chunk_size: cli.chunk_size,
        dbfile: cli.dbfile,
        track_overlaps: cli.overlaps,
    };

    // 1. Merge every source into the store
    let progress = spinner("green", "Merging classifications...");
    let results = match merge_classifications(&config) {
        Ok(results) => results,
        Err(e) => {
            progress.abandon_with_message("Merge failed.");
            return Err(e);
        }
    };
    progress.finish_with_message("Merge finished.");

    results.summary.log();

    // 2. Write the merged table, only once everything above succeeded
    let progress = spinner("yellow", "Writing merged classifications...");
    let rows = if cli.output.as_os_str() == "-" {
        results.write_merged(io::stdout().lock())?
    } else {
        results.write_merged(File::create(&cli.output)?)?
    };
    progress.finish_with_message(format!("Wrote {rows} merged reads."));

    log::debug!("Wrote {} rows to {}", rows, cli.output.display());
    Ok(())
}

fn main() {
    if std::env::args_os().len() < 2 {
        let _ = Cli::command().print_help();
        process::exit(1);
    }
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.loglevel, cli.logfile.as_deref()) {
        eprintln!("Error: cannot open log file: {e}");
        process::exit(1);
    }
    log::debug!("{:=^50}", " Logging started ");

    if let Err(e) = run(cli) {
        log::error!("{e}");
        eprintln!("Error: {e}");
        process::exit(e.exit_code());
    }
}
