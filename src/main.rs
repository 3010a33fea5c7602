use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use songsheet::config::AppConfig;
use songsheet::session::Session;
use songsheet::structure::{render, BlockType};
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "songsheet", version, about = "Chord sheet transposer and song structure tagger")]
struct Cli {
    /// Path to the SQLite database holding learned headers
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Markup,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the semitone offset between two keys
    Offset {
        /// Original key (e.g. "G", "Am", "Hm")
        from: String,
        /// Target key
        to: String,
    },

    /// Transpose every chord in a chord sheet
    Transpose {
        /// Input file ("-" for stdin)
        input: PathBuf,

        /// Original key of the sheet
        #[arg(long, default_value = "")]
        from: String,

        /// Target key; also decides flat/sharp and B/H spelling
        #[arg(long)]
        to: String,

        /// Explicit semitone offset (overrides --from)
        #[arg(long, allow_hyphen_values = true)]
        offset: Option<i32>,
    },

    /// Halve runs of spaces on chord lines
    Compact {
        /// Input file ("-" for stdin)
        input: PathBuf,
    },

    /// Wrap chords in highlight markup
    Highlight {
        /// Input file ("-" for stdin)
        input: PathBuf,
    },

    /// Split a song into labeled structural blocks
    Segment {
        /// Input file ("-" for stdin)
        input: PathBuf,

        #[arg(long, value_enum, default_value = "markup")]
        format: OutputFormat,
    },

    /// Compact, transpose, segment and highlight a song in one pass
    Render {
        /// Input file ("-" for stdin)
        input: PathBuf,

        #[arg(long, default_value = "")]
        from: String,

        #[arg(long, default_value = "")]
        to: String,
    },

    /// Teach the classifier what a header line means
    Correct {
        /// Header text as it appears in songs
        legend: String,

        /// Block type (verse, chorus, bridge, intro, outro, solo, pre-chorus, tag, interlude)
        block_type: BlockType,

        /// Label to show instead of the header text (defaults to the header text)
        #[arg(long)]
        label: Option<String>,
    },

    /// Forget all learned headers and corrections
    ResetLearning,

    /// Show what the classifier has learned
    Learning {
        /// Dump the full store as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render every song file under the given directories to HTML
    Batch {
        /// Directories or files to render
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Directory for the rendered .html files
        #[arg(short, long)]
        output: PathBuf,

        #[arg(long, default_value = "")]
        from: String,

        #[arg(long, default_value = "")]
        to: String,

        /// Number of parallel workers (default from config, or cores / 2)
        #[arg(short, long)]
        jobs: Option<usize>,
    },
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))
    }
}

fn open_session(cli_db_path: Option<PathBuf>, config: &AppConfig) -> Result<Session> {
    // Resolve database path: CLI > config > XDG default
    let db_path = cli_db_path
        .or(config.db_path.clone())
        .unwrap_or_else(songsheet::config::default_db_path);
    log::info!("Database: {}", db_path.display());

    let db = songsheet::db::Database::open(&db_path).context("Failed to open database")?;
    Ok(Session::open(db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = AppConfig::load();

    match cli.command {
        Commands::Offset { from, to } => {
            println!("{}", songsheet::transpose::semitone_offset(&from, &to));
        }

        Commands::Transpose { input, from, to, offset } => {
            let lyrics = read_input(&input)?;
            let offset =
                offset.unwrap_or_else(|| songsheet::transpose::semitone_offset(&from, &to));
            log::info!("Transposing by {} semitones into {}", offset, to);
            print!("{}", songsheet::transpose::transpose_text(&lyrics, offset, &to));
        }

        Commands::Compact { input } => {
            let lyrics = read_input(&input)?;
            print!("{}", songsheet::text::compact_chord_spacing(&lyrics));
        }

        Commands::Highlight { input } => {
            let lyrics = read_input(&input)?;
            print!("{}", songsheet::text::highlight_chords(&lyrics));
        }

        Commands::Segment { input, format } => {
            let lyrics = read_input(&input)?;
            let mut session = open_session(cli.db_path, &config)?;
            let blocks = session.segment(&lyrics);
            match format {
                OutputFormat::Markup => println!("{}", render::to_markup(&blocks)),
                OutputFormat::Json => println!(
                    "{}",
                    render::to_json(&blocks).context("Failed to serialize blocks")?
                ),
            }
        }

        Commands::Render { input, from, to } => {
            let lyrics = read_input(&input)?;
            let mut session = open_session(cli.db_path, &config)?;
            println!("{}", session.render_song(&lyrics, &from, &to));
        }

        Commands::Correct { legend, block_type, label } => {
            let mut session = open_session(cli.db_path, &config)?;
            let label = label.unwrap_or_else(|| legend.trim().to_string());
            session.record_correction(&legend, block_type, &label);
            println!("'{}' is now {} ({})", legend.trim(), block_type, label);
        }

        Commands::ResetLearning => {
            let mut session = open_session(cli.db_path, &config)?;
            let before = session.learning_stats();
            session.reset_learning();
            println!(
                "Cleared {} corrections, {} learned patterns and {} confidence scores",
                before.user_corrections, before.pattern_history, before.confidence_scores
            );
        }

        Commands::Learning { json } => {
            let session = open_session(cli.db_path, &config)?;
            if json {
                let dump = serde_json::to_string_pretty(session.store())
                    .context("Failed to serialize learning store")?;
                println!("{dump}");
            } else {
                let stats = session.learning_stats();
                println!("Learned terms:     {}", stats.learned_terms);
                println!("Pattern history:   {}", stats.pattern_history);
                println!("User corrections:  {}", stats.user_corrections);
                println!("Confidence scores: {}", stats.confidence_scores);

                for (term, c) in &session.store().user_corrections {
                    println!(
                        "  {:<24} -> {:<10} {:<16} {}",
                        term,
                        c.block_type,
                        c.label,
                        c.recorded_at.format("%Y-%m-%d %H:%M")
                    );
                }
            }
        }

        Commands::Batch { paths, output, from, to, jobs } => {
            let jobs = jobs.unwrap_or_else(|| config.resolve_workers());
            let mut session = open_session(cli.db_path, &config)?;
            let opts = songsheet::batch::BatchOptions {
                output_dir: &output,
                original_key: &from,
                target_key: &to,
                jobs,
            };
            let result = songsheet::batch::render_dir(&mut session, &paths, &opts)
                .context("Batch render failed")?;

            println!("Batch complete:");
            println!("  Rendered: {}", result.rendered);
            println!("  Failed:   {}", result.failed);
            println!("  Output:   {}", output.display());
        }
    }

    Ok(())
}
