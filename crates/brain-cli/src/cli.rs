use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::filter::LevelFilter;

/// Log level options for the CLI's own tracing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Parser)]
#[command(name = "brain")]
#[command(about = "Local knowledge engine: chunked embeddings, hybrid search, session state")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (off, error, warn, info, debug, trace).
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Shortcut for --log-level=debug.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project identifier; overrides BRAIN_PROJECT.
    #[arg(short = 'p', long, global = true)]
    pub project: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate embeddings for missing (or, with --force, all) notes.
    Embed {
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        force: bool,
    },

    /// Session lifecycle: create, pause, resume, complete.
    #[command(subcommand)]
    Session(SessionCommand),

    /// Hybrid (lexical + semantic) search.
    Search {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        threshold: Option<f32>,
        /// auto, semantic, or keyword.
        #[arg(long)]
        mode: Option<String>,
    },

    /// Conform notes already in the target store to the schema, or import
    /// a foreign markdown corpus into it.
    Analyze {
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        preview: bool,
        /// "conform" (default) or "import".
        #[arg(long)]
        mode: Option<String>,
        #[arg(long)]
        source_path: Option<std::path::PathBuf>,
        #[arg(long)]
        source_schema: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum SessionCommand {
    Create {
        topic: Option<String>,
    },
    Pause {
        id: String,
    },
    Resume {
        id: String,
    },
    Complete {
        id: String,
    },
}
