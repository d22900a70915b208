//! sqlfold CLI - consolidate PostgreSQL migration files

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "sqlfold")]
#[command(version)]
#[command(about = "Split, classify, version and consolidate PostgreSQL migrations")]
#[command(long_about = r#"
sqlfold reads multi-statement migration files and:
  • Splits them into statements (aware of comments, $$ bodies and triggers)
  • Classifies each statement as table, view, function, policy, grant, ...
  • Keeps only the latest version of every object
  • Writes one ordered, deduplicated script

Example usage:
  sqlfold parse supabase/migrations
  sqlfold generate supabase/migrations -o schema.sql
  sqlfold deps supabase/migrations --object profiles
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit machine-readable JSON envelopes
    #[arg(long, global = true)]
    json: bool,

    /// Path to sqlfold.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse migrations and report per-file coverage
    Parse {
        /// Files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Write unclassified SQL to this file
        #[arg(long)]
        unparsed: Option<PathBuf>,
    },

    /// Generate the consolidated script
    Generate {
        /// Files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output file (stdout when omitted; SQLFOLD_QUIET=1 keeps the stream clean)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip the per-type summary block
        #[arg(long)]
        no_summary: bool,
    },

    /// Show version histories per object
    Versions {
        /// Files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Only this statement type
        #[arg(long)]
        kind: Option<String>,

        /// Only this object name
        #[arg(long)]
        name: Option<String>,
    },

    /// Find statements that reference an object
    Deps {
        /// Files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Object name to look for
        #[arg(long)]
        object: String,
    },

    /// Manage the classification pattern table
    Patterns {
        #[command(subcommand)]
        action: PatternAction,
    },

    /// Write a default sqlfold.toml
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum PatternAction {
    /// List patterns in precedence order
    List,

    /// Add a custom pattern
    Add {
        /// Statement type produced on match
        #[arg(long)]
        kind: String,

        /// Regex in /pattern/flags form
        #[arg(long)]
        regex: String,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// Import patterns from an interchange JSON file
    Import { file: PathBuf },

    /// Export patterns as interchange JSON
    Export {
        /// Include the factory patterns
        #[arg(long)]
        all: bool,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Drop custom patterns and ordering
    Reset,

    /// Move types to the front of the table, in the given order
    Order {
        #[arg(required = true)]
        kinds: Vec<String>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(self) -> bool {
        self == OutputMode::Human
    }
}

/// Print a `{"ok": true, "command": ..., "data": ...}` envelope
pub fn emit_success(mode: OutputMode, command: &str, data: serde_json::Value) -> anyhow::Result<()> {
    if mode == OutputMode::Json {
        let envelope = serde_json::json!({
            "ok": true,
            "command": command,
            "data": data,
        });
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    }
    Ok(())
}

fn emit_error(mode: OutputMode, command: &str, error: &anyhow::Error) {
    match mode {
        OutputMode::Json => {
            let envelope = serde_json::json!({
                "ok": false,
                "command": command,
                "error": format!("{:#}", error),
            });
            println!("{}", envelope);
        }
        OutputMode::Human => sqlfold::ui::error(&format!("{:#}", error)),
    }
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Parse { .. } => "parse",
        Commands::Generate { .. } => "generate",
        Commands::Versions { .. } => "versions",
        Commands::Deps { .. } => "deps",
        Commands::Patterns { .. } => "patterns",
        Commands::Init { .. } => "init",
        Commands::Version => "version",
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mode = if cli.json { OutputMode::Json } else { OutputMode::Human };
    let name = command_name(&cli.command);

    if let Err(e) = run(cli, mode) {
        emit_error(mode, name, &e);
        std::process::exit(1);
    }
}

fn run(cli: Cli, mode: OutputMode) -> anyhow::Result<()> {
    if let Commands::Init { force } = cli.command {
        return commands::run_init(mode, cli.config.as_deref(), force);
    }
    if let Commands::Version = cli.command {
        return commands::run_version(mode);
    }

    let ctx = commands::Context::load(mode, cli.config.as_deref())?;

    match cli.command {
        Commands::Parse { paths, unparsed } => commands::run_parse(&ctx, &paths, unparsed.as_deref()),
        Commands::Generate {
            paths,
            output,
            no_summary,
        } => commands::run_generate(&ctx, &paths, output, no_summary),
        Commands::Versions { paths, kind, name } => {
            commands::run_versions(&ctx, &paths, kind.as_deref(), name.as_deref())
        }
        Commands::Deps { paths, object } => commands::run_deps(&ctx, &paths, &object),
        Commands::Patterns { action } => match action {
            PatternAction::List => commands::run_patterns_list(&ctx),
            PatternAction::Add {
                kind,
                regex,
                description,
            } => commands::run_patterns_add(&ctx, &kind, &regex, &description),
            PatternAction::Import { file } => commands::run_patterns_import(&ctx, &file),
            PatternAction::Export { all, output } => {
                commands::run_patterns_export(&ctx, all, output.as_deref())
            }
            PatternAction::Reset => commands::run_patterns_reset(&ctx),
            PatternAction::Order { kinds } => commands::run_patterns_order(&ctx, &kinds),
        },
        Commands::Init { .. } | Commands::Version => Ok(()),
    }
}
