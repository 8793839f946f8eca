use clap::{Parser, Subcommand};
use std::path::PathBuf;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "

License: MIT
Rust Edition: 2024"
);

#[derive(Parser)]
#[command(name = "tursoswap")]
#[command(about = "Convert a Supabase-backed HTML app to Turso (libSQL)")]
#[command(long_about = "tursoswap rewrites a single-page HTML app whose module script syncs
through Supabase into a copy that syncs through Turso (libSQL).

The document is scanned line by line. The Supabase client setup is replaced by
a libSQL web client, the Supabase sync section by Turso initTurso()/saveDB()
functions, and leftovers of the old integration are removed. Everything else
is copied unchanged. The source document is never modified.

CREDENTIALS:
  The Turso auth token is read from TURSO_AUTH_TOKEN or from `auth_token`
  under [turso] in the config file. TURSO_DATABASE_URL overrides the URL.

EXAMPLES:
  tursoswap                                  Convert 'index (7).html' to index_turso.html
  tursoswap -i app.html -o app_turso.html    Convert explicit paths
  tursoswap --dry-run                        Preview the changes, write nothing
  tursoswap --json                           Print the rewrite report as JSON
  tursoswap config --init                    Create a commented config file")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_version = LONG_VERSION)]
#[command(propagate_version = true)]
struct Cli {
    /// Document to convert
    #[arg(short = 'i', long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Where to write the converted document (overwritten if it exists)
    #[arg(short = 'o', long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Dry run mode (preview changes without writing)
    #[arg(short = 'd', long)]
    #[arg(help = "Preview the rewrite as a diff without writing the output file")]
    dry_run: bool,

    /// Number of context lines to show in the preview
    #[arg(short = 'n', long, value_name = "NUM")]
    #[arg(help = "Number of context lines to show around changes in --dry-run\nDefault: 2 (or context_lines from the config file)")]
    context: Option<usize>,

    /// Accept input that ends while lines are still being skipped
    #[arg(long)]
    #[arg(help = "Accept a document whose end marker is missing\n⚠️  Everything after the unmatched section start is dropped")]
    lenient: bool,

    /// Print the rewrite report as JSON
    #[arg(long)]
    json: bool,

    /// Config file to use instead of ~/.tursoswap/config.toml
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Write a debug log to ~/.tursoswap/tursoswap.log
    #[arg(long, global = true)]
    debug: bool,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or create the configuration file
    #[command(long_about = "Show or create the tursoswap configuration file.

CONFIGURATION OPTIONS:
  [turso]
    url = \"libsql://...\"         # Database URL written into the document
    auth_token = \"...\"           # Prefer TURSO_AUTH_TOKEN

  [paths]
    input = \"index (7).html\"     # Document to convert
    output = \"index_turso.html\"  # Converted document

  [rewrite]
    lenient = false               # Accept a missing end marker
    context_lines = 2             # Preview context lines (max 10)

EXAMPLES:
  tursoswap config --show         Show effective configuration
  tursoswap config --init         Write a commented default file")]
    Config {
        /// Show the effective configuration (token hidden)
        #[arg(long = "show", conflicts_with = "init")]
        show: bool,

        /// Write the default configuration file, replacing an existing one
        #[arg(long = "init")]
        init: bool,
    },
}

pub fn parse_args() -> Args {
    args_from(Cli::parse())
}

fn args_from(cli: Cli) -> Args {
    let options = GlobalOptions {
        config: cli.config,
        debug: cli.debug,
    };

    match cli.command {
        Some(Commands::Config { show, init }) => Args::Config {
            options,
            show: show || !init,
            init,
        },
        None => Args::Convert {
            options,
            input: cli.input,
            output: cli.output,
            dry_run: cli.dry_run,
            context: cli.context,
            lenient: cli.lenient,
            json: cli.json,
        },
    }
}

/// Options shared by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub debug: bool,
}

#[derive(Debug)]
pub enum Args {
    Convert {
        options: GlobalOptions,
        input: Option<PathBuf>,
        output: Option<PathBuf>,
        dry_run: bool,
        context: Option<usize>,
        lenient: bool,
        json: bool,
    },
    Config {
        options: GlobalOptions,
        show: bool,
        init: bool,
    },
}
