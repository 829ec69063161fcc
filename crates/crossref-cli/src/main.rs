//! Crossref CLI
//!
//! Command-line interface for crossref - links between references in a
//! library of texts.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crossref_core::{Config, LinkRegistry, RegistryError};

mod commands;
mod output;
mod prompt;

use commands::link::NewLink;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "crossref")]
#[command(about = "Crossref - Links between references in a text library")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage links
    Link {
        #[command(subcommand)]
        command: LinkCommands,
    },
    /// Manage the index catalog
    Index {
        #[command(subcommand)]
        command: IndexCommands,
    },
    /// Link counts between books and categories
    Explore {
        #[command(subcommand)]
        command: ExploreCommands,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show storage location and counts
    Status,
}

#[derive(Subcommand)]
enum LinkCommands {
    /// Link two references
    #[command(alias = "create")]
    Add {
        /// First reference
        first: String,
        /// Second reference
        second: String,
        /// Connection type (e.g. commentary, quotation)
        #[arg(short = 't', long = "type")]
        link_type: Option<String>,
        /// Anchor text
        #[arg(short, long)]
        anchor: Option<String>,
        /// Mark as generated by this process
        #[arg(long)]
        generated_by: Option<String>,
        /// Source text the link was generated from
        #[arg(long, requires = "generated_by")]
        source_text: Option<String>,
    },
    /// Show link details
    Show {
        /// Link ID (full UUID or prefix)
        id: String,
    },
    /// Delete a link
    #[command(alias = "rm")]
    Delete {
        /// Link ID (full UUID or prefix)
        id: String,
    },
    /// List links
    #[command(alias = "ls")]
    List {
        /// Only links touching this reference
        #[arg(short, long = "ref")]
        reference: Option<String>,
        /// Only links into these titles or categories
        #[arg(short, long)]
        filter: Vec<String>,
    },
    /// Show references linked to a reference
    Refs {
        /// Reference to start from
        reference: String,
        /// Print each linked reference with the matching side
        #[arg(long)]
        pairs: bool,
    },
    /// Count a reference's links by category
    Summary {
        /// Reference to summarize
        reference: String,
    },
    /// Import links from a JSON array
    Import {
        /// JSON file
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum IndexCommands {
    /// Add or replace an index
    Add {
        /// Canonical title
        title: String,
        /// Category, primary first (repeatable)
        #[arg(short, long = "category", required = true)]
        categories: Vec<String>,
        /// Section name, outermost first (repeatable)
        #[arg(short, long = "section", required = true)]
        sections: Vec<String>,
    },
    /// List indexes
    #[command(alias = "ls")]
    List {
        /// Only indexes in this category
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Import indexes from a JSON array
    Import {
        /// JSON file
        file: PathBuf,
    },
    /// Rename an index and rewrite its links
    Rename {
        /// Current title
        old: String,
        /// New title
        new: String,
    },
    /// Remove an index and delete its links
    #[command(alias = "rm")]
    Remove {
        /// Title to remove
        title: String,
    },
}

#[derive(Subcommand)]
enum ExploreCommands {
    /// Book-pair link counts between two categories
    Counts {
        /// First category
        cat1: String,
        /// Second category
        cat2: String,
    },
    /// Links between a book and a category
    Book {
        /// Book title
        book: String,
        /// Category
        category: String,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, explorer_excluded, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands don't need the registry
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    init_logging(&config, cli.verbose);

    let mut registry = LinkRegistry::open(&config).context("Failed to open link registry")?;
    debug!("Opened registry at {:?}", config.database_path());

    let result = match cli.command {
        Commands::Link { command } => handle_link_command(command, &mut registry, &output),
        Commands::Index { command } => handle_index_command(command, &mut registry, &output),
        Commands::Explore { command } => handle_explore_command(command, &registry, &output),
        Commands::Config { .. } => unreachable!(), // Handled above
        Commands::Status => commands::status::show(&registry, &config, &output),
    };

    if let Err(ref e) = result {
        if let Some(hint) = e.downcast_ref::<RegistryError>().and_then(RegistryError::suggestion) {
            if !output.is_quiet() {
                eprintln!("Hint: {}", hint);
            }
        }
    }

    result
}

fn handle_link_command(
    command: LinkCommands,
    registry: &mut LinkRegistry,
    output: &Output,
) -> Result<()> {
    match command {
        LinkCommands::Add {
            first,
            second,
            link_type,
            anchor,
            generated_by,
            source_text,
        } => commands::link::add(
            registry,
            NewLink {
                first,
                second,
                link_type,
                anchor_text: anchor,
                generated_by,
                source_text_id: source_text,
            },
            output,
        ),
        LinkCommands::Show { id } => commands::link::show(registry, id, output),
        LinkCommands::Delete { id } => commands::link::delete(registry, id, output),
        LinkCommands::List { reference, filter } => {
            commands::link::list(registry, reference, filter, output)
        }
        LinkCommands::Refs { reference, pairs } => {
            commands::link::refs(registry, reference, pairs, output)
        }
        LinkCommands::Summary { reference } => commands::link::summary(registry, reference, output),
        LinkCommands::Import { file } => commands::link::import(registry, &file, output),
    }
}

fn handle_index_command(
    command: IndexCommands,
    registry: &mut LinkRegistry,
    output: &Output,
) -> Result<()> {
    match command {
        IndexCommands::Add {
            title,
            categories,
            sections,
        } => commands::index::add(registry, title, categories, sections, output),
        IndexCommands::List { category } => commands::index::list(registry, category, output),
        IndexCommands::Import { file } => commands::index::import(registry, &file, output),
        IndexCommands::Rename { old, new } => commands::index::rename(registry, old, new, output),
        IndexCommands::Remove { title } => commands::index::remove(registry, title, output),
    }
}

fn handle_explore_command(
    command: ExploreCommands,
    registry: &LinkRegistry,
    output: &Output,
) -> Result<()> {
    match command {
        ExploreCommands::Counts { cat1, cat2 } => {
            commands::explore::counts(registry, cat1, cat2, output)
        }
        ExploreCommands::Book { book, category } => {
            commands::explore::book(registry, book, category, output)
        }
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize tracing to the configured log file, or stderr
///
/// `RUST_LOG` takes precedence over `--verbose`.
fn init_logging(config: &Config, verbose: bool) {
    let log_level = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("crossref_core={},crossref={}", log_level, log_level))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    // Ignore the error if a subscriber is already installed
    match config.log_file {
        Some(ref path) => {
            let log_file = match OpenOptions::new().create(true).append(true).open(path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not open log file {:?}: {}", path, e);
                    return;
                }
            };
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(log_file))
                .try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_link_add() {
        let cli = Cli::try_parse_from([
            "crossref",
            "--json",
            "link",
            "add",
            "Genesis 1:1",
            "Berakhot 2a:1",
            "--type",
            "quotation",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Link {
                command:
                    LinkCommands::Add {
                        first,
                        second,
                        link_type,
                        ..
                    },
            } => {
                assert_eq!(first, "Genesis 1:1");
                assert_eq!(second, "Berakhot 2a:1");
                assert_eq!(link_type.as_deref(), Some("quotation"));
            }
            _ => panic!("expected link add"),
        }
    }

    #[test]
    fn test_source_text_requires_generated_by() {
        let result = Cli::try_parse_from([
            "crossref",
            "link",
            "add",
            "Genesis 1:1",
            "Exodus 1:1",
            "--source-text",
            "t1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_index_add_requires_categories() {
        assert!(Cli::try_parse_from(["crossref", "index", "add", "Genesis", "-s", "Chapter"]).is_err());

        let cli = Cli::try_parse_from([
            "crossref", "index", "add", "Genesis", "-c", "Tanakh", "-c", "Torah", "-s", "Chapter",
            "-s", "Verse",
        ])
        .unwrap();
        match cli.command {
            Commands::Index {
                command: IndexCommands::Add {
                    categories,
                    sections,
                    ..
                },
            } => {
                assert_eq!(categories, vec!["Tanakh", "Torah"]);
                assert_eq!(sections, vec!["Chapter", "Verse"]);
            }
            _ => panic!("expected index add"),
        }
    }
}
