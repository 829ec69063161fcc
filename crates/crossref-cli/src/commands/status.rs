//! Status command handler

use anyhow::Result;

use crossref_core::{Config, LinkRegistry};

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(registry: &LinkRegistry, config: &Config, output: &Output) -> Result<()> {
    let database_size = registry.database().size_bytes();
    let links = registry.link_count()?;
    let indexes = registry.index_count()?;
    let categories = registry.library().categories().len();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "storage": {
                        "data_dir": config.data_dir,
                        "database": registry.database().path(),
                        "database_size": database_size
                    },
                    "counts": {
                        "links": links,
                        "indexes": indexes,
                        "categories": categories
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}\t{}", links, indexes);
        }
        OutputFormat::Human => {
            println!("Crossref Status");
            println!("===============");
            println!();
            println!("Storage:");
            println!("  Location: {}", config.data_dir.display());
            println!("  Size:     {}", human_size(database_size));
            println!();
            println!("Contents:");
            println!("  Links:      {}", links);
            println!("  Indexes:    {}", indexes);
            println!("  Categories: {}", categories);
        }
    }

    Ok(())
}

fn human_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
