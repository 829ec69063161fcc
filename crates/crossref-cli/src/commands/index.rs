//! Index (catalog) command handlers

use std::path::Path;

use anyhow::{Context, Result};

use crossref_core::{IndexEntry, LinkRegistry};

use crate::output::Output;
use crate::prompt::confirm;

/// Add or replace an index
pub fn add(
    registry: &mut LinkRegistry,
    title: String,
    categories: Vec<String>,
    sections: Vec<String>,
    output: &Output,
) -> Result<()> {
    let entry = IndexEntry::new(title, categories, sections);
    registry
        .add_index(entry.clone())
        .context("Failed to add index")?;

    output.success(&format!("Stored index: {}", entry.title));
    output.print_indexes(&[entry]);
    Ok(())
}

/// List indexes, optionally those in one category
pub fn list(registry: &LinkRegistry, category: Option<String>, output: &Output) -> Result<()> {
    let entries: Vec<IndexEntry> = registry
        .library()
        .entries()
        .iter()
        .filter(|e| category.as_deref().map_or(true, |c| e.in_category(c)))
        .cloned()
        .collect();

    output.print_indexes(&entries);
    Ok(())
}

/// Import indexes from a JSON array
pub fn import(registry: &mut LinkRegistry, file: &Path, output: &Output) -> Result<()> {
    let count = import_file(registry, file)?;
    output.success(&format!("Imported {} index(es)", count));
    Ok(())
}

fn import_file(registry: &mut LinkRegistry, file: &Path) -> Result<usize> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read index file: {:?}", file))?;
    let entries: Vec<IndexEntry> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse index file: {:?}", file))?;

    let count = entries.len();
    for entry in entries {
        let title = entry.title.clone();
        registry
            .add_index(entry)
            .with_context(|| format!("Failed to import index {}", title))?;
    }
    Ok(count)
}

/// Rename an index and rewrite its links
pub fn rename(registry: &mut LinkRegistry, old: String, new: String, output: &Output) -> Result<()> {
    let report = registry
        .rename_index(&old, &new)
        .with_context(|| format!("Failed to rename index {}", old))?;

    output.success(&format!(
        "Renamed {} to {}: {} link(s) rewritten, {} deleted",
        old, new, report.rewritten, report.deleted
    ));
    Ok(())
}

/// Remove an index and the links that point into it
pub fn remove(registry: &mut LinkRegistry, title: String, output: &Output) -> Result<()> {
    if output.should_prompt() {
        println!("Remove index {} and every link into it", title);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let deleted = registry
        .remove_index(&title)
        .with_context(|| format!("Failed to remove index {}", title))?;

    output.success(&format!("Removed {}: {} link(s) deleted", title, deleted));
    Ok(())
}
