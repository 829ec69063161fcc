//! Link command handlers

use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::warn;
use uuid::Uuid;

use crossref_core::{Link, LinkRegistry};

use crate::output::Output;
use crate::prompt::confirm;

/// Fields for a new link, as given on the command line
pub struct NewLink {
    pub first: String,
    pub second: String,
    pub link_type: Option<String>,
    pub anchor_text: Option<String>,
    pub generated_by: Option<String>,
    pub source_text_id: Option<String>,
}

impl NewLink {
    fn into_link(self) -> Link {
        let mut link = Link::new(self.first, self.second);
        if let Some(link_type) = self.link_type {
            link = link.with_type(link_type);
        }
        if let Some(anchor) = self.anchor_text {
            link = link.with_anchor_text(anchor);
        }
        if let Some(by) = self.generated_by {
            link = link.generated(by, self.source_text_id);
        }
        link
    }
}

/// Create a new link
pub fn add(registry: &mut LinkRegistry, new: NewLink, output: &Output) -> Result<()> {
    let link = new.into_link();

    match registry.save(&link) {
        Ok(saved) => {
            let id = saved.id.map(|id| id.to_string()).unwrap_or_default();
            output.success(&format!("Created link: {}", id));
            output.print_link(&saved);
            Ok(())
        }
        // No new record, but possibly an update to the existing one
        Err(e) if e.is_duplicate() => {
            output.message(&e.to_string());
            Ok(())
        }
        Err(e) => Err(e).context("Failed to create link"),
    }
}

/// Show a single link
pub fn show(registry: &LinkRegistry, id: String, output: &Output) -> Result<()> {
    let uuid = parse_link_id(&id, registry)?;

    let link = registry
        .get(uuid)?
        .ok_or_else(|| anyhow::anyhow!("Link not found: {}", id))?;

    output.print_link(&link);
    Ok(())
}

/// Delete a link
pub fn delete(registry: &mut LinkRegistry, id: String, output: &Output) -> Result<()> {
    let uuid = parse_link_id(&id, registry)?;

    let link = registry
        .get(uuid)?
        .ok_or_else(|| anyhow::anyhow!("Link not found: {}", id))?;

    if output.should_prompt() {
        println!(
            "Delete link: {} - {} <-> {}",
            &uuid.to_string()[..8],
            link.refs[0],
            link.refs[1]
        );
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    registry.delete(uuid).context("Failed to delete link")?;

    output.success(&format!("Deleted link: {}", uuid));

    Ok(())
}

/// List links, optionally those touching a ref, narrowed to titles or categories
pub fn list(
    registry: &LinkRegistry,
    reference: Option<String>,
    sources: Vec<String>,
    output: &Output,
) -> Result<()> {
    let set = match reference {
        Some(ref raw) => {
            let tref = registry.library().resolve(raw)?;
            registry.links_for(&tref)?
        }
        None => registry.all_links()?.into(),
    };

    let links = if sources.is_empty() {
        set.into_vec()
    } else {
        set.filter(registry.library(), &sources[..])?
    };

    output.print_links(&links);
    Ok(())
}

/// Show the refs linked to a ref
pub fn refs(registry: &LinkRegistry, reference: String, pairs: bool, output: &Output) -> Result<()> {
    let from = registry.library().resolve(&reference)?;
    let set = registry.links_for(&from)?;

    if pairs {
        output.print_ref_pairs(&set.ref_pairs_from(registry.library(), &from));
    } else {
        output.print_refs(&set.refs_from(registry.library(), &from));
    }
    Ok(())
}

/// Count the links of a ref by category
pub fn summary(registry: &LinkRegistry, reference: String, output: &Output) -> Result<()> {
    let relative = registry.library().resolve(&reference)?;
    let set = registry.links_for(&relative)?;
    output.print_summary(&set.summary(registry.library(), &relative));
    Ok(())
}

/// Tally of a bulk link import
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub saved: usize,
    pub duplicates: usize,
    pub failed: usize,
}

/// Import links from a JSON array
pub fn import(registry: &mut LinkRegistry, file: &Path, output: &Output) -> Result<()> {
    let report = import_file(registry, file)?;
    output.success(&format!(
        "Imported {} link(s), {} duplicate(s), {} failed",
        report.saved, report.duplicates, report.failed
    ));
    Ok(())
}

fn import_file(registry: &mut LinkRegistry, file: &Path) -> Result<ImportReport> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read link file: {:?}", file))?;
    let links: Vec<Link> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse link file: {:?}", file))?;

    let mut report = ImportReport::default();
    for link in links {
        match registry.save(&link) {
            Ok(_) => report.saved += 1,
            Err(e) if e.is_duplicate() => report.duplicates += 1,
            Err(e) if e.is_invalid_reference() => {
                warn!("Skipping {} - {}: {}", link.refs[0], link.refs[1], e);
                report.failed += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to import link {} - {}", link.refs[0], link.refs[1])
                })
            }
        }
    }
    Ok(report)
}

/// Parse a link ID (supports full UUID or prefix)
fn parse_link_id(id: &str, registry: &LinkRegistry) -> Result<Uuid> {
    // Try full UUID first
    if let Ok(uuid) = Uuid::parse_str(id) {
        return Ok(uuid);
    }

    // Try prefix match
    let links = registry.all_links()?;
    let matches: Vec<_> = links
        .iter()
        .filter_map(|l| l.id.map(|uuid| (uuid, l)))
        .filter(|(uuid, _)| uuid.to_string().starts_with(id))
        .collect();

    match matches.len() {
        0 => bail!("No link found matching: {}", id),
        1 => Ok(matches[0].0),
        _ => {
            eprintln!("Multiple links match '{}':", id);
            for (uuid, link) in &matches {
                eprintln!("  {} - {} <-> {}", uuid, link.refs[0], link.refs[1]);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}
