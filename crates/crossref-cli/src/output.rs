//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use crossref_core::{BookCategoryLink, BookPairCount, CategorySummary, IndexEntry, Link, Ref};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a single link
    pub fn print_link(&self, link: &Link) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:        {}", short_id(link));
                println!("Refs:      {} <-> {}", link.refs[0], link.refs[1]);
                if let Some(ref link_type) = link.link_type {
                    println!("Type:      {}", link_type);
                }
                if let Some(ref anchor) = link.anchor_text {
                    println!("Anchor:    {}", truncate(anchor, 60));
                }
                if link.auto {
                    let by = link.generated_by.as_deref().unwrap_or("(unknown)");
                    match link.source_text_id {
                        Some(ref source) => println!("Generated: {} (source {})", by, source),
                        None => println!("Generated: {}", by),
                    }
                }
                println!("Created:   {}", link.created_at.format("%Y-%m-%d %H:%M"));
                println!("Updated:   {}", link.updated_at.format("%Y-%m-%d %H:%M"));
            }
            OutputFormat::Json => print_json(link),
            OutputFormat::Quiet => println!("{}", full_id(link)),
        }
    }

    /// Print a list of links
    pub fn print_links(&self, links: &[Link]) {
        match self.format {
            OutputFormat::Human => {
                if links.is_empty() {
                    println!("No links found.");
                    return;
                }
                for link in links {
                    println!(
                        "{} | {} | {} | {}",
                        short_id(link),
                        truncate(&link.refs[0], 30),
                        truncate(&link.refs[1], 30),
                        link.link_type.as_deref().unwrap_or("-")
                    );
                }
                println!("\n{} link(s)", links.len());
            }
            OutputFormat::Json => print_json(&links),
            OutputFormat::Quiet => {
                for link in links {
                    println!("{}", full_id(link));
                }
            }
        }
    }

    /// Print catalog entries
    pub fn print_indexes(&self, entries: &[IndexEntry]) {
        match self.format {
            OutputFormat::Human => {
                if entries.is_empty() {
                    println!("No indexes found.");
                    return;
                }
                for entry in entries {
                    println!(
                        "{} | {} | {}",
                        entry.title,
                        entry.categories.join(" > "),
                        entry.section_names.join(", ")
                    );
                }
                println!("\n{} index(es)", entries.len());
            }
            OutputFormat::Json => print_json(&entries),
            OutputFormat::Quiet => {
                for entry in entries {
                    println!("{}", entry.title);
                }
            }
        }
    }

    /// Print refs reached from another ref
    pub fn print_refs(&self, refs: &[Ref]) {
        let normals: Vec<String> = refs.iter().map(Ref::normal).collect();
        match self.format {
            OutputFormat::Human => {
                if normals.is_empty() {
                    println!("No linked refs found.");
                    return;
                }
                for r in &normals {
                    println!("{}", r);
                }
                println!("\n{} ref(s)", normals.len());
            }
            OutputFormat::Json => print_json(&normals),
            OutputFormat::Quiet => {
                for r in &normals {
                    println!("{}", r);
                }
            }
        }
    }

    /// Print `(anchor, opposite)` ref pairs
    pub fn print_ref_pairs(&self, pairs: &[(Ref, Ref)]) {
        let normals: Vec<(String, String)> =
            pairs.iter().map(|(a, b)| (a.normal(), b.normal())).collect();
        match self.format {
            OutputFormat::Human => {
                if normals.is_empty() {
                    println!("No linked refs found.");
                    return;
                }
                for (anchor, opposite) in &normals {
                    println!("{} -> {}", anchor, opposite);
                }
                println!("\n{} pair(s)", normals.len());
            }
            OutputFormat::Json => print_json(&normals),
            OutputFormat::Quiet => {
                for (_, opposite) in &normals {
                    println!("{}", opposite);
                }
            }
        }
    }

    /// Print per-category link counts
    pub fn print_summary(&self, summary: &[CategorySummary]) {
        match self.format {
            OutputFormat::Human => {
                if summary.is_empty() {
                    println!("No links found.");
                    return;
                }
                for category in summary {
                    println!("{} ({})", category.name, category.count);
                    for (book, count) in &category.books {
                        println!("  {} ({})", book, count);
                    }
                }
            }
            OutputFormat::Json => print_json(&summary),
            OutputFormat::Quiet => {
                for category in summary {
                    println!("{}\t{}", category.name, category.count);
                }
            }
        }
    }

    /// Print book-pair link counts
    pub fn print_link_counts(&self, counts: &[BookPairCount]) {
        match self.format {
            OutputFormat::Human => {
                if counts.is_empty() {
                    println!("No links between these categories.");
                    return;
                }
                for pair in counts {
                    println!("{} | {} | {}", pair.book1, pair.book2, pair.count);
                }
                println!("\n{} book pair(s)", counts.len());
            }
            OutputFormat::Json => print_json(&counts),
            OutputFormat::Quiet => {
                for pair in counts {
                    println!("{}\t{}\t{}", pair.book1, pair.book2, pair.count);
                }
            }
        }
    }

    /// Print links between a book and a category
    pub fn print_book_links(&self, links: &[BookCategoryLink]) {
        match self.format {
            OutputFormat::Human | OutputFormat::Quiet => {
                if links.is_empty() && !self.is_quiet() {
                    println!("No links found.");
                    return;
                }
                for link in links {
                    println!(
                        "{} {}\t{} {}",
                        link.r1.title, link.r1.loc, link.r2.title, link.r2.loc
                    );
                }
            }
            OutputFormat::Json => print_json(&links),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

fn full_id(link: &Link) -> String {
    link.id.map(|id| id.to_string()).unwrap_or_default()
}

fn short_id(link: &Link) -> String {
    full_id(link).chars().take(8).collect()
}

/// Truncate a string to max length in characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate("בראשית ברא אלהים", 8), "בראשי...");
        assert_eq!(truncate("בראשית", 8), "בראשית");
    }

    #[test]
    fn test_link_ids() {
        let mut link = Link::new("Genesis 1:1", "Exodus 1:1");
        assert_eq!(short_id(&link), "");

        let id = Uuid::new_v4();
        link.id = Some(id);
        assert_eq!(full_id(&link), id.to_string());
        assert_eq!(short_id(&link), id.to_string()[..8]);
    }

    #[test]
    fn test_should_prompt_only_for_humans() {
        assert!(Output::new(OutputFormat::Human).should_prompt());
        assert!(!Output::new(OutputFormat::Json).should_prompt());
        assert!(!Output::new(OutputFormat::Quiet).should_prompt());
    }
}
