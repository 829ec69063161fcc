//! Link Explorer command handlers

use anyhow::Result;

use crossref_core::LinkRegistry;

use crate::output::Output;

/// Book-pair link counts between two categories
pub fn counts(registry: &LinkRegistry, cat1: String, cat2: String, output: &Output) -> Result<()> {
    let counts = registry.link_counts(&cat1, &cat2)?;
    output.print_link_counts(&counts);
    Ok(())
}

/// Links between one book and a category
pub fn book(registry: &LinkRegistry, book: String, category: String, output: &Output) -> Result<()> {
    let links = registry.book_category_links(&book, &category)?;
    output.print_book_links(&links);
    Ok(())
}
