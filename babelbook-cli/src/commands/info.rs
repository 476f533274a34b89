//! Info command implementation

use anyhow::{Context, Result};
use babelbook_core::archive::unpack;
use babelbook_core::package::resolve_book;
use serde::Serialize;
use std::path::Path;

/// Book info output
#[derive(Serialize)]
struct BookInfo {
    title: String,
    authors: Vec<String>,
    language: String,
    description: Option<String>,
    publisher: Option<String>,
    pages: usize,
    page_ids: Vec<String>,
}

/// Display information about an EPUB
pub fn info(input: &str, json: bool) -> Result<()> {
    let input_path = Path::new(input);

    let unpacked = unpack(input_path).with_context(|| format!("Failed to open {}", input))?;
    let book = resolve_book(input_path, unpacked.path())
        .with_context(|| format!("Failed to resolve package document in {}", input))?;

    let info = BookInfo {
        title: book.metadata().title.clone(),
        authors: book.metadata().authors.clone(),
        language: book.metadata().language.clone(),
        description: book.metadata().description.clone(),
        publisher: book.metadata().publisher.clone(),
        pages: book.total_pages(),
        page_ids: book.pages().iter().map(|p| p.id().to_string()).collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("Title:     {}", info.title);
        if !info.authors.is_empty() {
            println!("Authors:   {}", info.authors.join(", "));
        }
        println!("Language:  {}", info.language);
        if let Some(desc) = &info.description {
            println!("Description: {}", desc);
        }
        if let Some(publisher) = &info.publisher {
            println!("Publisher: {}", publisher);
        }
        println!("Pages:     {}", info.pages);
        for id in &info.page_ids {
            println!("  {}", id);
        }
    }

    Ok(())
}
