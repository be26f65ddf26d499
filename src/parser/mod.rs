pub mod blocks;
pub mod extract;
pub mod table;
pub mod technical;
pub mod text;

use anyhow::{anyhow, Result};
use scraper::{Html, Selector};

use blocks::Block;

/// The element that holds a page's real content, kept with its source text
/// so failures can name it.
#[derive(Debug, Clone)]
pub struct ContentContainer {
    css: String,
    selector: Selector,
}

impl ContentContainer {
    pub fn parse(css: &str) -> Result<Self> {
        let selector = Selector::parse(css)
            .map_err(|e| anyhow!("Invalid container selector {:?}: {}", css, e))?;
        Ok(Self {
            css: css.to_string(),
            selector,
        })
    }

    pub fn css(&self) -> &str {
        &self.css
    }

    pub fn extract(&self, html: &str) -> Option<Vec<Block>> {
        process_document(html, &self.selector)
    }
}

/// Two passes: markup → DOM → blocks from the content container.
/// `None` when the container selector matches nothing in the document.
pub fn process_document(html: &str, container: &Selector) -> Option<Vec<Block>> {
    let doc = Html::parse_document(html);
    let root = doc.select(container).next()?;
    Some(extract::extract(root))
}

// ── Tests ──
