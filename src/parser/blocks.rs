use serde::{Deserialize, Serialize};

/// One node of the structured content model. Serialized with a `type` tag,
/// the shape the storefront renderer reads from `structured_content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    Heading {
        level: u8,
        text: String,
    },
    Paragraph {
        text: String,
    },
    Image {
        src: String,
        alt: String,
    },
    List {
        #[serde(rename = "listType")]
        kind: ListKind,
        items: Vec<String>,
    },
    Table {
        title: String,
        rows: Vec<Vec<Cell>>,
    },
    Accordion {
        items: Vec<AccordionItem>,
    },
    Section {
        variant: SectionVariant,
        title: String,
        content: String,
    },
}

impl Block {
    pub fn kind(&self) -> &'static str {
        match self {
            Block::Heading { .. } => "heading",
            Block::Paragraph { .. } => "paragraph",
            Block::Image { .. } => "image",
            Block::List { .. } => "list",
            Block::Table { .. } => "table",
            Block::Accordion { .. } => "accordion",
            Block::Section { .. } => "section",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Ordered,
    Unordered,
}

impl ListKind {
    pub fn is_ordered(self) -> bool {
        matches!(self, ListKind::Ordered)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccordionItem {
    pub title: String,
    pub body: Vec<Block>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionVariant {
    Summary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub text: String,
    pub tag: CellKind,
    pub row_span: u32,
    pub col_span: u32,
    pub align: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellKind {
    #[serde(rename = "th")]
    Header,
    #[serde(rename = "td")]
    Data,
}
