use std::sync::LazyLock;

use scraper::{ElementRef, Selector};

use super::blocks::{AccordionItem, Block, ListKind, SectionVariant};
use super::table::normalize_table;
use super::text::{child_elements, child_with_class, element_text, has_class, own_text};

static IMG_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());
static TABLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static PANEL_TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".panel-title").unwrap());
static SNIPPET_TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".snippet-title").unwrap());
static SNIPPET_MARKUP_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".snippet-markup").unwrap());

/// Walk the direct children of `root` and emit blocks in document order.
///
/// Generic `div`/`center` wrappers are recursed and their blocks spliced in
/// place. Tags outside the recognized set are skipped together with their
/// subtree, so content nested in e.g. `<section>` or `<span>` is not seen.
pub fn extract(root: ElementRef) -> Vec<Block> {
    child_elements(root)
        .flat_map(extract_node)
        .collect()
}

fn extract_node(el: ElementRef) -> Vec<Block> {
    match el.value().name() {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => heading(el).into_iter().collect(),
        "p" => paragraph(el),
        "img" => image(el).into_iter().collect(),
        "ul" => list(el, ListKind::Unordered).into_iter().collect(),
        "ol" => list(el, ListKind::Ordered).into_iter().collect(),
        "table" => normalize_table(el, el).into_iter().collect(),
        "div" => container(el),
        "center" => extract(el),
        _ => Vec::new(),
    }
}

fn heading(el: ElementRef) -> Option<Block> {
    let level = el.value().name()[1..].parse::<u8>().ok()?;
    let text = element_text(el);
    if text.is_empty() {
        return None;
    }
    Some(Block::Heading { level, text })
}

fn paragraph(el: ElementRef) -> Vec<Block> {
    let mut blocks: Vec<Block> = el.select(&IMG_SEL).filter_map(image).collect();
    let text = element_text(el);
    if !text.is_empty() {
        blocks.push(Block::Paragraph { text });
    }
    blocks
}

fn image(el: ElementRef) -> Option<Block> {
    let src = el.value().attr("src").map(str::trim).unwrap_or("");
    if src.is_empty() {
        return None;
    }
    Some(Block::Image {
        src: src.to_string(),
        alt: el.value().attr("alt").unwrap_or("").trim().to_string(),
    })
}

fn list(el: ElementRef, kind: ListKind) -> Option<Block> {
    let items: Vec<String> = child_elements(el)
        .filter(|child| child.value().name() == "li")
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect();
    if items.is_empty() {
        return None;
    }
    Some(Block::List { kind, items })
}

fn container(el: ElementRef) -> Vec<Block> {
    if has_class(el, "table-responsive") {
        return el
            .select(&TABLE_SEL)
            .next()
            .and_then(|table| normalize_table(table, el))
            .into_iter()
            .collect();
    }

    if has_class(el, "panel-group") {
        return accordion(el).into_iter().collect();
    }

    let has_snippet_title = child_elements(el)
        .any(|child| has_class(child, "snippet-title"));
    if has_snippet_title {
        return summary(el).into_iter().collect();
    }

    let blocks = extract(el);
    if blocks.is_empty() {
        return legacy_text(el).into_iter().collect();
    }
    blocks
}

/// One item per `.panel` that is a direct child of the group. Nested groups
/// inside a panel body stay nested.
fn accordion(el: ElementRef) -> Option<Block> {
    let items: Vec<AccordionItem> = child_elements(el)
        .filter(|child| has_class(*child, "panel"))
        .filter_map(panel_item)
        .collect();

    if items.is_empty() {
        return None;
    }
    Some(Block::Accordion { items })
}

fn panel_item(panel: ElementRef) -> Option<AccordionItem> {
    let heading = child_with_class(panel, "panel-heading");
    let label = heading
        .and_then(|h| h.select(&PANEL_TITLE_SEL).next())
        .or_else(|| child_with_class(panel, "panel-title"))
        .or(heading);
    let title = label.map(element_text).unwrap_or_default();
    let body = panel_body(panel).map(extract).unwrap_or_default();

    if title.is_empty() && body.is_empty() {
        return None;
    }
    Some(AccordionItem { title, body })
}

/// The panel's own body: a direct child, or one level down inside `.panel-collapse`.
fn panel_body(panel: ElementRef) -> Option<ElementRef> {
    child_with_class(panel, "panel-body").or_else(|| {
        child_with_class(panel, "panel-collapse")
            .and_then(|collapse| child_with_class(collapse, "panel-body"))
    })
}

fn summary(el: ElementRef) -> Option<Block> {
    let text_of = |sel: &Selector| {
        el.select(sel)
            .map(element_text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    };
    let title = text_of(&SNIPPET_TITLE_SEL);
    let content = text_of(&SNIPPET_MARKUP_SEL);
    if title.is_empty() && content.is_empty() {
        return None;
    }
    Some(Block::Section {
        variant: SectionVariant::Summary,
        title,
        content,
    })
}

/// Bare-text `bold-text` / `text` divs from the older page template.
fn legacy_text(el: ElementRef) -> Option<Block> {
    let bold = has_class(el, "bold-text");
    if !bold && !has_class(el, "text") {
        return None;
    }
    let text = own_text(el);
    if text.is_empty() {
        return None;
    }
    let text = if bold { format!("<b>{}</b>", text) } else { text };
    Some(Block::Paragraph { text })
}
