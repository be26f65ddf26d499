use std::sync::LazyLock;

use regex::Regex;
use scraper::ElementRef;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Collapse whitespace runs (newlines and NBSP included) to one space and trim.
pub fn clean_text(raw: &str) -> String {
    WHITESPACE_RE.replace_all(raw, " ").trim().to_string()
}

/// Normalized text of an element and all its descendants.
pub fn element_text(el: ElementRef) -> String {
    clean_text(&el.text().collect::<String>())
}

/// Normalized text of the element's own text nodes, ignoring child elements.
pub fn own_text(el: ElementRef) -> String {
    let mut raw = String::new();
    for child in el.children() {
        if let Some(t) = child.value().as_text() {
            raw.push_str(t);
        }
    }
    clean_text(&raw)
}

pub fn has_class(el: ElementRef, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

/// Direct element children, skipping text and comment nodes.
pub fn child_elements<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    el.children().filter_map(ElementRef::wrap)
}

pub fn child_with_class<'a>(el: ElementRef<'a>, class: &str) -> Option<ElementRef<'a>> {
    child_elements(el).find(|child| has_class(*child, class))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_newlines_and_runs() {
        assert_eq!(clean_text("  Stainless\n\n   Steel\t304  "), "Stainless Steel 304");
    }

    #[test]
    fn nbsp_counts_as_whitespace() {
        assert_eq!(clean_text("\u{a0}Grade\u{a0}\u{a0}316L\u{a0}"), "Grade 316L");
    }

    #[test]
    fn whitespace_only_is_empty() {
        assert!(clean_text(" \n\t ").is_empty());
    }
}
