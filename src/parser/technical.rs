use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use super::table::{own_cells, own_rows};
use super::text::{element_text, has_class};

static ACCORDION_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".accordion.block").unwrap());
static BUTTON_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".acc-btn").unwrap());
static CONTENT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".acc-content .panel-body").unwrap());
static WRAPPER_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".table-responsive").unwrap());
static TABLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());

const SUBTITLE_LOOKBACK: usize = 5;

#[derive(Debug, Serialize)]
pub struct TechnicalCategory {
    pub title: String,
    pub data: Vec<TechnicalSection>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalSection {
    pub sub_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub rows: Vec<Vec<String>>,
}

/// Pull the reference tables out of the technical page's accordion blocks.
pub fn extract_technical(html: &str) -> Vec<TechnicalCategory> {
    let doc = Html::parse_document(html);
    doc.select(&ACCORDION_SEL).map(category).collect()
}

fn category(block: ElementRef) -> TechnicalCategory {
    let title = block
        .select(&BUTTON_SEL)
        .next()
        .map(element_text)
        .unwrap_or_default();

    let mut data = Vec::new();
    let mut fallback_text = Vec::new();
    for content in block.select(&CONTENT_SEL) {
        for wrapper in content.select(&WRAPPER_SEL) {
            let rows = wrapper
                .select(&TABLE_SEL)
                .next()
                .map(string_rows)
                .unwrap_or_default();
            data.push(TechnicalSection {
                sub_title: subtitle(wrapper).unwrap_or_else(|| "Data Table".to_string()),
                text: None,
                rows,
            });
        }
        let text = element_text(content);
        if !text.is_empty() {
            fallback_text.push(text);
        }
    }

    if data.is_empty() && !fallback_text.is_empty() {
        data.push(TechnicalSection {
            sub_title: "Information".to_string(),
            text: Some(fallback_text.join(" ")),
            rows: Vec::new(),
        });
    }

    TechnicalCategory { title, data }
}

/// Nearest preceding `h4`, giving up at another table wrapper.
fn subtitle(wrapper: ElementRef) -> Option<String> {
    for prev in wrapper
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .take(SUBTITLE_LOOKBACK)
    {
        if prev.value().name() == "h4" {
            let text = element_text(prev);
            return if text.is_empty() { None } else { Some(text) };
        }
        if has_class(prev, "table-responsive") {
            break;
        }
    }
    None
}

fn string_rows(table: ElementRef) -> Vec<Vec<String>> {
    own_rows(table)
        .map(|tr| own_cells(tr).map(element_text).collect::<Vec<_>>())
        .filter(|row| row.iter().any(|cell| !cell.is_empty()))
        .collect()
}
