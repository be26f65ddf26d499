use scraper::ElementRef;

use super::blocks::{Block, Cell, CellKind};
use super::text::{child_elements, element_text};

const SECTION_TAGS: &[&str] = &["thead", "tbody", "tfoot"];
const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

/// Normalize a `<table>` into a table block.
///
/// `anchor` is the element whose preceding sibling may title the table: the
/// table itself, or its `table-responsive` wrapper when reached through one.
/// Returns `None` when no row carries a cell.
pub fn normalize_table(table: ElementRef, anchor: ElementRef) -> Option<Block> {
    let rows: Vec<Vec<Cell>> = own_rows(table)
        .map(|tr| own_cells(tr).map(to_cell).collect::<Vec<_>>())
        .filter(|cells| !cells.is_empty())
        .collect();

    if rows.is_empty() {
        return None;
    }

    Some(Block::Table {
        title: resolve_title(table, anchor),
        rows,
    })
}

/// Rows belonging to this table, directly or through `thead`/`tbody`/`tfoot`.
/// Rows of tables nested inside cells are not included.
pub(super) fn own_rows<'a>(table: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    child_elements(table)
        .flat_map(|child| {
            if SECTION_TAGS.contains(&child.value().name()) {
                child_elements(child).collect::<Vec<_>>()
            } else {
                vec![child]
            }
        })
        .filter(|el| el.value().name() == "tr")
}

pub(super) fn own_cells<'a>(tr: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    child_elements(tr).filter(|el| matches!(el.value().name(), "th" | "td"))
}

fn to_cell(cell: ElementRef) -> Cell {
    let el = cell.value();
    Cell {
        text: element_text(cell),
        tag: if el.name() == "th" {
            CellKind::Header
        } else {
            CellKind::Data
        },
        row_span: parse_span(el.attr("rowspan")),
        col_span: parse_span(el.attr("colspan")),
        align: el
            .attr("align")
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or("left")
            .to_string(),
    }
}

/// Leading digits only, like the legacy markup's loose `colspan="2px"` usage.
fn parse_span(raw: Option<&str>) -> u32 {
    let digits: String = raw
        .unwrap_or("")
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    match digits.parse::<u32>() {
        Ok(n) if n >= 1 => n,
        _ => 1,
    }
}

fn resolve_title(table: ElementRef, anchor: ElementRef) -> String {
    let caption = child_elements(table)
        .find(|el| el.value().name() == "caption")
        .map(element_text)
        .filter(|t| !t.is_empty());
    if let Some(caption) = caption {
        return caption;
    }

    preceding_heading(table)
        .or_else(|| {
            if anchor.id() == table.id() {
                None
            } else {
                preceding_heading(anchor)
            }
        })
        .unwrap_or_default()
}

fn preceding_heading(el: ElementRef) -> Option<String> {
    el.prev_siblings()
        .find_map(ElementRef::wrap)
        .filter(|prev| HEADING_TAGS.contains(&prev.value().name()))
        .map(element_text)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn first_table(html: &str) -> Option<Block> {
        let doc = Html::parse_fragment(html);
        let sel = Selector::parse("table").unwrap();
        let table = doc.select(&sel).next().unwrap();
        normalize_table(table, table)
    }

    fn rows_of(block: &Block) -> &Vec<Vec<Cell>> {
        match block {
            Block::Table { rows, .. } => rows,
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn merged_header_keeps_colspan() {
        let html = r#"<table>
            <tr><th colspan="2">Grade</th></tr>
            <tr><td>304</td><td>316</td></tr>
        </table>"#;
        let block = first_table(html).unwrap();
        let rows = rows_of(&block);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0].col_span, 2);
        assert_eq!(rows[0][0].tag, CellKind::Header);
        assert_eq!(rows[1].len(), 2);
        assert_eq!(rows[1][1].text, "316");
        assert_eq!(rows[1][1].tag, CellKind::Data);
    }

    #[test]
    fn nested_table_stays_inside_its_cell() {
        let html = r#"<table><tr><td>Outer</td><td><table><tr><td>in1</td><td>in2</td></tr></table></td></tr></table>"#;
        let block = first_table(html).unwrap();
        let rows = rows_of(&block);
        assert_eq!(rows.len(), 1);
        let texts: Vec<_> = rows[0].iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["Outer", "in1in2"]);
    }

    #[test]
    fn rows_under_sections_keep_document_order() {
        let html = r#"<table><thead><tr><th>Size</th></tr></thead>
            <tbody><tr><td>1/2"</td></tr></tbody><tfoot><tr><td>end</td></tr></tfoot></table>"#;
        let block = first_table(html).unwrap();
        let firsts: Vec<_> = rows_of(&block).iter().map(|r| r[0].text.clone()).collect();
        assert_eq!(firsts, vec!["Size", "1/2\"", "end"]);
    }

    #[test]
    fn nested_caption_does_not_title_outer_table() {
        let html = r#"<table><tr><td><table><caption>Inner</caption><tr><td>x</td></tr></table></td></tr></table>"#;
        match first_table(html).unwrap() {
            Block::Table { title, .. } => assert_eq!(title, ""),
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn extraction_is_deterministic() {
        let html = r#"<table><tr><th colspan="2">Grade</th></tr><tr><td>A</td><td>B</td></tr></table>"#;
        assert_eq!(first_table(html), first_table(html));
    }

    #[test]
    fn span_and_align_defaults() {
        let html = r#"<table><tr>
            <td rowspan="abc">x</td>
            <td rowspan="0">y</td>
            <td colspan="3px" align="center">z</td>
        </tr></table>"#;
        let block = first_table(html).unwrap();
        let row = &rows_of(&block)[0];
        assert_eq!(row[0].row_span, 1);
        assert_eq!(row[0].align, "left");
        assert_eq!(row[1].row_span, 1);
        assert_eq!(row[2].col_span, 3);
        assert_eq!(row[2].align, "center");
    }

    #[test]
    fn spacer_rows_survive_but_cellless_rows_do_not() {
        let html = r#"<table>
            <tr><td>Size</td></tr>
            <tr><td>  </td><td></td></tr>
            <tr></tr>
        </table>"#;
        let block = first_table(html).unwrap();
        let rows = rows_of(&block);
        assert_eq!(rows.len(), 2);
        assert!(rows[1].iter().all(|c| c.text.is_empty()));
    }

    #[test]
    fn empty_table_yields_nothing() {
        assert!(first_table("<table><tr></tr></table>").is_none());
        assert!(first_table("<table></table>").is_none());
    }

    #[test]
    fn caption_wins_over_heading() {
        let html = r#"<div><h3>Heading Title</h3><table><caption> Mechanical
            Properties </caption><tr><td>x</td></tr></table></div>"#;
        match first_table(html).unwrap() {
            Block::Table { title, .. } => assert_eq!(title, "Mechanical Properties"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn preceding_heading_titles_table() {
        let html = r#"<div><h4>Equivalent Grades</h4>
            <table><tr><td>x</td></tr></table></div>"#;
        match first_table(html).unwrap() {
            Block::Table { title, .. } => assert_eq!(title, "Equivalent Grades"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn non_heading_sibling_leaves_title_empty() {
        let html = r#"<div><h4>Far away</h4><p>between</p>
            <table><tr><td>x</td></tr></table></div>"#;
        match first_table(html).unwrap() {
            Block::Table { title, .. } => assert!(title.is_empty()),
            _ => unreachable!(),
        }
    }
}
