use serde_json::Value;

use crate::store::MigratedPost;

const PREVIEW_CHARS: usize = 100;

/// What a spot check of one migrated post found.
#[derive(Debug, Default, PartialEq)]
pub struct VerifySummary {
    pub slug: String,
    pub title: String,
    /// `None` when `structured_content` is not a JSON array.
    pub block_count: Option<usize>,
    pub first_block: Option<Value>,
    pub table_title: Option<String>,
    pub first_cell: Option<Value>,
    pub summary_title: Option<String>,
    pub summary_preview: Option<String>,
}

/// Works on raw JSON so rows written by earlier tooling (which nested the
/// table title under `data`) still summarize.
pub fn summarize(post: &MigratedPost) -> VerifySummary {
    let mut summary = VerifySummary {
        slug: post.slug.clone(),
        title: post.title.clone(),
        ..Default::default()
    };
    let Some(blocks) = post.structured_content.as_array() else {
        return summary;
    };
    summary.block_count = Some(blocks.len());
    summary.first_block = blocks.first().cloned();

    if let Some(table) = blocks.iter().find(|b| b["type"] == "table") {
        let title = table["data"]["title"]
            .as_str()
            .or_else(|| table["title"].as_str())
            .filter(|t| !t.is_empty())
            .unwrap_or("Untitled");
        summary.table_title = Some(title.to_string());
        summary.first_cell = table["rows"][0][0].as_object().map(|c| Value::Object(c.clone()));
    }

    if let Some(section) = blocks
        .iter()
        .find(|b| b["type"] == "section" && b["variant"] == "summary")
    {
        summary.summary_title = section["title"].as_str().map(str::to_string);
        summary.summary_preview = section["content"]
            .as_str()
            .map(|c| c.chars().take(PREVIEW_CHARS).collect());
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post(content: Value) -> MigratedPost {
        MigratedPost {
            slug: "pipes".into(),
            title: "Pipes".into(),
            structured_content: content,
        }
    }

    #[test]
    fn summarizes_current_blocks() {
        let long = "x".repeat(150);
        let s = summarize(&post(json!([
            {"type": "heading", "level": 2, "text": "Pipes"},
            {"type": "table", "title": "Chemical Composition", "rows": [[
                {"text": "Grade", "tag": "th", "rowSpan": 1, "colSpan": 1, "align": "left"}
            ]]},
            {"type": "section", "variant": "summary", "title": "Quick Facts", "content": long},
        ])));
        assert_eq!(s.block_count, Some(3));
        assert_eq!(s.first_block.unwrap()["type"], "heading");
        assert_eq!(s.table_title.as_deref(), Some("Chemical Composition"));
        assert_eq!(s.first_cell.unwrap()["text"], "Grade");
        assert_eq!(s.summary_title.as_deref(), Some("Quick Facts"));
        assert_eq!(s.summary_preview.unwrap().len(), 100);
    }

    #[test]
    fn legacy_table_shape_and_untitled() {
        let s = summarize(&post(json!([{"type": "table", "data": {"title": "Sizes"}}])));
        assert_eq!(s.table_title.as_deref(), Some("Sizes"));
        assert_eq!(s.first_cell, None);

        let s = summarize(&post(json!([{"type": "table", "title": "", "rows": []}])));
        assert_eq!(s.table_title.as_deref(), Some("Untitled"));
    }

    #[test]
    fn non_array_content() {
        let s = summarize(&post(json!({"blocks": []})));
        assert_eq!(s.block_count, None);
        assert_eq!(s.table_title, None);
    }
}
