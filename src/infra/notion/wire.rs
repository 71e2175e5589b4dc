//! Mapping from Notion's JSON objects to domain types.
//!
//! Block and property payloads vary by `type`, so they are read from
//! `serde_json::Value`; the stable envelopes are typed.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::{
    blocks::{Annotations, Block, BlockKind, ListKind, RichText, plain_text},
    ids::NotionId,
    posts::{BlogPost, PostRecord, UNTITLED},
};

#[derive(Debug, Deserialize)]
pub(super) struct ListEnvelope {
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl ListEnvelope {
    /// Continuation cursor, only when Notion reports more results.
    pub fn continuation(&self) -> Option<String> {
        if self.has_more {
            self.next_cursor.clone()
        } else {
            None
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct WireRichText {
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    plain_text: String,
    #[serde(default)]
    href: Option<String>,
    #[serde(default)]
    annotations: WireAnnotations,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireAnnotations {
    bold: bool,
    italic: bool,
    strikethrough: bool,
    underline: bool,
    code: bool,
    color: String,
}

impl From<WireRichText> for RichText {
    fn from(wire: WireRichText) -> Self {
        let WireAnnotations {
            bold,
            italic,
            strikethrough,
            underline,
            code,
            color,
        } = wire.annotations;

        RichText {
            plain_text: wire.plain_text,
            href: wire.href.filter(|href| !href.is_empty()),
            annotations: Annotations {
                bold,
                italic,
                strikethrough,
                underline,
                code,
                color: if color.is_empty() {
                    "default".to_string()
                } else {
                    color
                },
            },
            equation: wire.kind == "equation",
        }
    }
}

fn rich_text(value: Option<&Value>) -> Vec<RichText> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| WireRichText::deserialize(item).ok())
        .map(RichText::from)
        .collect()
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn bool_field(value: &Value, key: &str) -> bool {
    value.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// URL of an `external` or Notion-hosted `file` payload.
fn file_url(payload: &Value) -> String {
    let kind = str_field(payload, "type").unwrap_or("external");
    payload
        .get(kind)
        .and_then(|inner| str_field(inner, "url"))
        .or_else(|| str_field(payload, "url"))
        .unwrap_or_default()
        .to_string()
}

fn callout_icon(payload: &Value) -> Option<String> {
    let icon = payload.get("icon")?;
    match str_field(icon, "type")? {
        "emoji" => str_field(icon, "emoji").map(str::to_string),
        _ => None,
    }
}

/// Map one block object; `None` for partial objects without a `type`.
pub(super) fn block_from_value(value: &Value) -> Option<Block> {
    let id = str_field(value, "id")?.to_string();
    let kind_name = str_field(value, "type")?;
    let empty = Value::Null;
    let payload = value.get(kind_name).unwrap_or(&empty);
    let text = || rich_text(payload.get("rich_text"));
    let caption = || rich_text(payload.get("caption"));

    let kind = match kind_name {
        "paragraph" => BlockKind::Paragraph { text: text() },
        "heading_1" | "heading_2" | "heading_3" => BlockKind::Heading {
            level: match kind_name {
                "heading_1" => 1,
                "heading_2" => 2,
                _ => 3,
            },
            text: text(),
            toggleable: bool_field(payload, "is_toggleable"),
        },
        "bulleted_list_item" => BlockKind::ListItem {
            list: ListKind::Bulleted,
            text: text(),
        },
        "numbered_list_item" => BlockKind::ListItem {
            list: ListKind::Numbered,
            text: text(),
        },
        "to_do" => BlockKind::ToDo {
            text: text(),
            checked: bool_field(payload, "checked"),
        },
        "toggle" => BlockKind::Toggle { text: text() },
        "quote" => BlockKind::Quote { text: text() },
        "callout" => BlockKind::Callout {
            text: text(),
            icon: callout_icon(payload),
        },
        "code" => BlockKind::Code {
            language: str_field(payload, "language")
                .unwrap_or("plain text")
                .to_string(),
            text: text(),
            caption: caption(),
        },
        "image" => BlockKind::Image {
            url: file_url(payload),
            caption: caption(),
        },
        "video" => BlockKind::Video {
            url: file_url(payload),
            caption: caption(),
        },
        "embed" => BlockKind::Embed {
            url: str_field(payload, "url").unwrap_or_default().to_string(),
            caption: caption(),
        },
        "bookmark" => BlockKind::Bookmark {
            url: str_field(payload, "url").unwrap_or_default().to_string(),
            caption: caption(),
        },
        "divider" => BlockKind::Divider,
        "equation" => BlockKind::Equation {
            expression: str_field(payload, "expression")
                .unwrap_or_default()
                .to_string(),
        },
        "table" => BlockKind::Table {
            width: payload
                .get("table_width")
                .and_then(Value::as_u64)
                .and_then(|width| usize::try_from(width).ok())
                .unwrap_or(0),
            has_column_header: bool_field(payload, "has_column_header"),
            has_row_header: bool_field(payload, "has_row_header"),
        },
        "table_row" => BlockKind::TableRow {
            cells: payload
                .get("cells")
                .and_then(Value::as_array)
                .map(|cells| cells.iter().map(|cell| rich_text(Some(cell))).collect())
                .unwrap_or_default(),
        },
        "column_list" => BlockKind::ColumnList,
        "column" => BlockKind::Column,
        "synced_block" => BlockKind::SyncedBlock {
            source: payload
                .get("synced_from")
                .and_then(|from| str_field(from, "block_id"))
                .map(str::to_string),
        },
        "child_page" => BlockKind::ChildPage {
            title: str_field(payload, "title").unwrap_or_default().to_string(),
        },
        "child_database" => BlockKind::ChildDatabase {
            title: str_field(payload, "title").unwrap_or_default().to_string(),
        },
        other => BlockKind::Unsupported {
            kind: other.to_string(),
        },
    };

    Some(Block {
        id,
        kind,
        has_children: bool_field(value, "has_children"),
        children: Vec::new(),
    })
}

/// Property lookup by exact name, then case-insensitively.
fn property<'a>(properties: &'a Value, name: &str) -> Option<&'a Value> {
    let map = properties.as_object()?;
    map.get(name).or_else(|| {
        map.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}

fn select_name(property: &Value) -> Option<String> {
    let kind = str_field(property, "type")?;
    match kind {
        "select" | "status" => property
            .get(kind)
            .and_then(|option| str_field(option, "name"))
            .map(str::to_string),
        "multi_select" => property
            .get(kind)
            .and_then(Value::as_array)
            .and_then(|options| options.first())
            .and_then(|option| str_field(option, "name"))
            .map(str::to_string),
        "rich_text" => {
            let text = plain_text(&rich_text(property.get(kind)));
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        _ => None,
    }
}

/// Map a page object to a post; `None` for partial objects without properties.
pub(super) fn post_from_value(value: &Value) -> Option<PostRecord> {
    let properties = value.get("properties")?;
    let id = NotionId::parse(str_field(value, "id")?).ok()?;

    let title = property(properties, "name")
        .and_then(|prop| prop.get("title"))
        .and_then(Value::as_array)
        .and_then(|segments| segments.first())
        .and_then(|segment| str_field(segment, "plain_text"))
        .filter(|title| !title.trim().is_empty())
        .unwrap_or(UNTITLED)
        .to_string();

    let description = property(properties, "description")
        .map(|prop| plain_text(&rich_text(prop.get("rich_text"))))
        .unwrap_or_default();

    let created_at = property(properties, "createdAt")
        .and_then(|prop| prop.get("date"))
        .and_then(|date| str_field(date, "start"))
        .unwrap_or_default()
        .to_string();

    let updated_at = str_field(value, "last_edited_time")
        .unwrap_or_default()
        .to_string();

    let tags = property(properties, "tags")
        .and_then(|prop| prop.get("multi_select"))
        .and_then(Value::as_array)
        .map(|options| {
            options
                .iter()
                .filter_map(|option| str_field(option, "name"))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(PostRecord {
        post: BlogPost {
            id,
            title,
            description,
            created_at,
            updated_at,
            tags,
            category: property(properties, "category").and_then(select_name),
            project: property(properties, "project").and_then(select_name),
        },
        status: property(properties, "status").and_then(select_name),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn maps_page_properties() {
        let page = json!({
            "object": "page",
            "id": "0123456789abcdef0123456789abcdef",
            "last_edited_time": "2026-01-27T10:00:00.000Z",
            "properties": {
                "name": { "type": "title", "title": [
                    { "type": "text", "plain_text": "Hello" },
                    { "type": "text", "plain_text": " ignored" }
                ]},
                "createdAt": { "type": "date", "date": { "start": "2026-01-26" } },
                "tags": { "type": "multi_select", "multi_select": [
                    { "name": "rust" }, { "name": "web" }
                ]},
                "Category": { "type": "select", "select": { "name": "Dev" } },
                "project": { "type": "select", "select": null },
                "description": { "type": "rich_text", "rich_text": [
                    { "type": "text", "plain_text": "A " },
                    { "type": "text", "plain_text": "post" }
                ]},
                "status": { "type": "status", "status": { "name": "Published" } }
            }
        });

        let record = post_from_value(&page).expect("full page");
        let post = &record.post;
        assert_eq!(post.id.as_str(), "01234567-89ab-cdef-0123-456789abcdef");
        assert_eq!(post.title, "Hello");
        assert_eq!(post.description, "A post");
        assert_eq!(post.created_at, "2026-01-26");
        assert_eq!(post.updated_at, "2026-01-27T10:00:00.000Z");
        assert_eq!(post.tags, vec!["rust", "web"]);
        assert_eq!(post.category.as_deref(), Some("Dev"));
        assert_eq!(post.project, None);
        assert_eq!(record.status.as_deref(), Some("Published"));
    }

    #[test]
    fn missing_properties_fall_back_to_defaults() {
        let page = json!({
            "object": "page",
            "id": "0123456789abcdef0123456789abcdef",
            "properties": { "name": { "type": "title", "title": [] } }
        });

        let post = post_from_value(&page).expect("full page").post;
        assert_eq!(post.title, UNTITLED);
        assert_eq!(post.created_at, "");
        assert_eq!(post.updated_at, "");
        assert!(post.tags.is_empty());
    }

    #[test]
    fn partial_objects_are_skipped() {
        assert!(post_from_value(&json!({ "object": "page", "id": "x" })).is_none());
        assert!(block_from_value(&json!({ "object": "block", "id": "b" })).is_none());
    }

    #[test]
    fn maps_rich_text_annotations_and_links() {
        let block = json!({
            "object": "block",
            "id": "b1",
            "type": "paragraph",
            "has_children": true,
            "paragraph": { "rich_text": [
                {
                    "type": "text",
                    "plain_text": "docs",
                    "href": "https://example.com",
                    "annotations": { "bold": true, "italic": false, "strikethrough": false,
                                     "underline": false, "code": false, "color": "red" }
                },
                { "type": "equation", "plain_text": "x^2" }
            ]}
        });

        let block = block_from_value(&block).expect("typed block");
        assert!(block.has_children);
        let BlockKind::Paragraph { text } = block.kind else {
            panic!("expected paragraph");
        };
        assert_eq!(text[0].href.as_deref(), Some("https://example.com"));
        assert!(text[0].annotations.bold);
        assert_eq!(text[0].annotations.color, "red");
        assert!(text[1].equation);
        assert_eq!(text[1].annotations.color, "default");
    }

    #[test]
    fn maps_media_tables_and_synced_blocks() {
        let image = block_from_value(&json!({
            "id": "i", "type": "image",
            "image": { "type": "file", "file": { "url": "https://files/x.png" },
                       "caption": [{ "type": "text", "plain_text": "Cap" }] }
        }))
        .expect("image");
        assert!(matches!(
            image.kind,
            BlockKind::Image { ref url, ref caption } if url == "https://files/x.png" && caption.len() == 1
        ));

        let table = block_from_value(&json!({
            "id": "t", "type": "table",
            "table": { "table_width": 3, "has_column_header": true, "has_row_header": false }
        }))
        .expect("table");
        assert_eq!(
            table.kind,
            BlockKind::Table {
                width: 3,
                has_column_header: true,
                has_row_header: false
            }
        );

        let row = block_from_value(&json!({
            "id": "r", "type": "table_row",
            "table_row": { "cells": [[{ "type": "text", "plain_text": "a" }], []] }
        }))
        .expect("row");
        let BlockKind::TableRow { cells } = row.kind else {
            panic!("expected row");
        };
        assert_eq!(cells.len(), 2);
        assert!(cells[1].is_empty());

        let synced = block_from_value(&json!({
            "id": "s", "type": "synced_block",
            "synced_block": { "synced_from": { "type": "block_id", "block_id": "orig" } }
        }))
        .expect("synced");
        assert_eq!(synced.children_source(), "orig");
    }

    #[test]
    fn unknown_types_are_kept_as_unsupported() {
        let block = block_from_value(&json!({ "id": "u", "type": "breadcrumb", "breadcrumb": {} }))
            .expect("typed block");
        assert_eq!(
            block.kind,
            BlockKind::Unsupported {
                kind: "breadcrumb".into()
            }
        );
    }

    #[test]
    fn continuation_requires_has_more() {
        let done: ListEnvelope =
            serde_json::from_value(json!({ "results": [], "has_more": false, "next_cursor": "c" }))
                .expect("envelope");
        assert_eq!(done.continuation(), None);

        let more: ListEnvelope =
            serde_json::from_value(json!({ "results": [], "has_more": true, "next_cursor": "c" }))
                .expect("envelope");
        assert_eq!(more.continuation().as_deref(), Some("c"));
    }
}
