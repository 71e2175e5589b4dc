//! The block tree making up a Notion page body.

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
    /// Notion colour name; `"default"` when unstyled.
    pub color: String,
}

impl Annotations {
    pub fn has_color(&self) -> bool {
        !self.color.is_empty() && self.color != "default"
    }
}

/// One styled run of inline text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RichText {
    pub plain_text: String,
    pub href: Option<String>,
    pub annotations: Annotations,
    pub equation: bool,
}

impl RichText {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            plain_text: text.into(),
            ..Default::default()
        }
    }
}

pub fn plain_text(runs: &[RichText]) -> String {
    runs.iter().map(|run| run.plain_text.as_str()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Bulleted,
    Numbered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    Paragraph {
        text: Vec<RichText>,
    },
    Heading {
        level: u8,
        text: Vec<RichText>,
        toggleable: bool,
    },
    ListItem {
        list: ListKind,
        text: Vec<RichText>,
    },
    ToDo {
        text: Vec<RichText>,
        checked: bool,
    },
    Toggle {
        text: Vec<RichText>,
    },
    Quote {
        text: Vec<RichText>,
    },
    Callout {
        text: Vec<RichText>,
        icon: Option<String>,
    },
    Code {
        language: String,
        text: Vec<RichText>,
        caption: Vec<RichText>,
    },
    Image {
        url: String,
        caption: Vec<RichText>,
    },
    Video {
        url: String,
        caption: Vec<RichText>,
    },
    Embed {
        url: String,
        caption: Vec<RichText>,
    },
    Bookmark {
        url: String,
        caption: Vec<RichText>,
    },
    Divider,
    Equation {
        expression: String,
    },
    Table {
        width: usize,
        has_column_header: bool,
        has_row_header: bool,
    },
    TableRow {
        cells: Vec<Vec<RichText>>,
    },
    ColumnList,
    Column,
    SyncedBlock {
        /// Original block when this is a reference to a synced block elsewhere.
        source: Option<String>,
    },
    ChildPage {
        title: String,
    },
    ChildDatabase {
        title: String,
    },
    Unsupported {
        kind: String,
    },
}

impl BlockKind {
    pub fn list_kind(&self) -> Option<ListKind> {
        match self {
            BlockKind::ListItem { list, .. } => Some(*list),
            _ => None,
        }
    }

    /// Child pages and databases own their children; they are linked, not inlined.
    pub fn owns_subtree(&self) -> bool {
        matches!(
            self,
            BlockKind::ChildPage { .. } | BlockKind::ChildDatabase { .. }
        )
    }

    /// Notion's `type` name for this block.
    pub fn type_name(&self) -> &str {
        match self {
            BlockKind::Paragraph { .. } => "paragraph",
            BlockKind::Heading { level: 1, .. } => "heading_1",
            BlockKind::Heading { level: 2, .. } => "heading_2",
            BlockKind::Heading { .. } => "heading_3",
            BlockKind::ListItem {
                list: ListKind::Bulleted,
                ..
            } => "bulleted_list_item",
            BlockKind::ListItem {
                list: ListKind::Numbered,
                ..
            } => "numbered_list_item",
            BlockKind::ToDo { .. } => "to_do",
            BlockKind::Toggle { .. } => "toggle",
            BlockKind::Quote { .. } => "quote",
            BlockKind::Callout { .. } => "callout",
            BlockKind::Code { .. } => "code",
            BlockKind::Image { .. } => "image",
            BlockKind::Video { .. } => "video",
            BlockKind::Embed { .. } => "embed",
            BlockKind::Bookmark { .. } => "bookmark",
            BlockKind::Divider => "divider",
            BlockKind::Equation { .. } => "equation",
            BlockKind::Table { .. } => "table",
            BlockKind::TableRow { .. } => "table_row",
            BlockKind::ColumnList => "column_list",
            BlockKind::Column => "column",
            BlockKind::SyncedBlock { .. } => "synced_block",
            BlockKind::ChildPage { .. } => "child_page",
            BlockKind::ChildDatabase { .. } => "child_database",
            BlockKind::Unsupported { kind } => kind.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    pub id: String,
    #[serde(flatten)]
    pub kind: BlockKind,
    pub has_children: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Block>,
}

impl Block {
    pub fn new(id: impl Into<String>, kind: BlockKind) -> Self {
        Self {
            id: id.into(),
            kind,
            has_children: false,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Block>) -> Self {
        self.has_children = !children.is_empty();
        self.children = children;
        self
    }

    /// Block id whose children hold this block's content.
    pub fn children_source(&self) -> &str {
        match &self.kind {
            BlockKind::SyncedBlock {
                source: Some(source),
            } => source.as_str(),
            _ => self.id.as_str(),
        }
    }
}

/// Total number of blocks in a forest, descendants included.
pub fn count_blocks(blocks: &[Block]) -> usize {
    blocks
        .iter()
        .map(|block| 1 + count_blocks(&block.children))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synced_references_read_children_from_source() {
        let original = Block::new("a", BlockKind::SyncedBlock { source: None });
        let reference = Block::new(
            "b",
            BlockKind::SyncedBlock {
                source: Some("a".into()),
            },
        );

        assert_eq!(original.children_source(), "a");
        assert_eq!(reference.children_source(), "a");
    }

    #[test]
    fn counts_nested_blocks() {
        let tree = vec![
            Block::new("1", BlockKind::Divider).with_children(vec![
                Block::new("2", BlockKind::Divider),
                Block::new("3", BlockKind::Divider)
                    .with_children(vec![Block::new("4", BlockKind::Divider)]),
            ]),
            Block::new("5", BlockKind::Divider),
        ];
        assert_eq!(count_blocks(&tree), 5);
    }

    #[test]
    fn serializes_with_type_tag() {
        let block = Block::new(
            "h",
            BlockKind::Heading {
                level: 2,
                text: vec![RichText::plain("Intro")],
                toggleable: false,
            },
        );
        let value = serde_json::to_value(&block).expect("serializable");
        assert_eq!(value["type"], "heading");
        assert_eq!(value["level"], 2);
        assert!(value.get("children").is_none());
    }
}
