//! HTML rendering of Notion block trees.
//!
//! Sibling list items of the same kind are grouped into one `<ul>`/`<ol>`;
//! container blocks (toggles, tables, columns, synced blocks) recurse into
//! their children.

mod highlight;
mod rich_text;

use std::fmt::Write as _;

use thiserror::Error;
use tracing::warn;

use crate::domain::blocks::{Block, BlockKind, ListKind, RichText, plain_text};

pub use highlight::{DEFAULT_THEME, stylesheet};
pub use rich_text::render_rich_text;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to highlight `{language}` code: {message}")]
    Highlighting { language: String, message: String },
    #[error("unknown highlight theme `{0}`")]
    UnknownTheme(String),
    #[error("failed to build highlight stylesheet: {0}")]
    Stylesheet(String),
}

const NUMBERED_STYLES: [&str; 3] = ["list-decimal", "list-lower-alpha", "list-lower-roman"];
const BULLETED_STYLES: [&str; 3] = ["list-disc", "list-circle", "list-square"];

/// Render a sibling sequence of blocks at list nesting `level`.
pub fn render_blocks(blocks: &[Block], level: usize) -> String {
    let mut html = String::new();
    let mut index = 0;

    while index < blocks.len() {
        match blocks[index].kind.list_kind() {
            Some(kind) => {
                let run = blocks[index..]
                    .iter()
                    .take_while(|block| block.kind.list_kind() == Some(kind))
                    .count();
                render_list(&mut html, kind, &blocks[index..index + run], level);
                index += run;
            }
            None => {
                render_block(&mut html, &blocks[index], level);
                index += 1;
            }
        }
    }

    html
}

pub fn list_class(kind: ListKind, level: usize) -> &'static str {
    let styles = match kind {
        ListKind::Numbered => &NUMBERED_STYLES,
        ListKind::Bulleted => &BULLETED_STYLES,
    };
    styles[level % styles.len()]
}

fn render_list(html: &mut String, kind: ListKind, items: &[Block], level: usize) {
    let tag = match kind {
        ListKind::Numbered => "ol",
        ListKind::Bulleted => "ul",
    };
    let _ = write!(html, "<{tag} class=\"{}\">", list_class(kind, level));
    for item in items {
        let text = match &item.kind {
            BlockKind::ListItem { text, .. } => text.as_slice(),
            _ => &[],
        };
        let _ = write!(html, "<li>{}", render_rich_text(text));
        html.push_str(&render_blocks(&item.children, level + 1));
        html.push_str("</li>");
    }
    let _ = write!(html, "</{tag}>");
}

fn render_block(html: &mut String, block: &Block, level: usize) {
    match &block.kind {
        BlockKind::Paragraph { text } => {
            let _ = write!(html, "<p>{}</p>", render_rich_text(text));
            if !block.children.is_empty() {
                let _ = write!(
                    html,
                    "<div class=\"indent\">{}</div>",
                    render_blocks(&block.children, level + 1)
                );
            }
        }
        BlockKind::Heading {
            level: heading,
            text,
            toggleable,
        } => {
            let heading = (*heading).clamp(1, 3);
            let id = escape_attribute(&block.id);
            let title = format!(
                "<h{heading} id=\"{id}\"><a href=\"#{id}\">{}</a></h{heading}>",
                render_rich_text(text)
            );
            if *toggleable {
                let _ = write!(
                    html,
                    "<details class=\"toggle-heading\"><summary>{title}</summary>{}</details>",
                    render_blocks(&block.children, level)
                );
            } else {
                html.push_str(&title);
            }
        }
        BlockKind::ListItem { .. } => {
            render_list(
                html,
                block.kind.list_kind().unwrap_or(ListKind::Bulleted),
                std::slice::from_ref(block),
                level,
            );
        }
        BlockKind::ToDo { text, checked } => {
            let _ = write!(
                html,
                "<div class=\"to-do{}\"><input type=\"checkbox\" disabled{}> <span>{}</span>{}</div>",
                if *checked { " checked" } else { "" },
                if *checked { " checked" } else { "" },
                render_rich_text(text),
                render_children(block, level)
            );
        }
        BlockKind::Toggle { text } => {
            let _ = write!(
                html,
                "<details class=\"toggle\"><summary>{}</summary>{}</details>",
                render_rich_text(text),
                render_blocks(&block.children, level)
            );
        }
        BlockKind::Quote { text } => {
            let _ = write!(
                html,
                "<blockquote>{}{}</blockquote>",
                render_rich_text(text),
                render_children(block, level)
            );
        }
        BlockKind::Callout { text, icon } => {
            let icon = icon
                .as_deref()
                .map(|icon| {
                    format!(
                        "<span class=\"callout-icon\">{}</span>",
                        ammonia::clean_text(icon)
                    )
                })
                .unwrap_or_default();
            let _ = write!(
                html,
                "<div class=\"callout\">{icon}<div class=\"callout-body\">{}{}</div></div>",
                render_rich_text(text),
                render_children(block, level)
            );
        }
        BlockKind::Code {
            language,
            text,
            caption,
        } => {
            let code = plain_text(text);
            let highlighted = highlight::highlight_code(language, &code).unwrap_or_else(|err| {
                warn!(block_id = %block.id, error = %err, "Falling back to plain code block");
                highlight::plain_code(language, &code)
            });
            if caption.is_empty() {
                html.push_str(&highlighted);
            } else {
                let _ = write!(
                    html,
                    "<figure class=\"code\">{highlighted}<figcaption>{}</figcaption></figure>",
                    render_rich_text(caption)
                );
            }
        }
        BlockKind::Image { url, caption } => {
            let Some(src) = rich_text::safe_href(url) else {
                warn!(block_id = %block.id, "Skipping image with unusable url");
                return;
            };
            let alt = plain_text(caption);
            let _ = write!(
                html,
                "<figure class=\"image\"><img src=\"{}\" alt=\"{}\" loading=\"lazy\">",
                escape_attribute(&src),
                escape_attribute(&alt)
            );
            push_caption(html, caption);
            html.push_str("</figure>");
        }
        BlockKind::Video { url, caption } => {
            let Some(src) = rich_text::safe_href(url) else {
                return;
            };
            let _ = write!(
                html,
                "<figure class=\"video\"><video src=\"{}\" controls preload=\"metadata\"></video>",
                escape_attribute(&src)
            );
            push_caption(html, caption);
            html.push_str("</figure>");
        }
        BlockKind::Embed { url, caption } | BlockKind::Bookmark { url, caption } => {
            let Some(href) = rich_text::safe_href(url) else {
                return;
            };
            let label = if caption.is_empty() {
                rich_text::escape_text(&href)
            } else {
                render_rich_text(caption)
            };
            let _ = write!(
                html,
                "<p class=\"{}\"><a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{label}</a></p>",
                block.kind.type_name(),
                escape_attribute(&href)
            );
        }
        BlockKind::Divider => html.push_str("<hr>"),
        BlockKind::Equation { expression } => {
            let _ = write!(
                html,
                "<div class=\"equation\">{}</div>",
                rich_text::escape_text(expression)
            );
        }
        BlockKind::Table {
            width,
            has_column_header,
            has_row_header,
        } => render_table(
            html,
            &block.children,
            *width,
            *has_column_header,
            *has_row_header,
        ),
        BlockKind::TableRow { cells } => {
            // A row outside a table still shows its cells.
            render_table(
                html,
                std::slice::from_ref(block),
                cells.len(),
                false,
                false,
            );
        }
        BlockKind::ColumnList => {
            html.push_str("<div class=\"columns\">");
            for column in &block.children {
                let _ = write!(
                    html,
                    "<div class=\"column\">{}</div>",
                    render_blocks(&column.children, level)
                );
            }
            html.push_str("</div>");
        }
        BlockKind::Column | BlockKind::SyncedBlock { .. } => {
            html.push_str(&render_blocks(&block.children, level));
        }
        BlockKind::ChildPage { title } => {
            let _ = write!(
                html,
                "<p class=\"child-page\"><a href=\"/post/{}\">{}</a></p>",
                escape_attribute(&block.id.replace('-', "")),
                rich_text::escape_text(title)
            );
        }
        BlockKind::ChildDatabase { .. } | BlockKind::Unsupported { .. } => {
            warn!(
                block_id = %block.id,
                block_type = block.kind.type_name(),
                "Unsupported block type"
            );
        }
    }
}

fn render_children(block: &Block, level: usize) -> String {
    if block.children.is_empty() {
        String::new()
    } else {
        render_blocks(&block.children, level)
    }
}

fn push_caption(html: &mut String, caption: &[RichText]) {
    if !caption.is_empty() {
        let _ = write!(html, "<figcaption>{}</figcaption>", render_rich_text(caption));
    }
}

fn render_table(
    html: &mut String,
    rows: &[Block],
    width: usize,
    has_column_header: bool,
    has_row_header: bool,
) {
    let rows: Vec<&Vec<Vec<RichText>>> = rows
        .iter()
        .filter_map(|row| match &row.kind {
            BlockKind::TableRow { cells } => Some(cells),
            _ => None,
        })
        .collect();
    let width = rows
        .iter()
        .map(|cells| cells.len())
        .max()
        .unwrap_or(0)
        .max(width);

    html.push_str("<div class=\"table-wrapper\"><table>");
    let (head, body) = match rows.split_first() {
        Some((first, rest)) if has_column_header => (Some(*first), rest),
        _ => (None, rows.as_slice()),
    };

    if let Some(cells) = head {
        html.push_str("<thead><tr>");
        for index in 0..width {
            let _ = write!(
                html,
                "<th scope=\"col\">{}</th>",
                cell_html(cells, index)
            );
        }
        html.push_str("</tr></thead>");
    }

    html.push_str("<tbody>");
    for cells in body {
        html.push_str("<tr>");
        for index in 0..width {
            if index == 0 && has_row_header {
                let _ = write!(
                    html,
                    "<th scope=\"row\">{}</th>",
                    cell_html(cells, index)
                );
            } else {
                let _ = write!(html, "<td>{}</td>", cell_html(cells, index));
            }
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table></div>");
}

fn cell_html(cells: &[Vec<RichText>], index: usize) -> String {
    cells
        .get(index)
        .map(|cell| render_rich_text(cell))
        .unwrap_or_default()
}

pub(crate) fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\n' | '\r' | '\t' => escaped.push(' '),
            _ => escaped.push(ch),
        }
    }
    escaped
}
