use serde::Serialize;

use crate::domain::blocks::{Block, BlockKind, plain_text};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocItem {
    pub id: String,
    pub text: String,
    pub level: u8,
}

/// Collect headings in document order.
///
/// The post title is the page's only top-level heading, so `heading_1` and
/// `heading_2` both sit at level 1 and `heading_3` at level 2.
pub fn extract_toc(blocks: &[Block]) -> Vec<TocItem> {
    let mut toc = Vec::new();
    collect(blocks, &mut toc);
    toc
}

fn collect(blocks: &[Block], toc: &mut Vec<TocItem>) {
    for block in blocks {
        if let BlockKind::Heading { level, text, .. } = &block.kind {
            toc.push(TocItem {
                id: block.id.clone(),
                text: plain_text(text),
                level: if *level >= 3 { 2 } else { 1 },
            });
        }

        if !block.kind.owns_subtree() {
            collect(&block.children, toc);
        }
    }
}
