//! Recursive block-tree loading on top of [`ContentSource`].

use std::sync::Arc;

use futures::{
    FutureExt, StreamExt, TryStreamExt,
    future::BoxFuture,
    stream,
};
use tracing::{debug, instrument};

use crate::{
    application::repos::{ContentSource, RepoError},
    domain::blocks::{Block, BlockKind},
};

#[derive(Clone)]
pub struct BlockTreeLoader {
    source: Arc<dyn ContentSource>,
    max_depth: u32,
    child_concurrency: usize,
}

impl BlockTreeLoader {
    pub fn new(source: Arc<dyn ContentSource>, max_depth: u32, child_concurrency: usize) -> Self {
        Self {
            source,
            max_depth,
            child_concurrency: child_concurrency.max(1),
        }
    }

    /// Fetch every block under `root`, descending into nested children.
    ///
    /// Child pages and databases are left as leaves. Blocks below `max_depth`
    /// keep `has_children` but get no children. The first failing request
    /// aborts the whole load.
    #[instrument(skip(self), fields(max_depth = self.max_depth))]
    pub async fn load(&self, root: &str) -> Result<Vec<Block>, RepoError> {
        self.load_level(root.to_string(), 0).await
    }

    fn load_level(&self, parent: String, depth: u32) -> BoxFuture<'_, Result<Vec<Block>, RepoError>> {
        async move {
            let blocks = self.list_all(&parent).await?;

            if depth >= self.max_depth {
                let truncated = blocks.iter().filter(|b| needs_children(b)).count();
                if truncated > 0 {
                    debug!(
                        parent = %parent,
                        depth,
                        truncated,
                        "Maximum block depth reached; nested children not loaded"
                    );
                }
                return Ok(blocks);
            }

            stream::iter(blocks.into_iter().map(|block| self.expand(block, depth)))
                .buffered(self.child_concurrency)
                .try_collect()
                .await
        }
        .boxed()
    }

    async fn expand(&self, mut block: Block, depth: u32) -> Result<Block, RepoError> {
        if needs_children(&block) {
            let source = block.children_source().to_string();
            block.children = self.load_level(source, depth + 1).await?;
        }
        Ok(block)
    }

    async fn list_all(&self, parent: &str) -> Result<Vec<Block>, RepoError> {
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self.source.list_children(parent, cursor.as_deref()).await?;
            blocks.extend(page.items);
            match page.next_cursor {
                Some(next) if Some(&next) != cursor.as_ref() => cursor = Some(next),
                _ => break,
            }
        }

        Ok(blocks)
    }
}

fn needs_children(block: &Block) -> bool {
    if block.kind.owns_subtree() {
        return false;
    }
    block.has_children
        || matches!(
            block.kind,
            BlockKind::SyncedBlock {
                source: Some(_)
            }
        )
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{
        application::repos::CursorPage,
        domain::{blocks::RichText, ids::NotionId, posts::PostRecord},
    };

    /// Children keyed by `(parent, cursor)`.
    #[derive(Default)]
    struct StubSource {
        pages: HashMap<(String, Option<String>), CursorPage<Block>>,
        failing: Option<String>,
        calls: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl StubSource {
        fn with(mut self, parent: &str, cursor: Option<&str>, page: CursorPage<Block>) -> Self {
            self.pages
                .insert((parent.to_string(), cursor.map(str::to_string)), page);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    #[async_trait]
    impl ContentSource for StubSource {
        async fn query_published(
            &self,
            _cursor: Option<&str>,
        ) -> Result<CursorPage<PostRecord>, RepoError> {
            Ok(CursorPage::last(Vec::new()))
        }

        async fn retrieve_post(&self, _id: &NotionId) -> Result<Option<PostRecord>, RepoError> {
            Ok(None)
        }

        async fn list_children(
            &self,
            block_id: &str,
            cursor: Option<&str>,
        ) -> Result<CursorPage<Block>, RepoError> {
            self.calls
                .lock()
                .expect("calls lock")
                .push(block_id.to_string());

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.as_deref() == Some(block_id) {
                return Err(RepoError::Upstream("boom".into()));
            }
            Ok(self
                .pages
                .get(&(block_id.to_string(), cursor.map(str::to_string)))
                .cloned()
                .unwrap_or_else(|| CursorPage::last(Vec::new())))
        }
    }

    fn paragraph(id: &str) -> Block {
        Block::new(
            id,
            BlockKind::Paragraph {
                text: vec![RichText::plain(id)],
            },
        )
    }

    fn parent(id: &str) -> Block {
        let mut block = paragraph(id);
        block.has_children = true;
        block
    }

    fn ids(blocks: &[Block]) -> Vec<&str> {
        blocks.iter().map(|b| b.id.as_str()).collect()
    }

    fn loader(source: StubSource, max_depth: u32) -> (Arc<StubSource>, BlockTreeLoader) {
        let source = Arc::new(source);
        let loader = BlockTreeLoader::new(source.clone(), max_depth, 4);
        (source, loader)
    }

    #[tokio::test]
    async fn follows_cursors_until_exhausted() {
        let source = StubSource::default()
            .with(
                "root",
                None,
                CursorPage {
                    items: vec![paragraph("a"), paragraph("b")],
                    next_cursor: Some("c1".into()),
                },
            )
            .with("root", Some("c1"), CursorPage::last(vec![paragraph("c")]));
        let (_, loader) = loader(source, 4);

        let blocks = loader.load("root").await.expect("load succeeds");
        assert_eq!(ids(&blocks), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn nests_children_in_original_order() {
        let source = StubSource::default()
            .with(
                "root",
                None,
                CursorPage::last(vec![parent("p1"), paragraph("x"), parent("p2")]),
            )
            .with("p1", None, CursorPage::last(vec![parent("p1a"), paragraph("p1b")]))
            .with("p1a", None, CursorPage::last(vec![paragraph("deep")]))
            .with("p2", None, CursorPage::last(vec![paragraph("p2a")]));
        let (_, loader) = loader(source, 8);

        let blocks = loader.load("root").await.expect("load succeeds");
        assert_eq!(ids(&blocks), vec!["p1", "x", "p2"]);
        assert_eq!(ids(&blocks[0].children), vec!["p1a", "p1b"]);
        assert_eq!(ids(&blocks[0].children[0].children), vec!["deep"]);
        assert_eq!(ids(&blocks[2].children), vec!["p2a"]);
        assert!(blocks[1].children.is_empty());
    }

    #[tokio::test]
    async fn child_pages_are_not_descended() {
        let mut child_page = Block::new(
            "sub",
            BlockKind::ChildPage {
                title: "Sub".into(),
            },
        );
        child_page.has_children = true;
        let source = StubSource::default().with("root", None, CursorPage::last(vec![child_page]));
        let (source, loader) = loader(source, 8);

        let blocks = loader.load("root").await.expect("load succeeds");
        assert!(blocks[0].children.is_empty());
        assert_eq!(source.calls(), vec!["root"]);
    }

    #[tokio::test]
    async fn synced_references_load_the_original_children() {
        let reference = Block::new(
            "ref",
            BlockKind::SyncedBlock {
                source: Some("orig".into()),
            },
        );
        let source = StubSource::default()
            .with("root", None, CursorPage::last(vec![reference]))
            .with("orig", None, CursorPage::last(vec![paragraph("shared")]));
        let (source, loader) = loader(source, 8);

        let blocks = loader.load("root").await.expect("load succeeds");
        assert_eq!(ids(&blocks[0].children), vec!["shared"]);
        assert!(!source.calls().contains(&"ref".to_string()));
    }

    #[tokio::test]
    async fn stops_at_max_depth() {
        let source = StubSource::default()
            .with("root", None, CursorPage::last(vec![parent("l0")]))
            .with("l0", None, CursorPage::last(vec![parent("l1")]))
            .with("l1", None, CursorPage::last(vec![paragraph("l2")]));
        let (source, loader) = loader(source, 1);

        let blocks = loader.load("root").await.expect("load succeeds");
        let l1 = &blocks[0].children[0];
        assert_eq!(l1.id, "l1");
        assert!(l1.has_children);
        assert!(l1.children.is_empty());
        assert_eq!(source.calls(), vec!["root", "l0"]);
    }

    #[tokio::test]
    async fn any_failure_aborts_the_load() {
        let mut source = StubSource::default()
            .with("root", None, CursorPage::last(vec![parent("ok"), parent("bad")]))
            .with("ok", None, CursorPage::last(vec![paragraph("fine")]));
        source.failing = Some("bad".into());
        let (_, loader) = loader(source, 8);

        let err = loader.load("root").await.expect_err("load fails");
        assert!(matches!(err, RepoError::Upstream(_)));
    }

    #[tokio::test]
    async fn sibling_loads_respect_concurrency_limit() {
        let children: Vec<Block> = (0..10).map(|i| parent(&format!("p{i}"))).collect();
        let source = StubSource::default().with("root", None, CursorPage::last(children));
        let source = Arc::new(source);
        let loader = BlockTreeLoader::new(source.clone(), 8, 2);

        let blocks = loader.load("root").await.expect("load succeeds");
        assert_eq!(blocks.len(), 10);
        assert!(source.peak.load(Ordering::SeqCst) <= 2);
    }
}
