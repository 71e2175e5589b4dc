use std::num::{NonZeroU32, NonZeroUsize};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use folio::application::blocks::BlockTreeLoader;
use folio::application::export::SiteExporter;
use folio::application::posts::{PostCacheConfig, PostService};
use folio::application::repos::{ContentSource, CursorPage, RepoError};
use folio::config::SiteSettings;
use folio::domain::blocks::{Block, BlockKind, RichText};
use folio::domain::ids::NotionId;
use folio::domain::posts::{BlogPost, PostRecord};
use folio::domain::profile::Profile;
use url::Url;

struct FixedSource {
    records: Vec<PostRecord>,
}

#[async_trait]
impl ContentSource for FixedSource {
    async fn query_published(
        &self,
        _cursor: Option<&str>,
    ) -> Result<CursorPage<PostRecord>, RepoError> {
        Ok(CursorPage::last(self.records.clone()))
    }

    async fn retrieve_post(&self, id: &NotionId) -> Result<Option<PostRecord>, RepoError> {
        Ok(self.records.iter().find(|r| &r.post.id == id).cloned())
    }

    async fn list_children(
        &self,
        block_id: &str,
        _cursor: Option<&str>,
    ) -> Result<CursorPage<Block>, RepoError> {
        Ok(CursorPage::last(vec![Block::new(
            format!("{block_id}-p"),
            BlockKind::Paragraph {
                text: vec![RichText::plain("Exported")],
            },
        )]))
    }
}

fn record(n: u32) -> PostRecord {
    PostRecord {
        post: BlogPost {
            id: NotionId::parse(&format!("{n:032x}")).expect("valid id"),
            title: format!("Post {n}"),
            description: String::new(),
            created_at: format!("2026-01-{n:02}"),
            updated_at: String::new(),
            tags: Vec::new(),
            category: None,
            project: None,
        },
        status: None,
    }
}

#[tokio::test]
async fn export_writes_every_public_page() {
    let source: Arc<dyn ContentSource> = Arc::new(FixedSource {
        records: (1..=3).rev().map(record).collect(),
    });
    let loader = BlockTreeLoader::new(source.clone(), 2, 2);
    let posts = Arc::new(PostService::new(
        source,
        loader,
        2,
        PostCacheConfig {
            revalidate: Duration::from_secs(60),
            capacity: NonZeroUsize::new(8).expect("non-zero"),
        },
    ));
    let exporter = SiteExporter::new(
        posts,
        Arc::new(SiteSettings {
            base_url: Url::parse("https://static.example.com").expect("url"),
            title: "Static".to_string(),
            author: "Kim".to_string(),
            description: String::new(),
            posts_per_page: NonZeroU32::new(2).expect("non-zero"),
        }),
        Arc::new(Profile {
            name: "Kim".to_string(),
            ..Profile::default()
        }),
    );

    let dir = tempfile::tempdir().expect("temp dir");
    let summary = exporter.export(dir.path()).await.expect("export succeeds");

    assert_eq!(summary.posts, 3);
    assert_eq!(summary.index_pages, 2);

    for relative in [
        "index.html",
        "page/1/index.html",
        "page/2/index.html",
        "about/index.html",
        "resume/index.html",
        "404.html",
        "sitemap.xml",
        "robots.txt",
        "static/syntax.css",
        "static/style.css",
        "static/app.js",
    ] {
        assert!(dir.path().join(relative).is_file(), "missing {relative}");
    }

    let first_id = NotionId::parse(&format!("{:032x}", 1)).expect("valid id");
    let post_html = std::fs::read_to_string(
        dir.path()
            .join("post")
            .join(first_id.to_string())
            .join("index.html"),
    )
    .expect("post page written");
    assert!(post_html.contains("Post 1"));
    assert!(post_html.contains("<p>Exported</p>"));

    let sitemap = std::fs::read_to_string(dir.path().join("sitemap.xml")).expect("sitemap");
    assert!(sitemap.contains(&format!("https://static.example.com/post/{first_id}")));
}
