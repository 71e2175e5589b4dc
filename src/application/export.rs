//! Static export of every public page into a directory tree.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use askama::Template;
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

use crate::{
    application::{
        posts::{PostError, PostService},
        render::{DEFAULT_THEME, RenderError, stylesheet},
        sitemap,
    },
    config::SiteSettings,
    domain::{posts::PostFilter, profile::Profile},
    infra::assets,
    presentation::views::{LayoutChrome, TemplateRenderError, pages, render_template},
};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Template(#[from] TemplateRenderError),
    #[error(transparent)]
    Stylesheet(#[from] RenderError),
    #[error("failed to load posts: {0}")]
    Posts(#[from] PostError),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub posts: usize,
    pub index_pages: usize,
    pub files: usize,
}

pub struct SiteExporter {
    posts: Arc<PostService>,
    site: Arc<SiteSettings>,
    profile: Arc<Profile>,
}

impl SiteExporter {
    pub fn new(posts: Arc<PostService>, site: Arc<SiteSettings>, profile: Arc<Profile>) -> Self {
        Self {
            posts,
            site,
            profile,
        }
    }

    /// Index page N lands at `page/N/index.html`; page 1 is also the root `index.html`.
    pub async fn export(&self, dir: &Path) -> Result<ExportSummary, ExportError> {
        let mut writer = Writer::new(dir);
        let chrome = LayoutChrome::from_site(&self.site);
        let posts = self.posts.all_posts().await?;

        let first = self.posts.list(PostFilter::default(), 1).await;
        let total_pages = first.page.total_pages;
        writer
            .template("index.html", &pages::index(chrome.clone(), &first))
            .await?;
        for number in 1..=total_pages {
            let listing = self.posts.list(PostFilter::default(), number).await;
            writer
                .template(
                    &format!("page/{number}/index.html"),
                    &pages::index(chrome.clone(), &listing),
                )
                .await?;
        }

        let mut exported_posts = 0;
        for post in posts.iter() {
            let detail = match self.posts.detail(&post.id).await {
                Ok(detail) => detail,
                Err(PostError::NotFound) => {
                    warn!(post_id = %post.id, "Skipping post that is no longer published");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            writer
                .template(
                    &format!("post/{}/index.html", post.id),
                    &pages::post(chrome.clone(), &detail),
                )
                .await?;
            exported_posts += 1;
        }

        writer
            .template("about/index.html", &pages::about(chrome.clone(), &self.profile))
            .await?;
        writer
            .template(
                "resume/index.html",
                &pages::resume(chrome.clone(), &self.profile),
            )
            .await?;
        writer
            .template("404.html", &pages::not_found(chrome))
            .await?;

        writer
            .bytes(
                "sitemap.xml",
                sitemap::sitemap_xml(&self.site.base_url, &posts, sitemap::today()).as_bytes(),
            )
            .await?;
        writer
            .bytes("robots.txt", sitemap::robots_txt(&self.site.base_url).as_bytes())
            .await?;
        writer
            .bytes("static/syntax.css", stylesheet(DEFAULT_THEME)?.as_bytes())
            .await?;
        for (path, contents) in assets::all_files() {
            writer.bytes(&format!("static/{path}"), contents).await?;
        }

        let summary = ExportSummary {
            posts: exported_posts,
            index_pages: total_pages,
            files: writer.files,
        };
        info!(
            dir = %dir.display(),
            posts = summary.posts,
            index_pages = summary.index_pages,
            files = summary.files,
            "Site exported"
        );
        Ok(summary)
    }
}

struct Writer<'a> {
    root: &'a Path,
    files: usize,
}

impl<'a> Writer<'a> {
    fn new(root: &'a Path) -> Self {
        Self { root, files: 0 }
    }

    async fn template<T: Template>(&mut self, relative: &str, template: &T) -> Result<(), ExportError> {
        let html = render_template(template)?;
        self.bytes(relative, html.as_bytes()).await
    }

    async fn bytes(&mut self, relative: &str, contents: &[u8]) -> Result<(), ExportError> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| ExportError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        fs::write(&path, contents)
            .await
            .map_err(|source| ExportError::Io {
                path: path.clone(),
                source,
            })?;
        self.files += 1;
        Ok(())
    }
}
