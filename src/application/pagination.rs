//! Page-number links for the blog index.

use url::form_urlencoded;

use crate::domain::posts::{PostFilter, PostPage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    pub number: usize,
    pub href: String,
    pub current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub pages: Vec<PageLink>,
    pub previous: Option<String>,
    pub next: Option<String>,
}

impl Pagination {
    pub fn for_page(path: &str, filter: &PostFilter, page: &PostPage) -> Self {
        let pages = (1..=page.total_pages)
            .map(|number| PageLink {
                number,
                href: page_href(path, filter, number),
                current: number == page.current_page,
            })
            .collect();

        Self {
            pages,
            previous: (page.current_page > 1)
                .then(|| page_href(path, filter, page.current_page - 1)),
            next: (page.current_page < page.total_pages)
                .then(|| page_href(path, filter, page.current_page + 1)),
        }
    }

    pub fn is_single(&self) -> bool {
        self.pages.len() <= 1
    }
}

/// Link to `page` that keeps the active filters and replaces `page`.
pub fn page_href(path: &str, filter: &PostFilter, page: usize) -> String {
    let mut query = filter_query(filter);
    query.append_pair("page", &page.to_string());
    format!("{path}?{}", query.finish())
}

/// Link to the index filtered by a single facet value.
pub fn facet_href(path: &str, key: &str, value: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair(key, value)
        .finish();
    format!("{path}?{query}")
}

fn filter_query(filter: &PostFilter) -> form_urlencoded::Serializer<'static, String> {
    let mut query = form_urlencoded::Serializer::new(String::new());
    for (key, value) in [
        ("category", &filter.category),
        ("project", &filter.project),
        ("tag", &filter.tag),
    ] {
        if let Some(value) = value {
            query.append_pair(key, value);
        }
    }
    query
}
