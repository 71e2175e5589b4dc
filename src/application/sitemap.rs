//! sitemap.xml and robots.txt generation.

use time::{Date, OffsetDateTime, format_description::well_known::Iso8601};
use url::Url;

use crate::domain::posts::{BlogPost, date_part};

const STATIC_ROUTES: [&str; 3] = ["", "/about", "/resume"];

/// Static routes dated `today`, then one entry per post dated by its last edit.
pub fn sitemap_xml(base: &Url, posts: &[BlogPost], today: Date) -> String {
    let base = normalize_base(base);
    let today = format_date(today);

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for route in STATIC_ROUTES {
        xml.push_str(&sitemap_entry(&base, route, &today));
    }
    for post in posts {
        let lastmod = match date_part(&post.updated_at) {
            "" => today.as_str(),
            date => date,
        };
        xml.push_str(&sitemap_entry(
            &base,
            &format!("/post/{}", post.id),
            lastmod,
        ));
    }
    xml.push_str("</urlset>\n");
    xml
}

pub fn robots_txt(base: &Url) -> String {
    format!(
        "User-agent: *\nAllow: /\nSitemap: {}/sitemap.xml\n",
        normalize_base(base)
    )
}

pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

fn normalize_base(base: &Url) -> String {
    base.as_str().trim_end_matches('/').to_string()
}

fn format_date(date: Date) -> String {
    date.format(&Iso8601::DATE)
        .unwrap_or_else(|_| date.to_string())
}

fn sitemap_entry(base: &str, path: &str, lastmod: &str) -> String {
    format!(
        "  <url><loc>{}{}</loc><lastmod>{}</lastmod></url>\n",
        xml_escape(base),
        xml_escape(path),
        xml_escape(lastmod)
    )
}

fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
