use url::Url;

use crate::domain::blocks::RichText;

use super::escape_attribute;

pub fn render_rich_text(runs: &[RichText]) -> String {
    runs.iter().map(render_run).collect()
}

fn render_run(run: &RichText) -> String {
    let text = escape_text(&run.plain_text);
    if run.equation {
        return format!("<span class=\"equation\">{text}</span>");
    }

    let annotations = &run.annotations;
    let mut html = text;
    if annotations.code {
        html = format!("<code>{html}</code>");
    }
    if annotations.underline {
        html = format!("<u>{html}</u>");
    }
    if annotations.strikethrough {
        html = format!("<s>{html}</s>");
    }
    if annotations.italic {
        html = format!("<em>{html}</em>");
    }
    if annotations.bold {
        html = format!("<strong>{html}</strong>");
    }
    if annotations.has_color() {
        html = format!(
            "<span class=\"color-{}\">{html}</span>",
            color_class(&annotations.color)
        );
    }

    match run.href.as_deref().and_then(safe_href) {
        Some(href) => format!(
            "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{html}</a>",
            escape_attribute(&href)
        ),
        None => html,
    }
}

/// Text node content; newlines inside a run become line breaks.
pub(crate) fn escape_text(text: &str) -> String {
    text.split('\n')
        .map(ammonia::clean_text)
        .collect::<Vec<_>>()
        .join("<br>")
}

/// Accept http(s), mailto, in-page and root-relative links; reject the rest.
pub(crate) fn safe_href(href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    if href.starts_with('#') || (href.starts_with('/') && !href.starts_with("//")) {
        return Some(href.to_string());
    }

    let url = Url::parse(href).ok()?;
    matches!(url.scheme(), "http" | "https" | "mailto").then(|| url.to_string())
}

fn color_class(color: &str) -> String {
    color
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        .collect::<String>()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::blocks::Annotations;

    fn run(text: &str) -> RichText {
        RichText::plain(text)
    }

    #[test]
    fn nests_annotations_outer_to_inner() {
        let mut styled = run("x");
        styled.annotations = Annotations {
            bold: true,
            italic: true,
            strikethrough: true,
            underline: true,
            code: true,
            color: "default".into(),
        };
        assert_eq!(
            render_rich_text(&[styled]),
            "<strong><em><s><u><code>x</code></u></s></em></strong>"
        );
    }

    #[test]
    fn escapes_markup() {
        let html = render_rich_text(&[run("<script>")]);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn colours_become_classes() {
        let mut coloured = run("x");
        coloured.annotations.color = "red_background".into();
        assert_eq!(
            render_rich_text(&[coloured]),
            "<span class=\"color-red_background\">x</span>"
        );
    }

    #[test]
    fn links_open_in_new_tab() {
        let mut link = run("docs");
        link.href = Some("https://example.com/a".into());
        assert_eq!(
            render_rich_text(&[link]),
            "<a href=\"https://example.com/a\" target=\"_blank\" rel=\"noopener noreferrer\">docs</a>"
        );
    }

    #[test]
    fn unsafe_links_render_as_text() {
        let mut link = run("click");
        link.href = Some("javascript:alert(1)".into());
        assert_eq!(render_rich_text(&[link]), "click");
    }

    #[test]
    fn href_policy() {
        assert_eq!(safe_href("#intro").as_deref(), Some("#intro"));
        assert_eq!(safe_href("/post/abc").as_deref(), Some("/post/abc"));
        assert_eq!(
            safe_href("mailto:me@example.com").as_deref(),
            Some("mailto:me@example.com")
        );
        assert_eq!(safe_href("//evil.example"), None);
        assert_eq!(safe_href("data:text/html,hi"), None);
        assert_eq!(safe_href("  "), None);
    }

    #[test]
    fn newlines_become_breaks() {
        assert_eq!(render_rich_text(&[run("a\nb")]), "a<br>b");
    }

    #[test]
    fn equations_are_wrapped() {
        let mut eq = run("x^2");
        eq.equation = true;
        assert_eq!(
            render_rich_text(&[eq]),
            "<span class=\"equation\">x^2</span>"
        );
    }
}
