use once_cell::sync::Lazy;
use syntect::{
    highlighting::ThemeSet,
    html::{ClassStyle, ClassedHTMLGenerator, css_for_theme_with_class_style},
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};

use super::{RenderError, escape_attribute};

pub const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "syntax-" };
pub const DEFAULT_THEME: &str = "InspiredGitHub";

static SYNTAXES: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);
static THEMES: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);

/// Highlight `code` written in a Notion code-block language.
pub(crate) fn highlight_code(language: &str, code: &str) -> Result<String, RenderError> {
    let token = syntax_token(language);
    let syntax = token
        .and_then(|token| find_syntax(&SYNTAXES, token))
        .unwrap_or_else(|| SYNTAXES.find_syntax_plain_text());

    let mut code_with_newline = code.to_string();
    if !code_with_newline.ends_with('\n') {
        code_with_newline.push('\n');
    }

    let mut generator = ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAXES, CLASS_STYLE);
    for line in LinesWithEndings::from(code_with_newline.as_str()) {
        generator
            .parse_html_for_line_which_includes_newline(line)
            .map_err(|err| RenderError::Highlighting {
                language: language.to_string(),
                message: err.to_string(),
            })?;
    }

    Ok(wrap_code(language, &generator.finalize()))
}

/// Escaped, unhighlighted fallback with the same markup shape.
pub(crate) fn plain_code(language: &str, code: &str) -> String {
    wrap_code(language, &ammonia::clean_text(code))
}

fn wrap_code(language: &str, inner: &str) -> String {
    let slug = language_slug(language);
    format!(
        "<pre class=\"syntax-highlight syntax-lang-{slug}\" data-language=\"{}\"><code class=\"language-{slug} syntax-code\">{inner}</code></pre>",
        escape_attribute(language)
    )
}

/// Stylesheet for highlighted code using one of syntect's bundled themes.
pub fn stylesheet(theme: &str) -> Result<String, RenderError> {
    let theme = THEMES
        .themes
        .get(theme)
        .ok_or_else(|| RenderError::UnknownTheme(theme.to_string()))?;
    css_for_theme_with_class_style(theme, CLASS_STYLE)
        .map_err(|err| RenderError::Stylesheet(err.to_string()))
}

/// Token for syntect lookup; `None` means plain text.
fn syntax_token(language: &str) -> Option<&str> {
    match language.trim() {
        "" | "plain text" | "text" => None,
        "shell" | "bash" => Some("bash"),
        "c++" => Some("cpp"),
        "c#" => Some("cs"),
        "objective-c" => Some("objc"),
        "typescript" | "javascript" => Some("js"),
        "docker" => Some("Dockerfile"),
        other => Some(other),
    }
}

fn find_syntax<'a>(syntax_set: &'a SyntaxSet, token: &str) -> Option<&'a SyntaxReference> {
    let lowercase = token.to_ascii_lowercase();
    syntax_set
        .find_syntax_by_token(&lowercase)
        .or_else(|| syntax_set.find_syntax_by_name(token))
        .or_else(|| syntax_set.find_syntax_by_extension(&lowercase))
}

fn language_slug(language: &str) -> String {
    let slug: String = language
        .trim()
        .to_ascii_lowercase()
        .chars()
        .map(|ch| match ch {
            'a'..='z' | '0'..='9' => ch,
            '+' => 'p',
            '#' => 's',
            _ => '-',
        })
        .collect();
    if slug.is_empty() {
        "plain-text".to_string()
    } else {
        slug
    }
}
