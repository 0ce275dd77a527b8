//! Syntax highlighting for fenced code blocks

use anyhow::{anyhow, Result};
use syntect::highlighting::ThemeSet;
use syntect::html::{css_for_theme_with_class_style, ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

use crate::helpers::html_escape;

/// A grammar a fence label can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    /// Canonical name, emitted as `language-{class}`
    pub class: &'static str,
    /// Token used to look the grammar up in the syntect set; `None` means plain text
    pub syntax: Option<&'static str>,
}

const fn lang(class: &'static str, syntax: Option<&'static str>) -> Language {
    Language { class, syntax }
}

/// Plain text, used for unlabeled and unknown blocks.
pub const PLAIN_TEXT: Language = lang("text", None);

/// Fence labels accepted in posts. Extend this when a post needs a new language.
static LANGUAGE_ALIASES: &[(&str, Language)] = &[
    ("sh", lang("shell", Some("bash"))),
    ("shell", lang("shell", Some("bash"))),
    ("bash", lang("shell", Some("bash"))),
    ("zsh", lang("shell", Some("bash"))),
    ("console", lang("shell", Some("bash"))),
    ("ts", lang("typescript", Some("js"))),
    ("typescript", lang("typescript", Some("js"))),
    ("tsx", lang("tsx", Some("js"))),
    ("js", lang("javascript", Some("js"))),
    ("javascript", lang("javascript", Some("js"))),
    ("jsx", lang("jsx", Some("js"))),
    ("json", lang("json", Some("json"))),
    ("yml", lang("yaml", Some("yaml"))),
    ("yaml", lang("yaml", Some("yaml"))),
    ("toml", lang("toml", None)),
    ("rs", lang("rust", Some("rs"))),
    ("rust", lang("rust", Some("rs"))),
    ("py", lang("python", Some("py"))),
    ("python", lang("python", Some("py"))),
    ("go", lang("go", Some("go"))),
    ("c", lang("c", Some("c"))),
    ("cpp", lang("cpp", Some("cpp"))),
    ("c++", lang("cpp", Some("cpp"))),
    ("java", lang("java", Some("java"))),
    ("rb", lang("ruby", Some("rb"))),
    ("ruby", lang("ruby", Some("rb"))),
    ("html", lang("html", Some("html"))),
    ("svelte", lang("html", Some("html"))),
    ("xml", lang("xml", Some("xml"))),
    ("css", lang("css", Some("css"))),
    ("sql", lang("sql", Some("sql"))),
    ("diff", lang("diff", Some("diff"))),
    ("md", lang("markdown", Some("md"))),
    ("markdown", lang("markdown", Some("md"))),
    ("dockerfile", lang("docker", None)),
    ("docker", lang("docker", None)),
    ("txt", PLAIN_TEXT),
    ("text", PLAIN_TEXT),
    ("plaintext", PLAIN_TEXT),
];

/// Look up a fence label. Matching ignores ascii case.
pub fn resolve_language(label: &str) -> Option<Language> {
    LANGUAGE_ALIASES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(label))
        .map(|(_, language)| *language)
}

/// Class-based highlighter; colors come from the stylesheet emitted by [`Highlighter::stylesheet`].
pub struct Highlighter {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme_name: String,
}

impl Highlighter {
    /// Create a highlighter whose stylesheet uses the given syntect theme
    pub fn new(theme: &str) -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme_name: theme.to_string(),
        }
    }

    /// Highlight `code` and return the inner HTML of the `<code>` element.
    ///
    /// Falls back to escaped text when the grammar is missing from the bundled
    /// set or the parser rejects the input.
    pub fn highlight(&self, code: &str, language: Language) -> String {
        let Some(token) = language.syntax else {
            return html_escape(code);
        };
        let Some(syntax) = self.syntax_set.find_syntax_by_token(token) else {
            tracing::debug!("No bundled grammar for `{}`, emitting plain text", token);
            return html_escape(code);
        };

        let mut generator = ClassedHTMLGenerator::new_with_class_style(
            syntax,
            &self.syntax_set,
            ClassStyle::Spaced,
        );
        for line in LinesWithEndings::from(code) {
            if let Err(e) = generator.parse_html_for_line_which_includes_newline(line) {
                tracing::warn!("Highlighting `{}` failed: {}", language.class, e);
                return html_escape(code);
            }
        }
        generator.finalize()
    }

    /// CSS for the configured theme, matching the classes `highlight` emits
    pub fn stylesheet(&self) -> Result<String> {
        let theme = self
            .theme_set
            .themes
            .get(&self.theme_name)
            .ok_or_else(|| anyhow!("Unknown highlight theme: {}", self.theme_name))?;
        Ok(css_for_theme_with_class_style(theme, ClassStyle::Spaced)?)
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new("base16-ocean.dark")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_aliases() {
        assert_eq!(resolve_language("ts").unwrap().class, "typescript");
        assert_eq!(resolve_language("sh").unwrap().class, "shell");
        assert_eq!(resolve_language("yml").unwrap().class, "yaml");
        assert_eq!(resolve_language("YAML").unwrap().class, "yaml");
        assert_eq!(resolve_language("text"), Some(PLAIN_TEXT));
        assert_eq!(resolve_language("brainfuck"), None);
    }

    #[test]
    fn test_highlight_emits_spans() {
        let highlighter = Highlighter::default();
        let rust = resolve_language("rust").unwrap();
        let html = highlighter.highlight("fn main() {}\n", rust);
        assert!(html.contains("<span class="));
        assert!(html.contains("main"));
    }

    #[test]
    fn test_plain_text_is_escaped() {
        let highlighter = Highlighter::default();
        let html = highlighter.highlight("<b>&</b>", PLAIN_TEXT);
        assert_eq!(html, "&lt;b&gt;&amp;&lt;/b&gt;");
    }

    #[test]
    fn test_missing_grammar_falls_back_to_text() {
        let highlighter = Highlighter::default();
        let toml = resolve_language("toml").unwrap();
        assert_eq!(highlighter.highlight("a = 1", toml), "a = 1");
    }

    #[test]
    fn test_stylesheet() {
        let css = Highlighter::default().stylesheet().unwrap();
        assert!(css.contains('{'));
        assert!(Highlighter::new("no-such-theme").stylesheet().is_err());
    }
}
