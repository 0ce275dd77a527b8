//! Front-matter parsing
//!
//! A post starts with a block of `key: value` lines between two `---` marker
//! lines. Values are plain strings; typing happens later in [`super::post`].

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ContentError, Result};

lazy_static! {
    static ref BLOCK: Regex =
        Regex::new(r"(?s)\A---[ \t]*\r?\n(?:(.*?)\r?\n)??---[ \t]*(?:\r?\n|\z)").unwrap();
}

/// Front-matter data from a post, in source order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrontMatter {
    fields: IndexMap<String, String>,
}

impl FrontMatter {
    /// Parse front-matter from content string
    /// Returns (front_matter, remaining_content)
    pub fn parse(content: &str) -> Result<(Self, &str)> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);

        if !content.starts_with("---") {
            return Err(ContentError::MissingFrontMatter);
        }
        let caps = BLOCK
            .captures(content)
            .ok_or(ContentError::UnclosedFrontMatter)?;
        let block = caps.get(1).map_or("", |m| m.as_str());
        let body = &content[caps.get(0).map_or(0, |m| m.end())..];

        let mut fields = IndexMap::new();
        // Line 1 is the opening marker
        for (i, raw) in block.lines().enumerate() {
            let line = i + 2;
            if raw.trim().is_empty() {
                continue;
            }
            let (key, value) = raw
                .split_once(':')
                .ok_or_else(|| ContentError::MalformedLine {
                    line,
                    text: raw.trim().to_string(),
                })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(ContentError::EmptyKey { line });
            }
            if fields.contains_key(key) {
                return Err(ContentError::DuplicateKey {
                    key: key.to_string(),
                    line,
                });
            }
            fields.insert(key.to_string(), unquote(value.trim()).to_string());
        }

        Ok((Self { fields }, body))
    }

    /// Value for `key`, if present
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Value for `key`, treating an empty string as absent
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// Value for a key the post cannot do without
    pub fn require(&self, key: &'static str) -> Result<&str> {
        self.non_empty(key).ok_or(ContentError::MissingField(key))
    }

    /// Set a value, keeping the position of an existing key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Iterate over `(key, value)` pairs in source order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Serialize back into a `---` delimited block, ending with a newline
    pub fn to_block(&self) -> String {
        let mut out = String::from("---\n");
        for (key, value) in &self.fields {
            out.push_str(key);
            out.push_str(": ");
            out.push_str(&quote_if_needed(value));
            out.push('\n');
        }
        out.push_str("---\n");
        out
    }
}

/// Drop one pair of matching surrounding quotes
fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Quote values that would not survive `trim` + `unquote` unchanged
fn quote_if_needed(value: &str) -> String {
    let padded = value.trim() != value;
    let quoted = unquote(value) != value;
    if padded || quoted {
        format!("\"{}\"", value)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POST: &str = "---
title: Hello World
slug: hello-world
date: 2024-01-15
tags: rust, blog
published: \"false\"
---

This is the content.
";

    #[test]
    fn test_parse_frontmatter() {
        let (fm, body) = FrontMatter::parse(POST).unwrap();
        assert_eq!(fm.get("title"), Some("Hello World"));
        assert_eq!(fm.get("slug"), Some("hello-world"));
        assert_eq!(fm.get("tags"), Some("rust, blog"));
        assert_eq!(fm.get("published"), Some("false"));
        assert_eq!(fm.len(), 5);
        assert_eq!(body, "\nThis is the content.\n");
    }

    #[test]
    fn test_value_split_on_first_colon() {
        let (fm, _) =
            FrontMatter::parse("---\nbanner: https://cdn.example.com/a.png\ntitle: A: B\n---\n")
                .unwrap();
        assert_eq!(fm.get("banner"), Some("https://cdn.example.com/a.png"));
        assert_eq!(fm.get("title"), Some("A: B"));
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        let (fm, _) = FrontMatter::parse("---\nTitle: Upper\n---\n").unwrap();
        assert_eq!(fm.get("title"), None);
        assert_eq!(fm.get("Title"), Some("Upper"));
    }

    #[test]
    fn test_crlf_and_bom() {
        let content = "\u{feff}---\r\ntitle: Windows\r\n---\r\nBody\r\n";
        let (fm, body) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.get("title"), Some("Windows"));
        assert_eq!(body, "Body\r\n");
    }

    #[test]
    fn test_empty_block() {
        let (fm, body) = FrontMatter::parse("---\n---\nbody").unwrap();
        assert!(fm.is_empty());
        assert_eq!(body, "body");
    }

    #[test]
    fn test_body_may_contain_markers() {
        let (fm, body) = FrontMatter::parse("---\ntitle: t\n---\nabove\n\n---\n\nbelow\n").unwrap();
        assert_eq!(fm.len(), 1);
        assert!(body.contains("above"));
        assert!(body.contains("below"));
    }

    #[test]
    fn test_missing_block_fails() {
        let err = FrontMatter::parse("# Just markdown\n").unwrap_err();
        assert!(matches!(err, ContentError::MissingFrontMatter));
    }

    #[test]
    fn test_unclosed_block_fails() {
        let err = FrontMatter::parse("---\ntitle: x\n\nbody without end").unwrap_err();
        assert!(matches!(err, ContentError::UnclosedFrontMatter));
    }

    #[test]
    fn test_line_without_colon_fails() {
        let err = FrontMatter::parse("---\ntitle: x\njust words\n---\n").unwrap_err();
        match err {
            ContentError::MalformedLine { line, text } => {
                assert_eq!(line, 3);
                assert_eq!(text, "just words");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_key_and_duplicate_key_fail() {
        assert!(matches!(
            FrontMatter::parse("---\n: value\n---\n").unwrap_err(),
            ContentError::EmptyKey { line: 2 }
        ));
        assert!(matches!(
            FrontMatter::parse("---\ntitle: a\ntitle: b\n---\n").unwrap_err(),
            ContentError::DuplicateKey { line: 3, .. }
        ));
    }

    #[test]
    fn test_round_trip_key_set() {
        let (fm, _) = FrontMatter::parse(POST).unwrap();
        let block = fm.to_block();
        let (again, body) = FrontMatter::parse(&block).unwrap();
        let keys: Vec<_> = fm.iter().map(|(k, _)| k).collect();
        let keys_again: Vec<_> = again.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, keys_again);
        assert_eq!(fm, again);
        assert!(body.is_empty());
    }

    #[test]
    fn test_round_trip_preserves_awkward_values() {
        let mut fm = FrontMatter::default();
        fm.insert("title", "\"quoted\"");
        fm.insert("description", "");
        fm.insert("note", "a: b");
        let (again, _) = FrontMatter::parse(&fm.to_block()).unwrap();
        assert_eq!(fm, again);
    }

    #[test]
    fn test_require() {
        let (fm, _) = FrontMatter::parse("---\ntitle:\n---\n").unwrap();
        assert!(matches!(
            fm.require("title"),
            Err(ContentError::MissingField("title"))
        ));
    }
}
