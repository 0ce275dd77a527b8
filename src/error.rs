//! Errors raised while turning post sources into posts

use std::path::PathBuf;

/// Content-level failures. All of them are fatal for a build.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("front-matter block not found: file must start with a `---` line")]
    MissingFrontMatter,

    #[error("front-matter block is not closed: expected a second `---` line")]
    UnclosedFrontMatter,

    #[error("malformed front-matter line {line}: `{text}` (expected `key: value`)")]
    MalformedLine { line: usize, text: String },

    #[error("front-matter line {line} has an empty key")]
    EmptyKey { line: usize },

    #[error("front-matter key `{key}` appears more than once (line {line})")]
    DuplicateKey { key: String, line: usize },

    #[error("required front-matter field `{0}` is missing")]
    MissingField(&'static str),

    #[error("invalid slug `{0}`: use lowercase letters, digits and `-` only")]
    InvalidSlug(String),

    #[error("invalid date `{0}`")]
    InvalidDate(String),

    #[error("duplicate slug `{slug}` used by {first:?} and {second:?}")]
    DuplicateSlug {
        slug: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("unknown timezone `{0}`")]
    InvalidTimezone(String),
}

pub type Result<T> = std::result::Result<T, ContentError>;
