//! CLI support for opgw-expr
//!
//! Provides programmatic access to the `opgw` command functionality so hosts
//! can embed the same checks and record processing.

mod check;
mod convert;
mod docs;
mod run;
mod suggest;

pub use check::{CheckOptions, CheckResult, execute_check};
pub use convert::{json_to_record, json_to_records, json_to_value, record_to_json, records_to_json, value_to_json};
pub use docs::{DocCategory, get_doc_category, get_docs_overview};
pub use run::{RunOptions, execute_apply, execute_filter};
pub use suggest::{SuggestOptions, execute_suggest};

use std::{fs, io, path::Path};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::{
    catalogue::CatalogueError,
    complete::CommitError,
    lexer::LexError,
    parser::ParseError,
    validate::FieldError,
};

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Catalogue(#[from] CatalogueError),

    #[error("Lex error: {0}")]
    Lex(#[from] LexError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Commit(#[from] CommitError),

    /// Validation failed; the field errors are the useful output
    #[error("{}", render_field_errors(.0))]
    Invalid(Vec<FieldError>),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid record: {0}")]
    Record(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Stdin(#[from] io::Error),

    #[error("No input provided. Use --input or pipe JSON to stdin.")]
    NoInput,

    #[error("Unknown category: '{0}'\nRun 'opgw docs' to see available categories.")]
    UnknownCategory(String),
}

fn render_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field_path, e.message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Read and deserialize a JSON file (channel catalogues, function lists, filter lists).
pub fn load_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, CliError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}
