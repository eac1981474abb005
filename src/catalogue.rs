//! Channel metadata and the token catalogue built on it.
//!
//! [`ChannelCatalogue`] is supplied by the host application (usually as JSON).
//! [`TokenCatalogue`] turns it into the tokens a user may type next, asking the
//! [`GrammarState`] for the final say on legality.

use std::{collections::BTreeMap, fs, io, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    ast::Token,
    functions,
    grammar::{Expect, GrammarState},
    value::ValueType,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Scalar,
    Waveform,
    Image,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    Numeric,
    Text,
}

/// Metadata for one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    /// Display name shown to users
    pub label: String,
    pub kind: ChannelKind,
    #[serde(default)]
    pub data_type: DataType,
}

impl ChannelInfo {
    pub fn scalar(label: impl Into<String>) -> Self {
        ChannelInfo {
            label: label.into(),
            kind: ChannelKind::Scalar,
            data_type: DataType::Numeric,
        }
    }

    pub fn text(label: impl Into<String>) -> Self {
        ChannelInfo {
            label: label.into(),
            kind: ChannelKind::Scalar,
            data_type: DataType::Text,
        }
    }

    pub fn waveform(label: impl Into<String>) -> Self {
        ChannelInfo {
            label: label.into(),
            kind: ChannelKind::Waveform,
            data_type: DataType::Numeric,
        }
    }

    pub fn image(label: impl Into<String>) -> Self {
        ChannelInfo {
            label: label.into(),
            kind: ChannelKind::Image,
            data_type: DataType::Numeric,
        }
    }

    pub fn value_type(&self) -> ValueType {
        match (self.kind, self.data_type) {
            (ChannelKind::Scalar, DataType::Numeric) => ValueType::Number,
            (ChannelKind::Scalar, DataType::Text) => ValueType::Text,
            (ChannelKind::Waveform, _) => ValueType::Waveform,
            (ChannelKind::Image, _) => ValueType::Image,
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error("cannot read channel catalogue {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("invalid channel catalogue: {0}")]
    Json(#[from] serde_json::Error),
}

/// Channels keyed by system name.
///
/// The JSON form is an object of system name to metadata:
///
/// ```
/// use opgw_expr::ChannelCatalogue;
///
/// let catalogue = ChannelCatalogue::from_json_str(
///     r#"{"temperature": {"label": "Temperature", "kind": "scalar"}}"#,
/// ).unwrap();
/// assert_eq!(catalogue.get("temperature").unwrap().label, "Temperature");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelCatalogue {
    channels: BTreeMap<String, ChannelInfo>,
}

impl ChannelCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, info: ChannelInfo) {
        self.channels.insert(name.into(), info);
    }

    pub fn with(mut self, name: impl Into<String>, info: ChannelInfo) -> Self {
        self.insert(name, info);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ChannelInfo> {
        self.channels.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ChannelInfo)> {
        self.channels.iter()
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogueError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogueError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| CatalogueError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }
}

/// Whether an expression is being written as a filter or a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Filter,
    Function,
}

/// Source of the tokens legal at a given point of an expression.
pub struct TokenCatalogue<'a> {
    channels: &'a ChannelCatalogue,
    functions: Vec<String>,
    mode: Mode,
}

impl<'a> TokenCatalogue<'a> {
    pub fn new(channels: &'a ChannelCatalogue, mode: Mode) -> Self {
        TokenCatalogue {
            channels,
            functions: Vec::new(),
            mode,
        }
    }

    /// User functions that may be referenced, in declaration order.
    pub fn with_functions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.functions.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn channels(&self) -> &ChannelCatalogue {
        self.channels
    }

    /// Operand tokens legal in `state`; empty unless an operand is expected.
    pub fn available_operands(&self, state: &GrammarState) -> Vec<Token> {
        let mut candidates = Vec::new();
        match state.expect() {
            Expect::Operator => return candidates,
            Expect::CallParen => {
                candidates.push(Token::open_paren());
                return candidates;
            }
            Expect::Operand => {}
        }

        // Comparing a channel with itself is never what the user means
        let left = state.comparison_left();
        for (name, info) in self.channels.iter() {
            if left != Some(name.as_str()) {
                candidates.push(Token::channel(name.clone(), info.label.clone()));
            }
        }
        for name in &self.functions {
            if left != Some(name.as_str()) {
                candidates.push(Token::reference(name));
            }
        }
        if self.mode == Mode::Function {
            candidates.extend(functions::builtins().iter().map(|b| Token::function(b.name)));
        }
        candidates.push(Token::open_paren());
        if self.mode == Mode::Filter {
            candidates.extend(Token::operator("not"));
        }
        candidates.extend(Token::operator("-"));

        candidates.retain(|token| state.accepts(token));
        candidates
    }

    /// Operator tokens legal in `state`; empty unless an operand was just completed.
    pub fn available_operators(&self, state: &GrammarState) -> Vec<Token> {
        if state.expect() != Expect::Operator {
            return Vec::new();
        }

        let symbols: &[&str] = match self.mode {
            Mode::Filter => &["==", "!=", ">", "<", ">=", "<=", "and", "or"],
            Mode::Function => &["+", "-", "*", "/", "^"],
        };
        let mut candidates: Vec<Token> = symbols.iter().filter_map(|s| Token::operator(s)).collect();
        candidates.push(Token::close_paren());
        if state.has_room_for_argument() {
            candidates.push(Token::comma());
        }

        candidates.retain(|token| state.accepts(token));
        candidates
    }

    /// Everything legal next: operands, then operators.
    pub fn available(&self, state: &GrammarState) -> Vec<Token> {
        let mut tokens = self.available_operands(state);
        tokens.extend(self.available_operators(state));
        tokens
    }
}
