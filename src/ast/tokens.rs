use serde::{Deserialize, Serialize};

/// Lexical category of a [`Token`].
///
/// Operator kinds carry their symbol in [`Token::value`]; the parser maps it to
/// a [`BinOp`](crate::ast::BinOp) or [`UnaryOp`](crate::ast::UnaryOp).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Channel or user function reference
    ///
    /// # Examples
    /// ```text
    /// temperature
    /// FE-204-NSO-P1-CAM-1
    /// ```
    Channel,

    /// Numeric literal
    ///
    /// # Examples
    /// ```text
    /// 21
    /// 21.95
    /// 1e-3
    /// ```
    Number,

    /// String literal enclosed in quotes
    ///
    /// # Examples
    /// ```text
    /// "shot"
    /// 'ready'
    /// ```
    Text,

    /// `>`, `<`, `>=`, `<=`, `==`, `!=`
    Comparison,

    /// `and`, `or`, `not`
    Boolean,

    /// `+`, `-`, `*`, `/`, `^`
    ///
    /// `-` doubles as unary minus when an operand is expected.
    Arithmetic,

    /// Builtin function name, always followed by `(`
    ///
    /// # Examples
    /// ```text
    /// centre ( trace )
    /// Mean ( image )
    /// ```
    Function,

    /// `(`
    OpenParen,

    /// `)`
    CloseParen,

    /// `,` separating function arguments
    Comma,
}

/// A discrete lexical unit of a filter or function expression.
///
/// `value` is what the engine works with (a channel's system name, an operator
/// symbol, the unquoted text of a string literal). `label` is what the user sees,
/// which for channels is the display name from the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub label: String,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>, label: impl Into<String>) -> Self {
        Token {
            kind,
            value: value.into(),
            label: label.into(),
        }
    }

    /// Channel reference with a display label.
    pub fn channel(name: impl Into<String>, label: impl Into<String>) -> Self {
        Token::new(TokenKind::Channel, name, label)
    }

    /// Reference whose label is its name (user functions, uncatalogued channels).
    pub fn reference(name: &str) -> Self {
        Token::new(TokenKind::Channel, name, name)
    }

    pub fn number(text: &str) -> Self {
        Token::new(TokenKind::Number, text, text)
    }

    pub fn text(text: &str) -> Self {
        Token::new(TokenKind::Text, text, quote(text))
    }

    pub fn function(name: &str) -> Self {
        Token::new(TokenKind::Function, name, name)
    }

    pub fn open_paren() -> Self {
        Token::new(TokenKind::OpenParen, "(", "(")
    }

    pub fn close_paren() -> Self {
        Token::new(TokenKind::CloseParen, ")", ")")
    }

    pub fn comma() -> Self {
        Token::new(TokenKind::Comma, ",", ",")
    }

    /// Operator token from its symbol, or `None` for anything that is not an operator.
    pub fn operator(symbol: &str) -> Option<Self> {
        let kind = match symbol {
            ">" | "<" | ">=" | "<=" | "==" | "!=" => TokenKind::Comparison,
            "and" | "or" | "not" => TokenKind::Boolean,
            "+" | "-" | "*" | "/" | "^" => TokenKind::Arithmetic,
            _ => return None,
        };
        Some(Token::new(kind, symbol, symbol))
    }

    pub fn is_operator(&self, symbol: &str) -> bool {
        matches!(
            self.kind,
            TokenKind::Comparison | TokenKind::Boolean | TokenKind::Arithmetic
        ) && self.value == symbol
    }

    /// Text form used when an expression is stored as a plain string.
    pub fn source_text(&self) -> String {
        match self.kind {
            TokenKind::Text => quote(&self.value),
            _ => self.value.clone(),
        }
    }
}

pub(crate) fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for ch in text.chars() {
        match ch {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Join a token sequence back into its stored text form.
pub fn tokens_to_text(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(Token::source_text)
        .collect::<Vec<_>>()
        .join(" ")
}
