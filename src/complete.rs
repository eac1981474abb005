//! Autocomplete over a partial token sequence.
//!
//! The expression being built is always a sequence of committed tokens plus
//! the text currently typed into the input box. Suggestions come from the
//! [`TokenCatalogue`], so nothing illegal is ever offered, and committing goes
//! through the same grammar so nothing illegal is ever accepted.

use thiserror::Error;

use crate::{
    ast::{Token, TokenKind, tokens_to_text},
    catalogue::TokenCatalogue,
    grammar::{Expect, GrammarState},
    lexer::Lexer,
    parser::{ParseError, ParseErrorKind},
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommitError {
    /// The existing sequence is itself broken
    #[error(transparent)]
    Sequence(#[from] ParseError),

    #[error("'{token}' cannot follow the expression: {reason}")]
    Rejected {
        token: String,
        reason: ParseErrorKind,
    },

    #[error("'{0}' does not match any option")]
    NoMatch(String),
}

fn replay(sequence: &[Token]) -> Result<GrammarState, ParseError> {
    GrammarState::replay(sequence).map_err(|kind| ParseError {
        expression: tokens_to_text(sequence),
        kind,
    })
}

/// Literal token for typed text, if the lexer reads it back as exactly one
/// finite number or one quoted string. A leading sign is not part of a number;
/// `-` is committed as its own token.
fn literal(typed: &str) -> Option<Token> {
    let tokens = Lexer::new(typed).tokenize().ok()?;
    let [token] = <[Token; 1]>::try_from(tokens).ok()?;
    match token.kind {
        TokenKind::Number if token.value.parse::<f64>().is_ok_and(f64::is_finite) => Some(token),
        TokenKind::Text => Some(token),
        _ => None,
    }
}

/// Legal next tokens matching `typed`, best first.
///
/// Case-insensitive prefix matches on the label (or value) come first, then
/// substring matches, each group in catalogue order. Empty input lists
/// everything legal. Typed numbers and quoted strings add a literal when an
/// operand may come next.
///
/// ```
/// use opgw_expr::{ChannelCatalogue, ChannelInfo};
/// use opgw_expr::catalogue::{Mode, TokenCatalogue};
/// use opgw_expr::complete::complete;
///
/// let channels = ChannelCatalogue::new()
///     .with("temperature", ChannelInfo::scalar("Temperature"))
///     .with("air_temp", ChannelInfo::scalar("Air temp"));
/// let catalogue = TokenCatalogue::new(&channels, Mode::Filter);
///
/// let options = complete(&catalogue, &[], "temp").unwrap();
/// let values: Vec<&str> = options.iter().map(|t| t.value.as_str()).collect();
/// assert_eq!(values, vec!["temperature", "air_temp"]);
/// ```
pub fn complete(
    catalogue: &TokenCatalogue<'_>,
    sequence: &[Token],
    typed: &str,
) -> Result<Vec<Token>, ParseError> {
    let state = replay(sequence)?;
    let candidates = catalogue.available(&state);
    let needle = typed.trim().to_lowercase();

    if needle.is_empty() {
        return Ok(candidates);
    }

    let mut prefix = Vec::new();
    let mut substring = Vec::new();
    for token in candidates {
        let label = token.label.to_lowercase();
        let value = token.value.to_lowercase();
        if label.starts_with(&needle) || value.starts_with(&needle) {
            prefix.push(token);
        } else if label.contains(&needle) || value.contains(&needle) {
            substring.push(token);
        }
    }

    let mut ranked = Vec::with_capacity(prefix.len() + substring.len() + 1);
    if state.expect() == Expect::Operand
        && let Some(token) = literal(typed)
    {
        ranked.push(token);
    }
    ranked.extend(prefix);
    ranked.extend(substring);
    Ok(ranked)
}

/// Append `token` to `sequence`, if the grammar accepts it there.
///
/// ```
/// use opgw_expr::ast::Token;
/// use opgw_expr::complete::commit;
///
/// let sequence = commit(&[], Token::reference("a")).unwrap();
/// assert!(commit(&sequence, Token::reference("b")).is_err());
/// ```
pub fn commit(sequence: &[Token], token: Token) -> Result<Vec<Token>, CommitError> {
    let mut state = replay(sequence)?;
    if let Err(reason) = state.step(&token) {
        return Err(CommitError::Rejected {
            token: token.label,
            reason,
        });
    }
    let mut next = sequence.to_vec();
    next.push(token);
    Ok(next)
}

/// Commit typed text: an option whose label or value equals it exactly
/// (ignoring case), else a literal. Anything else is rejected.
pub fn commit_text(
    catalogue: &TokenCatalogue<'_>,
    sequence: &[Token],
    typed: &str,
) -> Result<Vec<Token>, CommitError> {
    let wanted = typed.trim();
    let options = complete(catalogue, sequence, wanted)?;
    let exact = options.into_iter().find(|token| {
        token.kind != TokenKind::Number
            && token.kind != TokenKind::Text
            && (token.label.eq_ignore_ascii_case(wanted) || token.value.eq_ignore_ascii_case(wanted))
    });

    match exact.or_else(|| literal(wanted)) {
        Some(token) => commit(sequence, token),
        None => Err(CommitError::NoMatch(wanted.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_detection() {
        assert_eq!(literal("21.95"), Some(Token::number("21.95")));
        assert_eq!(literal("\"ready\""), Some(Token::text("ready")));
        assert_eq!(literal("'ready'"), Some(Token::text("ready")));
        assert_eq!(literal("\""), None);
        assert_eq!(literal("temp"), None);
        assert_eq!(literal("inf"), None);
        assert_eq!(literal("1e400"), None);
        for signed in ["-5", "+5", ".5", "5."] {
            assert_eq!(literal(signed), None, "{}", signed);
        }
    }
}
