use crate::ast::{Expr, Token};

/// One applied filter: a boolean expression over a row.
///
/// Several filters applied together are ANDed.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Tokens in source order
    pub tokens: Vec<Token>,

    /// Parsed and type checked condition
    pub tree: Expr,
}
