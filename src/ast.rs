//! # Expression Language - Abstract Syntax Tree
//!
//! Types shared by every stage of the filter and function engine.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer and the autocomplete matcher
//! - **[expressions]** - Expression nodes (literals, channel references, operations, calls)
//! - **[operators]** - Binary and prefix operators with their precedence
//! - **[filter]** - A validated filter condition
//! - **[function]** - Validated user-defined functions
//!
//! ## Two Kinds of Expression
//!
//! Filters are boolean conditions evaluated once per table row:
//!
//! ```text
//! not ( humidity > 55 or not humidity > 53 ) and temperature > 21
//! ```
//!
//! Functions are named numeric or array expressions evaluated once per record,
//! producing a derived column:
//!
//! ```text
//! centre ( trace ) + Mean ( trace )
//! ```
//!
//! ## Precedence
//!
//! From loosest to tightest:
//!
//! ```text
//! or < and < not < comparisons < + - < * / < unary - < ^ < calls, ( )
//! ```
//!
//! Comparisons do not chain: `a > 1 > 2` is rejected.
pub mod expressions;
pub mod filter;
pub mod function;
pub mod operators;
pub mod tokens;

pub use expressions::{Expr, Literal};
pub use filter::Filter;
pub use function::{FunctionDef, FunctionSet};
pub use operators::{BinOp, UnaryOp};
pub use tokens::{Token, TokenKind, tokens_to_text};
