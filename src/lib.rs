pub mod apply;
pub mod ast;
pub mod catalogue;
pub mod complete;
pub mod evaluator;
pub mod functions;
pub mod grammar;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod validate;
pub mod value;

#[cfg(feature = "cli")]
pub mod cli;

pub use apply::{apply_filters, apply_functions};
pub use ast::{BinOp, Expr, Filter, FunctionDef, FunctionSet, Token, TokenKind, UnaryOp};
pub use catalogue::{ChannelCatalogue, ChannelInfo, Mode, TokenCatalogue};
pub use evaluator::{EvalError, Evaluator, Truth};
pub use lexer::{LexError, Lexer};
pub use output::to_text;
pub use parser::{ParseError, Parser, SyntaxError};
pub use validate::{FieldError, FunctionForm, ValidationError, validate_filters, validate_functions};
pub use value::{Image, Record, Value, ValueType, Waveform};
