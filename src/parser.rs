use thiserror::Error;

use crate::{
    ast::{BinOp, Expr, Token, TokenKind, UnaryOp, tokens_to_text},
    catalogue::ChannelCatalogue,
    functions::{self, Arity},
    grammar::GrammarState,
    lexer::{self, LexError},
};

/// What went wrong while parsing; always reported inside a [`ParseError`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseErrorKind {
    #[error("has unexpected end-of-input, check all brackets are closed")]
    UnexpectedEnd,

    #[error("is missing an operator between '{previous}' and '{found}'")]
    MissingOperator { previous: String, found: String },

    #[error("has a closing bracket ')' without a matching '('")]
    UnmatchedClose,

    #[error("has unexpected token '{found}'")]
    UnexpectedToken { found: String },

    #[error("chains comparison '{found}' onto another comparison, join them with 'and' or 'or'")]
    ChainedComparison { found: String },

    #[error("must follow function '{function}' with '('")]
    ExpectedCallParen { function: String },

    #[error("calls '{function}' which expects {expected}, got {found}")]
    Arity {
        function: String,
        expected: Arity,
        found: usize,
    },

    #[error("calls unknown function '{0}'")]
    UnknownFunction(String),

    #[error("has invalid number '{0}'")]
    InvalidNumber(String),
}

/// A structural error, carrying the expression text it was found in.
///
/// ```
/// use opgw_expr::ast::Token;
/// use opgw_expr::parser::Parser;
///
/// let err = Parser::new(vec![Token::open_paren()]).parse().unwrap_err();
/// assert_eq!(
///     err.to_string(),
///     "expression '(' has unexpected end-of-input, check all brackets are closed"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
#[error("expression '{expression}' {kind}")]
pub struct ParseError {
    pub expression: String,
    pub kind: ParseErrorKind,
}

/// Errors from parsing free text: lexing first, then parsing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyntaxError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Recursive descent parser over a token sequence.
///
/// Every token consumed is first stepped through the shared
/// [`GrammarState`], which owns adjacency, bracket and arity rules.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    grammar: GrammarState,
    source: String,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        let source = tokens_to_text(&tokens);
        Self::with_source(tokens, source)
    }

    /// Parser whose errors quote `source` rather than the re-joined tokens.
    pub fn with_source(tokens: Vec<Token>, source: impl Into<String>) -> Self {
        Parser {
            tokens,
            position: 0,
            grammar: GrammarState::new(),
            source: source.into(),
        }
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError {
            expression: self.source.clone(),
            kind,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn check_operator(&self, symbol: &str) -> bool {
        self.peek().is_some_and(|t| t.is_operator(symbol))
    }

    fn check_kind(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|t| t.kind == kind)
    }

    fn advance(&mut self) -> Result<Token, ParseError> {
        let Some(token) = self.tokens.get(self.position).cloned() else {
            return Err(self.error(ParseErrorKind::UnexpectedEnd));
        };
        self.grammar.step(&token).map_err(|kind| self.error(kind))?;
        self.position += 1;
        Ok(token)
    }

    fn expect_close(&mut self) -> Result<(), ParseError> {
        let token = self.advance()?;
        if token.kind == TokenKind::CloseParen {
            Ok(())
        } else {
            Err(self.error(ParseErrorKind::UnexpectedToken {
                found: token.source_text(),
            }))
        }
    }

    /// Parse primary expressions (atoms): literals, references, calls, groups.
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.advance()?;
        match token.kind {
            TokenKind::Channel => Ok(Expr::Channel(token.value)),
            TokenKind::Number => match token.value.parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(Expr::number(n)),
                _ => Err(self.error(ParseErrorKind::InvalidNumber(token.value))),
            },
            TokenKind::Text => Ok(Expr::text(token.value)),
            TokenKind::OpenParen => {
                let inner = self.parse_expression()?;
                self.expect_close()?;
                Ok(Expr::Group(Box::new(inner)))
            }
            TokenKind::Function => self.parse_call(token),
            _ => Err(self.error(ParseErrorKind::UnexpectedToken {
                found: token.source_text(),
            })),
        }
    }

    fn parse_call(&mut self, function: Token) -> Result<Expr, ParseError> {
        let open = self.advance()?;
        if open.kind != TokenKind::OpenParen {
            return Err(self.error(ParseErrorKind::ExpectedCallParen {
                function: function.value,
            }));
        }

        let mut args = vec![];
        if self.check_kind(TokenKind::CloseParen) {
            // The grammar rejects this unless the builtin takes no arguments
            self.advance()?;
        } else {
            loop {
                args.push(self.parse_expression()?);
                let next = self.advance()?;
                match next.kind {
                    TokenKind::Comma => continue,
                    TokenKind::CloseParen => break,
                    _ => {
                        return Err(self.error(ParseErrorKind::UnexpectedToken {
                            found: next.source_text(),
                        }));
                    }
                }
            }
        }

        let name = match functions::lookup(&function.value) {
            Some(builtin) => builtin.name.to_string(),
            None => return Err(self.error(ParseErrorKind::UnknownFunction(function.value))),
        };
        Ok(Expr::Call { name, args })
    }

    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_primary()?;

        if self.check_operator("^") {
            self.advance()?;
            // Right associative, and the exponent may carry its own sign
            let exponent = self.parse_unary()?;
            return Ok(Expr::binary(BinOp::Power, base, exponent));
        }
        Ok(base)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.check_operator("-") {
            self.advance()?;
            let operand = self.parse_unary()?;
            return Ok(Expr::unary(UnaryOp::Negate, operand));
        }
        self.parse_power()
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = if self.check_operator("*") {
                BinOp::Multiply
            } else if self.check_operator("/") {
                BinOp::Divide
            } else {
                break;
            };

            self.advance()?;
            let right = self.parse_unary()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = if self.check_operator("+") {
                BinOp::Add
            } else if self.check_operator("-") {
                BinOp::Subtract
            } else {
                break;
            };

            self.advance()?;
            let right = self.parse_multiplicative()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    /// At most one comparison per level; a second one is left for the grammar to reject.
    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_additive()?;

        let op = match self.peek() {
            Some(token) if token.kind == TokenKind::Comparison => BinOp::from_symbol(&token.value),
            _ => None,
        };
        if let Some(op) = op {
            self.advance()?;
            let right = self.parse_additive()?;
            return Ok(Expr::binary(op, left, right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.check_operator("not") {
            self.advance()?;
            let operand = self.parse_not()?;
            return Ok(Expr::unary(UnaryOp::Not, operand));
        }
        self.parse_comparison()
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;

        while self.check_operator("and") {
            self.advance()?;
            let right = self.parse_not()?;
            left = Expr::binary(BinOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;

        while self.check_operator("or") {
            self.advance()?;
            let right = self.parse_and()?;
            left = Expr::binary(BinOp::Or, left, right);
        }
        Ok(left)
    }

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    /// Parse the whole sequence as one expression.
    pub fn parse(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expression()?;

        if let Some(token) = self.peek() {
            let found = token.source_text();
            // Leftover tokens are always illegal here; stepping reports why
            self.advance()?;
            return Err(self.error(ParseErrorKind::UnexpectedToken { found }));
        }

        self.grammar.finish().map_err(|kind| self.error(kind))?;
        Ok(expr)
    }
}

/// Parse a token sequence.
pub fn parse_tokens(tokens: &[Token]) -> Result<Expr, ParseError> {
    Parser::new(tokens.to_vec()).parse()
}

/// Tokenize and parse stored expression text.
///
/// ```
/// use opgw_expr::{ChannelCatalogue, parser::parse_text};
///
/// let expr = parse_text("temperature > 21", &ChannelCatalogue::new()).unwrap();
/// assert_eq!(expr.references(), vec!["temperature"]);
/// ```
pub fn parse_text(text: &str, catalogue: &ChannelCatalogue) -> Result<Expr, SyntaxError> {
    let tokens = lexer::tokenize(text, catalogue)?;
    let expr = Parser::with_source(tokens, text.trim()).parse()?;
    Ok(expr)
}
