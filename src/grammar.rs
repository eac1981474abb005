//! Operand/operator expectation state machine.
//!
//! The parser steps this machine for every token it consumes, and the token
//! catalogue replays a partial sequence through it to decide which tokens may
//! come next. Both therefore agree on what is legal by construction.

use crate::{
    ast::{Token, TokenKind},
    functions::{self, Arity, Builtin},
    parser::ParseErrorKind,
};

/// What the next token has to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// Start of an operand: channel, literal, function, `(`, `not`, unary `-`
    Operand,
    /// A complete operand was just closed: binary operator, `)`, `,`
    Operator,
    /// A function name was just read and must be followed by `(`
    CallParen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Root,
    Group,
    Call {
        name: &'static str,
        arity: Arity,
        /// Commas seen so far
        commas: usize,
    },
}

#[derive(Debug, Clone)]
struct Level {
    scope: Scope,
    /// A comparison has been applied at this level since the last `and`/`or`/`,`
    compared: bool,
    /// Nothing has been read at this level yet
    empty: bool,
}

impl Level {
    fn new(scope: Scope) -> Self {
        Level {
            scope,
            compared: false,
            empty: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GrammarState {
    expect: Expect,
    levels: Vec<Level>,
    pending_call: Option<&'static Builtin>,
    previous: Option<Token>,
    comparison_left: Option<String>,
}

impl Default for GrammarState {
    fn default() -> Self {
        Self::new()
    }
}

impl GrammarState {
    pub fn new() -> Self {
        GrammarState {
            expect: Expect::Operand,
            levels: vec![Level::new(Scope::Root)],
            pending_call: None,
            previous: None,
            comparison_left: None,
        }
    }

    /// State after consuming `tokens`, or the first structural error among them.
    pub fn replay(tokens: &[Token]) -> Result<Self, ParseErrorKind> {
        let mut state = Self::new();
        for token in tokens {
            state.step(token)?;
        }
        Ok(state)
    }

    pub fn expect(&self) -> Expect {
        self.expect
    }

    /// Number of open brackets, including function call brackets.
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    /// The innermost level already holds a comparison, so another would chain.
    pub fn comparison_pending(&self) -> bool {
        self.top().compared
    }

    /// Channel sitting immediately before the comparison operator just read.
    pub fn comparison_left(&self) -> Option<&str> {
        self.comparison_left.as_deref()
    }

    /// Inside a call that takes more arguments than it has been given.
    pub fn has_room_for_argument(&self) -> bool {
        match self.top().scope {
            Scope::Call { arity, commas, .. } => arity.max().is_none_or(|max| commas + 1 < max),
            _ => false,
        }
    }

    pub fn previous(&self) -> Option<&Token> {
        self.previous.as_ref()
    }

    /// Whether `token` would be accepted next.
    pub fn accepts(&self, token: &Token) -> bool {
        self.clone().step(token).is_ok()
    }

    /// Consume one token.
    pub fn step(&mut self, token: &Token) -> Result<(), ParseErrorKind> {
        let comparison_left = match &self.previous {
            Some(prev) if prev.kind == TokenKind::Channel && token.kind == TokenKind::Comparison => {
                Some(prev.value.clone())
            }
            _ => None,
        };

        match self.expect {
            Expect::CallParen => self.step_call_paren(token)?,
            Expect::Operand => self.step_operand(token)?,
            Expect::Operator => self.step_operator(token)?,
        }

        self.comparison_left = comparison_left;
        self.previous = Some(token.clone());
        Ok(())
    }

    /// Check that the tokens consumed so far form a complete expression.
    pub fn finish(&self) -> Result<(), ParseErrorKind> {
        if self.expect == Expect::Operator && self.depth() == 0 {
            Ok(())
        } else {
            Err(ParseErrorKind::UnexpectedEnd)
        }
    }

    fn top(&self) -> &Level {
        // levels[0] is Root and is never popped
        &self.levels[self.levels.len() - 1]
    }

    fn top_mut(&mut self) -> &mut Level {
        let last = self.levels.len() - 1;
        &mut self.levels[last]
    }

    /// `not` only opens a condition: at the start, after `(`, `,`, `and`, `or` or `not`.
    fn at_condition_start(&self) -> bool {
        match &self.previous {
            None => true,
            Some(prev) => {
                matches!(prev.kind, TokenKind::OpenParen | TokenKind::Comma)
                    || prev.is_operator("and")
                    || prev.is_operator("or")
                    || prev.is_operator("not")
            }
        }
    }

    fn unexpected(token: &Token) -> ParseErrorKind {
        ParseErrorKind::UnexpectedToken {
            found: token.source_text(),
        }
    }

    fn step_call_paren(&mut self, token: &Token) -> Result<(), ParseErrorKind> {
        let Some(builtin) = self.pending_call.take() else {
            return Err(Self::unexpected(token));
        };
        if token.kind != TokenKind::OpenParen {
            return Err(ParseErrorKind::ExpectedCallParen {
                function: builtin.name.to_string(),
            });
        }
        self.levels.push(Level::new(Scope::Call {
            name: builtin.name,
            arity: builtin.arity,
            commas: 0,
        }));
        self.expect = Expect::Operand;
        Ok(())
    }

    fn step_operand(&mut self, token: &Token) -> Result<(), ParseErrorKind> {
        if token.kind == TokenKind::CloseParen {
            if self.depth() == 0 {
                return Err(ParseErrorKind::UnmatchedClose);
            }
            // Only legal as the end of an empty argument list
            let top = self.top();
            return match top.scope {
                Scope::Call { name, arity, .. } if top.empty => {
                    if !arity.accepts(0) {
                        return Err(ParseErrorKind::Arity {
                            function: name.to_string(),
                            expected: arity,
                            found: 0,
                        });
                    }
                    self.levels.pop();
                    self.expect = Expect::Operator;
                    Ok(())
                }
                _ => Err(Self::unexpected(token)),
            };
        }

        match token.kind {
            TokenKind::Number if !token.value.parse::<f64>().is_ok_and(f64::is_finite) => {
                return Err(ParseErrorKind::InvalidNumber(token.value.clone()));
            }
            TokenKind::Channel | TokenKind::Number | TokenKind::Text => {
                self.expect = Expect::Operator;
            }
            TokenKind::Function => {
                let builtin = functions::lookup(&token.value)
                    .ok_or_else(|| ParseErrorKind::UnknownFunction(token.value.clone()))?;
                self.pending_call = Some(builtin);
                self.expect = Expect::CallParen;
            }
            TokenKind::OpenParen => {
                self.top_mut().empty = false;
                self.levels.push(Level::new(Scope::Group));
                return Ok(());
            }
            TokenKind::Boolean if token.value == "not" && self.at_condition_start() => {}
            TokenKind::Arithmetic if token.value == "-" => {}
            _ => return Err(Self::unexpected(token)),
        }
        self.top_mut().empty = false;
        Ok(())
    }

    fn step_operator(&mut self, token: &Token) -> Result<(), ParseErrorKind> {
        match token.kind {
            TokenKind::Channel
            | TokenKind::Number
            | TokenKind::Text
            | TokenKind::Function
            | TokenKind::OpenParen => {
                let previous = self
                    .previous
                    .as_ref()
                    .map(Token::source_text)
                    .unwrap_or_default();
                return Err(ParseErrorKind::MissingOperator {
                    previous,
                    found: token.source_text(),
                });
            }
            TokenKind::Comparison => {
                let top = self.top_mut();
                if top.compared {
                    return Err(ParseErrorKind::ChainedComparison {
                        found: token.value.clone(),
                    });
                }
                top.compared = true;
            }
            TokenKind::Boolean if token.value == "and" || token.value == "or" => {
                self.top_mut().compared = false;
            }
            TokenKind::Boolean => return Err(Self::unexpected(token)),
            TokenKind::Arithmetic => {}
            TokenKind::CloseParen => {
                if self.depth() == 0 {
                    return Err(ParseErrorKind::UnmatchedClose);
                }
                if let Some(Level {
                    scope: Scope::Call { name, arity, commas },
                    ..
                }) = self.levels.pop()
                {
                    let found = commas + 1;
                    if !arity.accepts(found) {
                        return Err(ParseErrorKind::Arity {
                            function: name.to_string(),
                            expected: arity,
                            found,
                        });
                    }
                }
                return Ok(());
            }
            TokenKind::Comma => {
                let top = self.top_mut();
                match &mut top.scope {
                    Scope::Call { commas, .. } => *commas += 1,
                    _ => return Err(Self::unexpected(token)),
                }
                top.compared = false;
            }
        }
        self.expect = Expect::Operand;
        Ok(())
    }
}
