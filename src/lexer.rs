use thiserror::Error;

use crate::{ast::Token, catalogue::ChannelCatalogue, functions};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("unexpected character '{ch}' at position {position}")]
    UnexpectedChar { ch: char, position: usize },

    #[error("unexpected '{ch}' at position {position} (did you mean '{ch}='?)")]
    IncompleteOperator { ch: char, position: usize },

    #[error("unterminated string starting at position {position}")]
    UnterminatedString { position: usize },

    #[error("invalid escape sequence '\\{ch}' at position {position}")]
    InvalidEscape { ch: char, position: usize },
}

/// Splits stored expression text back into tokens.
///
/// Identifiers may contain `-` (channel system names such as
/// `FE-204-NSO-P1-CAM-1` do), so subtraction between two names needs spaces.
/// An identifier naming a builtin becomes a function token only when `(`
/// follows it; otherwise it is a channel reference.
pub struct Lexer<'a> {
    input: Vec<char>,
    position: usize,
    catalogue: Option<&'a ChannelCatalogue>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            catalogue: None,
        }
    }

    /// Label channel tokens with their display names.
    pub fn with_catalogue(mut self, catalogue: &'a ChannelCatalogue) -> Self {
        self.catalogue = Some(catalogue);
        self
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn next_non_whitespace(&self) -> Option<char> {
        self.input[self.position..]
            .iter()
            .copied()
            .find(|c| !c.is_whitespace())
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' || ch == '-' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_string(&mut self, quote: char) -> Result<String, LexError> {
        let start = self.position;
        let mut result = String::new();
        self.advance(); // Consume opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    self.advance(); // Consume backslash
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some(c @ ('"' | '\'' | '\\')) => result.push(c),
                        Some(c) => {
                            return Err(LexError::InvalidEscape {
                                ch: c,
                                position: self.position,
                            });
                        }
                        None => return Err(LexError::UnterminatedString { position: start }),
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError::UnterminatedString { position: start })
    }

    fn read_number(&mut self) -> String {
        let mut number = String::new();
        let mut seen_dot = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.'
                && !seen_dot
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                seen_dot = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // Exponent, only when digits actually follow
        if matches!(self.current_char(), Some('e' | 'E')) {
            let sign = usize::from(matches!(self.peek_char(1), Some('+' | '-')));
            if self.peek_char(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                for _ in 0..=sign {
                    if let Some(ch) = self.current_char() {
                        number.push(ch);
                    }
                    self.advance();
                }
                while let Some(ch) = self.current_char().filter(char::is_ascii_digit) {
                    number.push(ch);
                    self.advance();
                }
            }
        }
        number
    }

    fn symbol(&mut self, text: &str) -> Option<Token> {
        for _ in text.chars() {
            self.advance();
        }
        Token::operator(text)
    }

    /// Next token, or `None` at the end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_whitespace();

        let Some(ch) = self.current_char() else {
            return Ok(None);
        };
        let position = self.position;

        let token = match ch {
            '(' => {
                self.advance();
                Token::open_paren()
            }
            ')' => {
                self.advance();
                Token::close_paren()
            }
            ',' => {
                self.advance();
                Token::comma()
            }
            '+' | '-' | '*' | '/' | '^' => {
                let text = ch.to_string();
                return Ok(self.symbol(&text));
            }
            '>' | '<' | '=' | '!' => {
                if self.peek_char(1) == Some('=') {
                    let text = format!("{}=", ch);
                    return Ok(self.symbol(&text));
                } else if matches!(ch, '>' | '<') {
                    let text = ch.to_string();
                    return Ok(self.symbol(&text));
                } else {
                    return Err(LexError::IncompleteOperator { ch, position });
                }
            }
            '"' | '\'' => Token::text(&self.read_string(ch)?),
            c if c.is_ascii_digit() => Token::number(&self.read_number()),
            c if c.is_alphabetic() || c == '_' => {
                let ident = self.read_identifier();
                match ident.as_str() {
                    "and" | "or" | "not" => return Ok(Token::operator(&ident)),
                    _ if functions::lookup(&ident).is_some()
                        && self.next_non_whitespace() == Some('(') =>
                    {
                        Token::function(&ident)
                    }
                    _ => {
                        let label = self
                            .catalogue
                            .and_then(|c| c.get(&ident))
                            .map(|info| info.label.clone())
                            .unwrap_or_else(|| ident.clone());
                        Token::channel(ident, label)
                    }
                }
            }
            c => return Err(LexError::UnexpectedChar { ch: c, position }),
        };
        Ok(Some(token))
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }
}

/// Re-derive the token sequence of a stored expression.
pub fn tokenize(input: &str, catalogue: &ChannelCatalogue) -> Result<Vec<Token>, LexError> {
    Lexer::new(input).with_catalogue(catalogue).tokenize()
}

#[test]
fn test_keywords() {
    let mut lexer = Lexer::new("and or not");
    assert_eq!(lexer.next_token().unwrap(), Token::operator("and"));
    assert_eq!(lexer.next_token().unwrap(), Token::operator("or"));
    assert_eq!(lexer.next_token().unwrap(), Token::operator("not"));
    assert_eq!(lexer.next_token().unwrap(), None);
}

#[test]
fn test_filter_expression() {
    let tokens = Lexer::new("not ( humidity > 55 )").tokenize().unwrap();
    let values: Vec<&str> = tokens.iter().map(|t| t.value.as_str()).collect();
    assert_eq!(values, vec!["not", "(", "humidity", ">", "55", ")"]);
}
