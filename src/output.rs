//! Canonical text form of expressions.
//!
//! Expressions are stored as plain strings and re-tokenized on load, so the
//! printer emits exactly what the lexer reads back: tokens separated by single
//! spaces, string literals quoted, numbers in shortest round-trip form.
//!
//! # Examples
//!
//! ```
//! use opgw_expr::ast::{BinOp, Expr};
//! use opgw_expr::output::to_text;
//!
//! let expr = Expr::binary(
//!     BinOp::Multiply,
//!     Expr::binary(BinOp::Add, Expr::channel("a"), Expr::number(1.0)),
//!     Expr::number(2.5),
//! );
//!
//! // Precedence is restored with brackets where the tree needs them
//! assert_eq!(to_text(&expr), "( a + 1 ) * 2.5");
//! ```

use std::fmt;

use crate::ast::{BinOp, Expr, Literal, tokens::quote};

pub struct TextPrinter {
    out: String,
}

impl TextPrinter {
    pub fn new() -> Self {
        TextPrinter { out: String::new() }
    }

    pub fn print(mut self, expr: &Expr) -> String {
        self.print_expr(expr);
        self.out
    }

    fn word(&mut self, text: &str) {
        if !self.out.is_empty() {
            self.out.push(' ');
        }
        self.out.push_str(text);
    }

    fn print_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(Literal::Number(n)) => self.word(&format_number(*n)),
            Expr::Literal(Literal::Text(s)) => self.word(&quote(s)),
            Expr::Channel(name) => self.word(name),
            Expr::Group(inner) => {
                self.word("(");
                self.print_expr(inner);
                self.word(")");
            }
            Expr::Unary { op, operand } => {
                self.word(op.symbol());
                self.print_operand(operand, op.precedence(), true);
            }
            Expr::Binary { op, left, right } => {
                let prec = op.precedence();
                // `^` groups to the right, everything else to the left
                let right_assoc = *op == BinOp::Power;
                self.print_operand(left, prec, !right_assoc && !op.is_comparison());
                self.word(op.symbol());
                self.print_operand(right, prec, right_assoc);
            }
            Expr::Call { name, args } => {
                self.word(name);
                self.word("(");
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.word(",");
                    }
                    self.print_expr(arg);
                }
                self.word(")");
            }
        }
    }

    /// Bracket `operand` when it binds looser than its parent, or equally on
    /// the side the parent does not associate towards.
    fn print_operand(&mut self, operand: &Expr, parent: u8, same_level_ok: bool) {
        let own = operand.precedence();
        let needs_brackets = own < parent || (own == parent && !same_level_ok);
        if needs_brackets {
            self.word("(");
            self.print_expr(operand);
            self.word(")");
        } else {
            self.print_expr(operand);
        }
    }
}

impl Default for TextPrinter {
    fn default() -> Self {
        Self::new()
    }
}

fn format_number(n: f64) -> String {
    // Display is the shortest representation that parses back to the same f64
    n.to_string()
}

/// Render an expression in its stored text form.
pub fn to_text(expr: &Expr) -> String {
    TextPrinter::new().print(expr)
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_text(self))
    }
}
