use serde::{Deserialize, Serialize};

use crate::ast::{BinOp, UnaryOp};

/// Literal operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// Floating point number
    ///
    /// # Example
    /// ```text
    /// 21.95
    /// ```
    Number(f64),

    /// String literal, only usable with `==` and `!=`
    ///
    /// # Example
    /// ```text
    /// "ready"
    /// ```
    Text(String),
}

/// Abstract Syntax Tree node of a filter or function expression.
///
/// Every node owns its children, so a tree can never share or cycle. Cycles
/// between user functions only exist by name and are rejected by the validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Literal value
    Literal(Literal),

    /// Channel or previously defined user function, by system name
    ///
    /// # Examples
    /// ```text
    /// temperature
    /// my_function
    /// ```
    Channel(String),

    /// Prefix operation
    ///
    /// # Examples
    /// ```text
    /// not humidity > 55
    /// - trace
    /// ```
    Unary { op: UnaryOp, operand: Box<Expr> },

    /// Binary operation (logical, comparison, arithmetic)
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Builtin function call
    ///
    /// # Example
    /// ```text
    /// centre ( trace )
    /// ```
    Call { name: String, args: Vec<Expr> },

    /// Parenthesised sub-expression
    ///
    /// Kept in the tree so the stored text form round trips.
    Group(Box<Expr>),
}

impl Expr {
    pub fn number(n: f64) -> Self {
        Expr::Literal(Literal::Number(n))
    }

    pub fn text(s: impl Into<String>) -> Self {
        Expr::Literal(Literal::Text(s.into()))
    }

    pub fn channel(name: impl Into<String>) -> Self {
        Expr::Channel(name.into())
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Names referenced by [`Expr::Channel`] nodes, in source order, duplicates kept.
    pub fn references(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_references(&mut names);
        names
    }

    fn collect_references<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Channel(name) => names.push(name),
            Expr::Unary { operand, .. } => operand.collect_references(names),
            Expr::Binary { left, right, .. } => {
                left.collect_references(names);
                right.collect_references(names);
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.collect_references(names);
                }
            }
            Expr::Group(inner) => inner.collect_references(names),
        }
    }

    /// Binding strength of the node's outermost operator; atoms bind tightest.
    pub fn precedence(&self) -> u8 {
        match self {
            Expr::Unary { op, .. } => op.precedence(),
            Expr::Binary { op, .. } => op.precedence(),
            // Printed with a leading `-`, which reads back as unary minus
            Expr::Literal(Literal::Number(n)) if n.is_sign_negative() => {
                UnaryOp::Negate.precedence()
            }
            Expr::Literal(_) | Expr::Channel(_) | Expr::Call { .. } | Expr::Group(_) => u8::MAX,
        }
    }
}
