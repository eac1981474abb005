use thiserror::Error;

use crate::{
    ast::{BinOp, Expr, Literal, UnaryOp},
    functions,
    value::{Record, Value, Waveform},
};

/// Three-valued outcome of a filter condition.
///
/// `Indeterminate` comes from comparisons involving missing data and combines
/// with Kleene logic: `Indeterminate or True` is `True`, `Indeterminate and
/// False` is `False`, anything else involving it stays `Indeterminate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truth {
    True,
    False,
    Indeterminate,
}

impl Truth {
    pub fn from_bool(b: bool) -> Self {
        if b { Truth::True } else { Truth::False }
    }

    /// Only a determinate `True` keeps a row.
    pub fn is_true(self) -> bool {
        self == Truth::True
    }

    pub fn not(self) -> Self {
        match self {
            Truth::True => Truth::False,
            Truth::False => Truth::True,
            Truth::Indeterminate => Truth::Indeterminate,
        }
    }

    pub fn and(self, other: Truth) -> Self {
        match (self, other) {
            (Truth::False, _) | (_, Truth::False) => Truth::False,
            (Truth::True, Truth::True) => Truth::True,
            _ => Truth::Indeterminate,
        }
    }

    pub fn or(self, other: Truth) -> Self {
        match (self, other) {
            (Truth::True, _) | (_, Truth::True) => Truth::True,
            (Truth::False, Truth::False) => Truth::False,
            _ => Truth::Indeterminate,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Truth::True => Value::Boolean(true),
            Truth::False => Value::Boolean(false),
            Truth::Indeterminate => Value::Missing,
        }
    }
}

/// Failures the validator rules out; seeing one means an unvalidated tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("condition produced {0} where a boolean was required")]
    NotBoolean(&'static str),
}

/// Walks validated trees against one record.
///
/// Missing channels and operand type surprises in the data resolve to
/// [`Value::Missing`] / [`Truth::Indeterminate`] rather than errors.
#[derive(Debug, Default, Clone, Copy)]
pub struct Evaluator;

impl Evaluator {
    pub fn new() -> Self {
        Evaluator
    }

    /// Evaluates a filter condition against one row.
    ///
    /// `and` and `or` short-circuit left to right.
    ///
    /// # Examples
    ///
    /// ```
    /// use opgw_expr::{ChannelCatalogue, Evaluator, Record, Truth, Value};
    /// use opgw_expr::parser::parse_text;
    ///
    /// let expr = parse_text("temperature > 21", &ChannelCatalogue::new()).unwrap();
    /// let row = Record::new().with("temperature", Value::Number(21.98));
    ///
    /// let evaluator = Evaluator::new();
    /// assert_eq!(evaluator.eval_filter(&expr, &row).unwrap(), Truth::True);
    /// assert_eq!(evaluator.eval_filter(&expr, &Record::new()).unwrap(), Truth::Indeterminate);
    /// ```
    pub fn eval_filter(&self, expr: &Expr, record: &Record) -> Result<Truth, EvalError> {
        match expr {
            Expr::Group(inner) => self.eval_filter(inner, record),
            Expr::Unary {
                op: UnaryOp::Not,
                operand,
            } => Ok(self.eval_filter(operand, record)?.not()),
            Expr::Binary {
                op: BinOp::And,
                left,
                right,
            } => {
                let left = self.eval_filter(left, record)?;
                if left == Truth::False {
                    return Ok(Truth::False);
                }
                Ok(left.and(self.eval_filter(right, record)?))
            }
            Expr::Binary {
                op: BinOp::Or,
                left,
                right,
            } => {
                let left = self.eval_filter(left, record)?;
                if left == Truth::True {
                    return Ok(Truth::True);
                }
                Ok(left.or(self.eval_filter(right, record)?))
            }
            Expr::Binary { op, left, right } if op.is_comparison() => {
                let left = self.eval_value(left, record)?;
                let right = self.eval_value(right, record)?;
                Ok(compare(*op, &left, &right))
            }
            other => match self.eval_value(other, record)? {
                Value::Boolean(b) => Ok(Truth::from_bool(b)),
                Value::Missing => Ok(Truth::Indeterminate),
                Value::Number(_) => Err(EvalError::NotBoolean("a number")),
                Value::Text(_) => Err(EvalError::NotBoolean("text")),
                Value::Waveform(_) => Err(EvalError::NotBoolean("a waveform")),
                Value::Image(_) => Err(EvalError::NotBoolean("an image")),
            },
        }
    }

    /// Evaluates an expression to a value against one record.
    ///
    /// # Examples
    ///
    /// ```
    /// use opgw_expr::{ChannelCatalogue, Evaluator, Record, Value};
    /// use opgw_expr::parser::parse_text;
    ///
    /// let expr = parse_text("a * 2 + 1", &ChannelCatalogue::new()).unwrap();
    /// let record = Record::new().with("a", Value::Number(3.0));
    ///
    /// let result = Evaluator::new().eval_value(&expr, &record).unwrap();
    /// assert_eq!(result, Value::Number(7.0));
    /// ```
    pub fn eval_value(&self, expr: &Expr, record: &Record) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(Literal::Number(n)) => Ok(Value::Number(*n)),
            Expr::Literal(Literal::Text(s)) => Ok(Value::Text(s.clone())),
            Expr::Channel(name) => Ok(record.get(name).cloned().unwrap_or(Value::Missing)),
            Expr::Group(inner) => self.eval_value(inner, record),
            Expr::Unary {
                op: UnaryOp::Negate,
                operand,
            } => Ok(negate(&self.eval_value(operand, record)?)),
            Expr::Unary { op: UnaryOp::Not, .. } => Ok(self.eval_filter(expr, record)?.into_value()),
            Expr::Binary { op, .. } if op.is_logical() || op.is_comparison() => {
                Ok(self.eval_filter(expr, record)?.into_value())
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval_value(left, record)?;
                let right = self.eval_value(right, record)?;
                Ok(arithmetic(*op, &left, &right))
            }
            Expr::Call { name, args } => {
                let builtin =
                    functions::lookup(name).ok_or_else(|| EvalError::UnknownFunction(name.clone()))?;
                let args = args
                    .iter()
                    .map(|arg| self.eval_value(arg, record))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(builtin.call(&args))
            }
        }
    }
}

/// IEEE comparison on numbers, equality only on text; anything else is indeterminate.
fn compare(op: BinOp, left: &Value, right: &Value) -> Truth {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Truth::from_bool(match op {
            BinOp::Equal => a == b,
            BinOp::NotEqual => a != b,
            BinOp::LessThan => a < b,
            BinOp::GreaterThan => a > b,
            BinOp::LessEqual => a <= b,
            BinOp::GreaterEqual => a >= b,
            _ => return Truth::Indeterminate,
        }),
        (Value::Text(a), Value::Text(b)) => match op {
            BinOp::Equal => Truth::from_bool(a == b),
            BinOp::NotEqual => Truth::from_bool(a != b),
            _ => Truth::Indeterminate,
        },
        _ => Truth::Indeterminate,
    }
}

fn apply_arithmetic(op: BinOp, a: f64, b: f64) -> f64 {
    match op {
        BinOp::Add => a + b,
        BinOp::Subtract => a - b,
        BinOp::Multiply => a * b,
        BinOp::Divide => a / b,
        BinOp::Power => a.powf(b),
        _ => f64::NAN,
    }
}

fn zip_with(a: &[f64], b: &[f64], f: impl Fn(f64, f64) -> f64) -> Vec<f64> {
    a.iter().zip(b).map(|(&x, &y)| f(x, y)).collect()
}

/// Elementwise when either side is an array. Arrays must match in shape
/// (waveforms by length, images by width and height), else the result is missing.
fn arithmetic(op: BinOp, left: &Value, right: &Value) -> Value {
    let f = |a: f64, b: f64| apply_arithmetic(op, a, b);
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Value::Number(f(*a, *b)),

        (Value::Waveform(w), Value::Number(b)) => Value::Waveform(w.map_y(|a| f(a, *b))),
        (Value::Number(a), Value::Waveform(w)) => Value::Waveform(w.map_y(|b| f(*a, b))),
        (Value::Waveform(l), Value::Waveform(r)) if l.len() == r.len() => {
            Value::Waveform(Waveform::new(l.x().to_vec(), zip_with(l.y(), r.y(), f)))
        }

        (Value::Image(img), Value::Number(b)) => Value::Image(img.map(|a| f(a, *b))),
        (Value::Number(a), Value::Image(img)) => Value::Image(img.map(|b| f(*a, b))),
        (Value::Image(l), Value::Image(r)) => l.zip_with(r, f).map_or(Value::Missing, Value::Image),

        _ => Value::Missing,
    }
}

fn negate(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(-n),
        Value::Waveform(w) => Value::Waveform(w.map_y(|v| -v)),
        Value::Image(img) => Value::Image(img.map(|v| -v)),
        _ => Value::Missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kleene_tables() {
        use Truth::*;
        assert_eq!(Indeterminate.or(True), True);
        assert_eq!(Indeterminate.or(False), Indeterminate);
        assert_eq!(Indeterminate.and(False), False);
        assert_eq!(Indeterminate.and(True), Indeterminate);
        assert_eq!(Indeterminate.not(), Indeterminate);
    }

    #[test]
    fn test_division_by_zero_is_ieee() {
        let result = arithmetic(BinOp::Divide, &Value::Number(1.0), &Value::Number(0.0));
        assert_eq!(result, Value::Number(f64::INFINITY));
        let result = arithmetic(BinOp::Divide, &Value::Number(0.0), &Value::Number(0.0));
        assert!(matches!(result, Value::Number(n) if n.is_nan()));
    }

    #[test]
    fn test_mismatched_waveforms_are_missing() {
        let a = Value::Waveform(Waveform::from_samples(vec![1.0, 2.0]));
        let b = Value::Waveform(Waveform::from_samples(vec![1.0]));
        assert_eq!(arithmetic(BinOp::Add, &a, &b), Value::Missing);
    }

    #[test]
    fn test_text_ordering_is_indeterminate() {
        let a = Value::Text("a".into());
        let b = Value::Text("b".into());
        assert_eq!(compare(BinOp::LessThan, &a, &b), Truth::Indeterminate);
        assert_eq!(compare(BinOp::NotEqual, &a, &b), Truth::True);
    }
}
