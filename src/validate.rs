//! Checks that grammar alone cannot express.
//!
//! Validation runs on form submission (and whenever a form field changes) and
//! always reports through [`FieldError`]s addressed by field path, one error per
//! problem, so the owning form can show each next to its field.

use std::{
    collections::{BTreeMap, HashMap},
    sync::LazyLock,
};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    ast::{BinOp, Expr, Filter, FunctionDef, FunctionSet, Literal, Token, UnaryOp},
    catalogue::ChannelCatalogue,
    functions::{self, Arity},
    lexer::{self, LexError},
    output::to_text,
    parser::{ParseError, Parser},
    value::ValueType,
};

pub const REQUIRED_MESSAGE: &str = "String should have at least 1 character";

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("name pattern compiles"));

/// An error attached to one form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub field_path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field_path: impl Into<String>, error: &ValidationError) -> Self {
        FieldError {
            field_path: field_path.into(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TypeError {
    #[error("operator '{op}' expects {expected} operands, got {found} '{operand}'")]
    Operand {
        op: &'static str,
        expected: &'static str,
        found: ValueType,
        operand: String,
    },

    #[error("operator '{op}' cannot combine {left} with {right}")]
    Mismatch {
        op: &'static str,
        left: ValueType,
        right: ValueType,
    },

    #[error("function '{function}' expects {expected} as argument {position}, got {found} '{operand}'")]
    Argument {
        function: String,
        position: usize,
        expected: &'static str,
        found: ValueType,
        operand: String,
    },

    #[error("function '{function}' expects {expected}, got {found}")]
    Arity {
        function: String,
        expected: Arity,
        found: usize,
    },

    #[error("unknown function '{0}'")]
    UnknownFunction(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("String should have at least 1 character")]
    Required,

    #[error(
        "name '{0}' must start with a letter, and can only contain letters, digits, '-' or '_' characters"
    )]
    InvalidName(String),

    #[error("name '{0}' is already used by another function")]
    DuplicateName(String),

    #[error("name '{0}' is already used by a channel")]
    ChannelName(String),

    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("'{0}' is not a known channel or function")]
    UnknownReference(String),

    #[error("function '{function}' references '{reference}', which is defined after it")]
    ForwardReference { function: String, reference: String },

    #[error("function '{function}' is part of a reference cycle: {}", .path.join(" -> "))]
    Cycle { function: String, path: Vec<String> },

    #[error("filter must be a boolean condition, got {0}")]
    NotBoolean(ValueType),

    #[error("function must produce a number, waveform or image, got {0}")]
    NotNumeric(ValueType),
}

/// Check a function or channel name against the naming rule.
///
/// ```
/// use opgw_expr::validate::validate_name;
///
/// assert!(validate_name("Channel_A1").is_ok());
/// assert_eq!(
///     validate_name("b@d_n@m3").unwrap_err().to_string(),
///     "name 'b@d_n@m3' must start with a letter, and can only contain letters, digits, '-' or '_' characters"
/// );
/// ```
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::InvalidName(name.to_string()))
    }
}

/// `Required` for an empty (or all whitespace) field.
pub fn required(field: &str) -> Result<&str, ValidationError> {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        Err(ValidationError::Required)
    } else {
        Ok(trimmed)
    }
}

enum Lookup {
    Found(ValueType),
    /// A function declared after the one being checked
    Later,
    /// A function that failed validation itself; already reported
    Broken,
    Unknown,
}

/// Names visible while checking one expression.
struct Scope<'a> {
    channels: &'a ChannelCatalogue,
    functions: &'a [(String, ValueType)],
    later: &'a [String],
    broken: &'a [String],
}

impl Scope<'_> {
    fn lookup(&self, name: &str) -> Lookup {
        if let Some((_, t)) = self.functions.iter().find(|(n, _)| n == name) {
            Lookup::Found(*t)
        } else if let Some(info) = self.channels.get(name) {
            Lookup::Found(info.value_type())
        } else if self.broken.iter().any(|n| n == name) {
            Lookup::Broken
        } else if self.later.iter().any(|n| n == name) {
            Lookup::Later
        } else {
            Lookup::Unknown
        }
    }
}

/// Infers types bottom-up, collecting every problem rather than stopping at the first.
///
/// `None` means the type is unknown because of an error already recorded, and
/// suppresses follow-on errors higher up the tree.
struct TypeChecker<'a> {
    scope: &'a Scope<'a>,
    current: Option<&'a str>,
    errors: Vec<ValidationError>,
}

impl<'a> TypeChecker<'a> {
    fn new(scope: &'a Scope<'a>, current: Option<&'a str>) -> Self {
        TypeChecker {
            scope,
            current,
            errors: Vec::new(),
        }
    }

    fn push(&mut self, error: ValidationError) {
        if !self.errors.contains(&error) {
            self.errors.push(error);
        }
    }

    fn operand_error(&mut self, op: &'static str, expected: &'static str, found: ValueType, operand: &Expr) {
        self.push(
            TypeError::Operand {
                op,
                expected,
                found,
                operand: to_text(operand),
            }
            .into(),
        );
    }

    fn check(&mut self, expr: &Expr) -> Option<ValueType> {
        match expr {
            Expr::Literal(Literal::Number(_)) => Some(ValueType::Number),
            Expr::Literal(Literal::Text(_)) => Some(ValueType::Text),
            Expr::Channel(name) => match self.scope.lookup(name) {
                Lookup::Found(t) => Some(t),
                Lookup::Later => {
                    self.push(ValidationError::ForwardReference {
                        function: self.current.unwrap_or_default().to_string(),
                        reference: name.clone(),
                    });
                    None
                }
                Lookup::Broken => None,
                Lookup::Unknown => {
                    self.push(ValidationError::UnknownReference(name.clone()));
                    None
                }
            },
            Expr::Group(inner) => self.check(inner),
            Expr::Unary {
                op: UnaryOp::Not,
                operand,
            } => {
                if let Some(t) = self.check(operand)
                    && t != ValueType::Boolean
                {
                    self.operand_error("not", "boolean", t, operand);
                }
                Some(ValueType::Boolean)
            }
            Expr::Unary {
                op: UnaryOp::Negate,
                operand,
            } => {
                let t = self.check(operand)?;
                if !t.is_numeric() {
                    self.operand_error("-", "numeric", t, operand);
                    return None;
                }
                Some(t)
            }
            Expr::Binary { op, left, right } if op.is_logical() => {
                for side in [left, right] {
                    if let Some(t) = self.check(side)
                        && t != ValueType::Boolean
                    {
                        self.operand_error(op.symbol(), "boolean", t, side);
                    }
                }
                Some(ValueType::Boolean)
            }
            Expr::Binary { op, left, right } if op.is_comparison() => {
                let l = self.check(left);
                let r = self.check(right);
                if let (Some(l), Some(r)) = (l, r) {
                    self.check_comparison(*op, (l, &**left), (r, &**right));
                }
                Some(ValueType::Boolean)
            }
            Expr::Binary { op, left, right } => {
                let l = self.check(left);
                let r = self.check(right);
                let mut ok = true;
                for (t, side) in [(l, left), (r, right)] {
                    if let Some(t) = t
                        && !t.is_numeric()
                    {
                        self.operand_error(op.symbol(), "numeric", t, side);
                        ok = false;
                    }
                }
                let (l, r) = (l?, r?);
                if !ok {
                    return None;
                }
                match (l, r) {
                    (ValueType::Waveform, ValueType::Image) | (ValueType::Image, ValueType::Waveform) => {
                        self.push(
                            TypeError::Mismatch {
                                op: op.symbol(),
                                left: l,
                                right: r,
                            }
                            .into(),
                        );
                        None
                    }
                    (ValueType::Image, _) | (_, ValueType::Image) => Some(ValueType::Image),
                    (ValueType::Waveform, _) | (_, ValueType::Waveform) => Some(ValueType::Waveform),
                    _ => Some(ValueType::Number),
                }
            }
            Expr::Call { name, args } => {
                let types: Vec<Option<ValueType>> = args.iter().map(|arg| self.check(arg)).collect();
                let Some(builtin) = functions::lookup(name) else {
                    self.push(TypeError::UnknownFunction(name.clone()).into());
                    return None;
                };
                if !builtin.arity.accepts(args.len()) {
                    self.push(
                        TypeError::Arity {
                            function: builtin.name.to_string(),
                            expected: builtin.arity,
                            found: args.len(),
                        }
                        .into(),
                    );
                    return None;
                }
                let types: Vec<ValueType> = types.into_iter().collect::<Option<_>>()?;
                match builtin.signature.result_type(&types) {
                    Ok(t) => Some(t),
                    Err(mismatch) => {
                        self.push(
                            TypeError::Argument {
                                function: builtin.name.to_string(),
                                position: mismatch.index + 1,
                                expected: mismatch.expected,
                                found: mismatch.found,
                                operand: to_text(&args[mismatch.index]),
                            }
                            .into(),
                        );
                        None
                    }
                }
            }
        }
    }

    fn check_comparison(&mut self, op: BinOp, left: (ValueType, &Expr), right: (ValueType, &Expr)) {
        match (left.0, right.0) {
            (ValueType::Number, ValueType::Number) => {}
            (ValueType::Text, ValueType::Text) if op.is_equality() => {}
            (ValueType::Text, ValueType::Text) => {
                self.operand_error(op.symbol(), "numeric", ValueType::Text, left.1);
            }
            (l, r) if l == r || l == ValueType::Boolean || l.is_array() => {
                self.operand_error(op.symbol(), "number or text", l, left.1);
            }
            (_, r) if r == ValueType::Boolean || r.is_array() => {
                self.operand_error(op.symbol(), "number or text", r, right.1);
            }
            (l, r) => self.push(
                TypeError::Mismatch {
                    op: op.symbol(),
                    left: l,
                    right: r,
                }
                .into(),
            ),
        }
    }
}

/// Parse stored text, reporting lexing and parsing failures as validation errors.
fn parse_field(text: &str, channels: &ChannelCatalogue) -> Result<(Vec<Token>, Expr), ValidationError> {
    let tokens = lexer::tokenize(text, channels)?;
    let tree = Parser::with_source(tokens.clone(), text).parse()?;
    Ok((tokens, tree))
}

/// Validate one filter given as a token sequence.
pub fn validate_filter_tokens(
    tokens: Vec<Token>,
    channels: &ChannelCatalogue,
    functions: &FunctionSet,
) -> Result<Filter, Vec<ValidationError>> {
    if tokens.is_empty() {
        return Err(vec![ValidationError::Required]);
    }
    let tree = Parser::new(tokens.clone())
        .parse()
        .map_err(|e| vec![ValidationError::from(e)])?;
    check_filter_tree(tokens, tree, channels, functions)
}

/// Validate one filter given as text.
///
/// ```
/// use opgw_expr::{ChannelCatalogue, ChannelInfo, FunctionSet};
/// use opgw_expr::validate::validate_filter;
///
/// let channels = ChannelCatalogue::new().with("temperature", ChannelInfo::scalar("Temperature"));
/// assert!(validate_filter("temperature > 21", &channels, &FunctionSet::default()).is_ok());
/// assert!(validate_filter("temperature + 21", &channels, &FunctionSet::default()).is_err());
/// ```
pub fn validate_filter(
    text: &str,
    channels: &ChannelCatalogue,
    functions: &FunctionSet,
) -> Result<Filter, Vec<ValidationError>> {
    let text = required(text).map_err(|e| vec![e])?;
    let (tokens, tree) = parse_field(text, channels).map_err(|e| vec![e])?;
    check_filter_tree(tokens, tree, channels, functions)
}

fn check_filter_tree(
    tokens: Vec<Token>,
    tree: Expr,
    channels: &ChannelCatalogue,
    functions: &FunctionSet,
) -> Result<Filter, Vec<ValidationError>> {
    let visible: Vec<(String, ValueType)> = functions
        .iter()
        .map(|def| (def.name.clone(), def.value_type))
        .collect();
    let scope = Scope {
        channels,
        functions: &visible,
        later: &[],
        broken: &[],
    };
    let mut checker = TypeChecker::new(&scope, None);
    let root = checker.check(&tree);
    if let Some(t) = root
        && t != ValueType::Boolean
    {
        checker.push(ValidationError::NotBoolean(t));
    }

    if checker.errors.is_empty() {
        Ok(Filter { tokens, tree })
    } else {
        Err(checker.errors)
    }
}

/// Validate every applied filter; errors are addressed as `filters.<index>`.
pub fn validate_filters<S: AsRef<str>>(
    texts: &[S],
    channels: &ChannelCatalogue,
    functions: &FunctionSet,
) -> Result<Vec<Filter>, Vec<FieldError>> {
    let mut filters = Vec::with_capacity(texts.len());
    let mut errors = Vec::new();
    for (i, text) in texts.iter().enumerate() {
        match validate_filter(text.as_ref(), channels, functions) {
            Ok(filter) => filters.push(filter),
            Err(errs) => {
                let path = format!("filters.{}", i);
                errors.extend(errs.iter().map(|e| FieldError::new(&path, e)));
            }
        }
    }
    if errors.is_empty() {
        tracing::debug!(count = filters.len(), "filters validated");
        Ok(filters)
    } else {
        Err(errors)
    }
}

/// A function as entered in the function form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionForm {
    pub name: String,
    pub expression: String,
}

impl FunctionForm {
    pub fn new(name: impl Into<String>, expression: impl Into<String>) -> Self {
        FunctionForm {
            name: name.into(),
            expression: expression.into(),
        }
    }
}

/// Validate the whole function list and build an evaluable snapshot.
///
/// Errors are addressed as `functions.<index>.name` and
/// `functions.<index>.expression`. Each field is judged on its current content
/// only, so fixing a field clears exactly that field's errors on the next call.
///
/// ```
/// use opgw_expr::ChannelCatalogue;
/// use opgw_expr::validate::{FunctionForm, validate_functions};
///
/// let channels = ChannelCatalogue::new();
/// let set = validate_functions(
///     &[FunctionForm::new("a", "1"), FunctionForm::new("b", "a + 1")],
///     &channels,
/// ).unwrap();
/// assert_eq!(set.dependencies("b"), vec!["a"]);
///
/// let errors = validate_functions(&[FunctionForm::new("c", "c + 1")], &channels).unwrap_err();
/// assert_eq!(errors[0].field_path, "functions.0.expression");
/// ```
pub fn validate_functions(
    forms: &[FunctionForm],
    channels: &ChannelCatalogue,
) -> Result<FunctionSet, Vec<FieldError>> {
    let mut errors = Vec::new();
    let name_path = |i: usize| format!("functions.{}.name", i);
    let expression_path = |i: usize| format!("functions.{}.expression", i);

    // Names
    let names: Vec<&str> = forms.iter().map(|f| f.name.trim()).collect();
    let mut name_ok = vec![false; forms.len()];
    for (i, name) in names.iter().enumerate() {
        let result = required(name).and_then(|name| {
            validate_name(name)?;
            if names[..i].contains(&name) {
                Err(ValidationError::DuplicateName(name.to_string()))
            } else if channels.contains(name) {
                Err(ValidationError::ChannelName(name.to_string()))
            } else {
                Ok(())
            }
        });
        match result {
            Ok(()) => name_ok[i] = true,
            Err(e) => errors.push(FieldError::new(name_path(i), &e)),
        }
    }

    // Syntax
    let mut trees: Vec<Option<Expr>> = Vec::with_capacity(forms.len());
    for (i, form) in forms.iter().enumerate() {
        let parsed = required(&form.expression).and_then(|text| parse_field(text, channels));
        match parsed {
            Ok((_, tree)) => trees.push(Some(tree)),
            Err(e) => {
                errors.push(FieldError::new(expression_path(i), &e));
                trees.push(None);
            }
        }
    }

    // Cycles, over every parsed function with a usable name
    let mut graph: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (i, tree) in trees.iter().enumerate() {
        if let Some(tree) = tree
            && name_ok[i]
        {
            let edges = tree
                .references()
                .into_iter()
                .filter(|r| names.iter().enumerate().any(|(j, n)| name_ok[j] && n == r))
                .collect();
            graph.insert(names[i], edges);
        }
    }
    let cycles = find_cycles(&graph);

    // Types, in declaration order
    let mut defined: Vec<(String, ValueType)> = Vec::new();
    let mut broken: Vec<String> = Vec::new();
    let mut defs = Vec::new();
    for (i, form) in forms.iter().enumerate() {
        let name = names[i];
        if let Some(path) = cycles.get(name).filter(|_| name_ok[i]) {
            let error = ValidationError::Cycle {
                function: name.to_string(),
                path: path.iter().map(|s| s.to_string()).collect(),
            };
            errors.push(FieldError::new(expression_path(i), &error));
            broken.push(name.to_string());
            continue;
        }
        let Some(tree) = &trees[i] else {
            broken.push(name.to_string());
            continue;
        };

        let later: Vec<String> = names[i + 1..].iter().map(|n| n.to_string()).collect();
        let scope = Scope {
            channels,
            functions: &defined,
            later: &later,
            broken: &broken,
        };
        let mut checker = TypeChecker::new(&scope, Some(name));
        let root = checker.check(tree);
        if let Some(t) = root
            && !t.is_numeric()
        {
            checker.push(ValidationError::NotNumeric(t));
        }

        let path = expression_path(i);
        let clean = checker.errors.is_empty();
        errors.extend(checker.errors.iter().map(|e| FieldError::new(&path, e)));

        match root {
            Some(value_type) if clean && name_ok[i] => {
                tracing::debug!(function = name, %value_type, "function validated");
                defined.push((name.to_string(), value_type));
                defs.push(FunctionDef {
                    name: name.to_string(),
                    expression: form.expression.trim().to_string(),
                    tree: tree.clone(),
                    value_type,
                });
            }
            _ => broken.push(name.to_string()),
        }
    }

    if errors.is_empty() {
        Ok(FunctionSet::new(defs))
    } else {
        Err(errors)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Every node on a cycle, mapped to that cycle written out from the node back to itself.
fn find_cycles<'a>(graph: &BTreeMap<&'a str, Vec<&'a str>>) -> HashMap<&'a str, Vec<&'a str>> {
    let mut marks = HashMap::new();
    let mut stack = Vec::new();
    let mut cycles = HashMap::new();
    for &node in graph.keys() {
        visit(node, graph, &mut marks, &mut stack, &mut cycles);
    }
    cycles
}

fn visit<'a>(
    node: &'a str,
    graph: &BTreeMap<&'a str, Vec<&'a str>>,
    marks: &mut HashMap<&'a str, Mark>,
    stack: &mut Vec<&'a str>,
    cycles: &mut HashMap<&'a str, Vec<&'a str>>,
) {
    match marks.get(node) {
        Some(Mark::Done) => return,
        Some(Mark::Visiting) => {
            // Back edge: the cycle is the stack from `node` onwards
            let from = stack.iter().position(|n| *n == node).unwrap_or(0);
            let members = &stack[from..];
            for (k, member) in members.iter().enumerate() {
                let mut path: Vec<&str> = members[k..].iter().chain(&members[..k]).copied().collect();
                path.push(*member);
                cycles.entry(*member).or_insert(path);
            }
            return;
        }
        None => {}
    }

    marks.insert(node, Mark::Visiting);
    stack.push(node);
    for &next in graph.get(node).into_iter().flatten() {
        visit(next, graph, marks, stack, cycles);
    }
    stack.pop();
    marks.insert(node, Mark::Done);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_cycles_marks_every_member() {
        let mut graph = BTreeMap::new();
        graph.insert("a", vec!["b"]);
        graph.insert("b", vec!["a"]);
        graph.insert("c", vec!["a"]);
        let cycles = find_cycles(&graph);
        assert_eq!(cycles.get("a"), Some(&vec!["a", "b", "a"]));
        assert_eq!(cycles.get("b"), Some(&vec!["b", "a", "b"]));
        assert!(!cycles.contains_key("c"));
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let mut graph = BTreeMap::new();
        graph.insert("c", vec!["c"]);
        assert_eq!(find_cycles(&graph).get("c"), Some(&vec!["c", "c"]));
    }

    #[test]
    fn test_required_trims() {
        assert_eq!(required("  "), Err(ValidationError::Required));
        assert_eq!(required(" a "), Ok("a"));
    }
}
