use crate::{ast::Expr, value::ValueType};

/// User-defined function.
///
/// Produced by [`validate_functions`](crate::validate::validate_functions), so the
/// name is well formed and the tree is fully resolved and type checked.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    /// Function name, usable as a column by later functions and filters
    pub name: String,

    /// Expression as the user typed it
    pub expression: String,

    /// Parsed expression
    pub tree: Expr,

    /// Inferred result type (number, waveform or image)
    pub value_type: ValueType,
}

/// Immutable snapshot of validated functions in declaration order.
///
/// Later functions may only reference earlier ones, so evaluating in order
/// always has every dependency available.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionSet {
    defs: Vec<FunctionDef>,
}

impl FunctionSet {
    pub(crate) fn new(defs: Vec<FunctionDef>) -> Self {
        FunctionSet { defs }
    }

    pub fn iter(&self) -> impl Iterator<Item = &FunctionDef> {
        self.defs.iter()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.defs.iter().find(|def| def.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.defs.iter().map(|def| def.name.as_str())
    }

    /// Other functions in this set that `name` references directly.
    pub fn dependencies(&self, name: &str) -> Vec<&str> {
        let Some(def) = self.get(name) else {
            return Vec::new();
        };
        let mut deps: Vec<&str> = Vec::new();
        for reference in def.tree.references() {
            if self.get(reference).is_some() && !deps.contains(&reference) {
                deps.push(reference);
            }
        }
        deps
    }
}
