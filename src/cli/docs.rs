//! Documentation content for the opgw CLI

use std::fmt::Write as _;

use super::CliError;
use crate::functions;

/// Available documentation categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocCategory {
    Syntax,
    Operators,
    Functions,
    Filters,
    Types,
}

impl DocCategory {
    /// Parse category name from string
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "syntax" => Some(Self::Syntax),
            "operators" | "ops" => Some(Self::Operators),
            "functions" | "function" | "builtins" => Some(Self::Functions),
            "filters" | "filter" => Some(Self::Filters),
            "types" | "type" | "missing" => Some(Self::Types),
            _ => None,
        }
    }
}

/// Get the docs overview (category listing)
pub fn get_docs_overview() -> &'static str {
    r#"OPGW EXPRESSION DOCUMENTATION

Filters select experiment records with boolean conditions over channels.
Functions derive new columns from channels and earlier functions. Both are
written as sequences of tokens and stored as plain text.

DOCUMENTATION CATEGORIES

  syntax            Tokens, names, literals and brackets
  operators         Boolean, comparison and arithmetic operators, precedence
  functions         Builtin functions and user-defined functions
  filters           How several filters combine and what missing data does
  types             Scalars, text, waveforms and images

QUICK REFERENCE

  temperature > 21              Compare a channel with a number
  a > 1 and not b == "off"      Combine conditions
  centre ( trace ) * 2          Call a builtin, do arithmetic

Run 'opgw doc <category>' for detailed documentation.
"#
}

/// Get documentation for a specific category
pub fn get_doc_category(name: &str) -> Result<String, CliError> {
    match DocCategory::from_name(name) {
        Some(DocCategory::Syntax) => Ok(SYNTAX_DOC.to_string()),
        Some(DocCategory::Operators) => Ok(OPERATORS_DOC.to_string()),
        Some(DocCategory::Functions) => Ok(functions_doc()),
        Some(DocCategory::Filters) => Ok(FILTERS_DOC.to_string()),
        Some(DocCategory::Types) => Ok(TYPES_DOC.to_string()),
        None => Err(CliError::UnknownCategory(name.to_string())),
    }
}

const SYNTAX_DOC: &str = r#"SYNTAX - Tokens and Names

CHANNELS
  temperature
  FE-204-NSO-P1-CAM-1
    Channels are referenced by system name. Names may contain '-', so write
    spaces around subtraction: 'a - b', not 'a-b'.

NUMBERS
  21    21.95    1e-3

TEXT
  "shot"    'ready'
    Text literals compare with '==' and '!=' only.

BRACKETS
  ( a + b ) * 2
    Every '(' needs a matching ')'. An expression that stops early fails with:
      expression '(' has unexpected end-of-input, check all brackets are closed

FUNCTION NAMES
  Names start with a letter and contain only letters, digits, '-' or '_'.
    Valid:    Channel_A1, peak-width
    Invalid:  b@d_n@m3, 1st
"#;

const OPERATORS_DOC: &str = r#"OPERATORS - Precedence from loosest to tightest

  or                 Either condition holds
  and                Both conditions hold
  not                Condition does not hold (prefix)
  == != > < >= <=    Comparison; at most one per condition, no chaining
  + -                Addition, subtraction
  * /                Multiplication, division
  -                  Negation (prefix)
  ^                  Power, groups to the right: 2 ^ 3 ^ 2 is 2 ^ 9
  f ( ... )  ( ... ) Calls and brackets

  'and' and 'or' evaluate left to right and stop as soon as the answer is known.

  Division follows IEEE rules: 1 / 0 is inf, 0 / 0 is NaN.

ARRAYS
  Arithmetic on a waveform applies to each y value; on an image to each pixel.
  Two waveforms (or two images) combine sample by sample and must have the
  same length (or shape). Waveforms and images do not mix.
"#;

const FILTERS_DOC: &str = r#"FILTERS - Combining Conditions and Missing Data

  Several filters applied together must all hold for a record to be kept.

MISSING DATA
  A comparison that reads a channel the record does not carry is undecided.
  Undecided conditions follow three-valued logic:

    undecided or  true     true
    undecided and false    false
    not undecided          undecided

  A record whose filters end up undecided is not kept.

  Example:
    Filter:  temperature > 21 or temperature > 21.95
    temperature = 21.98   kept
    temperature missing   not kept
"#;

const TYPES_DOC: &str = r#"TYPES

  number      Scalar channels, numeric literals, arithmetic results
  text        Text channels and quoted literals
  boolean     Comparisons and conditions; filters must produce one
  waveform    Trace channels with x and y samples
  image       2-D channels

  Functions must produce a number, waveform or image. Any function reading a
  missing channel yields an empty value for that record.
"#;

fn functions_doc() -> String {
    let mut doc = String::from("FUNCTIONS - Builtins\n\n");
    for builtin in functions::builtins() {
        let _ = writeln!(doc, "  {:<12} {:<22} {}", builtin.name, builtin.arity.to_string(), builtin.summary);
    }
    doc.push_str(
        r#"
  Builtin names ignore case: Mean ( trace ) and mean ( trace ) are the same.

USER FUNCTIONS
  A function may use channels and any function defined before it:
    a = 1
    b = a + 1         gives 2
  A function may not use itself or a later function:
    c = c + 1         rejected as a cycle
"#,
    );
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_aliases() {
        assert_eq!(DocCategory::from_name("ops"), Some(DocCategory::Operators));
        assert_eq!(DocCategory::from_name("Builtins"), Some(DocCategory::Functions));
        assert!(get_doc_category("nope").is_err());
    }

    #[test]
    fn test_functions_doc_lists_builtins() {
        let doc = get_doc_category("functions").unwrap();
        assert!(doc.contains("centroid_x"));
        assert!(doc.contains("at least 1 argument"));
    }
}
