//! Validate a single filter or function expression

use serde::Serialize;

use super::CliError;
use crate::{
    ChannelCatalogue,
    catalogue::Mode,
    output::to_text,
    validate::{FunctionForm, validate_filters, validate_functions},
    value::ValueType,
};

/// Options for the check command
#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// The expression to check
    pub expression: String,
    /// Check as a filter condition or as a function
    pub mode: Mode,
    /// Name to give the expression when checked as a function
    pub name: String,
    /// Channels the expression may reference
    pub channels: ChannelCatalogue,
    /// Functions defined before this expression
    pub functions: Vec<FunctionForm>,
}

/// Result of a successful check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    /// Canonical text form
    pub text: String,
    pub value_type: ValueType,
}

/// Validate `options.expression` against the channels and earlier functions.
///
/// Validation failures come back as [`CliError::Invalid`] with field paths.
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    match options.mode {
        Mode::Filter => {
            let functions =
                validate_functions(&options.functions, &options.channels).map_err(CliError::Invalid)?;
            let filters = validate_filters(&[options.expression.as_str()], &options.channels, &functions)
                .map_err(CliError::Invalid)?;
            let text = filters.first().map(|f| to_text(&f.tree)).unwrap_or_default();
            Ok(CheckResult {
                text,
                value_type: ValueType::Boolean,
            })
        }
        Mode::Function => {
            let mut forms = options.functions.clone();
            forms.push(FunctionForm::new(&options.name, &options.expression));
            let functions = validate_functions(&forms, &options.channels).map_err(CliError::Invalid)?;
            let def = functions
                .get(options.name.trim())
                .ok_or_else(|| CliError::Record(format!("function '{}' was not defined", options.name)))?;
            Ok(CheckResult {
                text: to_text(&def.tree),
                value_type: def.value_type,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChannelInfo;

    fn options(expression: &str, mode: Mode) -> CheckOptions {
        CheckOptions {
            expression: expression.to_string(),
            mode,
            name: "result".to_string(),
            channels: ChannelCatalogue::new().with("trace", ChannelInfo::waveform("Trace")),
            functions: vec![FunctionForm::new("peak", "centre(trace)")],
        }
    }

    #[test]
    fn test_filter_on_function() {
        let result = execute_check(&options("peak>2", Mode::Filter)).unwrap();
        assert_eq!(result.text, "peak > 2");
        assert_eq!(result.value_type, ValueType::Boolean);
    }

    #[test]
    fn test_function_type() {
        let result = execute_check(&options("trace * 2", Mode::Function)).unwrap();
        assert_eq!(result.value_type, ValueType::Waveform);
    }

    #[test]
    fn test_invalid_reports_fields() {
        match execute_check(&options("trace > 2", Mode::Filter)) {
            Err(CliError::Invalid(errors)) => assert_eq!(errors[0].field_path, "filters.0"),
            other => panic!("expected field errors, got {:?}", other),
        }
    }
}
