//! Run filters and functions over JSON records

use super::{CliError, json_to_records, records_to_json};
use crate::{
    ChannelCatalogue,
    apply::{apply_filters, apply_functions},
    validate::{FunctionForm, validate_filters, validate_functions},
};

/// Options shared by the filter and apply commands
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub channels: ChannelCatalogue,
    /// Functions, in declaration order
    pub functions: Vec<FunctionForm>,
    /// Filter expressions, ANDed together
    pub filters: Vec<String>,
    /// JSON records
    pub input: String,
}

/// Derive function columns, then keep the records every filter holds for.
pub fn execute_filter(options: &RunOptions) -> Result<serde_json::Value, CliError> {
    let records = json_to_records(&serde_json::from_str(&options.input)?)?;
    let functions = validate_functions(&options.functions, &options.channels).map_err(CliError::Invalid)?;
    let filters = validate_filters(options.filters.as_slice(), &options.channels, &functions).map_err(CliError::Invalid)?;

    let records = apply_functions(&functions, records);
    let records = apply_filters(&filters, records);
    Ok(records_to_json(&records))
}

/// Add one column per function to every record.
pub fn execute_apply(options: &RunOptions) -> Result<serde_json::Value, CliError> {
    let records = json_to_records(&serde_json::from_str(&options.input)?)?;
    let functions = validate_functions(&options.functions, &options.channels).map_err(CliError::Invalid)?;
    Ok(records_to_json(&apply_functions(&functions, records)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChannelInfo;
    use serde_json::json;

    fn options(filters: &[&str]) -> RunOptions {
        RunOptions {
            channels: ChannelCatalogue::new().with("temperature", ChannelInfo::scalar("Temperature")),
            functions: vec![FunctionForm::new("kelvin", "temperature + 273.15")],
            filters: filters.iter().map(|s| s.to_string()).collect(),
            input: r#"[{"temperature": 21.98}, {"temperature": 20}, {"other": 1}]"#.to_string(),
        }
    }

    #[test]
    fn test_filter_records() {
        let output = execute_filter(&options(&["temperature > 21 or temperature > 21.95"])).unwrap();
        assert_eq!(output.as_array().map(Vec::len), Some(1));
        assert_eq!(output[0]["temperature"], json!(21.98));
    }

    #[test]
    fn test_filter_on_derived_column() {
        let output = execute_filter(&options(&["kelvin < 294"])).unwrap();
        assert_eq!(output[0]["temperature"], json!(20.0));
    }

    #[test]
    fn test_apply_adds_columns() {
        let output = execute_apply(&options(&[])).unwrap();
        assert_eq!(output.as_array().map(Vec::len), Some(3));
        assert_eq!(output[2]["kelvin"], serde_json::Value::Null);
    }
}
