//! Autocomplete suggestions for a partial expression

use super::CliError;
use crate::{
    ChannelCatalogue,
    ast::Token,
    catalogue::{Mode, TokenCatalogue},
    complete::complete,
    lexer,
};

/// Options for the complete command
#[derive(Debug, Clone)]
pub struct SuggestOptions {
    pub channels: ChannelCatalogue,
    /// User function names that may be referenced
    pub functions: Vec<String>,
    pub mode: Mode,
    /// Expression committed so far, as text
    pub sequence: String,
    /// Text typed after it
    pub typed: String,
}

/// Ranked suggestions for the token after `options.sequence`.
pub fn execute_suggest(options: &SuggestOptions) -> Result<Vec<Token>, CliError> {
    let sequence = lexer::tokenize(&options.sequence, &options.channels)?;
    let catalogue = TokenCatalogue::new(&options.channels, options.mode).with_functions(options.functions.iter().cloned());
    Ok(complete(&catalogue, &sequence, &options.typed)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChannelInfo;

    #[test]
    fn test_comparison_left_not_suggested() {
        let options = SuggestOptions {
            channels: ChannelCatalogue::new()
                .with("temperature", ChannelInfo::scalar("Temperature"))
                .with("humidity", ChannelInfo::scalar("Humidity")),
            functions: vec![],
            mode: Mode::Filter,
            sequence: "temperature >".to_string(),
            typed: String::new(),
        };
        let values: Vec<String> = execute_suggest(&options)
            .unwrap()
            .into_iter()
            .map(|t| t.value)
            .collect();
        assert!(values.contains(&"humidity".to_string()));
        assert!(!values.contains(&"temperature".to_string()));
    }
}
