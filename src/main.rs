use clap::{Parser as ClapParser, Subcommand, ValueEnum};
use opgw_expr::{
    ChannelCatalogue,
    catalogue::Mode,
    cli::{self, CheckOptions, CliError, RunOptions, SuggestOptions},
    validate::FunctionForm,
};
use std::{
    io::{self, Read},
    path::PathBuf,
};
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "opgw")]
#[command(about = "Check and run filter and function expressions over experiment records")]
#[command(version)]
struct Cli {
    /// Channel catalogue JSON file (system name -> label, kind, data_type)
    #[arg(short, long, global = true)]
    channels: Option<PathBuf>,

    /// Function definitions JSON file ([{"name": ..., "expression": ...}])
    #[arg(short, long, global = true)]
    functions: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Filter,
    Function,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Filter => Mode::Filter,
            ModeArg::Function => Mode::Function,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an expression and print its canonical form
    Check {
        /// The expression to check
        expression: String,

        /// Check as a filter condition or as a function
        #[arg(short, long, value_enum, default_value = "filter")]
        mode: ModeArg,

        /// Name of the function being checked
        #[arg(short, long, default_value = "result")]
        name: String,
    },

    /// Keep the JSON records every filter holds for
    Filter {
        /// Filter expressions, ANDed together
        #[arg(required = true)]
        filters: Vec<String>,

        /// JSON input (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Add a column per function to the JSON records
    Apply {
        /// JSON input (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// List the tokens that may follow a partial expression
    Complete {
        /// Expression typed so far
        #[arg(default_value = "")]
        sequence: String,

        /// Text typed for the next token
        #[arg(short, long, default_value = "")]
        typed: String,

        #[arg(short, long, value_enum, default_value = "filter")]
        mode: ModeArg,
    },

    /// List documentation categories
    Docs,

    /// Show documentation for a specific category
    Doc {
        /// Category name (use 'opgw docs' to list categories)
        category: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let channels = match &cli.channels {
        Some(path) => ChannelCatalogue::from_json_file(path)?,
        None => ChannelCatalogue::new(),
    };
    let functions: Vec<FunctionForm> = match &cli.functions {
        Some(path) => cli::load_json(path)?,
        None => Vec::new(),
    };

    match cli.command {
        Commands::Check {
            expression,
            mode,
            name,
        } => {
            let options = CheckOptions {
                expression,
                mode: mode.into(),
                name,
                channels,
                functions,
            };
            match cli::execute_check(&options) {
                Ok(result) => {
                    println!("{}", result.text);
                    println!("type: {}", result.value_type);
                }
                Err(CliError::Invalid(errors)) => {
                    println!("{}", serde_json::to_string_pretty(&errors)?);
                    std::process::exit(1);
                }
                Err(e) => return Err(e),
            }
        }
        Commands::Filter {
            filters,
            input,
            pretty,
        } => {
            let options = RunOptions {
                channels,
                functions,
                filters,
                input: read_input(input)?,
            };
            print_json(&cli::execute_filter(&options)?, pretty)?;
        }
        Commands::Apply { input, pretty } => {
            let options = RunOptions {
                channels,
                functions,
                filters: Vec::new(),
                input: read_input(input)?,
            };
            print_json(&cli::execute_apply(&options)?, pretty)?;
        }
        Commands::Complete {
            sequence,
            typed,
            mode,
        } => {
            let options = SuggestOptions {
                channels,
                functions: functions.into_iter().map(|f| f.name).collect(),
                mode: mode.into(),
                sequence,
                typed,
            };
            for token in cli::execute_suggest(&options)? {
                println!("{}\t{}", token.label, token.value);
            }
        }
        Commands::Docs => print!("{}", cli::get_docs_overview()),
        Commands::Doc { category } => print!("{}", cli::get_doc_category(&category)?),
    }
    Ok(())
}

fn read_input(input: Option<String>) -> Result<String, CliError> {
    match input {
        Some(s) => Ok(s),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
        None => Err(CliError::NoInput),
    }
}

fn print_json(output: &serde_json::Value, pretty: bool) -> Result<(), CliError> {
    let json = if pretty {
        serde_json::to_string_pretty(output)
    } else {
        serde_json::to_string(output)
    }?;
    println!("{}", json);
    Ok(())
}
