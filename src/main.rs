use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use rox::ast_printer::AstPrinter;
use rox::error::{Diagnostics, EXIT_RUNTIME_ERROR, EXIT_STATIC_ERROR};
use rox::parser::Parser;
use rox::scanner::{scan_tokens, Scanner};
use rox::{Interpreter, Lox};

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    /// Starts an interactive prompt when omitted
    #[command(subcommand)]
    commands: Option<Commands>,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print the tokens as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Parses a program from a file and prints its AST
    Parse { filename: PathBuf },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs input from a file as a Lox program
    Run { filename: PathBuf },

    /// Starts an interactive prompt
    Repl,
}

/// Reads the contents of a file as UTF‑8 text
fn read_file(filename: PathBuf) -> Result<String> {
    rox::read_source(&filename).context(format!("Failed to read source file {:?}", filename))
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Configure env_logger to write to file with module and source line
    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Prints every diagnostic to stderr.
fn report(diagnostics: &Diagnostics) {
    for e in diagnostics.errors() {
        eprintln!("{}", e);
    }
}

fn tokenize(filename: PathBuf, json: bool) -> Result<()> {
    let source = read_file(filename)?;
    let mut diagnostics = Diagnostics::new();

    if json {
        let tokens = scan_tokens(&source, &mut diagnostics);
        report(&diagnostics);
        println!(
            "{}",
            serde_json::to_string_pretty(&tokens).context("Failed to serialize tokens")?
        );
    } else {
        // Stream so that errors interleave with the tokens around them.
        for token in Scanner::new(&source) {
            match token {
                Ok(token) => println!("{}", token),
                Err(e) => {
                    eprintln!("{}", e);
                    diagnostics.report(e);
                }
            }
        }
    }

    if diagnostics.had_error() {
        debug!("Tokenization failed, exiting with code 65");
        std::process::exit(EXIT_STATIC_ERROR);
    }

    Ok(())
}

fn parse(filename: PathBuf) -> Result<()> {
    let source = read_file(filename)?;
    let mut diagnostics = Diagnostics::new();

    let tokens = scan_tokens(&source, &mut diagnostics);
    let statements = Parser::new(tokens).parse(&mut diagnostics);

    if diagnostics.had_error() {
        report(&diagnostics);
        std::process::exit(EXIT_STATIC_ERROR);
    }

    let ast = AstPrinter::print_program(&statements);
    debug!("AST: {}", ast);
    println!("{}", ast);

    Ok(())
}

fn evaluate(filename: PathBuf) -> Result<()> {
    let source = read_file(filename)?;
    let mut diagnostics = Diagnostics::new();

    let tokens = scan_tokens(&source, &mut diagnostics);
    let expr = Parser::new(tokens).parse_expression(&mut diagnostics);

    let expr = match expr {
        Some(expr) if !diagnostics.had_error() => expr,
        _ => {
            report(&diagnostics);
            std::process::exit(EXIT_STATIC_ERROR);
        }
    };

    // A bare expression has no locals, so no resolver pass is needed.
    match Interpreter::new().evaluate(&expr) {
        Ok(value) => {
            debug!("Evaluated to: {}", value);
            println!("{}", value);
        }
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(EXIT_RUNTIME_ERROR);
        }
    }

    Ok(())
}

fn run(filename: PathBuf) -> Result<()> {
    let source = read_file(filename)?;
    let mut lox = Lox::new();

    let diagnostics = lox.run(&source);
    report(&diagnostics);

    let code = diagnostics.exit_code();
    if code != 0 {
        debug!("Run failed, exiting with code {}", code);
        std::process::exit(code);
    }

    info!("Program executed successfully");
    Ok(())
}

fn run_prompt() -> Result<()> {
    let mut editor = DefaultEditor::new().context("Failed to start line editor")?;
    let mut lox = Lox::new();

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                if let Err(e) = editor.add_history_entry(line.as_str()) {
                    debug!("Could not record history entry: {}", e);
                }

                report(&lox.run_line(&line));
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("Failed to read from prompt"),
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Some(Commands::Tokenize { filename, json }) => tokenize(filename, json),
        Some(Commands::Parse { filename }) => parse(filename),
        Some(Commands::Evaluate { filename }) => evaluate(filename),
        Some(Commands::Run { filename }) => run(filename),
        Some(Commands::Repl) | None => run_prompt(),
    }
}
