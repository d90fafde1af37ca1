use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use rlox::ast_printer::AstPrinter;
use rlox::error::{Reporter, StderrReporter};
use rlox::lox::Lox;
use rlox::parser::Parser;
use rlox::scanner::Scanner;
use rlox::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about = "rlox language interpreter", long_about = None)]
pub struct Cli {
    /// Without a subcommand an interactive prompt is started
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable logging to rlox.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print the tokens as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Parses a file and prints each top-level statement's AST
    Parse { filename: PathBuf },

    /// Runs a file as an rlox program
    Run { filename: PathBuf },

    /// Starts the interactive prompt
    Repl,
}

/// Maps a script into memory and checks that it is UTF-8.
fn load_source(filename: &Path) -> Result<Mmap> {
    info!("Reading file: {:?}", filename);

    let file = File::open(filename).with_context(|| format!("Failed to open file {:?}", filename))?;

    // SAFETY: the mapping is read-only and dropped before the process exits;
    // scripts are not expected to be modified while they are being run.
    let map = unsafe { Mmap::map(&file) }
        .with_context(|| format!("Failed to read file {:?}", filename))?;

    std::str::from_utf8(&map).with_context(|| format!("{:?} is not valid UTF-8", filename))?;

    info!("Read {} bytes from {:?}", map.len(), filename);

    Ok(map)
}

fn source_text(map: &Mmap) -> &str {
    // Validated in `load_source`.
    std::str::from_utf8(map).unwrap_or_default()
}

fn init_logger() -> Result<()> {
    let log_file = File::create("rlox.log").context("Failed to create rlox.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip the crate prefix from module paths
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("rlox::").unwrap_or(module);

            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to rlox.log");

    Ok(())
}

fn tokenize(filename: &Path, json: bool) -> Result<bool> {
    let map = load_source(filename)?;
    let mut reporter = StderrReporter;
    let mut tokens: Vec<Token> = Vec::new();
    let mut clean = true;

    for result in Scanner::new(source_text(&map)) {
        match result {
            Ok(token) => {
                if !json {
                    println!("{}", token);
                }
                tokens.push(token);
            }

            Err(e) => {
                clean = false;
                reporter.report_error(&e);
            }
        }
    }

    if json {
        let rendered = serde_json::to_string_pretty(&tokens).context("Failed to encode tokens")?;
        println!("{}", rendered);
    }

    Ok(clean)
}

fn parse(filename: &Path) -> Result<bool> {
    let map = load_source(filename)?;
    let mut reporter = StderrReporter;
    let mut tokens: Vec<Token> = Vec::new();
    let mut clean = true;

    for result in Scanner::new(source_text(&map)) {
        match result {
            Ok(token) => tokens.push(token),
            Err(e) => {
                clean = false;
                reporter.report_error(&e);
            }
        }
    }

    if !clean {
        return Ok(false);
    }

    let mut parser = Parser::new(tokens);
    let program = parser.parse();

    for e in parser.errors() {
        reporter.report_error(e);
    }

    if parser.had_error() {
        return Ok(false);
    }

    for stmt in &program {
        println!("{}", AstPrinter::print_stmt(stmt));
    }

    Ok(true)
}

fn run_file(filename: &Path) -> Result<bool> {
    let map = load_source(filename)?;
    let mut lox = Lox::new();

    Ok(lox.run(source_text(&map)))
}

fn repl() -> Result<()> {
    let mut lox = Lox::new();
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut line = String::new();

    println!("rlox shell");

    loop {
        print!("rlox> ");
        io::stdout().flush().context("Failed to flush prompt")?;

        line.clear();
        if input.read_line(&mut line).context("Failed to read input")? == 0 {
            break;
        }

        debug!("REPL line: {:?}", line);

        lox.run(&line);
    }

    println!();

    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        Builder::new().filter_level(log::LevelFilter::Off).init();
    }

    info!("CLI arguments: {:?}", args);

    let clean = match args.command {
        Some(Commands::Tokenize { filename, json }) => tokenize(&filename, json)?,
        Some(Commands::Parse { filename }) => parse(&filename)?,
        Some(Commands::Run { filename }) => run_file(&filename)?,
        Some(Commands::Repl) | None => {
            repl()?;
            true
        }
    };

    if !clean {
        debug!("Errors were reported, exiting with code 1");
        std::process::exit(1);
    }

    Ok(())
}
