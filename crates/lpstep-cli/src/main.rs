use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use lpstep_lang::steps_to;
use lpstep_solver::format::{format_program, format_solution, format_tableau};
use lpstep_solver::{ConversionStep, Converter, PivotRule, State, StateKind};

#[derive(Parser)]
#[command(name = "lpstep")]
#[command(about = "Solve linear programs with an explained, exact simplex", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Pretty, global = true)]
    format: Format,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a program and print it back in canonical form
    Parse {
        /// Program file, or - for stdin
        file: PathBuf,
    },
    /// Check a program for errors
    Check {
        /// Program file, or - for stdin
        file: PathBuf,
    },
    /// Rewrite a program into standard form
    Standardize {
        /// Program file, or - for stdin
        file: PathBuf,
    },
    /// Build the initial simplex tableau
    Tableau {
        /// Program file, or - for stdin
        file: PathBuf,
    },
    /// Run the simplex method to a solution
    Solve {
        /// Program file, or - for stdin
        file: PathBuf,
        /// Print every step with its explanation
        #[arg(short, long)]
        steps: bool,
        /// Maximum number of steps before giving up
        #[arg(long, default_value_t = 100)]
        max_steps: usize,
        /// Rule for choosing pivots
        #[arg(long, value_enum, default_value_t = Rule::Dantzig)]
        pivot_rule: Rule,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum Format {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum Rule {
    /// Most improving reduced cost, lowest row on ratio ties
    Dantzig,
    /// Lowest-index improving column (never cycles)
    Bland,
}

impl From<Rule> for PivotRule {
    fn from(rule: Rule) -> Self {
        match rule {
            Rule::Dantzig => PivotRule::Dantzig,
            Rule::Bland => PivotRule::Bland,
        }
    }
}

fn level_for(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn read_source(path: &Path) -> std::io::Result<String> {
    if path.as_os_str() == "-" {
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source)?;
        Ok(source)
    } else {
        std::fs::read_to_string(path)
    }
}

/// A step and its substeps, indented by nesting depth.
fn render_step(step: &ConversionStep, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    out.push_str(&format!("{}[{}] {}\n", indent, step.step_name, step.what));
    for line in step.how.lines() {
        out.push_str(&format!("{}  {}\n", indent, line));
    }
    for substep in &step.substeps {
        render_step(substep, depth + 1, out);
    }
}

fn render_steps(steps: &[ConversionStep]) -> String {
    let mut out = String::new();
    for step in steps {
        render_step(step, 0, &mut out);
        out.push('\n');
    }
    out
}

/// Human-readable form of the state a command ended in.
fn render_state(state: &State) -> String {
    match state {
        State::Program(p) | State::StdProgram(p) => format_program(p),
        State::Solution(s) => format_solution(s),
        State::Unbounded(e) => format!(
            "Unbounded: {} can grow without limit\n{}",
            e.entering_var,
            format_tableau(&e.tableau)
        ),
        other => other.tableau().map(format_tableau).unwrap_or_default(),
    }
}

fn fail(context: &str, error: impl std::fmt::Display) -> ! {
    eprintln!("{}: {}", context, error);
    std::process::exit(1);
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => fail("Serialization error", e),
    }
}

/// Drive the program in `file` to `target` and print the outcome.
fn run_to(file: &Path, target: StateKind, converter: &Converter, format: Format, show_steps: bool) {
    let source = read_source(file).unwrap_or_else(|e| fail("Error reading input", e));
    let steps =
        steps_to(converter, &source, target).unwrap_or_else(|e| fail("Error", e));
    info!(steps = steps.len(), target = %target, "conversion finished");

    match format {
        Format::Json => print_json(&steps),
        Format::Pretty => {
            if show_steps {
                print!("{}", render_steps(&steps));
            }
            if let Some(last) = steps.last() {
                println!("{}", render_state(&last.result));
            }
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level_for(cli.verbose))
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        fail("Failed to set tracing subscriber", e);
    }

    match cli.command {
        Commands::Parse { file } => {
            let source = read_source(&file).unwrap_or_else(|e| fail("Error reading input", e));
            match lpstep_lang::Parser::parse(&source) {
                Ok(program) => match cli.format {
                    Format::Json => print_json(&program),
                    Format::Pretty => println!("{}", format_program(&program)),
                },
                Err(e) => fail("Parse error", e),
            }
        }
        Commands::Check { file } => {
            let source = read_source(&file).unwrap_or_else(|e| fail("Error reading input", e));
            match lpstep_lang::Parser::parse(&source) {
                Ok(program) => println!(
                    "OK: {} constraints, {} variables",
                    program.constraints.len(),
                    program.variables.len()
                ),
                Err(e) => fail("Parse error", e),
            }
        }
        Commands::Standardize { file } => {
            run_to(&file, StateKind::StdProgram, &Converter::new(), cli.format, true);
        }
        Commands::Tableau { file } => {
            run_to(&file, StateKind::UnknownTableau, &Converter::new(), cli.format, false);
        }
        Commands::Solve {
            file,
            steps,
            max_steps,
            pivot_rule,
        } => {
            let converter = Converter::new()
                .with_max_steps(max_steps)
                .with_pivot_rule(pivot_rule.into());
            run_to(&file, StateKind::Solution, &converter, cli.format, steps);
        }
    }
}
