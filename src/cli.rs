//! Command-line arguments and the evaluation loop shared by the demo,
//! one-shot and REPL modes.

use crate::{
    expr::{Expression, OverflowPolicy},
    jit_ctx::JITContext,
    parser, Error,
};
use clap::{ArgAction, Parser};
use std::io::{BufRead, Write};
use tracing::info;

pub const DEMO_EXPRESSIONS: [&str; 2] = ["5 + 3 - 2", "10 - 4 + 2"];

/// Evaluates `+`/`-` integer expressions strictly left to right.
///
/// Without arguments, evaluates a couple of demo expressions.
#[derive(Debug, Parser)]
#[command(name = "simplecalc", version)]
pub struct Cli {
    /// Expressions to evaluate, e.g. "5 + 3 - 2" (put `--` before one starting with `-`)
    #[arg(value_name = "EXPR", conflicts_with = "repl")]
    pub expressions: Vec<String>,

    /// Read expressions interactively until `quit` or `exit`
    #[arg(long)]
    pub repl: bool,

    /// Behavior when a result does not fit in 64 bits
    #[arg(long, value_enum, default_value_t = OverflowPolicy::Checked)]
    pub overflow: OverflowPolicy,

    /// Compile each expression to native code (always wraps on overflow)
    #[arg(long, conflicts_with = "overflow")]
    pub jit: bool,

    /// Also print the number of literals, operators and the tree depth
    #[arg(long)]
    pub tree: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

pub enum Evaluator {
    Interpreter(OverflowPolicy),
    Jit(JITContext),
}

impl Evaluator {
    pub fn from_cli(cli: &Cli) -> Result<Self, Error> {
        if cli.jit {
            Ok(Self::Jit(JITContext::new()?))
        } else {
            Ok(Self::Interpreter(cli.overflow))
        }
    }

    pub fn evaluate(&mut self, expr: &Expression) -> Result<i64, Error> {
        match self {
            Self::Interpreter(policy) => Ok(expr.evaluate_with(*policy)?),
            Self::Jit(jit) => Ok(jit.evaluate(expr)?),
        }
    }
}

fn write_tree(out: &mut impl Write, expr: &Expression) -> Result<(), Error> {
    writeln!(
        out,
        "Tree: {} literals, {} operators, depth {}",
        expr.leaf_count(),
        expr.operator_count(),
        expr.depth()
    )?;
    Ok(())
}

/// Prints each demo expression followed by its result.
pub fn run_demo(evaluator: &mut Evaluator, tree: bool, out: &mut impl Write) -> Result<(), Error> {
    for (i, source) in DEMO_EXPRESSIONS.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        writeln!(out, "Expression: {source}")?;
        let expr = parser::parse(source)?;
        if tree {
            write_tree(out, &expr)?;
        }
        writeln!(out, "Result: {}", evaluator.evaluate(&expr)?)?;
    }
    Ok(())
}

/// Evaluates one line of input and prints `<expr> = <value>`.
pub fn run_line(
    evaluator: &mut Evaluator,
    source: &str,
    tree: bool,
    out: &mut impl Write,
) -> Result<i64, Error> {
    let expr = parser::parse(source)?;
    let value = evaluator.evaluate(&expr)?;
    if tree {
        write_tree(out, &expr)?;
    }
    writeln!(out, "{expr} = {value}")?;
    Ok(value)
}

/// Evaluates every argument, stopping at the first failure.
pub fn run_expressions(
    evaluator: &mut Evaluator,
    sources: &[String],
    tree: bool,
    out: &mut impl Write,
) -> Result<(), Error> {
    for source in sources {
        run_line(evaluator, source, tree, out)?;
    }
    Ok(())
}

/// Reads lines from `input` until EOF, `quit` or `exit`.
///
/// Errors in a single line are reported to `err` and do not end the session.
pub fn run_repl(
    evaluator: &mut Evaluator,
    tree: bool,
    input: &mut impl BufRead,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<(), Error> {
    writeln!(out, "If you want to quit, please enter `quit` or `exit`.")?;
    loop {
        let mut buffer = String::new();

        write!(out, "> ")?;
        out.flush()?;
        if input.read_line(&mut buffer)? == 0 {
            break;
        }

        if ["quit", "exit"].contains(&buffer.trim()) {
            break;
        }
        if buffer.trim().is_empty() {
            continue;
        }

        if let Err(e) = run_line(evaluator, &buffer, tree, out) {
            writeln!(err, "{e}")?;
        }
    }
    info!("leaving REPL");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn demo_output_test() {
        let mut out = Vec::new();
        let mut evaluator = Evaluator::Interpreter(OverflowPolicy::Checked);
        run_demo(&mut evaluator, false, &mut out).unwrap();

        let expected = "Expression: 5 + 3 - 2\nResult: 6\n\nExpression: 10 - 4 + 2\nResult: 8\n";
        let got = output(out);
        assert_eq!(got, expected, "expected {expected:?}, but got {got:?}");
    }

    #[test]
    fn demo_with_tree_test() {
        let mut out = Vec::new();
        let mut evaluator = Evaluator::Interpreter(OverflowPolicy::Checked);
        run_demo(&mut evaluator, true, &mut out).unwrap();
        assert!(output(out).contains("Tree: 3 literals, 2 operators, depth 3\nResult: 6\n"));
    }

    #[test]
    fn run_line_test() {
        let mut out = Vec::new();
        let mut evaluator = Evaluator::Interpreter(OverflowPolicy::Checked);
        let value = run_line(&mut evaluator, "  1 - 2 - 3\n", false, &mut out).unwrap();
        assert_eq!(value, -4);
        assert_eq!(output(out), "1 - 2 - 3 = -4\n");
    }

    #[test]
    fn run_expressions_stops_at_error_test() {
        let mut out = Vec::new();
        let mut evaluator = Evaluator::Interpreter(OverflowPolicy::Checked);
        let sources = vec!["1 + 1".to_owned(), "2 +".to_owned(), "3 + 3".to_owned()];
        let result = run_expressions(&mut evaluator, &sources, false, &mut out);
        assert!(matches!(result, Err(Error::Parse(_))));
        assert_eq!(output(out), "1 + 1 = 2\n");
    }

    #[test]
    fn repl_test() {
        let mut input = "5 + 3 - 2\n\n5 +\n10 - 4 + 2\nquit\n7\n".as_bytes();
        let mut out = Vec::new();
        let mut err = Vec::new();
        let mut evaluator = Evaluator::Interpreter(OverflowPolicy::Checked);
        run_repl(&mut evaluator, false, &mut input, &mut out, &mut err).unwrap();

        let out = output(out);
        assert!(out.contains("5 + 3 - 2 = 6\n"), "{out}");
        assert!(out.contains("10 - 4 + 2 = 8\n"), "{out}");
        assert!(!out.contains("7 = 7"), "{out}");
        assert_eq!(
            output(err),
            "Syntax error: operator `+` at offset 2 has no right operand\n"
        );
    }

    #[test]
    fn repl_ends_at_eof_test() {
        let mut input = "1 + 1".as_bytes();
        let mut out = Vec::new();
        let mut err = Vec::new();
        let mut evaluator = Evaluator::Interpreter(OverflowPolicy::Checked);
        run_repl(&mut evaluator, false, &mut input, &mut out, &mut err).unwrap();
        assert!(output(out).contains("1 + 1 = 2\n"));
        assert!(err.is_empty());
    }

    #[test]
    fn jit_evaluator_test() {
        let cli = Cli::try_parse_from(["simplecalc", "--jit", "1 + 2"]).unwrap();
        let mut evaluator = Evaluator::from_cli(&cli).unwrap();
        assert!(matches!(evaluator, Evaluator::Jit(_)));

        let mut out = Vec::new();
        run_expressions(&mut evaluator, &cli.expressions, false, &mut out).unwrap();
        assert_eq!(output(out), "1 + 2 = 3\n");
    }
}
