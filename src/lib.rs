//! Interpreter for integer arithmetic with `+` and `-`, evaluated strictly
//! left to right.
//!
//! ```
//! let expr = simplecalc::parser::parse("10 - 4 + 2").unwrap();
//! assert_eq!(expr.to_string(), "10 - 4 + 2");
//! assert_eq!(expr.evaluate(), Ok(8));
//! ```

pub mod cli;
pub mod codegen;
pub mod expr;
pub mod jit_ctx;
pub mod parser;

use expr::{EvalError, OverflowPolicy};
use jit_ctx::JitError;
use parser::ParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Jit(#[from] JitError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parses `source` and evaluates it under `policy`.
pub fn parse_and_evaluate(source: &str, policy: OverflowPolicy) -> Result<i64, Error> {
    let expr = parser::parse(source)?;
    Ok(expr.evaluate_with(policy)?)
}
