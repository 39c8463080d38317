use std::fmt::{self, Display, Formatter};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Hash, Eq)]
pub struct Number(i64);

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number(value)
    }
}

impl From<Number> for i64 {
    fn from(value: Number) -> Self {
        value.0
    }
}

impl From<&Number> for i64 {
    fn from(value: &Number) -> Self {
        (*value).into()
    }
}

impl Display for Number {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Sub,
}

impl Operator {
    pub fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// What to do when an intermediate result leaves the `i64` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OverflowPolicy {
    /// Stop with [`EvalError::ArithmeticOverflow`].
    #[default]
    Checked,
    /// Two's complement wrap-around, the same as compiled code.
    Wrapping,
    /// Clamp to `i64::MIN` / `i64::MAX`.
    Saturating,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("Overflow error: `{lhs} {op} {rhs}` does not fit in a 64-bit integer")]
    ArithmeticOverflow { op: Operator, lhs: i64, rhs: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Number(Number),
    Add(Box<Expression>, Box<Expression>),
    Sub(Box<Expression>, Box<Expression>),
}

impl Expression {
    pub fn number(n: i64) -> Self {
        Self::Number(n.into())
    }

    pub fn add(lhs: Expression, rhs: Expression) -> Self {
        Self::Add(Box::new(lhs), Box::new(rhs))
    }

    pub fn sub(lhs: Expression, rhs: Expression) -> Self {
        Self::Sub(Box::new(lhs), Box::new(rhs))
    }

    /// Wraps `lhs` and `rhs` in the node for `op`.
    pub fn binary(op: Operator, lhs: Expression, rhs: Expression) -> Self {
        match op {
            Operator::Add => Self::add(lhs, rhs),
            Operator::Sub => Self::sub(lhs, rhs),
        }
    }

    /// Evaluates the tree with checked arithmetic.
    pub fn evaluate(&self) -> Result<i64, EvalError> {
        self.evaluate_with(OverflowPolicy::Checked)
    }

    pub fn evaluate_with(&self, policy: OverflowPolicy) -> Result<i64, EvalError> {
        match self {
            Expression::Number(num) => Ok(num.into()),
            Expression::Add(lhs, rhs) => {
                let lhs = lhs.evaluate_with(policy)?;
                let rhs = rhs.evaluate_with(policy)?;
                apply(Operator::Add, lhs, rhs, policy)
            }
            Expression::Sub(lhs, rhs) => {
                let lhs = lhs.evaluate_with(policy)?;
                let rhs = rhs.evaluate_with(policy)?;
                apply(Operator::Sub, lhs, rhs, policy)
            }
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            Expression::Number(_) => 1,
            Expression::Add(lhs, rhs) | Expression::Sub(lhs, rhs) => {
                lhs.leaf_count() + rhs.leaf_count()
            }
        }
    }

    pub fn operator_count(&self) -> usize {
        match self {
            Expression::Number(_) => 0,
            Expression::Add(lhs, rhs) | Expression::Sub(lhs, rhs) => {
                1 + lhs.operator_count() + rhs.operator_count()
            }
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Expression::Number(_) => 1,
            Expression::Add(lhs, rhs) | Expression::Sub(lhs, rhs) => {
                1 + lhs.depth().max(rhs.depth())
            }
        }
    }
}

fn apply(op: Operator, lhs: i64, rhs: i64, policy: OverflowPolicy) -> Result<i64, EvalError> {
    let checked = match op {
        Operator::Add => lhs.checked_add(rhs),
        Operator::Sub => lhs.checked_sub(rhs),
    };
    if let Some(value) = checked {
        return Ok(value);
    }

    match policy {
        OverflowPolicy::Checked => Err(EvalError::ArithmeticOverflow { op, lhs, rhs }),
        OverflowPolicy::Wrapping => {
            warn!("`{lhs} {op} {rhs}` overflowed, wrapping");
            Ok(match op {
                Operator::Add => lhs.wrapping_add(rhs),
                Operator::Sub => lhs.wrapping_sub(rhs),
            })
        }
        OverflowPolicy::Saturating => {
            warn!("`{lhs} {op} {rhs}` overflowed, saturating");
            Ok(match op {
                Operator::Add => lhs.saturating_add(rhs),
                Operator::Sub => lhs.saturating_sub(rhs),
            })
        }
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let (op, lhs, rhs) = match self {
            Expression::Number(num) => return write!(f, "{num}"),
            Expression::Add(lhs, rhs) => (Operator::Add, lhs, rhs),
            Expression::Sub(lhs, rhs) => (Operator::Sub, lhs, rhs),
        };
        // Left operands never need grouping since every operator is left-associative.
        match rhs.as_ref() {
            Expression::Number(_) => write!(f, "{lhs} {op} {rhs}"),
            _ => write!(f, "{lhs} {op} ({rhs})"),
        }
    }
}
