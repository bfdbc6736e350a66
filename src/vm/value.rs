use crate::bytecode::Literal;

use super::Fault;

/// 2^53: past this not every integer is representable, and casting through
/// `i64` can saturate.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// What lives on an operand stack or in a local.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    /// Only numeric zero is false.
    pub fn is_false(&self) -> bool {
        matches!(self, Value::Number(n) if *n == 0.0)
    }

    pub(crate) fn as_number(&self, op: &'static str) -> Result<f64, Fault> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::Text(_) => Err(Fault::TypeMismatch { op, found: "text" }),
        }
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Integer(n) => Value::Number(*n as f64),
            Literal::Text(s) => Value::Text(s.clone()),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() <= MAX_EXACT_INTEGER {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}
