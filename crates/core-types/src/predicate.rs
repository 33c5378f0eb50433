use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Comparison operator for a single predicate leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CmpOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "<>",
            CmpOp::Gt => ">",
            CmpOp::Gte => ">=",
            CmpOp::Lt => "<",
            CmpOp::Lte => "<=",
        }
    }
}

/// A database-agnostic condition tree over entity fields.
///
/// `And([])` and `All` both match every entity. `Or([])` matches *nothing*:
/// a disjunction over zero clauses has no satisfying row. The translator
/// relies on that distinction when a text search resolves to zero fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// Matches every entity (the empty predicate).
    All,
    /// Compares a field against a scalar value.
    Cmp(String, CmpOp, Value),
    /// Substring containment against a text field.
    Like(String, String),
    /// Field value is one of the listed values.
    In(String, Vec<Value>),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Cmp(field.into(), CmpOp::Eq, value.into())
    }

    pub fn like(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Predicate::Like(field.into(), needle.into())
    }

    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Predicate::In(field.into(), values)
    }

    /// True if this predicate places no restriction on the result set.
    pub fn is_unrestricted(&self) -> bool {
        match self {
            Predicate::All => true,
            Predicate::And(clauses) => clauses.iter().all(Predicate::is_unrestricted),
            _ => false,
        }
    }
}

impl Default for Predicate {
    fn default() -> Self {
        Predicate::All
    }
}
