use std::fmt;

/// Type tag for a column or cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// 64-bit signed integer.
    Int,
    /// 64-bit float.
    Real,
    /// Nominal (string) value drawn from a column's value space.
    Str,
}

/// A typed scalar cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Real(f64),
    Str(String),
}

impl Value {
    /// Return the type tag of this cell.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Real(_) => ValueKind::Real,
            Value::Str(_) => ValueKind::Str,
        }
    }

    /// Numeric view of the cell. `None` for nominal cells.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Real(v) => Some(*v),
            Value::Str(_) => None,
        }
    }

    /// String view of the cell. `None` for numeric cells.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Build a numeric cell of the given kind from an `f64`.
    ///
    /// Integer cells round to the nearest integer; requesting a `Str`
    /// cell returns `None` (there is no meaningful conversion).
    #[must_use]
    pub fn from_f64(kind: ValueKind, v: f64) -> Option<Value> {
        match kind {
            ValueKind::Int => Some(Value::Int(v.round() as i64)),
            ValueKind::Real => Some(Value::Real(v)),
            ValueKind::Str => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Real(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v}"),
        }
    }
}

/// The criterion stored in a split node and applied when partitioning.
///
/// Continuous attributes split on a numeric threshold; nominal attributes
/// split on membership in one block of a two-block partition of the
/// column's value space.
#[derive(Debug, Clone, PartialEq)]
pub enum SplitValue {
    /// Rows with `value <= threshold` match (go left).
    Threshold(f64),
    /// Rows whose value is in the subset match (go left).
    Subset(Vec<String>),
}

impl SplitValue {
    /// Whether a cell satisfies this split criterion.
    #[must_use]
    pub fn matches(&self, cell: &Value) -> bool {
        match self {
            SplitValue::Threshold(t) => cell.as_f64().is_some_and(|v| v <= *t),
            SplitValue::Subset(block) => {
                cell.as_str().is_some_and(|v| block.iter().any(|b| b == v))
            }
        }
    }
}
