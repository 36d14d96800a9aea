//! Expression tree: a recursive value distinct
//! from the plan tree, used to re-parse a plan node's opaque condition/item
//! strings on demand and infer their types.

mod parser;

pub use parser::parse_expression;

use crate::function_registry::FunctionCategory;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Integer,
    BigInt,
    Decimal,
    Float,
    Double,
    Varchar,
    Char,
    Text,
    Date,
    Time,
    Timestamp,
    Boolean,
    Blob,
    Clob,
}

impl DataType {
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            DataType::Integer
                | DataType::BigInt
                | DataType::Decimal
                | DataType::Float
                | DataType::Double
        )
    }

    pub fn is_string(self) -> bool {
        matches!(self, DataType::Varchar | DataType::Char | DataType::Text)
    }
}

/// A column visible to an expression being parsed, with its schema-resolved
/// type (or `VARCHAR` when the type is unknown).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub name: String,
    pub data_type: DataType,
}

impl ColumnRef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        ColumnRef {
            table: None,
            name: name.into(),
            data_type,
        }
    }

    pub fn qualified(table: impl Into<String>, name: impl Into<String>, data_type: DataType) -> Self {
        ColumnRef {
            table: Some(table.into()),
            name: name.into(),
            data_type,
        }
    }

    fn matches(&self, text: &str) -> bool {
        if let Some((table, column)) = text.split_once('.') {
            self.table.as_deref().is_some_and(|t| t.eq_ignore_ascii_case(table))
                && self.name.eq_ignore_ascii_case(column)
        } else {
            self.name.eq_ignore_ascii_case(text)
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal {
        text: String,
        data_type: DataType,
    },
    Column {
        name: String,
        data_type: DataType,
    },
    Operator {
        op: String,
        left: Box<Expression>,
        right: Box<Expression>,
        data_type: DataType,
    },
    Function {
        name: String,
        args: Vec<Expression>,
        category: FunctionCategory,
        data_type: DataType,
    },
}

impl Expression {
    pub fn data_type(&self) -> DataType {
        match self {
            Expression::Literal { data_type, .. }
            | Expression::Column { data_type, .. }
            | Expression::Operator { data_type, .. }
            | Expression::Function { data_type, .. } => *data_type,
        }
    }

    fn is_wildcard(&self) -> bool {
        matches!(self, Expression::Column { name, .. } if name == "*")
    }

    /// Recursively validates children, then applies per-operator and
    /// per-function-category argument constraints. Never panics;
    /// returns the empty vec when the subtree is well-typed.
    pub fn validate_types(&self) -> Vec<String> {
        match self {
            Expression::Literal { .. } | Expression::Column { .. } => Vec::new(),
            Expression::Operator { op, left, right, .. } => {
                let mut errors = left.validate_types();
                errors.extend(right.validate_types());
                if is_arithmetic_op(op) {
                    let lt = left.data_type();
                    let rt = right.data_type();
                    let ok = (lt.is_numeric() && rt.is_numeric())
                        || (op == "+" && lt.is_string() && rt.is_string());
                    if !ok {
                        errors.push(format!(
                            "incompatible operand types for operator '{op}'"
                        ));
                    }
                }
                errors
            }
            Expression::Function { name, args, category, .. } => {
                let mut errors: Vec<String> = args.iter().flat_map(Expression::validate_types).collect();
                for arg in args {
                    if arg.is_wildcard() {
                        continue;
                    }
                    match category {
                        FunctionCategory::String => {
                            if !arg.data_type().is_string() {
                                errors.push(format!(
                                    "function '{name}' expects a string argument"
                                ));
                            }
                        }
                        FunctionCategory::Numeric => {
                            if !arg.data_type().is_numeric() {
                                errors.push(format!(
                                    "function '{name}' expects a numeric argument"
                                ));
                            }
                        }
                        FunctionCategory::Aggregate | FunctionCategory::Date | FunctionCategory::Conditional | FunctionCategory::Unknown => {}
                    }
                }
                errors
            }
        }
    }
}

fn is_comparison_op(op: &str) -> bool {
    matches!(op, "=" | "!=" | "<>" | "<" | ">" | "<=" | ">=") || op.eq_ignore_ascii_case("LIKE")
}

fn is_logical_op(op: &str) -> bool {
    op.eq_ignore_ascii_case("AND") || op.eq_ignore_ascii_case("OR")
}

fn is_arithmetic_op(op: &str) -> bool {
    matches!(op, "+" | "-" | "*" | "/" | "%")
}
