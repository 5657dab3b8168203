use crate::Value;
use std::fmt::{self, Display};

/// Token expanded into one placeholder per bound value, for `IN (,,,,)` lists.
pub const EXPAND_PLACEHOLDERS: &str = ",,,,";

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    #[default]
    And,
    Or,
}

impl Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operator::And => "AND",
            Operator::Or => "OR",
        })
    }
}

/// A filter or assignment fragment together with its positional parameters.
///
/// `operator` joins the clause to the previous sibling, the first clause ignores it.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub operator: Operator,
    pub template: String,
    pub values: Vec<Value>,
}

impl Clause {
    pub fn new(operator: Operator, template: &str, values: Vec<Value>) -> Self {
        let template = if template.contains(EXPAND_PLACEHOLDERS) {
            let placeholders = vec!["?"; values.len()].join(", ");
            template.replace(EXPAND_PLACEHOLDERS, &placeholders)
        } else {
            template.to_owned()
        };
        Self {
            operator,
            template,
            values,
        }
    }
}

/// Row lock appended to a select.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    #[default]
    None,
    ForUpdate,
    Shared,
}

/// Statement shapes the writer composes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Insert,
    Select,
    Update,
    Delete,
    Count,
    BatchInsert,
    BatchUpdate,
    CreateTable,
}

impl Method {
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Method::Select | Method::Count)
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Insert => "INSERT",
            Method::Select => "SELECT",
            Method::Update => "UPDATE",
            Method::Delete => "DELETE",
            Method::Count => "COUNT",
            Method::BatchInsert => "batch INSERT",
            Method::BatchUpdate => "batch UPDATE",
            Method::CreateTable => "CREATE TABLE",
        })
    }
}

/// Dynamic parts of a statement set through the builder.
#[derive(Default, Debug, Clone)]
pub struct Clauses {
    pub filters: Vec<Clause>,
    pub group_by: Option<String>,
    pub having: Option<String>,
    pub order_by: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub lock: LockMode,
}
