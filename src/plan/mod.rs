//! Plan node model: the relational-algebra operator tree. A
//! closed tagged-sum over {TableScan, Projection, Selection, Join,
//! Aggregation, Sort, Subquery}, each exposing SQL, tree-string, and
//! parenthetical serializers.

pub mod parenthetical;
pub mod sql_parser;

use std::fmt;

use crate::error::{CrateError, CrateResult};
use crate::function_registry::FunctionCategory;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinKind {
    pub fn sql_word(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER",
            JoinKind::Left => "LEFT",
            JoinKind::Right => "RIGHT",
            JoinKind::Full => "FULL",
            JoinKind::Cross => "CROSS",
        }
    }

    pub fn opname(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER_JOIN",
            JoinKind::Left => "LEFT_JOIN",
            JoinKind::Right => "RIGHT_JOIN",
            JoinKind::Full => "FULL_JOIN",
            JoinKind::Cross => "CROSS_JOIN",
        }
    }

    pub fn from_sql_word(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "INNER" => Some(JoinKind::Inner),
            "LEFT" => Some(JoinKind::Left),
            "RIGHT" => Some(JoinKind::Right),
            "FULL" => Some(JoinKind::Full),
            "CROSS" => Some(JoinKind::Cross),
            _ => None,
        }
    }

    pub fn from_opname(name: &str) -> Option<Self> {
        match name {
            "INNER_JOIN" => Some(JoinKind::Inner),
            "LEFT_JOIN" => Some(JoinKind::Left),
            "RIGHT_JOIN" => Some(JoinKind::Right),
            "FULL_JOIN" => Some(JoinKind::Full),
            "CROSS_JOIN" => Some(JoinKind::Cross),
            _ => None,
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubqueryKind {
    From,
    Exists,
    In,
    NotIn,
    Scalar,
    SelectScalar,
}

impl SubqueryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SubqueryKind::From => "FROM",
            SubqueryKind::Exists => "EXISTS",
            SubqueryKind::In => "IN",
            SubqueryKind::NotIn => "NOT_IN",
            SubqueryKind::Scalar => "SCALAR",
            SubqueryKind::SelectScalar => "SELECT_SCALAR",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "FROM" => Some(SubqueryKind::From),
            "EXISTS" => Some(SubqueryKind::Exists),
            "IN" => Some(SubqueryKind::In),
            "NOT_IN" => Some(SubqueryKind::NotIn),
            "SCALAR" => Some(SubqueryKind::Scalar),
            "SELECT_SCALAR" => Some(SubqueryKind::SelectScalar),
            _ => None,
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
    Unspecified,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub column: String,
    pub direction: Direction,
}

impl OrderItem {
    pub fn new(column: impl Into<String>, direction: Direction) -> Self {
        OrderItem {
            column: column.into(),
            direction,
        }
    }

    fn render(&self) -> String {
        match self.direction {
            Direction::Asc => format!("{} ASC", self.column),
            Direction::Desc => format!("{} DESC", self.column),
            Direction::Unspecified => self.column.clone(),
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<String>,
    pub category: FunctionCategory,
    pub source_text: String,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, args: Vec<String>, source_text: impl Into<String>) -> Self {
        let name = name.into().to_ascii_uppercase();
        let category = crate::function_registry::category_of(&name);
        FunctionCall {
            name,
            args,
            category,
            source_text: source_text.into(),
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expression: String,
    pub alias: Option<String>,
    pub parsed_functions: Vec<FunctionCall>,
}

impl SelectItem {
    pub fn new(expression: impl Into<String>, alias: Option<String>) -> Self {
        let expression = expression.into();
        let parsed_functions = extract_function_calls(&expression);
        SelectItem {
            expression,
            alias,
            parsed_functions,
        }
    }

    pub fn effective_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.expression)
    }

    fn render(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{} AS {}", self.expression, alias),
            None => self.expression.clone(),
        }
    }
}

/// Scans `text` for `IDENT(...)` call shapes and extracts a [`FunctionCall`]
/// for each, deepest-first, using a balanced-parenthesis scan (not a regex
/// over the original string) so that duplicate substrings never produce the
/// `indexOf`-style overlap ambiguity flagged in the design notes.
pub fn extract_function_calls(text: &str) -> Vec<FunctionCall> {
    let tokens = crate::lexer::tokenize(Some(text));
    let mut calls = Vec::new();
    collect_calls(&tokens, &mut calls);
    calls
}

fn collect_calls(tokens: &[crate::lexer::Token], out: &mut Vec<FunctionCall>) {
    use crate::lexer::token::TokenKind;
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i].kind == TokenKind::Identifier
            && i + 1 < tokens.len()
            && tokens[i + 1].is_delimiter()
            && tokens[i + 1].text == "("
        {
            let mut depth = 0i32;
            let mut end = None;
            for (off, t) in tokens[i + 1..].iter().enumerate() {
                if t.is_delimiter() && t.text == "(" {
                    depth += 1;
                } else if t.is_delimiter() && t.text == ")" {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(i + 1 + off);
                        break;
                    }
                }
            }
            if let Some(end) = end {
                let inner = &tokens[i + 2..end];
                collect_calls(inner, out);
                let args = split_args(inner);
                let source_text: String = tokens[i..=end].iter().map(|t| t.text.as_str()).collect();
                out.push(FunctionCall::new(tokens[i].text.clone(), args, source_text));
                i = end + 1;
                continue;
            }
        }
        i += 1;
    }
}

fn split_args(tokens: &[crate::lexer::Token]) -> Vec<String> {
    if tokens.is_empty() {
        return Vec::new();
    }
    let mut args = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for t in tokens {
        if t.is_delimiter() && t.text == "(" {
            depth += 1;
            current.push_str(&t.text);
        } else if t.is_delimiter() && t.text == ")" {
            depth -= 1;
            current.push_str(&t.text);
        } else if t.is_delimiter() && t.text == "," && depth == 0 {
            args.push(current.trim().to_string());
            current.clear();
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&t.text);
        }
    }
    args.push(current.trim().to_string());
    args
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    TableScan {
        table_name: String,
        alias: Option<String>,
    },
    Projection {
        items: Vec<SelectItem>,
        distinct: bool,
        child: Box<Plan>,
    },
    Selection {
        condition: String,
        child: Box<Plan>,
    },
    Join {
        kind: JoinKind,
        condition: Option<String>,
        left: Box<Plan>,
        right: Box<Plan>,
    },
    Aggregation {
        group_by: Vec<String>,
        aggregates: Vec<String>,
        having: Option<String>,
        child: Box<Plan>,
    },
    Sort {
        order_items: Vec<OrderItem>,
        child: Box<Plan>,
    },
    Subquery {
        kind: SubqueryKind,
        alias: Option<String>,
        child: Box<Plan>,
    },
}

fn has_whitespace(s: &str) -> bool {
    s.chars().any(|c| c.is_whitespace())
}

impl Plan {
    pub fn table_scan(table_name: impl Into<String>, alias: Option<String>) -> CrateResult<Plan> {
        let table_name = table_name.into();
        if table_name.is_empty() {
            return Err(CrateError::argument("table name must not be empty"));
        }
        if has_whitespace(&table_name) {
            return Err(CrateError::argument(format!(
                "table name '{table_name}' must not contain whitespace"
            )));
        }
        if let Some(alias) = &alias {
            if has_whitespace(alias) {
                return Err(CrateError::argument(format!(
                    "alias '{alias}' must not contain whitespace"
                )));
            }
        }
        Ok(Plan::TableScan { table_name, alias })
    }

    pub fn projection(items: Vec<SelectItem>, distinct: bool, child: Plan) -> CrateResult<Plan> {
        if items.is_empty() {
            return Err(CrateError::argument("projection must have at least one item"));
        }
        let wildcard_count = items.iter().filter(|i| i.expression == "*").count();
        if wildcard_count > 0 && items.len() > 1 {
            return Err(CrateError::argument("'*' may appear only as the sole projection item"));
        }
        Ok(Plan::Projection {
            items,
            distinct,
            child: Box::new(child),
        })
    }

    pub fn selection(condition: impl Into<String>, child: Plan) -> CrateResult<Plan> {
        let condition = condition.into();
        if condition.is_empty() {
            return Err(CrateError::argument("selection condition must not be empty"));
        }
        Ok(Plan::Selection {
            condition,
            child: Box::new(child),
        })
    }

    pub fn join(kind: JoinKind, condition: Option<String>, left: Plan, right: Plan) -> CrateResult<Plan> {
        let is_cross = kind == JoinKind::Cross;
        if is_cross && condition.is_some() {
            return Err(CrateError::argument("CROSS join must not carry a condition"));
        }
        if !is_cross && condition.is_none() {
            return Err(CrateError::argument(format!(
                "{} join requires a condition",
                kind.sql_word()
            )));
        }
        Ok(Plan::Join {
            kind,
            condition,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn aggregation(
        group_by: Vec<String>,
        aggregates: Vec<String>,
        having: Option<String>,
        child: Plan,
    ) -> CrateResult<Plan> {
        if group_by.is_empty() && aggregates.is_empty() {
            return Err(CrateError::argument(
                "aggregation requires at least one of group_by or aggregates",
            ));
        }
        Ok(Plan::Aggregation {
            group_by,
            aggregates,
            having,
            child: Box::new(child),
        })
    }

    pub fn sort(order_items: Vec<OrderItem>, child: Plan) -> CrateResult<Plan> {
        if order_items.is_empty() {
            return Err(CrateError::argument("sort requires at least one order item"));
        }
        Ok(Plan::Sort {
            order_items,
            child: Box::new(child),
        })
    }

    pub fn subquery(kind: SubqueryKind, alias: Option<String>, child: Plan) -> Plan {
        Plan::Subquery {
            kind,
            alias,
            child: Box::new(child),
        }
    }

    pub fn opname(&self) -> &'static str {
        match self {
            Plan::TableScan { .. } => "TABLE_SCAN",
            Plan::Projection { .. } => "PROJECTION",
            Plan::Selection { .. } => "SELECTION",
            Plan::Join { kind, .. } => kind.opname(),
            Plan::Aggregation { .. } => "AGGREGATION",
            Plan::Sort { .. } => "SORT",
            Plan::Subquery { .. } => "SUBQUERY",
        }
    }

    pub fn children(&self) -> Vec<&Plan> {
        match self {
            Plan::TableScan { .. } => Vec::new(),
            Plan::Projection { child, .. }
            | Plan::Selection { child, .. }
            | Plan::Aggregation { child, .. }
            | Plan::Sort { child, .. }
            | Plan::Subquery { child, .. } => vec![child.as_ref()],
            Plan::Join { left, right, .. } => vec![left.as_ref(), right.as_ref()],
        }
    }

    pub fn arity(&self) -> usize {
        self.children().len()
    }

    /// Scalar (non-child) parameters, in the order the parenthetical
    /// convention below specifies.
    fn own_params(&self) -> Vec<String> {
        match self {
            Plan::TableScan { table_name, alias } => vec![match alias {
                Some(alias) => format!("{table_name} AS {alias}"),
                None => table_name.clone(),
            }],
            Plan::Projection { items, distinct, .. } => {
                let mut params = Vec::new();
                if *distinct {
                    params.push("DISTINCT".to_string());
                }
                params.extend(items.iter().map(SelectItem::render));
                params
            }
            Plan::Selection { condition, .. } => vec![condition.clone()],
            Plan::Join { kind, condition, .. } => {
                if *kind == JoinKind::Cross {
                    Vec::new()
                } else {
                    vec![condition.clone().unwrap_or_default()]
                }
            }
            Plan::Aggregation {
                group_by,
                aggregates,
                having,
                ..
            } => {
                let mut params = Vec::new();
                if !group_by.is_empty() {
                    params.push(format!("GROUP_BY:{}", group_by.join(",")));
                }
                if !aggregates.is_empty() {
                    params.push(format!("AGG:{}", aggregates.join(",")));
                }
                if let Some(having) = having {
                    params.push(format!("HAVING:{having}"));
                }
                params
            }
            Plan::Sort { order_items, .. } => order_items.iter().map(OrderItem::render).collect(),
            Plan::Subquery { kind, alias, .. } => {
                let mut params = vec![format!("TYPE:{}", kind.as_str())];
                if let Some(alias) = alias {
                    params.push(format!("ALIAS:{alias}"));
                }
                params
            }
        }
    }

    pub fn to_parenthetical(&self) -> String {
        let mut parts = self.own_params();
        parts.extend(self.children().iter().map(|c| c.to_parenthetical()));
        format!("{}({})", self.opname(), parts.join(", "))
    }

    pub fn to_tree_string(&self) -> String {
        let mut buf = String::new();
        self.write_tree_string(&mut buf, 0);
        buf
    }

    fn write_tree_string(&self, buf: &mut String, level: usize) {
        let indent = "  ".repeat(level);
        buf.push_str(&indent);
        buf.push_str(self.opname());
        buf.push('(');
        buf.push_str(&self.own_params().join(", "));
        buf.push(')');
        buf.push('\n');
        for child in self.children() {
            child.write_tree_string(buf, level + 1);
        }
    }

    pub fn to_sql(&self) -> String {
        match self {
            Plan::TableScan { table_name, alias } => match alias {
                Some(alias) => format!("{table_name} AS {alias}"),
                None => table_name.clone(),
            },
            Plan::Join {
                kind,
                condition,
                left,
                right,
            } => {
                let base = format!("{} {} JOIN {}", left.to_sql(), kind.sql_word(), right.to_sql());
                match condition {
                    Some(cond) => format!("{base} ON {cond}"),
                    None => base,
                }
            }
            Plan::Subquery { kind, alias, child } => {
                let inner = format!("({})", child.to_sql());
                match (kind, alias) {
                    (SubqueryKind::From, Some(alias)) => format!("{inner} AS {alias}"),
                    _ => inner,
                }
            }
            Plan::Selection { condition, child } => format!("{} WHERE {}", child.to_sql(), condition),
            Plan::Aggregation {
                group_by,
                aggregates: _,
                having,
                child,
            } => {
                let mut sql = child.to_sql();
                if !group_by.is_empty() {
                    sql.push_str(&format!(" GROUP BY {}", group_by.join(", ")));
                }
                if let Some(having) = having {
                    sql.push_str(&format!(" HAVING {having}"));
                }
                sql
            }
            Plan::Projection { items, distinct, child } => {
                let columns = items.iter().map(SelectItem::render).collect::<Vec<_>>().join(", ");
                let distinct = if *distinct { "DISTINCT " } else { "" };
                format!("SELECT {distinct}{columns} FROM {}", child.to_sql())
            }
            Plan::Sort { order_items, child } => {
                let items = order_items.iter().map(OrderItem::render).collect::<Vec<_>>().join(", ");
                format!("{} ORDER BY {items}", child.to_sql())
            }
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_tree_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_scan_rejects_whitespace() {
        assert!(Plan::table_scan("my table", None).is_err());
        assert!(Plan::table_scan("users", Some("the alias".to_string())).is_err());
    }

    #[test]
    fn cross_join_rejects_condition() {
        let left = Plan::table_scan("a", None).unwrap();
        let right = Plan::table_scan("b", None).unwrap();
        assert!(Plan::join(JoinKind::Cross, Some("a.x = b.y".to_string()), left, right).is_err());
    }

    #[test]
    fn non_cross_join_requires_condition() {
        let left = Plan::table_scan("a", None).unwrap();
        let right = Plan::table_scan("b", None).unwrap();
        assert!(Plan::join(JoinKind::Inner, None, left, right).is_err());
    }

    #[test]
    fn simple_projection_parenthetical() {
        let scan = Plan::table_scan("users", None).unwrap();
        let plan = Plan::projection(vec![SelectItem::new("name", None)], false, scan).unwrap();
        assert_eq!(plan.to_parenthetical(), "PROJECTION(name, TABLE_SCAN(users))");
    }

    #[test]
    fn extracts_nested_function_calls() {
        let calls = extract_function_calls("UPPER(name) > LENGTH(other)");
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "UPPER");
        assert_eq!(calls[0].args, vec!["name".to_string()]);
        assert_eq!(calls[1].name, "LENGTH");
    }

    #[test]
    fn full_query_to_sql_round_trips_recursively() {
        let scan = Plan::table_scan("employees", None).unwrap();
        let selection = Plan::selection("age > 25", scan).unwrap();
        let aggregation = Plan::aggregation(
            vec!["department".to_string()],
            vec!["COUNT(*)".to_string()],
            Some("COUNT(*) > 5".to_string()),
            selection,
        )
        .unwrap();
        let projection = Plan::projection(
            vec![
                SelectItem::new("department", None),
                SelectItem::new("COUNT(*)", None),
            ],
            false,
            aggregation,
        )
        .unwrap();
        let sort = Plan::sort(
            vec![OrderItem::new("department", Direction::Asc)],
            projection,
        )
        .unwrap();

        assert_eq!(
            sort.to_sql(),
            "SELECT department, COUNT(*) FROM employees WHERE age > 25 GROUP BY department HAVING COUNT(*) > 5 ORDER BY department ASC"
        );
    }
}
