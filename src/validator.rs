//! Schema validator: a post-order walk of a plan under a schema,
//! carrying an available-columns context upward and collecting errors and
//! warnings rather than failing fast.

use crate::expr::{parse_expression, ColumnRef, DataType};
use crate::lexer::token::TokenKind;
use crate::plan::{extract_function_calls, Plan};
use crate::schema::Schema;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone)]
struct ContextEntry {
    table: Option<String>,
    column: String,
    data_type: DataType,
}

struct WalkState {
    errors: Vec<String>,
    warnings: Vec<String>,
    subquery_counter: usize,
}

/// Validates `plan` against `schema`, returning every error and warning
/// encountered in post-order-walk (deterministic) order.
pub fn validate(plan: &Plan, schema: &Schema) -> ValidationReport {
    let mut state = WalkState {
        errors: Vec::new(),
        warnings: Vec::new(),
        subquery_counter: 0,
    };
    walk(plan, schema, &mut state);
    ValidationReport {
        errors: state.errors,
        warnings: state.warnings,
    }
}

fn walk(plan: &Plan, schema: &Schema, state: &mut WalkState) -> Vec<ContextEntry> {
    match plan {
        Plan::TableScan { table_name, alias } => walk_table_scan(table_name, alias, schema, state),
        Plan::Projection { items, child, .. } => walk_projection(items, child, schema, state),
        Plan::Selection { condition, child } => walk_selection(condition, child, schema, state),
        Plan::Join {
            condition, left, right, ..
        } => walk_join(condition, left, right, schema, state),
        Plan::Aggregation {
            group_by,
            aggregates,
            having,
            child,
        } => walk_aggregation(group_by, aggregates, having, child, schema, state),
        Plan::Sort { order_items, child } => walk_sort(order_items, child, schema, state),
        Plan::Subquery { alias, child, .. } => walk_subquery(alias, child, schema, state),
    }
}

fn walk_table_scan(
    table_name: &str,
    alias: &Option<String>,
    schema: &Schema,
    state: &mut WalkState,
) -> Vec<ContextEntry> {
    let Some(table) = schema.table(table_name) else {
        state
            .errors
            .push(format!("Table '{table_name}' does not exist in schema"));
        return Vec::new();
    };
    let qualifier = alias.clone().unwrap_or_else(|| table_name.to_string());
    table
        .columns()
        .map(|c| ContextEntry {
            table: Some(qualifier.clone()),
            column: c.name.clone(),
            data_type: c.data_type,
        })
        .collect()
}

fn walk_projection(
    items: &[crate::plan::SelectItem],
    child: &Plan,
    schema: &Schema,
    state: &mut WalkState,
) -> Vec<ContextEntry> {
    let child_ctx = walk(child, schema, state);
    let column_refs = to_column_refs(&child_ctx);
    let mut out_ctx = Vec::new();
    for item in items {
        if item.expression == "*" {
            out_ctx.extend(child_ctx.iter().cloned());
            continue;
        }
        let errors = validate_expression(&item.expression, &child_ctx, |c| {
            format!("Column '{c}' is not available in projection")
        });
        state.errors.extend(errors);
        let data_type = parse_expression(&item.expression, &column_refs)
            .map(|e| e.data_type())
            .unwrap_or(DataType::Varchar);
        out_ctx.push(ContextEntry {
            table: None,
            column: item.effective_name().to_string(),
            data_type,
        });
    }
    out_ctx
}

fn walk_selection(condition: &str, child: &Plan, schema: &Schema, state: &mut WalkState) -> Vec<ContextEntry> {
    let child_ctx = walk(child, schema, state);
    let errors = validate_expression(condition, &child_ctx, |c| {
        format!("Column '{c}' is not available in condition '{condition}'")
    });
    state.errors.extend(errors);
    child_ctx
}

fn walk_join(
    condition: &Option<String>,
    left: &Plan,
    right: &Plan,
    schema: &Schema,
    state: &mut WalkState,
) -> Vec<ContextEntry> {
    let left_ctx = walk(left, schema, state);
    let right_ctx = walk(right, schema, state);

    if let Some(condition) = condition {
        let combined: Vec<ContextEntry> = left_ctx.iter().chain(right_ctx.iter()).cloned().collect();
        let errors = validate_expression(condition, &combined, |c| {
            format!("Column '{c}' is not available in join condition '{condition}'")
        });
        state.errors.extend(errors);
    }

    for left_entry in &left_ctx {
        if right_ctx
            .iter()
            .any(|r| r.column.eq_ignore_ascii_case(&left_entry.column))
        {
            state.warnings.push(format!(
                "Ambiguous column name '{}' exists in both sides of join",
                left_entry.column
            ));
        }
    }

    left_ctx.into_iter().chain(right_ctx).collect()
}

fn walk_aggregation(
    group_by: &[String],
    aggregates: &[String],
    having: &Option<String>,
    child: &Plan,
    schema: &Schema,
    state: &mut WalkState,
) -> Vec<ContextEntry> {
    let child_ctx = walk(child, schema, state);

    let mut out_ctx = Vec::new();
    for col in group_by {
        match resolve(&child_ctx, col) {
            Some(entry) => out_ctx.push(entry.clone()),
            None => {
                state
                    .errors
                    .push(format!("Column '{col}' is not available"));
                out_ctx.push(ContextEntry {
                    table: None,
                    column: col.clone(),
                    data_type: DataType::Varchar,
                });
            }
        }
    }

    for agg in aggregates {
        for call in extract_function_calls(agg) {
            for arg in &call.args {
                let errors = validate_function_arg(&call.name, arg, &child_ctx, |c, fname| {
                    format!("Column '{c}' referenced in function '{fname}' is not available")
                });
                state.errors.extend(errors);
            }
        }
        out_ctx.push(ContextEntry {
            table: None,
            column: agg.clone(),
            data_type: DataType::Decimal,
        });
    }

    if let Some(having) = having {
        let errors = validate_expression(having, &out_ctx, |c| {
            format!("Column '{c}' in HAVING condition is not available (having: '{having}')")
        });
        state.errors.extend(errors);
    }

    out_ctx
}

fn walk_sort(order_items: &[crate::plan::OrderItem], child: &Plan, schema: &Schema, state: &mut WalkState) -> Vec<ContextEntry> {
    let child_ctx = walk(child, schema, state);
    for item in order_items {
        if resolve(&child_ctx, &item.column).is_none() {
            state
                .errors
                .push(format!("Column '{}' is not available", item.column));
        }
    }
    child_ctx
}

fn walk_subquery(alias: &Option<String>, child: &Plan, schema: &Schema, state: &mut WalkState) -> Vec<ContextEntry> {
    let inner_ctx = walk(child, schema, state);
    let alias_name = match alias {
        Some(a) => a.clone(),
        None => {
            state.subquery_counter += 1;
            format!("subquery_{}", state.subquery_counter)
        }
    };
    inner_ctx
        .into_iter()
        .map(|e| ContextEntry {
            table: Some(alias_name.clone()),
            column: e.column,
            data_type: e.data_type,
        })
        .collect()
}

fn to_column_refs(context: &[ContextEntry]) -> Vec<ColumnRef> {
    context
        .iter()
        .map(|e| match &e.table {
            Some(table) => ColumnRef::qualified(table.clone(), e.column.clone(), e.data_type),
            None => ColumnRef::new(e.column.clone(), e.data_type),
        })
        .collect()
}

fn resolve<'a>(context: &'a [ContextEntry], name: &str) -> Option<&'a ContextEntry> {
    if let Some((table, column)) = name.split_once('.') {
        context.iter().find(|e| {
            e.table.as_deref().is_some_and(|t| t.eq_ignore_ascii_case(table)) && e.column.eq_ignore_ascii_case(column)
        })
    } else {
        context.iter().find(|e| e.column.eq_ignore_ascii_case(name))
    }
}

/// Validates a full condition/expression string: extracts any function
/// calls and checks their non-literal, non-wildcard arguments first, then
/// scans the remainder (functions skipped whole) for unresolved identifiers.
fn validate_expression(expr: &str, context: &[ContextEntry], msg: impl Fn(&str) -> String) -> Vec<String> {
    let mut errors = Vec::new();
    for call in extract_function_calls(expr) {
        for arg in &call.args {
            errors.extend(validate_function_arg(&call.name, arg, context, |c, _| msg(c)));
        }
    }
    for ident in unresolved_identifiers(expr, context) {
        errors.push(msg(&ident));
    }
    errors
}

fn validate_function_arg(
    function_name: &str,
    arg: &str,
    context: &[ContextEntry],
    msg: impl Fn(&str, &str) -> String,
) -> Vec<String> {
    let arg = arg.trim();
    if arg.is_empty() || arg == "*" {
        return Vec::new();
    }
    if crate::lexer::token::is_string_literal(arg) || crate::lexer::token::is_numeric_literal(arg) {
        return Vec::new();
    }
    unresolved_identifiers(arg, context)
        .into_iter()
        .map(|ident| msg(&ident, function_name))
        .collect()
}

/// Scans `text` for bare column-reference identifiers, skipping function
/// names (identifier immediately followed by `(`, whose whole call is
/// skipped) and SQL keywords. Qualified `t.c` forms are resolved as a unit.
fn unresolved_identifiers(text: &str, context: &[ContextEntry]) -> Vec<String> {
    let tokens = crate::lexer::tokenize(Some(text));
    let mut unresolved = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let t = &tokens[i];
        if t.kind != TokenKind::Identifier || t.is_keyword() {
            i += 1;
            continue;
        }
        if tokens.get(i + 1).is_some_and(|n| n.is_delimiter() && n.text == "(") {
            let mut depth = 0i32;
            let mut j = i + 1;
            while j < tokens.len() {
                if tokens[j].is_delimiter() && tokens[j].text == "(" {
                    depth += 1;
                } else if tokens[j].is_delimiter() && tokens[j].text == ")" {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                j += 1;
            }
            i = j + 1;
            continue;
        }
        if tokens.get(i + 1).is_some_and(|n| n.is_delimiter() && n.text == ".")
            && tokens.get(i + 2).is_some_and(|n| n.kind == TokenKind::Identifier)
        {
            let qualified = format!("{}.{}", t.text, tokens[i + 2].text);
            if resolve(context, &qualified).is_none() {
                unresolved.push(qualified);
            }
            i += 3;
            continue;
        }
        if resolve(context, &t.text).is_none() {
            unresolved.push(t.text.clone());
        }
        i += 1;
    }
    unresolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, Table};

    fn users_schema() -> Schema {
        Schema::new().with_table(
            Table::new("users")
                .with_column(Column::new("id", DataType::Integer).primary_key())
                .with_column(Column::new("name", DataType::Varchar))
                .with_column(Column::new("age", DataType::Integer)),
        )
    }

    #[test]
    fn unknown_column_in_projection_is_an_error() {
        let scan = Plan::table_scan("users", None).unwrap();
        let plan = Plan::projection(
            vec![crate::plan::SelectItem::new("nonexistent", None)],
            false,
            scan,
        )
        .unwrap();
        let report = validate(&plan, &users_schema());
        assert!(report.errors.iter().any(|e| e.contains("is not available in projection")));
    }

    #[test]
    fn valid_projection_has_no_errors() {
        let scan = Plan::table_scan("users", None).unwrap();
        let plan = Plan::projection(vec![crate::plan::SelectItem::new("name", None)], false, scan).unwrap();
        let report = validate(&plan, &users_schema());
        assert!(report.is_valid());
    }

    #[test]
    fn having_referencing_non_group_column_is_an_error() {
        let scan = Plan::table_scan("users", None).unwrap();
        let aggregation = Plan::aggregation(
            vec!["department_id".to_string()],
            vec!["COUNT(*)".to_string()],
            None,
            scan,
        )
        .unwrap();
        let plan = Plan::projection(
            vec![
                crate::plan::SelectItem::new("name", None),
                crate::plan::SelectItem::new("COUNT(*)", None),
            ],
            false,
            aggregation,
        )
        .unwrap();
        let report = validate(&plan, &users_schema());
        assert!(report.errors.iter().any(|e| e.contains("name") && e.contains("is not available")));
    }

    #[test]
    fn unknown_table_is_an_error() {
        let scan = Plan::table_scan("ghosts", None).unwrap();
        let plan = Plan::projection(vec![crate::plan::SelectItem::new("*", None)], false, scan).unwrap();
        let report = validate(&plan, &users_schema());
        assert!(report.errors.iter().any(|e| e.contains("does not exist in schema")));
    }

    #[test]
    fn ambiguous_join_column_is_a_warning() {
        let left = Plan::table_scan("users", None).unwrap();
        let right = Plan::table_scan("users", Some("u2".to_string())).unwrap();
        let join = Plan::join(crate::plan::JoinKind::Inner, Some("users.id = u2.id".to_string()), left, right).unwrap();
        let report = validate(&join, &users_schema());
        assert!(report.warnings.iter().any(|w| w.contains("Ambiguous column name")));
    }
}
