//! Parenthetical parser/printer: the round-trippable textual plan
//! form `OP(param, …, child, …)`. Printing lives on [`Plan::to_parenthetical`];
//! this module is the parser's inverse.

use crate::error::{CrateError, CrateResult};
use crate::plan::{Direction, JoinKind, OrderItem, Plan, SelectItem, SubqueryKind};

const KNOWN_OPNAMES: &[&str] = &[
    "TABLE_SCAN",
    "PROJECTION",
    "SELECTION",
    "INNER_JOIN",
    "LEFT_JOIN",
    "RIGHT_JOIN",
    "FULL_JOIN",
    "CROSS_JOIN",
    "AGGREGATION",
    "SORT",
    "SUBQUERY",
];

/// Parses a complete parenthetical string into a plan.
pub fn parse(text: &str) -> CrateResult<Plan> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CrateError::invalid_input("empty parenthetical input"));
    }
    parse_full(trimmed)
}

fn parse_full(text: &str) -> CrateResult<Plan> {
    let (plan, rest) = parse_node(text)?;
    if !rest.trim().is_empty() {
        return Err(CrateError::syntax(format!(
            "unexpected trailing input after top-level node: '{}'",
            rest.trim()
        )));
    }
    Ok(plan)
}

struct Param {
    text: String,
    is_child: bool,
}

fn parse_node(s: &str) -> CrateResult<(Plan, &str)> {
    let s = s.trim_start();
    let Some(open_idx) = s.find('(') else {
        return Err(CrateError::syntax("expected '(' after operator name"));
    };
    let opname = s[..open_idx].trim();
    if opname.is_empty() || !opname.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
        return Err(CrateError::syntax(format!("unknown operator name '{opname}'")));
    }
    let close_idx = find_matching_close(s, open_idx)?;
    let params_str = &s[open_idx + 1..close_idx];
    let rest = &s[close_idx + 1..];

    let params = split_top_level(params_str)
        .into_iter()
        .filter(|p| !p.is_empty())
        .map(|text| {
            let is_child = is_child_param(&text);
            Param { text, is_child }
        })
        .collect::<Vec<_>>();

    let plan = build(opname, params)?;
    Ok((plan, rest))
}

fn find_matching_close(s: &str, open_idx: usize) -> CrateResult<usize> {
    let mut depth = 0i32;
    let mut in_quote: Option<char> = None;
    for (i, c) in s.char_indices().skip(open_idx) {
        if let Some(q) = in_quote {
            if c == q {
                in_quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => in_quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
    }
    Err(CrateError::syntax("missing closing parenthesis"))
}

fn split_top_level(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_quote: Option<char> = None;
    let mut start = 0usize;
    for (i, c) in s.char_indices() {
        if let Some(q) = in_quote {
            if c == q {
                in_quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => in_quote = Some(c),
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(s[start..i].trim().to_string());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(s[start..].trim().to_string());
    parts
}

fn is_child_param(text: &str) -> bool {
    let text = text.trim();
    KNOWN_OPNAMES
        .iter()
        .any(|name| text.starts_with(*name) && text[name.len()..].starts_with('(') && text.ends_with(')'))
}

fn build(opname: &str, params: Vec<Param>) -> CrateResult<Plan> {
    let mut split_at = params.len();
    while split_at > 0 && params[split_at - 1].is_child {
        split_at -= 1;
    }
    let literals: Vec<String> = params[..split_at].iter().map(|p| p.text.clone()).collect();
    let children = params[split_at..]
        .iter()
        .map(|p| parse_full(&p.text))
        .collect::<CrateResult<Vec<_>>>()?;

    if let Some(kind) = JoinKind::from_opname(opname) {
        return build_join(kind, literals, children);
    }

    match opname {
        "TABLE_SCAN" => build_table_scan(literals, children),
        "PROJECTION" => build_projection(literals, children),
        "SELECTION" => build_selection(literals, children),
        "AGGREGATION" => build_aggregation(literals, children),
        "SORT" => build_sort(literals, children),
        "SUBQUERY" => build_subquery(literals, children),
        other => Err(CrateError::syntax(format!("unknown operator name '{other}'"))),
    }
}

fn require_one_child(mut children: Vec<Plan>, opname: &str) -> CrateResult<Plan> {
    if children.len() != 1 {
        return Err(CrateError::syntax(format!(
            "{opname} requires exactly one child, got {}",
            children.len()
        )));
    }
    Ok(children.remove(0))
}

fn build_table_scan(literals: Vec<String>, children: Vec<Plan>) -> CrateResult<Plan> {
    if !children.is_empty() || literals.len() != 1 {
        return Err(CrateError::syntax("TABLE_SCAN requires exactly one parameter"));
    }
    let (name, alias) = match literals[0].split_once(" AS ") {
        Some((n, a)) => (n.to_string(), Some(a.to_string())),
        None => (literals[0].clone(), None),
    };
    Plan::table_scan(name, alias)
}

fn build_projection(mut literals: Vec<String>, children: Vec<Plan>) -> CrateResult<Plan> {
    let child = require_one_child(children, "PROJECTION")?;
    let distinct = if literals.first().map(String::as_str) == Some("DISTINCT") {
        literals.remove(0);
        true
    } else {
        false
    };
    if literals.is_empty() {
        return Err(CrateError::syntax("PROJECTION requires at least one column"));
    }
    let items = literals
        .into_iter()
        .map(|col| match col.split_once(" AS ") {
            Some((expr, alias)) => SelectItem::new(expr.to_string(), Some(alias.to_string())),
            None => SelectItem::new(col, None),
        })
        .collect();
    Plan::projection(items, distinct, child)
}

fn build_selection(literals: Vec<String>, children: Vec<Plan>) -> CrateResult<Plan> {
    let child = require_one_child(children, "SELECTION")?;
    if literals.len() != 1 {
        return Err(CrateError::syntax("SELECTION requires exactly one condition parameter"));
    }
    Plan::selection(literals[0].clone(), child)
}

fn build_join(kind: JoinKind, literals: Vec<String>, mut children: Vec<Plan>) -> CrateResult<Plan> {
    if children.len() != 2 {
        return Err(CrateError::syntax(format!(
            "{} requires exactly two children, got {}",
            kind.opname(),
            children.len()
        )));
    }
    let condition = if kind == JoinKind::Cross {
        if !literals.is_empty() {
            return Err(CrateError::syntax("CROSS_JOIN must not carry a condition"));
        }
        None
    } else {
        if literals.len() != 1 {
            return Err(CrateError::syntax(format!(
                "{} requires exactly one condition parameter",
                kind.opname()
            )));
        }
        Some(literals[0].clone())
    };
    let right = children.remove(1);
    let left = children.remove(0);
    Plan::join(kind, condition, left, right)
}

const AGGREGATION_PREFIXES: &[&str] = &["GROUP_BY", "AGG", "HAVING"];

/// Recombines the comma-split pieces of a multi-valued `GROUP_BY:`/`AGG:`
/// section back into one value, since top-level splitting can't by itself
/// tell a section-internal comma from a parameter boundary.
fn merge_sections(literals: Vec<String>) -> CrateResult<Vec<(&'static str, String)>> {
    let mut out: Vec<(&'static str, String)> = Vec::new();
    for lit in literals {
        let prefix_match = AGGREGATION_PREFIXES
            .iter()
            .find(|p| lit.starts_with(format!("{p}:").as_str()));
        if let Some(prefix) = prefix_match {
            let value = lit[prefix.len() + 1..].to_string();
            out.push((prefix, value));
        } else if let Some((_, value)) = out.last_mut() {
            value.push(',');
            value.push_str(&lit);
        } else {
            return Err(CrateError::syntax(format!("unrecognized AGGREGATION parameter '{lit}'")));
        }
    }
    Ok(out)
}

fn build_aggregation(literals: Vec<String>, children: Vec<Plan>) -> CrateResult<Plan> {
    let child = require_one_child(children, "AGGREGATION")?;
    let sections = merge_sections(literals)?;
    let group_by = sections
        .iter()
        .find(|(p, _)| *p == "GROUP_BY")
        .map(|(_, v)| v.split(',').map(str::to_string).collect())
        .unwrap_or_default();
    let aggregates = sections
        .iter()
        .find(|(p, _)| *p == "AGG")
        .map(|(_, v)| v.split(',').map(str::to_string).collect())
        .unwrap_or_default();
    let having = sections.iter().find(|(p, _)| *p == "HAVING").map(|(_, v)| v.clone());
    Plan::aggregation(group_by, aggregates, having, child)
}

fn build_sort(literals: Vec<String>, children: Vec<Plan>) -> CrateResult<Plan> {
    let child = require_one_child(children, "SORT")?;
    if literals.is_empty() {
        return Err(CrateError::syntax("SORT requires at least one order item"));
    }
    let order_items = literals
        .into_iter()
        .map(|item| {
            if let Some(col) = item.strip_suffix(" ASC") {
                OrderItem::new(col.to_string(), Direction::Asc)
            } else if let Some(col) = item.strip_suffix(" DESC") {
                OrderItem::new(col.to_string(), Direction::Desc)
            } else {
                OrderItem::new(item, Direction::Unspecified)
            }
        })
        .collect();
    Plan::sort(order_items, child)
}

fn build_subquery(literals: Vec<String>, children: Vec<Plan>) -> CrateResult<Plan> {
    let child = require_one_child(children, "SUBQUERY")?;
    let mut kind = None;
    let mut alias = None;
    for lit in literals {
        if let Some(rest) = lit.strip_prefix("TYPE:") {
            kind = SubqueryKind::from_str(rest);
        } else if let Some(rest) = lit.strip_prefix("ALIAS:") {
            alias = Some(rest.to_string());
        } else {
            return Err(CrateError::syntax(format!("unrecognized SUBQUERY parameter '{lit}'")));
        }
    }
    let kind = kind.ok_or_else(|| CrateError::syntax("SUBQUERY requires a TYPE parameter"))?;
    Ok(Plan::subquery(kind, alias, child))
}
