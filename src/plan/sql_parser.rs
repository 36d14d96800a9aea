//! SQL parser: orchestrates the tokenizer and the expression
//! reconstruction rules to build a plan tree out of a SELECT statement.
//!
//! ORDER BY's `Sort` node ends up as the outermost wrapper, with
//! `Projection` nested underneath it (SQL sorts the projected output, not
//! the other way around). See DESIGN.md for the resolved ambiguity.

use crate::error::{CrateError, CrateResult};
use crate::lexer::token::{Token, TokenKind};
use crate::lexer::tokenize;
use crate::plan::{extract_function_calls, Direction, JoinKind, OrderItem, Plan, SelectItem, SubqueryKind};
use crate::function_registry::FunctionCategory;

const JOIN_KEYWORDS: &[&str] = &["JOIN", "INNER", "LEFT", "RIGHT", "FULL", "CROSS"];

/// Parses a `SELECT ...` statement into a plan tree.
pub fn parse(sql: &str) -> CrateResult<Plan> {
    let trimmed = sql.trim();
    if trimmed.is_empty() {
        return Err(CrateError::invalid_input("empty SQL"));
    }
    let tokens = tokenize(Some(trimmed));
    parse_tokens(&tokens)
}

fn parse_tokens(tokens: &[Token]) -> CrateResult<Plan> {
    check_balanced_parens(tokens)?;
    let depths = paren_depths(tokens);

    let select_pos = find_keyword(tokens, &depths, 0, &["SELECT"]);
    let from_pos = find_keyword(tokens, &depths, 0, &["FROM"]);

    let select_pos = match select_pos {
        Some(p) => p,
        None => return Err(CrateError::syntax("expected SELECT")),
    };
    let from_pos = match from_pos {
        Some(p) => p,
        None => return Err(CrateError::syntax("missing FROM clause")),
    };

    let where_pos = find_keyword(tokens, &depths, from_pos + 1, &["WHERE"]);
    let group_pos = find_keyword(tokens, &depths, from_pos + 1, &["GROUP", "BY"]);
    let having_pos = group_pos.and_then(|g| find_keyword(tokens, &depths, g + 2, &["HAVING"]));
    let order_pos = find_keyword(tokens, &depths, from_pos + 1, &["ORDER", "BY"]);

    let clause_starts = [where_pos, group_pos, order_pos]
        .into_iter()
        .flatten()
        .filter(|&p| p > from_pos)
        .collect::<Vec<_>>();
    let from_end = clause_starts.iter().copied().min().unwrap_or(tokens.len());

    let where_end = [group_pos, order_pos]
        .into_iter()
        .flatten()
        .filter(|&p| where_pos.is_some_and(|w| p > w))
        .min()
        .unwrap_or(tokens.len());

    let group_end = having_pos.or(order_pos).unwrap_or(tokens.len());
    let having_end = order_pos.unwrap_or(tokens.len());

    let select_items_tokens = &tokens[select_pos + 1..from_pos];
    let (select_items, distinct) = parse_select_list(select_items_tokens)?;

    let from_tokens = &tokens[from_pos + 1..from_end];
    let mut current = parse_from(from_tokens)?;

    if let Some(where_pos) = where_pos {
        let cond_tokens = &tokens[where_pos + 1..where_end];
        if cond_tokens.is_empty() {
            return Err(CrateError::syntax("empty WHERE condition"));
        }
        current = Plan::selection(reconstruct(cond_tokens), current)?;
    }

    if let Some(group_pos) = group_pos {
        let group_tokens = &tokens[group_pos + 2..group_end];
        let group_by = split_top_level_commas(group_tokens)
            .into_iter()
            .filter(|piece| !piece.is_empty())
            .map(reconstruct)
            .collect::<Vec<_>>();
        let aggregates = select_items
            .iter()
            .flat_map(|item| item.parsed_functions.iter())
            .filter(|call| call.category == FunctionCategory::Aggregate)
            .map(|call| call.source_text.clone())
            .collect::<Vec<_>>();
        let having = having_pos.map(|h| reconstruct(&tokens[h + 1..having_end]));
        current = Plan::aggregation(group_by, aggregates, having, current)?;
    }

    current = Plan::projection(select_items, distinct, current)?;

    if let Some(order_pos) = order_pos {
        let order_tokens = &tokens[order_pos + 2..];
        let order_items = split_top_level_commas(order_tokens)
            .into_iter()
            .filter(|piece| !piece.is_empty())
            .map(parse_order_item)
            .collect::<Vec<_>>();
        if order_items.is_empty() {
            return Err(CrateError::syntax("empty ORDER BY list"));
        }
        current = Plan::sort(order_items, current)?;
    }

    Ok(current)
}

fn parse_select_list(tokens: &[Token]) -> CrateResult<(Vec<SelectItem>, bool)> {
    let mut tokens = tokens;
    let mut distinct = false;
    if tokens.first().is_some_and(|t| t.text_is("DISTINCT")) {
        distinct = true;
        tokens = &tokens[1..];
    }
    if tokens.is_empty() {
        return Err(CrateError::syntax("empty SELECT list"));
    }
    let items = split_top_level_commas(tokens)
        .into_iter()
        .filter(|piece| !piece.is_empty())
        .map(parse_select_item)
        .collect::<Vec<_>>();
    Ok((items, distinct))
}

fn parse_select_item(tokens: &[Token]) -> SelectItem {
    if tokens.len() == 1 && tokens[0].is_operator() && tokens[0].text == "*" {
        return SelectItem::new("*", None);
    }
    let len = tokens.len();
    // `expr AS alias`
    if len >= 2 && tokens[len - 2].text_is("AS") && tokens[len - 1].kind == TokenKind::Identifier {
        let alias = unquote(&tokens[len - 1].text);
        return SelectItem::new(reconstruct(&tokens[..len - 2]), Some(alias));
    }
    // Bare-identifier alias, but only when the expression isn't itself a
    // function call: function-call aliases require AS.
    if len >= 2
        && tokens[len - 1].kind == TokenKind::Identifier
        && !tokens[len - 1].is_keyword()
        && !(tokens[len - 2].is_delimiter() && tokens[len - 2].text == ")")
    {
        let alias = tokens[len - 1].text.clone();
        return SelectItem::new(reconstruct(&tokens[..len - 1]), Some(alias));
    }
    SelectItem::new(reconstruct(tokens), None)
}

fn parse_order_item(tokens: &[Token]) -> OrderItem {
    let len = tokens.len();
    if len >= 1 {
        if tokens[len - 1].text_is("ASC") {
            return OrderItem::new(reconstruct(&tokens[..len - 1]), Direction::Asc);
        }
        if tokens[len - 1].text_is("DESC") {
            return OrderItem::new(reconstruct(&tokens[..len - 1]), Direction::Desc);
        }
    }
    OrderItem::new(reconstruct(tokens), Direction::Unspecified)
}

fn parse_from(tokens: &[Token]) -> CrateResult<Plan> {
    if tokens.is_empty() {
        return Err(CrateError::syntax("empty FROM clause"));
    }
    let (mut current, mut pos) = parse_table_reference(tokens)?;

    loop {
        if pos >= tokens.len() {
            break;
        }
        let Some((kind, mut next)) = parse_join_kind(tokens, pos) else {
            break;
        };
        if next >= tokens.len() || !tokens[next].text_is("JOIN") {
            break;
        }
        next += 1;
        if next >= tokens.len() {
            return Err(CrateError::syntax("expected table reference after JOIN"));
        }
        let (right, after_right) = parse_table_reference(&tokens[next..])?;
        let mut after = next + after_right;
        let mut condition = None;
        if after < tokens.len() && tokens[after].text_is("ON") {
            let cond_start = after + 1;
            let cond_end = find_next_join_start(tokens, cond_start);
            condition = Some(reconstruct(&tokens[cond_start..cond_end]));
            after = cond_end;
        }
        current = Plan::join(kind, condition, current, right)?;
        pos = after;
    }

    Ok(current)
}

fn find_next_join_start(tokens: &[Token], start: usize) -> usize {
    let depths = paren_depths(tokens);
    for i in start..tokens.len() {
        if depths[i] == 0 && JOIN_KEYWORDS.iter().any(|kw| tokens[i].text_is(kw)) {
            return i;
        }
    }
    tokens.len()
}

fn parse_join_kind(tokens: &[Token], pos: usize) -> Option<(JoinKind, usize)> {
    let token = tokens.get(pos)?;
    if token.text_is("JOIN") {
        return Some((JoinKind::Inner, pos));
    }
    let kind = JoinKind::from_sql_word(&token.text)?;
    if tokens.get(pos + 1).is_some_and(|t| t.text_is("JOIN")) {
        Some((kind, pos + 1))
    } else {
        None
    }
}

/// Parses either a bare table reference or a parenthesized FROM subquery,
/// returning the node and the number of tokens consumed.
fn parse_table_reference(tokens: &[Token]) -> CrateResult<(Plan, usize)> {
    if tokens.is_empty() {
        return Err(CrateError::syntax("expected a table reference"));
    }
    if tokens[0].is_delimiter() && tokens[0].text == "(" {
        if !tokens.get(1).is_some_and(|t| t.text_is("SELECT")) {
            return Err(CrateError::syntax(
                "malformed subquery: no SELECT found after opening parenthesis",
            ));
        }
        let close = matching_close_paren(tokens, 0).ok_or_else(|| {
            CrateError::syntax("malformed subquery: missing closing parenthesis")
        })?;
        let inner_plan = parse_tokens(&tokens[1..close])?;
        let mut pos = close + 1;
        let alias = consume_alias(tokens, &mut pos, true);
        let subquery = Plan::subquery(SubqueryKind::From, alias, inner_plan);
        return Ok((subquery, pos));
    }

    if tokens[0].kind != TokenKind::Identifier || tokens[0].is_keyword() {
        return Err(CrateError::syntax(format!(
            "expected a table name, found '{}'",
            tokens[0].text
        )));
    }
    let table_name = tokens[0].text.clone();
    let mut pos = 1;
    let alias = consume_alias(tokens, &mut pos, true);
    Ok((Plan::table_scan(table_name, alias)?, pos))
}

/// Consumes an optional `AS alias` or bare-identifier alias at `*pos`,
/// advancing it past what was consumed. Bare aliases are rejected when the
/// next token is a join keyword, since that marks the start of a join clause
/// rather than an alias.
fn consume_alias(tokens: &[Token], pos: &mut usize, reject_join_keywords: bool) -> Option<String> {
    let i = *pos;
    if tokens.get(i).is_some_and(|t| t.text_is("AS")) {
        if let Some(name_token) = tokens.get(i + 1) {
            *pos = i + 2;
            return Some(unquote(&name_token.text));
        }
        return None;
    }
    if let Some(t) = tokens.get(i) {
        let is_join_kw = reject_join_keywords && JOIN_KEYWORDS.iter().any(|kw| t.text_is(kw));
        if t.kind == TokenKind::Identifier && !t.is_keyword() && !is_join_kw {
            *pos = i + 1;
            return Some(t.text.clone());
        }
    }
    None
}

fn unquote(text: &str) -> String {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        text[1..text.len() - 1].to_string()
    } else {
        text.to_string()
    }
}

fn matching_close_paren(tokens: &[Token], open_pos: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (i, t) in tokens.iter().enumerate().skip(open_pos) {
        if t.is_delimiter() && t.text == "(" {
            depth += 1;
        } else if t.is_delimiter() && t.text == ")" {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

fn check_balanced_parens(tokens: &[Token]) -> CrateResult<()> {
    let mut depth = 0i32;
    for t in tokens {
        if t.is_delimiter() && t.text == "(" {
            depth += 1;
        } else if t.is_delimiter() && t.text == ")" {
            depth -= 1;
            if depth < 0 {
                return Err(CrateError::syntax("unbalanced parentheses"));
            }
        }
    }
    if depth != 0 {
        return Err(CrateError::syntax("unbalanced parentheses"));
    }
    Ok(())
}

fn paren_depths(tokens: &[Token]) -> Vec<i32> {
    let mut depths = Vec::with_capacity(tokens.len());
    let mut depth = 0i32;
    for t in tokens {
        if t.is_delimiter() && t.text == "(" {
            depths.push(depth);
            depth += 1;
        } else if t.is_delimiter() && t.text == ")" {
            depth -= 1;
            depths.push(depth);
        } else {
            depths.push(depth);
        }
    }
    depths
}

/// Finds the first top-level (depth-zero) occurrence of the word sequence
/// `words` at or after `start`.
fn find_keyword(tokens: &[Token], depths: &[i32], start: usize, words: &[&str]) -> Option<usize> {
    if words.is_empty() || start >= tokens.len() {
        return None;
    }
    let mut i = start;
    while i + words.len() <= tokens.len() {
        if depths[i] == 0 && words.iter().enumerate().all(|(off, w)| tokens[i + off].text_is(w)) {
            return Some(i);
        }
        i += 1;
    }
    None
}

fn split_top_level_commas(tokens: &[Token]) -> Vec<&[Token]> {
    if tokens.is_empty() {
        return Vec::new();
    }
    let mut pieces = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, t) in tokens.iter().enumerate() {
        if t.is_delimiter() && t.text == "(" {
            depth += 1;
        } else if t.is_delimiter() && t.text == ")" {
            depth -= 1;
        } else if t.is_delimiter() && t.text == "," && depth == 0 {
            pieces.push(&tokens[start..i]);
            start = i + 1;
        }
    }
    pieces.push(&tokens[start..]);
    pieces
}

/// Reassembles a token range into canonical text following fixed spacing rules:
/// no space between a function name and its `(`, none just inside `(`/`)`,
/// one space after a comma, and a single space everywhere else (including
/// around comparison/arithmetic operators).
pub fn reconstruct(tokens: &[Token]) -> String {
    let mut out = String::new();
    for (i, t) in tokens.iter().enumerate() {
        if i == 0 {
            out.push_str(&t.text);
            continue;
        }
        let prev = &tokens[i - 1];
        if needs_space(prev, t) {
            out.push(' ');
        }
        out.push_str(&t.text);
    }
    out
}

fn needs_space(prev: &Token, next: &Token) -> bool {
    if next.is_delimiter() && matches!(next.text.as_str(), ")" | ",") {
        return false;
    }
    if prev.is_delimiter() && prev.text == "(" {
        return false;
    }
    if next.is_delimiter() && next.text == "(" {
        return !(prev.kind == TokenKind::Identifier && !prev.is_keyword());
    }
    true
}
