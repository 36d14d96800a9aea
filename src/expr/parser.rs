use crate::error::{CrateError, CrateResult};
use crate::expr::{is_arithmetic_op, is_comparison_op, is_logical_op, ColumnRef, DataType, Expression};
use crate::function_registry::{self, FunctionCategory};
use crate::lexer::token::{Token, TokenKind};
use crate::lexer::tokenize;

/// Precedence levels, lowest first.
const PRECEDENCE_LEVELS: &[&[&str]] = &[
    &["OR"],
    &["AND"],
    &["=", "!=", "<>", "<", ">", "<=", ">=", "LIKE"],
    &["+", "-"],
    &["*", "/", "%"],
];

/// Parses an expression string into a typed expression tree, resolving
/// column references against `columns`.
pub fn parse_expression(input: &str, columns: &[ColumnRef]) -> CrateResult<Expression> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CrateError::invalid_input("empty expression"));
    }
    let tokens = tokenize(Some(trimmed));
    if tokens.is_empty() {
        return Err(CrateError::invalid_input(trimmed));
    }
    parse_tokens(&tokens, columns)
}

fn parse_tokens(tokens: &[Token], columns: &[ColumnRef]) -> CrateResult<Expression> {
    let tokens = strip_outer_parens(tokens);
    if tokens.is_empty() {
        return Err(CrateError::argument("empty expression after stripping parentheses"));
    }

    if let Some(expr) = try_parse_function_call(tokens, columns)? {
        return Ok(expr);
    }

    for level in PRECEDENCE_LEVELS {
        if let Some(split) = find_top_level_operator(tokens, level) {
            let op = tokens[split].text.clone();
            let left = parse_tokens(&tokens[..split], columns)?;
            let right = parse_tokens(&tokens[split + 1..], columns)?;
            let data_type = infer_operator_type(&op, &left, &right);
            return Ok(Expression::Operator {
                op,
                left: Box::new(left),
                right: Box::new(right),
                data_type,
            });
        }
    }

    parse_leaf(tokens, columns)
}

/// Strips matching outermost parentheses, e.g. `((a))` -> `a`, but leaves
/// `(a) + (b)` untouched since the parens don't span the whole expression.
fn strip_outer_parens(tokens: &[Token]) -> &[Token] {
    let mut tokens = tokens;
    loop {
        if tokens.len() < 2 {
            return tokens;
        }
        let first = &tokens[0];
        let last = &tokens[tokens.len() - 1];
        if !(first.is_delimiter() && first.text == "(" && last.is_delimiter() && last.text == ")") {
            return tokens;
        }
        // Confirm the opening paren's matching close is indeed the last token.
        let mut depth = 0i32;
        let mut matches_at_end = false;
        for (i, t) in tokens.iter().enumerate() {
            if t.is_delimiter() && t.text == "(" {
                depth += 1;
            } else if t.is_delimiter() && t.text == ")" {
                depth -= 1;
                if depth == 0 {
                    matches_at_end = i == tokens.len() - 1;
                    break;
                }
            }
        }
        if !matches_at_end {
            return tokens;
        }
        tokens = &tokens[1..tokens.len() - 1];
    }
}

fn try_parse_function_call(tokens: &[Token], columns: &[ColumnRef]) -> CrateResult<Option<Expression>> {
    if tokens.len() < 3 {
        return Ok(None);
    }
    let name_token = &tokens[0];
    let open = &tokens[1];
    let close = &tokens[tokens.len() - 1];
    if name_token.kind != TokenKind::Identifier
        || !(open.is_delimiter() && open.text == "(")
        || !(close.is_delimiter() && close.text == ")")
    {
        return Ok(None);
    }
    if !function_registry::is_registered(&name_token.text) {
        return Ok(None);
    }
    // Confirm tokens[1] is the opening paren matching the final close.
    let mut depth = 0i32;
    let mut matches_at_end = false;
    for (i, t) in tokens[1..].iter().enumerate() {
        if t.is_delimiter() && t.text == "(" {
            depth += 1;
        } else if t.is_delimiter() && t.text == ")" {
            depth -= 1;
            if depth == 0 {
                matches_at_end = i == tokens.len() - 2;
                break;
            }
        }
    }
    if !matches_at_end {
        return Ok(None);
    }

    let arg_tokens = &tokens[2..tokens.len() - 1];
    let args = split_top_level_commas(arg_tokens)
        .into_iter()
        .filter(|piece| !piece.is_empty())
        .map(|piece| parse_tokens(piece, columns))
        .collect::<CrateResult<Vec<_>>>()?;

    let category = function_registry::category_of(&name_token.text);
    let name = name_token.text.to_ascii_uppercase();
    let data_type = infer_function_type(&name, category, &args);
    Ok(Some(Expression::Function {
        name,
        args,
        category,
        data_type,
    }))
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

fn find_top_level_operator(tokens: &[Token], level: &[&str]) -> Option<usize> {
    let mut depth = 0i32;
    for (i, t) in tokens.iter().enumerate() {
        if t.is_delimiter() && t.text == "(" {
            depth += 1;
        } else if t.is_delimiter() && t.text == ")" {
            depth -= 1;
        } else if depth == 0 && i > 0 && i < tokens.len() - 1 && token_matches_any(t, level) {
            return Some(i);
        }
    }
    None
}

fn token_matches_any(token: &Token, level: &[&str]) -> bool {
    level.iter().any(|op| token_matches(token, op))
}

fn token_matches(token: &Token, op: &str) -> bool {
    if op.chars().all(|c| c.is_ascii_alphabetic()) {
        token.kind == TokenKind::Identifier && token.text.eq_ignore_ascii_case(op)
    } else {
        token.is_operator() && token.text == op
    }
}

fn parse_leaf(tokens: &[Token], columns: &[ColumnRef]) -> CrateResult<Expression> {
    if tokens.len() == 1 {
        let token = &tokens[0];
        if token.is_string_literal() {
            return Ok(Expression::Literal {
                text: token.text.clone(),
                data_type: DataType::Varchar,
            });
        }
        if token.is_numeric_literal() {
            let data_type = if token.text.contains('.') {
                DataType::Decimal
            } else {
                DataType::Integer
            };
            return Ok(Expression::Literal {
                text: token.text.clone(),
                data_type,
            });
        }
        if token.is_operator() && token.text == "*" {
            return Ok(Expression::Column {
                name: "*".to_string(),
                data_type: DataType::Varchar,
            });
        }
    }

    // Anything else is taken as a (possibly qualified) column reference.
    let text: String = tokens.iter().map(|t| t.text.as_str()).collect();
    let data_type = columns
        .iter()
        .find(|c| c.matches(&text))
        .map(|c| c.data_type)
        .unwrap_or(DataType::Varchar);
    Ok(Expression::Column {
        name: text,
        data_type,
    })
}

fn infer_operator_type(op: &str, left: &Expression, right: &Expression) -> DataType {
    if is_comparison_op(op) || is_logical_op(op) {
        return DataType::Boolean;
    }
    let lt = left.data_type();
    let rt = right.data_type();
    if is_arithmetic_op(op) {
        if op == "+" && lt.is_string() && rt.is_string() {
            return DataType::Varchar;
        }
        if lt.is_numeric() && rt.is_numeric() {
            return if lt == DataType::Decimal || rt == DataType::Decimal {
                DataType::Decimal
            } else {
                DataType::Integer
            };
        }
    }
    DataType::Varchar
}

fn infer_function_type(name: &str, category: FunctionCategory, args: &[Expression]) -> DataType {
    let first_numeric_or_decimal = args.first().map(|a| a.data_type()).filter(|dt| {
        matches!(dt, DataType::Integer | DataType::BigInt | DataType::Decimal)
    });
    match category {
        FunctionCategory::Aggregate => {
            if name == "COUNT" {
                DataType::Integer
            } else if matches!(name, "SUM" | "AVG" | "MIN" | "MAX") {
                first_numeric_or_decimal.unwrap_or(DataType::Decimal)
            } else {
                DataType::Decimal
            }
        }
        FunctionCategory::String => {
            if matches!(name, "LENGTH" | "LEN") {
                DataType::Integer
            } else {
                DataType::Varchar
            }
        }
        FunctionCategory::Numeric => first_numeric_or_decimal.unwrap_or(DataType::Decimal),
        FunctionCategory::Date => DataType::Timestamp,
        FunctionCategory::Conditional | FunctionCategory::Unknown => DataType::Varchar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<ColumnRef> {
        vec![
            ColumnRef::new("age", DataType::Integer),
            ColumnRef::new("name", DataType::Varchar),
        ]
    }

    #[test]
    fn literal_types() {
        let e = parse_expression("'hello'", &[]).unwrap();
        assert_eq!(e.data_type(), DataType::Varchar);
        let e = parse_expression("42", &[]).unwrap();
        assert_eq!(e.data_type(), DataType::Integer);
        let e = parse_expression("3.14", &[]).unwrap();
        assert_eq!(e.data_type(), DataType::Decimal);
    }

    #[test]
    fn column_type_resolves_from_scope() {
        let e = parse_expression("age", &columns()).unwrap();
        assert_eq!(e.data_type(), DataType::Integer);
        let e = parse_expression("unknown_col", &columns()).unwrap();
        assert_eq!(e.data_type(), DataType::Varchar);
    }

    #[test]
    fn comparison_is_boolean() {
        let e = parse_expression("age > 25", &columns()).unwrap();
        assert_eq!(e.data_type(), DataType::Boolean);
    }

    #[test]
    fn count_star_is_integer() {
        let e = parse_expression("COUNT(*)", &[]).unwrap();
        assert_eq!(e.data_type(), DataType::Integer);
    }

    #[test]
    fn sum_takes_arg_type() {
        let e = parse_expression("SUM(age)", &columns()).unwrap();
        assert_eq!(e.data_type(), DataType::Integer);
    }

    #[test]
    fn length_is_integer() {
        let e = parse_expression("LENGTH(name)", &columns()).unwrap();
        assert_eq!(e.data_type(), DataType::Integer);
    }

    #[test]
    fn precedence_splits_on_or_before_and() {
        let e = parse_expression("a AND b OR c", &[]).unwrap();
        match e {
            Expression::Operator { op, .. } => assert_eq!(op, "OR"),
            _ => panic!("expected operator node"),
        }
    }

    #[test]
    fn mixed_arithmetic_operands_fail_validation() {
        let e = parse_expression("name + age", &columns()).unwrap();
        let errors = e.validate_types();
        assert!(!errors.is_empty());
    }

    #[test]
    fn string_function_rejects_numeric_argument() {
        let e = parse_expression("UPPER(age)", &columns()).unwrap();
        let errors = e.validate_types();
        assert!(errors.iter().any(|e| e.contains("UPPER")));
    }
}
