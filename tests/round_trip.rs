//! Cross-module round-trip properties: parenthetical printing/parsing
//! and SQL printing/parsing must agree with the plan that produced them.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use relalg_translator::plan::{Direction, JoinKind, OrderItem, Plan, SelectItem, SubqueryKind};
use relalg_translator::{parse_parenthetical, parse_sql};
use rstest::rstest;

#[rstest]
#[case::simple_projection("SELECT name FROM users", "PROJECTION(name, TABLE_SCAN(users))")]
#[case::distinct("SELECT DISTINCT name FROM users", "PROJECTION(DISTINCT, name, TABLE_SCAN(users))")]
#[case::cross_join("SELECT a FROM x CROSS JOIN y", "PROJECTION(a, CROSS_JOIN(TABLE_SCAN(x), TABLE_SCAN(y)))")]
fn sql_to_parenthetical_is_exact(#[case] sql: &str, #[case] expected: &str) {
    let plan = parse_sql(sql).unwrap();
    assert_eq!(plan.to_parenthetical(), expected);
}

/// Every plan the SQL parser produces survives a parenthetical
/// print/parse round trip unchanged.
#[rstest]
#[case("SELECT name FROM users")]
#[case("SELECT department, COUNT(*) FROM employees WHERE age > 25 GROUP BY department HAVING COUNT(*) > 5 ORDER BY department ASC")]
#[case("SELECT name FROM (SELECT name, age FROM users) AS u")]
#[case("SELECT a FROM x INNER JOIN y ON x.id = y.id")]
#[case("SELECT a FROM x LEFT JOIN y ON x.id = y.id RIGHT JOIN z ON y.id = z.id")]
#[case("SELECT a FROM x CROSS JOIN y")]
fn sql_plan_survives_parenthetical_round_trip(#[case] sql: &str) {
    let plan = parse_sql(sql).unwrap();
    let printed = plan.to_parenthetical();
    let reparsed = parse_parenthetical(&printed).unwrap();
    assert_eq!(reparsed, plan);
}

/// `parse(Q).to_sql()` parses back to a plan whose canonical parenthetical
/// form matches that of `parse(Q)`.
#[rstest]
#[case("SELECT name FROM users")]
#[case("SELECT department, COUNT(*) FROM employees WHERE age > 25 GROUP BY department HAVING COUNT(*) > 5 ORDER BY department ASC")]
#[case("SELECT a FROM x INNER JOIN y ON x.id = y.id")]
fn sql_round_trips_through_to_sql(#[case] sql: &str) {
    let plan = parse_sql(sql).unwrap();
    let regenerated_sql = plan.to_sql();
    let reparsed = parse_sql(&regenerated_sql).unwrap();
    assert_eq!(reparsed.to_parenthetical(), plan.to_parenthetical());
}

#[test]
fn tree_string_is_deterministic() {
    let plan = parse_sql("SELECT name FROM users WHERE age > 25").unwrap();
    assert_eq!(plan.to_tree_string(), plan.to_tree_string());
}

fn arb_plan(depth: u32) -> BoxedStrategy<Plan> {
    let leaf = "[a-z][a-z0-9_]{0,5}"
        .prop_map(|name| Plan::table_scan(name, None).unwrap())
        .boxed();
    if depth == 0 {
        return leaf;
    }
    let smaller = arb_plan(depth - 1);
    prop_oneof![
        smaller.clone().prop_map(|child| {
            Plan::projection(vec![SelectItem::new("col", None)], false, child).unwrap()
        }),
        smaller.clone().prop_map(|child| {
            Plan::selection("col = 1", child).unwrap()
        }),
        smaller.clone().prop_map(|child| {
            Plan::sort(vec![OrderItem::new("col", Direction::Asc)], child).unwrap()
        }),
        smaller.clone().prop_map(|child| {
            Plan::aggregation(vec!["col".to_string()], vec![], None, child).unwrap()
        }),
        smaller.clone().prop_map(|child| {
            Plan::subquery(SubqueryKind::From, Some("alias".to_string()), child)
        }),
        (smaller.clone(), smaller).prop_map(|(left, right)| {
            Plan::join(JoinKind::Inner, Some("left.id = right.id".to_string()), left, right).unwrap()
        }),
    ]
    .boxed()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Generalized: an arbitrary plan tree survives a
    /// parenthetical print/parse round trip.
    #[test]
    fn arbitrary_plan_survives_parenthetical_round_trip(plan in arb_plan(3)) {
        let printed = plan.to_parenthetical();
        let reparsed = parse_parenthetical(&printed).unwrap();
        prop_assert_eq!(reparsed, plan);
    }
}
