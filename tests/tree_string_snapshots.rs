//! Snapshot coverage for the indented tree-string form.

use expect_test::{expect, Expect};
use relalg_translator::parse_sql;

fn check(sql: &str, expected: Expect) {
    let plan = parse_sql(sql).unwrap();
    expected.assert_eq(&plan.to_tree_string());
}

#[test]
fn simple_projection_tree() {
    check(
        "SELECT name FROM users",
        expect![[r#"
        PROJECTION(name)
          TABLE_SCAN(users)
        "#]],
    );
}

#[test]
fn full_query_tree() {
    check(
        "SELECT department, COUNT(*) FROM employees WHERE age > 25 GROUP BY department HAVING COUNT(*) > 5 ORDER BY department ASC",
        expect![[r#"
        SORT(department ASC)
          PROJECTION(department, COUNT(*))
            AGGREGATION(GROUP_BY:department, AGG:COUNT(*), HAVING:COUNT(*) > 5)
              SELECTION(age > 25)
                TABLE_SCAN(employees)
        "#]],
    );
}

#[test]
fn subquery_in_from_tree() {
    check(
        "SELECT name FROM (SELECT name, age FROM users) AS u",
        expect![[r#"
        PROJECTION(name)
          SUBQUERY(TYPE:FROM, ALIAS:u)
            PROJECTION(name, age)
              TABLE_SCAN(users)
        "#]],
    );
}
