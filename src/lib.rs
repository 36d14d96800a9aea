//! SQL-to-relational-algebra translator/validator (Core A) and an
//! approximate-word lookup companion (Core B).
//!
//! Core A turns a `SELECT` statement into a [`plan::Plan`] tree, serializes
//! it back to SQL or to a parenthetical textual form, parses the
//! parenthetical form back into an equivalent plan, and validates any plan
//! against a [`schema::Schema`]. Core B answers approximate membership
//! queries over a static vocabulary via [`vocab::VocabularyFacade`].

pub mod error;
pub mod expr;
pub mod function_registry;
pub mod lexer;
pub mod plan;
pub mod schema;
pub mod validator;
pub mod vocab;

pub use error::{CrateError, CrateResult};
pub use plan::Plan;
pub use schema::Schema;
pub use validator::{validate, ValidationReport};
pub use vocab::VocabularyFacade;

/// Parses a `SELECT` statement into a plan tree.
pub fn parse_sql(sql: &str) -> CrateResult<Plan> {
    plan::sql_parser::parse(sql)
}

/// Parses a parenthetical plan string into a plan tree.
pub fn parse_parenthetical(text: &str) -> CrateResult<Plan> {
    plan::parenthetical::parse(text)
}

#[cfg(feature = "wasm")]
mod wasm_bindings {
    use wasm_bindgen::prelude::*;

    use crate::{parse_parenthetical, parse_sql};

    #[wasm_bindgen(start)]
    pub fn main() {
        console_error_panic_hook::set_once();
    }

    /// Parses `sql` and returns its parenthetical form, or throws a JS
    /// exception carrying the error message on failure.
    #[wasm_bindgen(js_name = planFromSql)]
    pub fn plan_from_sql(sql: &str) -> Result<String, JsValue> {
        parse_sql(sql)
            .map(|plan| plan.to_parenthetical())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Parses `sql` and returns its indented tree-string form.
    #[wasm_bindgen(js_name = treeFromSql)]
    pub fn tree_from_sql(sql: &str) -> Result<String, JsValue> {
        parse_sql(sql)
            .map(|plan| plan.to_tree_string())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Round-trips `sql` through the plan tree and back to canonical SQL.
    #[wasm_bindgen(js_name = canonicalizeSql)]
    pub fn canonicalize_sql(sql: &str) -> Result<String, JsValue> {
        parse_sql(sql)
            .map(|plan| plan.to_sql())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Parses `sql` and returns the plan tree serialized as JSON, for
    /// front-ends that want structured access instead of re-parsing one of
    /// the textual forms.
    #[wasm_bindgen(js_name = planJsonFromSql)]
    pub fn plan_json_from_sql(sql: &str) -> Result<String, JsValue> {
        let plan = parse_sql(sql).map_err(|e| JsValue::from_str(&e.to_string()))?;
        serde_json::to_string(&plan).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Parses a parenthetical plan string and re-prints it, validating the
    /// grammar without exposing the plan's internal representation to JS.
    #[wasm_bindgen(js_name = reprintParenthetical)]
    pub fn reprint_parenthetical(text: &str) -> Result<String, JsValue> {
        parse_parenthetical(text)
            .map(|plan| plan.to_parenthetical())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }
}
