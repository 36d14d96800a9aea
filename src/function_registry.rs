//! Static classification of built-in function names.

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionCategory {
    Aggregate,
    String,
    Numeric,
    Date,
    Conditional,
    Unknown,
}

const AGGREGATE: &[&str] = &["COUNT", "SUM", "AVG", "MIN", "MAX"];

const STRING: &[&str] = &[
    "UPPER", "LOWER", "LENGTH", "LEN", "SUBSTRING", "CONCAT", "TRIM", "LTRIM", "RTRIM", "REPLACE",
];

const NUMERIC: &[&str] = &["ROUND", "FLOOR", "CEIL", "CEILING", "ABS", "POWER", "SQRT", "MOD"];

const DATE: &[&str] = &[
    "NOW",
    "CURRENT_DATE",
    "CURRENT_TIMESTAMP",
    "DATE_ADD",
    "DATE_SUB",
    "DATEDIFF",
    "EXTRACT",
    "YEAR",
    "MONTH",
    "DAY",
];

const CONDITIONAL: &[&str] = &["COALESCE", "NULLIF", "IFNULL", "CASE"];

/// Folds `name` to upper-case and classifies it; unrecognized names are
/// `Unknown` rather than an error.
pub fn category_of(name: &str) -> FunctionCategory {
    let upper = name.to_ascii_uppercase();
    let upper = upper.as_str();
    if AGGREGATE.contains(&upper) {
        FunctionCategory::Aggregate
    } else if STRING.contains(&upper) {
        FunctionCategory::String
    } else if NUMERIC.contains(&upper) {
        FunctionCategory::Numeric
    } else if DATE.contains(&upper) {
        FunctionCategory::Date
    } else if CONDITIONAL.contains(&upper) {
        FunctionCategory::Conditional
    } else {
        FunctionCategory::Unknown
    }
}

/// Union of every registered name, anchoring the expression parser's
/// function-call recognition.
pub fn all_names() -> Vec<&'static str> {
    AGGREGATE
        .iter()
        .chain(STRING.iter())
        .chain(NUMERIC.iter())
        .chain(DATE.iter())
        .chain(CONDITIONAL.iter())
        .copied()
        .collect()
}

/// True iff `name` (case-insensitive) is one of [`all_names`].
pub fn is_registered(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    all_names().iter().any(|registered| *registered == upper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorizes_known_functions_case_insensitively() {
        assert_eq!(category_of("count"), FunctionCategory::Aggregate);
        assert_eq!(category_of("Upper"), FunctionCategory::String);
        assert_eq!(category_of("ROUND"), FunctionCategory::Numeric);
        assert_eq!(category_of("now"), FunctionCategory::Date);
        assert_eq!(category_of("Coalesce"), FunctionCategory::Conditional);
    }

    #[test]
    fn unknown_names_fall_through() {
        assert_eq!(category_of("FROBNICATE"), FunctionCategory::Unknown);
        assert!(!is_registered("FROBNICATE"));
    }

    #[test]
    fn is_registered_matches_all_names() {
        let names = all_names();
        assert!(names.contains(&"COUNT"));
        assert!(names.contains(&"UPPER"));
        for name in names {
            assert!(is_registered(name));
            assert!(is_registered(&name.to_ascii_lowercase()));
        }
    }

    #[test]
    fn disjoint_sets() {
        let sets: [&[&str]; 5] = [AGGREGATE, STRING, NUMERIC, DATE, CONDITIONAL];
        for (i, a) in sets.iter().enumerate() {
            for (j, b) in sets.iter().enumerate() {
                if i == j {
                    continue;
                }
                for name in a.iter() {
                    assert!(!b.contains(name), "{name} appears in two categories");
                }
            }
        }
    }
}
