//! Schema data model: case-folded table/column lookups, populated once
//! and treated as immutable thereafter.

use std::collections::HashMap;

use crate::expr::DataType;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub primary_key: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Column {
            name: name.into(),
            data_type,
            nullable: true,
            primary_key: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    name: String,
    columns: HashMap<String, Column>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Table {
            name: name.into(),
            columns: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_column(&mut self, column: Column) -> &mut Self {
        self.columns.insert(column.name.to_ascii_lowercase(), column);
        self
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.add_column(column);
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(&name.to_ascii_lowercase())
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    tables: HashMap<String, Table>,
}

impl Schema {
    pub fn new() -> Self {
        Schema::default()
    }

    pub fn add_table(&mut self, table: Table) -> &mut Self {
        self.tables.insert(table.name().to_ascii_lowercase(), table);
        self
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.add_table(table);
        self
    }

    /// Convenience constructor over `(table_name, [(column_name, type), ...])`
    /// pairs, sparing callers (and tests) from hand-building nested maps.
    pub fn from_tables<T, C, N>(tables: T) -> Self
    where
        T: IntoIterator<Item = (N, C)>,
        C: IntoIterator<Item = (N, DataType)>,
        N: Into<String>,
    {
        let mut schema = Schema::new();
        for (table_name, columns) in tables {
            let mut table = Table::new(table_name);
            for (col_name, data_type) in columns {
                table.add_column(Column::new(col_name, data_type));
            }
            schema.add_table(table);
        }
        schema
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(&name.to_ascii_lowercase())
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_are_case_insensitive() {
        let schema = Schema::new().with_table(
            Table::new("Users").with_column(Column::new("Id", DataType::Integer).primary_key()),
        );
        assert!(schema.has_table("users"));
        assert!(schema.has_table("USERS"));
        let table = schema.table("UsErS").unwrap();
        assert_eq!(table.name(), "Users");
        assert!(table.column("ID").is_some());
    }

    #[test]
    fn from_tables_builds_nested_schema() {
        let schema = Schema::from_tables([(
            "users",
            vec![
                ("id", DataType::Integer),
                ("name", DataType::Varchar),
                ("age", DataType::Integer),
            ],
        )]);
        assert!(schema.has_table("users"));
        assert_eq!(
            schema.table("users").unwrap().column("name").unwrap().data_type,
            DataType::Varchar
        );
    }
}
