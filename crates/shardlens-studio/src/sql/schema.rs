//! Schema knowledge gathered from `CREATE TABLE` statements.

use sqlparser::ast::Statement;
use std::collections::HashMap;

/// A column declared in a `CREATE TABLE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

/// Tables and their columns, keyed case-insensitively
#[derive(Debug, Clone, Default)]
pub struct SchemaInfo {
    tables: HashMap<String, Vec<ColumnInfo>>,
}

impl SchemaInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a table definition, replacing any earlier one
    pub fn add_table(&mut self, table: &str, columns: Vec<ColumnInfo>) {
        self.tables.insert(table.to_ascii_lowercase(), columns);
    }

    /// Register the table when `statement` is a `CREATE TABLE`
    ///
    /// # Returns
    /// `true` if the statement was a table definition
    pub fn register(&mut self, statement: &Statement) -> bool {
        let Statement::CreateTable(create) = statement else {
            return false;
        };

        let Some(table) = create.name.0.last() else {
            return false;
        };

        let columns = create
            .columns
            .iter()
            .map(|c| ColumnInfo {
                name: c.name.value.clone(),
                data_type: c.data_type.to_string(),
            })
            .collect();

        self.add_table(&table.value, columns);
        true
    }

    pub fn columns(&self, table: &str) -> Option<&[ColumnInfo]> {
        self.tables
            .get(&table.to_ascii_lowercase())
            .map(|c| c.as_slice())
    }

    /// `None` when the table is unknown
    pub fn has_column(&self, table: &str, column: &str) -> Option<bool> {
        self.columns(table)
            .map(|cols| cols.iter().any(|c| c.name.eq_ignore_ascii_case(column)))
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }
}
