//! Query shape extraction.
//!
//! A shape keeps the operation, the affected table, the updated columns and
//! the `column op literal` predicates of a statement. Literals are swapped for
//! slots in a transaction-local [`ValueDictionary`].

use super::schema::{Predicate, QueryShape};
use crate::sql::{parse, ComparisonOp, StatementType};
use crate::utils::error::SqlError;
use sqlparser::ast::{
    AssignmentTarget, BinaryOperator, Expr, FromTable, SetExpr, Statement, TableFactor,
    TableWithJoins, UnaryOperator, Value,
};
use std::collections::HashMap;

/// Literal text to slot, in encounter order
#[derive(Debug, Clone, Default)]
pub struct ValueDictionary {
    slots: HashMap<String, usize>,
}

impl ValueDictionary {
    pub fn slot(&mut self, literal: String) -> usize {
        let next = self.slots.len();
        *self.slots.entry(literal).or_insert(next)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Extract the shape of `sql`
///
/// # Returns
/// `None` for statements that are neither DML nor SELECT
pub fn extract_shape(
    sql: &str,
    values: &mut ValueDictionary,
) -> Result<Option<QueryShape>, SqlError> {
    let statement = parse(sql)?;
    let op = StatementType::of(&statement);

    let (tables, updated_columns, selection): (&[TableWithJoins], Vec<String>, Option<&Expr>) =
        match &statement {
            Statement::Query(query) => match query.body.as_ref() {
                SetExpr::Select(select) => (
                    select.from.as_slice(),
                    Vec::new(),
                    select.selection.as_ref(),
                ),
                _ => return Ok(None),
            },
            Statement::Insert(insert) => {
                let table = insert
                    .table_name
                    .0
                    .last()
                    .map(|i| i.value.clone())
                    .unwrap_or_default();
                return Ok(Some(QueryShape {
                    op,
                    affected_table: table,
                    updated_columns: Vec::new(),
                    predicates: Vec::new(),
                }));
            }
            Statement::Update {
                table,
                assignments,
                selection,
                ..
            } => {
                let columns = assignments
                    .iter()
                    .flat_map(|a| match &a.target {
                        AssignmentTarget::ColumnName(name) => vec![name],
                        AssignmentTarget::Tuple(names) => names.iter().collect(),
                    })
                    .filter_map(|name| name.0.last().map(|i| i.value.clone()))
                    .collect();
                (std::slice::from_ref(table), columns, selection.as_ref())
            }
            Statement::Delete(delete) => {
                let tables = match &delete.from {
                    FromTable::WithFromKeyword(t) | FromTable::WithoutKeyword(t) => t.as_slice(),
                };
                (tables, Vec::new(), delete.selection.as_ref())
            }
            _ => return Ok(None),
        };

    let aliases = alias_map(tables);
    let Some(affected_table) = aliases.first().map(|(_, table)| table.clone()) else {
        return Ok(None);
    };

    let mut predicates = Vec::new();
    if let Some(selection) = selection {
        collect_predicates(selection, &affected_table, &aliases, values, &mut predicates);
    }

    Ok(Some(QueryShape {
        op,
        affected_table,
        updated_columns,
        predicates,
    }))
}

/// (visible name, real table) for every plain table in the FROM list
fn alias_map(tables: &[TableWithJoins]) -> Vec<(String, String)> {
    let factors = tables
        .iter()
        .flat_map(|twj| std::iter::once(&twj.relation).chain(twj.joins.iter().map(|j| &j.relation)));

    factors
        .filter_map(|factor| match factor {
            TableFactor::Table { name, alias, .. } => name.0.last().map(|table| {
                let visible = alias
                    .as_ref()
                    .map(|a| a.name.value.clone())
                    .unwrap_or_else(|| table.value.clone());
                (visible, table.value.clone())
            }),
            _ => None,
        })
        .collect()
}

fn collect_predicates(
    expr: &Expr,
    default_table: &str,
    aliases: &[(String, String)],
    values: &mut ValueDictionary,
    out: &mut Vec<Predicate>,
) {
    match expr {
        Expr::BinaryOp {
            left,
            op: BinaryOperator::And,
            right,
        } => {
            collect_predicates(left, default_table, aliases, values, out);
            collect_predicates(right, default_table, aliases, values, out);
        }
        Expr::Nested(inner) => collect_predicates(inner, default_table, aliases, values, out),
        Expr::BinaryOp { left, op, right } => {
            let Some(op) = ComparisonOp::from_binary(op) else {
                return;
            };

            let (column, literal, op) = match (
                column_of(left, default_table, aliases),
                literal_of(right),
            ) {
                (Some(column), Some(literal)) => (column, literal, op),
                _ => match (column_of(right, default_table, aliases), literal_of(left)) {
                    (Some(column), Some(literal)) => (column, literal, op.flip()),
                    _ => return,
                },
            };

            let slot = values.slot(literal);
            out.push(Predicate {
                table: column.0,
                col: column.1,
                op,
                val: slot as i64,
            });
        }
        _ => {}
    }
}

fn column_of(
    expr: &Expr,
    default_table: &str,
    aliases: &[(String, String)],
) -> Option<(String, String)> {
    match expr {
        Expr::Identifier(ident) => Some((default_table.to_string(), ident.value.clone())),
        Expr::CompoundIdentifier(idents) if idents.len() >= 2 => {
            let qualifier = &idents[idents.len() - 2].value;
            let table = aliases
                .iter()
                .find(|(visible, _)| visible == qualifier)
                .map(|(_, table)| table.clone())
                .unwrap_or_else(|| qualifier.clone());
            Some((table, idents[idents.len() - 1].value.clone()))
        }
        Expr::Nested(inner) => column_of(inner, default_table, aliases),
        _ => None,
    }
}

fn literal_of(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Value(Value::Null) => None,
        Expr::Value(value) => Some(value.to_string()),
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => literal_of(expr).map(|v| format!("-{}", v)),
        Expr::Nested(inner) => literal_of(inner),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn shape(sql: &str, values: &mut ValueDictionary) -> QueryShape {
        extract_shape(sql, values).unwrap().unwrap()
    }

    #[test]
    fn test_update_shape() {
        let mut values = ValueDictionary::default();
        let s = shape("update t set c = 1, d = 2 where id = 42 and v > 3", &mut values);
        assert_eq!(s.op, StatementType::Update);
        assert_eq!(s.affected_table, "t");
        assert_eq!(s.updated_columns, vec!["c", "d"]);
        assert_eq!(
            s.predicates,
            vec![
                Predicate {
                    table: "t".to_string(),
                    col: "id".to_string(),
                    op: ComparisonOp::Eq,
                    val: 0
                },
                Predicate {
                    table: "t".to_string(),
                    col: "v".to_string(),
                    op: ComparisonOp::Gt,
                    val: 1
                },
            ]
        );
    }

    #[test]
    fn test_values_share_slots_within_transaction() {
        let mut values = ValueDictionary::default();
        let a = shape("delete from t where id = 5", &mut values);
        let b = shape("select * from u where t_id = 5 and 9 < n", &mut values);
        assert_eq!(a.predicates[0].val, 0);
        assert_eq!(b.predicates[0].val, 0);
        assert_eq!(b.predicates[1].val, 1);
        assert_eq!(b.predicates[1].op, ComparisonOp::Gt);
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_non_literal_comparisons_are_ignored() {
        let mut values = ValueDictionary::default();
        let s = shape(
            "select * from a join b on a.id = b.a_id where a.x = b.y and a.z like 'q'",
            &mut values,
        );
        assert_eq!(s.affected_table, "a");
        assert!(s.predicates.is_empty());
    }

    #[test]
    fn test_insert_and_other_statements() {
        let mut values = ValueDictionary::default();
        let s = shape("insert into t (a) values (1)", &mut values);
        assert_eq!(s.op, StatementType::Insert);
        assert!(s.predicates.is_empty());
        assert!(extract_shape("set autocommit = 0", &mut values).unwrap().is_none());
    }
}
