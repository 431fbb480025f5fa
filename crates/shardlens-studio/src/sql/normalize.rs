//! Literal normalization.
//!
//! Replaces bindable literals with `:vN` placeholders so that queries which
//! differ only in their constants share one canonical text. A literal `IN`
//! list collapses into a single placeholder.

use sqlparser::ast::{visit_expressions, Expr, Statement, Value, VisitMut, VisitorMut};
use std::collections::HashSet;
use std::ops::ControlFlow;

/// A literal lifted out of a statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindVar {
    /// Placeholder name without the leading colon
    pub name: String,
    /// Original literal text (comma-joined for collapsed lists)
    pub value: String,
}

/// Rewrite `statement` in place and return the lifted literals in encounter order
///
/// Placeholder names already present in the statement are never reused, so
/// normalizing a normalized statement is a no-op.
pub fn normalize(statement: &mut Statement) -> Vec<BindVar> {
    let mut normalizer = Normalizer {
        reserved: existing_placeholders(statement),
        counter: 0,
        lifted: Vec::new(),
    };
    let _ = statement.visit(&mut normalizer);
    normalizer.lifted
}

/// NULL, booleans and existing placeholders stay in the text
pub(crate) fn is_bindable(value: &Value) -> bool {
    !matches!(
        value,
        Value::Null | Value::Boolean(_) | Value::Placeholder(_)
    )
}

fn is_literal(expr: &Expr) -> bool {
    matches!(expr, Expr::Value(value) if is_bindable(value))
}

fn existing_placeholders(statement: &Statement) -> HashSet<String> {
    let mut names = HashSet::new();
    let _ = visit_expressions(statement, |expr| {
        if let Expr::Value(Value::Placeholder(p)) = expr {
            names.insert(p.trim_start_matches(':').to_string());
        }
        ControlFlow::<()>::Continue(())
    });
    names
}

struct Normalizer {
    reserved: HashSet<String>,
    counter: usize,
    lifted: Vec<BindVar>,
}

impl Normalizer {
    fn next_placeholder(&mut self, original: String) -> Value {
        let name = loop {
            self.counter += 1;
            let candidate = format!("v{}", self.counter);
            if !self.reserved.contains(&candidate) {
                break candidate;
            }
        };

        let placeholder = Value::Placeholder(format!(":{}", name));
        self.lifted.push(BindVar {
            name,
            value: original,
        });
        placeholder
    }
}

impl VisitorMut for Normalizer {
    type Break = ();

    fn pre_visit_expr(&mut self, expr: &mut Expr) -> ControlFlow<Self::Break> {
        match expr {
            Expr::InList { list, .. } if !list.is_empty() && list.iter().all(is_literal) => {
                let joined = list
                    .iter()
                    .map(|item| item.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                let placeholder = self.next_placeholder(joined);
                *list = vec![Expr::Value(placeholder)];
            }
            Expr::Value(value) if is_bindable(value) => {
                let original = value.to_string();
                *value = self.next_placeholder(original);
            }
            _ => {}
        }
        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::{canonicalize, parse};

    fn normalized(sql: &str) -> (String, Vec<BindVar>) {
        let mut stmt = parse(sql).unwrap();
        let vars = normalize(&mut stmt);
        (canonicalize(&stmt), vars)
    }

    #[test]
    fn test_literals_become_placeholders() {
        let (text, vars) = normalized("select * from t where a = 1 and b = 'x'");
        assert_eq!(text, "SELECT * FROM t WHERE a = :v1 AND b = :v2");
        assert_eq!(vars.len(), 2);
        assert_eq!(vars[0].value, "1");
        assert_eq!(vars[1].value, "'x'");
    }

    #[test]
    fn test_null_and_booleans_are_kept() {
        let (text, vars) = normalized("select * from t where a is null and b = true");
        assert_eq!(text, "SELECT * FROM t WHERE a IS NULL AND b = true");
        assert!(vars.is_empty());
    }

    #[test]
    fn test_in_list_collapses() {
        let (short, _) = normalized("select * from t where id in (1, 2)");
        let (long, vars) = normalized("select * from t where id in (1, 2, 3, 4)");
        assert_eq!(short, long);
        assert_eq!(vars[0].value, "1, 2, 3, 4");
    }

    #[test]
    fn test_existing_placeholders_are_not_reused() {
        let (text, vars) = normalized("select * from t where a = :v1 and b = 7");
        assert_eq!(text, "SELECT * FROM t WHERE a = :v1 AND b = :v2");
        assert_eq!(vars[0].name, "v2");
    }

    #[test]
    fn test_different_constants_share_text() {
        let (a, _) = normalized("update t set x = 5 where id = 10");
        let (b, _) = normalized("update t set x = 6 where id = 11");
        assert_eq!(a, b);
    }
}
