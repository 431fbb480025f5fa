//! Bind variable substitution for gateway logs.

use super::parse;
use crate::utils::error::SqlError;
use serde::{Deserialize, Serialize};
use sqlparser::ast::{Expr, Value, VisitMut, VisitorMut};
use std::collections::HashMap;
use std::ops::ControlFlow;

/// One bind variable as logged by the query router
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindVariable {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub value: serde_json::Value,
}

/// Write `vars` back into `sql` and return the re-serialized statement
///
/// Every variable is converted before the statement is parsed, so an
/// unsupported type is reported even when the SQL itself cannot be parsed.
///
/// # Errors
/// * `SqlError::UnsupportedBindVariable` - tuple values
/// * `SqlError::InvalidBindVariable` - a numeric type with a non-numeric value
/// * `SqlError::Parse` - the statement does not parse
pub fn bind_variables(
    sql: &str,
    vars: &HashMap<String, BindVariable>,
) -> Result<String, SqlError> {
    let literals = vars
        .iter()
        .map(|(name, var)| Ok((name.clone(), to_literal(name, var)?)))
        .collect::<Result<HashMap<_, _>, SqlError>>()?;

    let mut statement = parse(sql)?;
    let _ = statement.visit(&mut Binder {
        literals: &literals,
    });

    Ok(statement.to_string())
}

fn raw_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        serde_json::Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        other => other.to_string(),
    }
}

fn to_literal(name: &str, var: &BindVariable) -> Result<Value, SqlError> {
    let kind = var.kind.to_ascii_uppercase();
    let text = raw_text(&var.value);
    let invalid = || SqlError::InvalidBindVariable(name.to_string());

    let literal = match kind.as_str() {
        "TUPLE" => {
            return Err(SqlError::UnsupportedBindVariable {
                name: name.to_string(),
                kind,
            })
        }
        "NULL_TYPE" => Value::Null,
        k if k.starts_with("UINT") => {
            let n: u64 = text.trim().parse().map_err(|_| invalid())?;
            Value::Number(n.to_string(), false)
        }
        k if k.starts_with("INT") => {
            let n: i64 = text.trim().parse().map_err(|_| invalid())?;
            Value::Number(n.to_string(), false)
        }
        "FLOAT32" | "FLOAT64" => {
            let f: f64 = text.trim().parse().map_err(|_| invalid())?;
            if !f.is_finite() {
                return Err(invalid());
            }
            Value::Number(f.to_string(), false)
        }
        "DECIMAL" => {
            let trimmed = text.trim();
            trimmed.parse::<f64>().map_err(|_| invalid())?;
            Value::Number(trimmed.to_string(), false)
        }
        _ => Value::SingleQuotedString(text),
    };

    Ok(literal)
}

struct Binder<'a> {
    literals: &'a HashMap<String, Value>,
}

impl VisitorMut for Binder<'_> {
    type Break = ();

    fn post_visit_expr(&mut self, expr: &mut Expr) -> ControlFlow<Self::Break> {
        if let Expr::Value(Value::Placeholder(p)) = expr {
            if let Some(literal) = self.literals.get(p.trim_start_matches(':')) {
                *expr = Expr::Value(literal.clone());
            }
        }
        ControlFlow::Continue(())
    }
}
