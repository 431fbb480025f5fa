//! Key extraction: which tables a statement touches, which columns it filters
//! and groups on, and which columns it joins across tables.

use super::schema::SchemaInfo;
use crate::utils::error::SqlError;
use serde::{Deserialize, Serialize};
use sqlparser::ast::{
    visit_expressions, BinaryOperator, Expr, FromTable, GroupByExpr, JoinConstraint, JoinOperator,
    Query, Select, SetExpr, Statement, TableFactor, TableWithJoins,
};
use std::ops::ControlFlow;

/// A column resolved to its real table
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: String,
    pub name: String,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.table, self.name)
    }
}

/// Comparison applied to a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComparisonOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<=>")]
    NullSafeEq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    LtEq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    GtEq,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not in")]
    NotIn,
    #[serde(rename = "like")]
    Like,
    #[serde(rename = "not like")]
    NotLike,
    #[serde(rename = "between")]
    Between,
    #[serde(rename = "not between")]
    NotBetween,
    #[serde(rename = "is null")]
    IsNull,
    #[serde(rename = "is not null")]
    IsNotNull,
}

impl ComparisonOp {
    pub(crate) fn from_binary(op: &BinaryOperator) -> Option<Self> {
        Some(match op {
            BinaryOperator::Eq => Self::Eq,
            BinaryOperator::Spaceship => Self::NullSafeEq,
            BinaryOperator::NotEq => Self::NotEq,
            BinaryOperator::Lt => Self::Lt,
            BinaryOperator::LtEq => Self::LtEq,
            BinaryOperator::Gt => Self::Gt,
            BinaryOperator::GtEq => Self::GtEq,
            _ => return None,
        })
    }

    /// Operator with its operands swapped
    pub fn flip(self) -> Self {
        match self {
            Self::Lt => Self::Gt,
            Self::LtEq => Self::GtEq,
            Self::Gt => Self::Lt,
            Self::GtEq => Self::LtEq,
            other => other,
        }
    }

    /// Anything that is not a point lookup
    pub fn is_range(self) -> bool {
        !matches!(self, Self::Eq | Self::NullSafeEq | Self::In | Self::IsNull)
    }
}

impl std::fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Eq => "=",
            Self::NullSafeEq => "<=>",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Like => "like",
            Self::NotLike => "not like",
            Self::Between => "between",
            Self::NotBetween => "not between",
            Self::IsNull => "is null",
            Self::IsNotNull => "is not null",
        };
        f.write_str(s)
    }
}

/// A filtered column together with its operator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnUse {
    #[serde(flatten)]
    pub column: ColumnRef,
    pub op: ComparisonOp,
}

/// Column-to-column comparison across two tables
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JoinPredicate {
    pub lhs: ColumnRef,
    pub rhs: ColumnRef,
    pub op: ComparisonOp,
}

impl JoinPredicate {
    /// Same predicate with `lhs` ordered before `rhs`
    pub fn ordered(&self) -> Self {
        if self.lhs <= self.rhs {
            self.clone()
        } else {
            Self {
                lhs: self.rhs.clone(),
                rhs: self.lhs.clone(),
                op: self.op.flip(),
            }
        }
    }
}

/// Everything extracted from one statement, in encounter order without duplicates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryKeys {
    pub table_names: Vec<String>,
    pub filter_columns: Vec<ColumnUse>,
    pub grouping_columns: Vec<ColumnRef>,
    pub join_predicates: Vec<JoinPredicate>,
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

/// Extract keys from a statement
///
/// # Arguments
/// * `statement` - Parsed (typically normalized) statement
/// * `schema` - Known table definitions, used to place unqualified columns
///
/// # Errors
/// * `SqlError::UnknownTable` - a qualifier names no table in scope
/// * `SqlError::AmbiguousColumn` - an unqualified column cannot be placed
pub fn extract_keys(statement: &Statement, schema: &SchemaInfo) -> Result<QueryKeys, SqlError> {
    let mut extractor = Extractor {
        schema,
        ctes: Vec::new(),
        keys: QueryKeys::default(),
    };
    extractor.statement(statement)?;
    Ok(extractor.keys)
}

/// A name visible in a FROM clause
struct Source {
    visible: String,
    /// `None` for derived tables and CTE references
    table: Option<String>,
}

struct Scope<'p> {
    sources: Vec<Source>,
    parent: Option<&'p Scope<'p>>,
}

impl<'p> Scope<'p> {
    fn new(parent: Option<&'p Scope<'p>>) -> Self {
        Self {
            sources: Vec::new(),
            parent,
        }
    }
}

struct Extractor<'s> {
    schema: &'s SchemaInfo,
    ctes: Vec<String>,
    keys: QueryKeys,
}

impl Extractor<'_> {
    fn statement(&mut self, statement: &Statement) -> Result<(), SqlError> {
        match statement {
            Statement::Query(query) => self.query(query, None),
            Statement::Insert(insert) => {
                if let Some(table) = insert.table_name.0.last() {
                    self.add_table(&table.value);
                }
                match &insert.source {
                    Some(source) => self.query(source, None),
                    None => Ok(()),
                }
            }
            Statement::Update {
                table, selection, ..
            } => self.filtered(std::slice::from_ref(table), selection.as_ref()),
            Statement::Delete(delete) => {
                let tables = match &delete.from {
                    FromTable::WithFromKeyword(tables) | FromTable::WithoutKeyword(tables) => {
                        tables
                    }
                };
                self.filtered(tables, delete.selection.as_ref())
            }
            _ => Ok(()),
        }
    }

    fn filtered(
        &mut self,
        from: &[TableWithJoins],
        selection: Option<&Expr>,
    ) -> Result<(), SqlError> {
        let mut scope = Scope::new(None);
        let mut conditions = Vec::new();
        for twj in from {
            self.table_with_joins(twj, &mut scope, &mut conditions)?;
        }
        for condition in conditions.into_iter().chain(selection) {
            self.predicates(condition, &scope)?;
        }
        Ok(())
    }

    fn query(&mut self, query: &Query, parent: Option<&Scope>) -> Result<(), SqlError> {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                self.query(&cte.query, parent)?;
                self.ctes.push(cte.alias.name.value.clone());
            }
        }
        self.set_expr(&query.body, parent)
    }

    fn set_expr(&mut self, body: &SetExpr, parent: Option<&Scope>) -> Result<(), SqlError> {
        match body {
            SetExpr::Select(select) => self.select(select, parent),
            SetExpr::Query(query) => self.query(query, parent),
            SetExpr::SetOperation { left, right, .. } => {
                self.set_expr(left, parent)?;
                self.set_expr(right, parent)
            }
            _ => Ok(()),
        }
    }

    fn select(&mut self, select: &Select, parent: Option<&Scope>) -> Result<(), SqlError> {
        let mut scope = Scope::new(parent);
        let mut conditions = Vec::new();
        for twj in &select.from {
            self.table_with_joins(twj, &mut scope, &mut conditions)?;
        }

        for condition in conditions.into_iter().chain(select.selection.as_ref()) {
            self.predicates(condition, &scope)?;
        }

        if let GroupByExpr::Expressions(exprs, ..) = &select.group_by {
            for expr in exprs {
                if let Some(column) = self.column(expr, &scope)? {
                    push_unique(&mut self.keys.grouping_columns, column);
                }
            }
        }

        if let Some(having) = &select.having {
            self.predicates(having, &scope)?;
        }

        Ok(())
    }

    fn table_with_joins<'q>(
        &mut self,
        twj: &'q TableWithJoins,
        scope: &mut Scope,
        conditions: &mut Vec<&'q Expr>,
    ) -> Result<(), SqlError> {
        self.table_factor(&twj.relation, scope, conditions)?;
        for join in &twj.joins {
            self.table_factor(&join.relation, scope, conditions)?;
            if let Some(JoinConstraint::On(on)) = join_constraint(&join.join_operator) {
                conditions.push(on);
            }
        }
        Ok(())
    }

    fn table_factor<'q>(
        &mut self,
        factor: &'q TableFactor,
        scope: &mut Scope,
        conditions: &mut Vec<&'q Expr>,
    ) -> Result<(), SqlError> {
        match factor {
            TableFactor::Table { name, alias, .. } => {
                let Some(last) = name.0.last() else {
                    return Ok(());
                };
                let table = last.value.clone();
                let visible = alias
                    .as_ref()
                    .map(|a| a.name.value.clone())
                    .unwrap_or_else(|| table.clone());

                if name.0.len() == 1 && self.ctes.iter().any(|c| c.eq_ignore_ascii_case(&table)) {
                    scope.sources.push(Source {
                        visible,
                        table: None,
                    });
                } else {
                    self.add_table(&table);
                    scope.sources.push(Source {
                        visible,
                        table: Some(table),
                    });
                }
            }
            TableFactor::Derived {
                subquery, alias, ..
            } => {
                self.query(subquery, None)?;
                scope.sources.push(Source {
                    visible: alias
                        .as_ref()
                        .map(|a| a.name.value.clone())
                        .unwrap_or_default(),
                    table: None,
                });
            }
            TableFactor::NestedJoin {
                table_with_joins, ..
            } => self.table_with_joins(table_with_joins, scope, conditions)?,
            _ => {}
        }
        Ok(())
    }

    fn add_table(&mut self, table: &str) {
        push_unique(&mut self.keys.table_names, table.to_string());
    }

    fn filter(&mut self, column: ColumnRef, op: ComparisonOp) {
        push_unique(&mut self.keys.filter_columns, ColumnUse { column, op });
    }

    fn predicates(&mut self, expr: &Expr, scope: &Scope) -> Result<(), SqlError> {
        match expr {
            Expr::BinaryOp {
                left,
                op: BinaryOperator::And | BinaryOperator::Or,
                right,
            } => {
                self.predicates(left, scope)?;
                self.predicates(right, scope)?;
            }
            Expr::Nested(inner) => self.predicates(inner, scope)?,
            Expr::UnaryOp { expr, .. } => self.predicates(expr, scope)?,
            Expr::BinaryOp { left, op, right } => {
                if let Some(op) = ComparisonOp::from_binary(op) {
                    self.comparison(left, op, right, scope)?;
                }
            }
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                if let Some(column) = self.column(expr, scope)? {
                    if !list.iter().any(references_column) {
                        let op = if *negated {
                            ComparisonOp::NotIn
                        } else {
                            ComparisonOp::In
                        };
                        self.filter(column, op);
                    }
                }
            }
            Expr::InSubquery {
                expr,
                subquery,
                negated,
            } => {
                if let Some(column) = self.column(expr, scope)? {
                    let op = if *negated {
                        ComparisonOp::NotIn
                    } else {
                        ComparisonOp::In
                    };
                    self.filter(column, op);
                }
                self.query(subquery, Some(scope))?;
            }
            Expr::Between { expr, negated, .. } => {
                if let Some(column) = self.column(expr, scope)? {
                    let op = if *negated {
                        ComparisonOp::NotBetween
                    } else {
                        ComparisonOp::Between
                    };
                    self.filter(column, op);
                }
            }
            Expr::Like { expr, negated, .. } => {
                if let Some(column) = self.column(expr, scope)? {
                    let op = if *negated {
                        ComparisonOp::NotLike
                    } else {
                        ComparisonOp::Like
                    };
                    self.filter(column, op);
                }
            }
            Expr::IsNull(expr) => {
                if let Some(column) = self.column(expr, scope)? {
                    self.filter(column, ComparisonOp::IsNull);
                }
            }
            Expr::IsNotNull(expr) => {
                if let Some(column) = self.column(expr, scope)? {
                    self.filter(column, ComparisonOp::IsNotNull);
                }
            }
            Expr::Exists { subquery, .. } | Expr::Subquery(subquery) => {
                self.query(subquery, Some(scope))?;
            }
            _ => {}
        }
        Ok(())
    }

    fn comparison(
        &mut self,
        left: &Expr,
        op: ComparisonOp,
        right: &Expr,
        scope: &Scope,
    ) -> Result<(), SqlError> {
        for side in [left, right] {
            if let Expr::Subquery(subquery) = side {
                self.query(subquery, Some(scope))?;
            }
        }

        let lhs = self.column(left, scope)?;
        let rhs = self.column(right, scope)?;

        match (lhs, rhs) {
            (Some(lhs), Some(rhs)) => {
                if lhs.table != rhs.table {
                    push_unique(
                        &mut self.keys.join_predicates,
                        JoinPredicate { lhs, rhs, op },
                    );
                }
            }
            (Some(column), None) if is_operand(right) => self.filter(column, op),
            (None, Some(column)) if is_operand(left) => self.filter(column, op.flip()),
            _ => {}
        }
        Ok(())
    }

    /// Resolve a column reference; `None` for non-columns and columns of derived tables
    fn column(&self, expr: &Expr, scope: &Scope) -> Result<Option<ColumnRef>, SqlError> {
        match expr {
            Expr::Identifier(ident) => self.unqualified(&ident.value, scope),
            Expr::CompoundIdentifier(idents) if idents.len() >= 2 => {
                let qualifier = &idents[idents.len() - 2].value;
                let name = &idents[idents.len() - 1].value;
                self.qualified(qualifier, name, scope)
            }
            Expr::Nested(inner) => self.column(inner, scope),
            _ => Ok(None),
        }
    }

    fn qualified(
        &self,
        qualifier: &str,
        name: &str,
        scope: &Scope,
    ) -> Result<Option<ColumnRef>, SqlError> {
        let mut current = Some(scope);
        while let Some(level) = current {
            let found = level
                .sources
                .iter()
                .find(|s| s.visible == qualifier)
                .or_else(|| {
                    level
                        .sources
                        .iter()
                        .find(|s| s.visible.eq_ignore_ascii_case(qualifier))
                });

            if let Some(source) = found {
                return Ok(source.table.as_ref().map(|t| ColumnRef::new(t, name)));
            }
            current = level.parent;
        }
        Err(SqlError::UnknownTable(qualifier.to_string()))
    }

    fn unqualified(&self, name: &str, scope: &Scope) -> Result<Option<ColumnRef>, SqlError> {
        let mut current = Some(scope);
        while let Some(level) = current {
            if let [only] = level.sources.as_slice() {
                return Ok(only.table.as_ref().and_then(|table| {
                    match self.schema.has_column(table, name) {
                        Some(false) => None,
                        _ => Some(ColumnRef::new(table, name)),
                    }
                }));
            }

            if !level.sources.is_empty() {
                let mut matches = Vec::new();
                let mut unknown = false;
                for source in &level.sources {
                    match source
                        .table
                        .as_ref()
                        .map(|t| (t, self.schema.has_column(t, name)))
                    {
                        Some((table, Some(true))) => matches.push(table),
                        Some((_, Some(false))) => {}
                        _ => unknown = true,
                    }
                }

                match matches.as_slice() {
                    [table] if !unknown => return Ok(Some(ColumnRef::new(*table, name))),
                    [] if !unknown => {}
                    _ => return Err(SqlError::AmbiguousColumn(name.to_string())),
                }
            }

            current = level.parent;
        }
        Ok(None)
    }
}

fn join_constraint(op: &JoinOperator) -> Option<&JoinConstraint> {
    match op {
        JoinOperator::Inner(c)
        | JoinOperator::LeftOuter(c)
        | JoinOperator::RightOuter(c)
        | JoinOperator::FullOuter(c) => Some(c),
        _ => None,
    }
}

fn references_column(expr: &Expr) -> bool {
    visit_expressions(expr, |e| match e {
        Expr::Identifier(_) | Expr::CompoundIdentifier(_) => ControlFlow::Break(()),
        _ => ControlFlow::Continue(()),
    })
    .is_break()
}

/// A comparison operand that pins a column to a value
fn is_operand(expr: &Expr) -> bool {
    matches!(expr, Expr::Subquery(_)) || !references_column(expr)
}
