//! Positional arguments for stored procedure calls.
//!
//! Procedures are schema-versioned and positional, so the order in which arguments are
//! added to a [`ProcedureCall`] is part of the wire contract.

use sqlx::MySql;
use sqlx::mysql::MySqlArguments;

/// A single procedure argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcArg {
    Bool(bool),
    /// Stored as i64 for maximum range
    Int(i64),
    Float(f64),
    Text(String),
}

impl ProcArg {
    /// Get the type name of this argument for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
        }
    }
}

impl From<bool> for ProcArg {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ProcArg {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ProcArg {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for ProcArg {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ProcArg {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<&String> for ProcArg {
    fn from(v: &String) -> Self {
        Self::Text(v.clone())
    }
}

impl From<String> for ProcArg {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// A named stored procedure and its ordered arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureCall {
    name: &'static str,
    args: Vec<ProcArg>,
}

impl ProcedureCall {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            args: Vec::new(),
        }
    }

    /// Append the next positional argument.
    pub fn arg(mut self, value: impl Into<ProcArg>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn args(&self) -> &[ProcArg] {
        &self.args
    }

    /// `CALL <schema>.<name>(?,...)` with one placeholder per argument.
    pub fn statement(&self, schema: &str) -> String {
        let placeholders = vec!["?"; self.args.len()].join(",");
        format!("CALL {}.{}({})", schema, self.name, placeholders)
    }

    /// Bind every argument, in order, to a prepared statement.
    pub(crate) fn bind<'q>(
        &'q self,
        mut query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    ) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
        for arg in &self.args {
            query = bind_mysql_arg(query, arg);
        }
        query
    }
}

/// Bind an argument to a MySQL query.
fn bind_mysql_arg<'q>(
    query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    arg: &'q ProcArg,
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    match arg {
        ProcArg::Bool(v) => query.bind(*v),
        ProcArg::Int(v) => query.bind(*v),
        ProcArg::Float(v) => query.bind(*v),
        ProcArg::Text(v) => query.bind(v.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_placeholders() {
        let call = ProcedureCall::new("UpdateOrder")
            .arg(42_i64)
            .arg(10.5)
            .arg(0.25)
            .arg(100.0)
            .arg("FILLED");
        assert_eq!(
            call.statement("cryptopump"),
            "CALL cryptopump.UpdateOrder(?,?,?,?,?)"
        );
    }

    #[test]
    fn test_statement_without_arguments() {
        let call = ProcedureCall::new("GetThreadCount");
        assert_eq!(
            call.statement("cryptopump_test"),
            "CALL cryptopump_test.GetThreadCount()"
        );
    }

    #[test]
    fn test_arguments_keep_declared_order() {
        let call = ProcedureCall::new("GetOrderTransactionCount")
            .arg("thread-1")
            .arg("BUY")
            .arg(-60);
        assert_eq!(
            call.args(),
            &[
                ProcArg::Text("thread-1".to_string()),
                ProcArg::Text("BUY".to_string()),
                ProcArg::Int(-60),
            ]
        );
        assert_eq!(call.args()[2].type_name(), "int");
    }
}
