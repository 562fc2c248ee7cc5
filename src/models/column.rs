use super::validation::{not_blank, Result};
use super::{ColumnsAware, DbObject, PgContext, TableNameAware};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Column {
    table_name: String,
    column_name: String,
    not_null: bool,
}

impl Column {
    fn new(table_name: &str, column_name: &str, not_null: bool) -> Result<Self> {
        Ok(Self {
            table_name: not_blank(table_name, "table_name")?,
            column_name: not_blank(column_name, "column_name")?,
            not_null,
        })
    }

    pub fn of_not_null(table_name: &str, column_name: &str) -> Result<Self> {
        Self::new(table_name, column_name, true)
    }

    pub fn of_nullable(table_name: &str, column_name: &str) -> Result<Self> {
        Self::new(table_name, column_name, false)
    }

    pub fn with_context(
        ctx: &PgContext,
        table_name: &str,
        column_name: &str,
        nullable: bool,
    ) -> Result<Self> {
        Self::new(&ctx.enrich_with_schema(table_name), column_name, !nullable)
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    pub fn is_nullable(&self) -> bool {
        !self.not_null
    }

    pub fn is_not_null(&self) -> bool {
        self.not_null
    }
}

impl TableNameAware for Column {
    fn table_name(&self) -> &str {
        &self.table_name
    }
}

impl ColumnsAware for Column {
    fn columns(&self) -> &[Column] {
        std::slice::from_ref(self)
    }
}

impl DbObject for Column {
    fn name(&self) -> &str {
        &self.column_name
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nullability = if self.not_null { "not null" } else { "nullable" };
        write!(f, "{}.{} ({})", self.table_name, self.column_name, nullability)
    }
}
