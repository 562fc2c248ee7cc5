use super::validation::{not_blank, same_table, EmptySnafu, Result, UnknownConstraintTypeSnafu};
use super::{Column, ColumnsAware, DbObject, PgContext, TableNameAware};
use serde::Serialize;
use snafu::ensure;
use std::fmt;

/// Subset of `pg_constraint.contype` codes the diagnostics report on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintType {
    Check,
    ForeignKey,
}

impl ConstraintType {
    pub fn pg_con_type(&self) -> &'static str {
        match self {
            ConstraintType::Check => "c",
            ConstraintType::ForeignKey => "f",
        }
    }

    pub fn from_pg_con_type(code: &str) -> Result<Self> {
        match code {
            "c" => Ok(ConstraintType::Check),
            "f" => Ok(ConstraintType::ForeignKey),
            _ => UnknownConstraintTypeSnafu { code }.fail(),
        }
    }
}

/// A constraint that was created `NOT VALID` and never validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Constraint {
    table_name: String,
    constraint_name: String,
    constraint_type: ConstraintType,
}

impl Constraint {
    pub fn of(table_name: &str, constraint_name: &str, constraint_type: ConstraintType) -> Result<Self> {
        Ok(Self {
            table_name: not_blank(table_name, "table_name")?,
            constraint_name: not_blank(constraint_name, "constraint_name")?,
            constraint_type,
        })
    }

    pub fn with_context(
        ctx: &PgContext,
        table_name: &str,
        constraint_name: &str,
        constraint_type: ConstraintType,
    ) -> Result<Self> {
        Self::of(&ctx.enrich_with_schema(table_name), constraint_name, constraint_type)
    }

    pub fn constraint_name(&self) -> &str {
        &self.constraint_name
    }

    pub fn constraint_type(&self) -> ConstraintType {
        self.constraint_type
    }
}

impl TableNameAware for Constraint {
    fn table_name(&self) -> &str {
        &self.table_name
    }
}

impl DbObject for Constraint {
    fn name(&self) -> &str {
        &self.constraint_name
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on {} ({})",
            self.constraint_name,
            self.table_name,
            self.constraint_type.pg_con_type()
        )
    }
}

/// A foreign key with the ordered columns it is declared on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ForeignKey {
    table_name: String,
    constraint_name: String,
    columns: Vec<Column>,
}

impl ForeignKey {
    pub fn of(table_name: &str, constraint_name: &str, columns: Vec<Column>) -> Result<Self> {
        let table_name = not_blank(table_name, "table_name")?;
        let constraint_name = not_blank(constraint_name, "constraint_name")?;
        ensure!(!columns.is_empty(), EmptySnafu { field: "columns" });
        same_table(
            std::iter::once(table_name.as_str()).chain(columns.iter().map(|c| c.table_name())),
        )?;
        Ok(Self {
            table_name,
            constraint_name,
            columns,
        })
    }

    pub fn of_column(table_name: &str, constraint_name: &str, column: Column) -> Result<Self> {
        Self::of(table_name, constraint_name, vec![column])
    }

    pub fn constraint_name(&self) -> &str {
        &self.constraint_name
    }
}

impl TableNameAware for ForeignKey {
    fn table_name(&self) -> &str {
        &self.table_name
    }
}

impl ColumnsAware for ForeignKey {
    fn columns(&self) -> &[Column] {
        &self.columns
    }
}

impl DbObject for ForeignKey {
    fn name(&self) -> &str {
        &self.constraint_name
    }
}

impl fmt::Display for ForeignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let columns: Vec<&str> = self.columns.iter().map(|c| c.column_name()).collect();
        write!(
            f,
            "{} on {} ({})",
            self.constraint_name,
            self.table_name,
            columns.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ValidationError;
    use rstest::rstest;

    #[rstest]
    #[case("c", ConstraintType::Check)]
    #[case("f", ConstraintType::ForeignKey)]
    fn constraint_type_round_trips_pg_codes(#[case] code: &str, #[case] expected: ConstraintType) {
        let parsed = ConstraintType::from_pg_con_type(code).unwrap();
        assert_eq!(parsed, expected);
        assert_eq!(parsed.pg_con_type(), code);
    }

    #[test]
    fn unknown_constraint_type_is_rejected() {
        assert_eq!(
            ConstraintType::from_pg_con_type("u").unwrap_err().to_string(),
            "unknown constraint type: 'u'"
        );
    }

    #[test]
    fn foreign_key_requires_columns() {
        assert_eq!(
            ForeignKey::of("t", "fk", vec![]).unwrap_err(),
            ValidationError::Empty { field: "columns" }
        );
    }

    #[test]
    fn foreign_key_columns_belong_to_its_table() {
        let err = ForeignKey::of(
            "t",
            "fk",
            vec![Column::of_not_null("other", "c").unwrap()],
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::TableMismatch { .. }));
    }

    #[test]
    fn foreign_key_keeps_column_order() {
        let fk = ForeignKey::of(
            "t",
            "fk",
            vec![
                Column::of_not_null("t", "b").unwrap(),
                Column::of_nullable("t", "a").unwrap(),
            ],
        )
        .unwrap();
        let names: Vec<&str> = fk.columns().iter().map(|c| c.column_name()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(fk.to_string(), "fk on t (b, a)");
        assert_eq!(fk.name(), "fk");
    }
}
