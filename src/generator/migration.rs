use super::identifier::PgIdentifierNameGenerator;
use super::options::GeneratingOptions;
use crate::models::{Column, ColumnsAware, ForeignKey};
use itertools::Itertools;

/// Produces advisory DDL for records of one type.
pub trait DbMigrationGenerator<T> {
    fn generate_one(&self, row: &T) -> String;

    /// One statement per record, same order, no deduplication.
    fn generate_all(&self, rows: &[T]) -> Vec<String> {
        rows.iter().map(|row| self.generate_one(row)).collect()
    }
}

/// Renders `create index` statements covering foreign key columns.
#[derive(Debug, Clone, Default)]
pub struct PgIndexOnForeignKeyGenerator {
    options: GeneratingOptions,
}

impl PgIndexOnForeignKeyGenerator {
    pub fn new(options: GeneratingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &GeneratingOptions {
        &self.options
    }

    pub fn generate<C: ColumnsAware>(&self, source: &C) -> String {
        let names = PgIdentifierNameGenerator::of(source, &self.options);
        let full_name = names.full_index_name();
        let truncated = names.needs_truncation();
        let index_name = names.index_identifier();

        let mut sql = String::new();
        if truncated || self.options.is_always_comment() {
            sql.push_str("/* ");
            sql.push_str(&full_name);
            sql.push_str(" */");
            sql.push_str(if self.options.is_break_lines() { "\n" } else { " " });
        }

        sql.push_str(&self.keyword("create index "));
        if self.options.is_concurrently() {
            sql.push_str(&self.keyword("concurrently "));
        }
        sql.push_str(&self.keyword("if not exists "));
        sql.push_str(&index_name);

        if self.options.is_break_lines() {
            sql.push('\n');
            sql.push_str(&" ".repeat(usize::from(self.options.indentation())));
        } else {
            sql.push(' ');
        }

        let columns = source.columns();
        sql.push_str(&self.keyword("on "));
        sql.push_str(source.table_name());
        sql.push_str(" (");
        sql.push_str(&columns.iter().map(Column::column_name).join(", "));
        sql.push(')');

        if self.options.is_exclude_nulls() {
            let conditions = columns
                .iter()
                .filter(|column| column.is_nullable())
                .map(|column| format!("{} {}", column.column_name(), self.keyword("is not null")))
                .join(&format!(" {} ", self.keyword("or")));
            if !conditions.is_empty() {
                sql.push(' ');
                sql.push_str(&self.keyword("where "));
                sql.push_str(&conditions);
            }
        }

        sql.push(';');
        sql
    }

    fn keyword(&self, keyword: &str) -> String {
        if self.options.is_uppercase_for_keywords() {
            keyword.to_uppercase()
        } else {
            keyword.to_lowercase()
        }
    }
}

impl DbMigrationGenerator<ForeignKey> for PgIndexOnForeignKeyGenerator {
    fn generate_one(&self, row: &ForeignKey) -> String {
        PgIndexOnForeignKeyGenerator::generate(self, row)
    }
}

impl DbMigrationGenerator<Column> for PgIndexOnForeignKeyGenerator {
    fn generate_one(&self, row: &Column) -> String {
        PgIndexOnForeignKeyGenerator::generate(self, row)
    }
}
