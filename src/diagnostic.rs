use crate::checks::queries;
use crate::connection::ServerVersion;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How results of a diagnostic relate across the hosts of a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionType {
    /// Derived from the schema, identical on every host.
    Static,
    /// Derived from statistics, may differ from host to host.
    Runtime,
}

impl ExecutionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionType::Static => "static",
            ExecutionType::Runtime => "runtime",
        }
    }
}

/// Extra values a diagnostic query binds after the schema name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryParameters {
    SchemaOnly,
    SchemaAndBloatThreshold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Diagnostic {
    InvalidIndexes,
    DuplicatedIndexes,
    IntersectedIndexes,
    UnusedIndexes,
    ForeignKeysWithoutIndex,
    TablesWithMissingIndexes,
    TablesWithoutPrimaryKey,
    IndexesWithNullValues,
    BloatedIndexes,
    BloatedTables,
    NotValidConstraints,
}

impl Diagnostic {
    pub const ALL: [Diagnostic; 11] = [
        Diagnostic::InvalidIndexes,
        Diagnostic::DuplicatedIndexes,
        Diagnostic::IntersectedIndexes,
        Diagnostic::UnusedIndexes,
        Diagnostic::ForeignKeysWithoutIndex,
        Diagnostic::TablesWithMissingIndexes,
        Diagnostic::TablesWithoutPrimaryKey,
        Diagnostic::IndexesWithNullValues,
        Diagnostic::BloatedIndexes,
        Diagnostic::BloatedTables,
        Diagnostic::NotValidConstraints,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Diagnostic::InvalidIndexes => "invalid_indexes",
            Diagnostic::DuplicatedIndexes => "duplicated_indexes",
            Diagnostic::IntersectedIndexes => "intersected_indexes",
            Diagnostic::UnusedIndexes => "unused_indexes",
            Diagnostic::ForeignKeysWithoutIndex => "foreign_keys_without_index",
            Diagnostic::TablesWithMissingIndexes => "tables_with_missing_indexes",
            Diagnostic::TablesWithoutPrimaryKey => "tables_without_primary_key",
            Diagnostic::IndexesWithNullValues => "indexes_with_null_values",
            Diagnostic::BloatedIndexes => "bloated_indexes",
            Diagnostic::BloatedTables => "bloated_tables",
            Diagnostic::NotValidConstraints => "not_valid_constraints",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Diagnostic::InvalidIndexes => "Invalid (broken) indexes",
            Diagnostic::DuplicatedIndexes => "Duplicated (completely identical) indexes",
            Diagnostic::IntersectedIndexes => "Intersected (partially identical) indexes",
            Diagnostic::UnusedIndexes => "Unused indexes",
            Diagnostic::ForeignKeysWithoutIndex => "Foreign keys without associated indexes",
            Diagnostic::TablesWithMissingIndexes => "Tables with potentially missing indexes",
            Diagnostic::TablesWithoutPrimaryKey => "Tables without primary key",
            Diagnostic::IndexesWithNullValues => "Indexes that contain null values",
            Diagnostic::BloatedIndexes => "Indexes with bloat",
            Diagnostic::BloatedTables => "Tables with bloat",
            Diagnostic::NotValidConstraints => "Constraints that were never validated",
        }
    }

    pub fn execution_type(&self) -> ExecutionType {
        match self {
            Diagnostic::UnusedIndexes
            | Diagnostic::TablesWithMissingIndexes
            | Diagnostic::BloatedIndexes
            | Diagnostic::BloatedTables => ExecutionType::Runtime,
            _ => ExecutionType::Static,
        }
    }

    pub fn is_static(&self) -> bool {
        self.execution_type() == ExecutionType::Static
    }

    pub fn is_runtime(&self) -> bool {
        self.execution_type() == ExecutionType::Runtime
    }

    /// Resolves the catalog query variant matching the server version.
    pub fn query(&self, version: ServerVersion) -> &'static str {
        match self {
            Diagnostic::InvalidIndexes => queries::INVALID_INDEXES,
            Diagnostic::DuplicatedIndexes if version.is_at_least(15) => {
                queries::DUPLICATED_INDEXES_PG15
            }
            Diagnostic::DuplicatedIndexes => queries::DUPLICATED_INDEXES,
            Diagnostic::IntersectedIndexes => queries::INTERSECTED_INDEXES,
            Diagnostic::UnusedIndexes => queries::UNUSED_INDEXES,
            Diagnostic::ForeignKeysWithoutIndex => queries::FOREIGN_KEYS_WITHOUT_INDEX,
            Diagnostic::TablesWithMissingIndexes => queries::TABLES_WITH_MISSING_INDEXES,
            Diagnostic::TablesWithoutPrimaryKey => queries::TABLES_WITHOUT_PRIMARY_KEY,
            Diagnostic::IndexesWithNullValues => queries::INDEXES_WITH_NULL_VALUES,
            Diagnostic::BloatedIndexes => queries::BLOATED_INDEXES,
            Diagnostic::BloatedTables => queries::BLOATED_TABLES,
            Diagnostic::NotValidConstraints => queries::NOT_VALID_CONSTRAINTS,
        }
    }

    pub fn query_parameters(&self) -> QueryParameters {
        match self {
            Diagnostic::BloatedIndexes | Diagnostic::BloatedTables => {
                QueryParameters::SchemaAndBloatThreshold
            }
            _ => QueryParameters::SchemaOnly,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
