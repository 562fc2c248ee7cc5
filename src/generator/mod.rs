//! Advisory SQL migrations for diagnostic findings.

pub mod identifier;
pub mod migration;
pub mod options;

pub use identifier::{PgIdentifierNameGenerator, DELIMITER, MAX_IDENTIFIER_LENGTH};
pub use migration::{DbMigrationGenerator, PgIndexOnForeignKeyGenerator};
pub use options::{
    GeneratingOptions, GeneratingOptionsBuilder, IdxPosition, DEFAULT_INDENTATION, MAX_INDENTATION,
};
