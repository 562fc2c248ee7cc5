use super::validation::{
    not_blank, same_table, MalformedDuplicatedIndexesSnafu, NotEnoughRowsSnafu, Result,
};
use super::{DbObject, IndexSizeAware, IndexWithSize, IndexesAware, TableNameAware};
use itertools::Itertools;
use serde::Serialize;
use snafu::ensure;
use std::fmt;
use std::hash::{Hash, Hasher};

const ENTRY_SEPARATOR: &str = ";";
const FIELD_SEPARATOR: &str = ",";
const INDEX_NAME_PREFIX: &str = "idx=";
const SIZE_PREFIX: &str = "size=";

/// A group of at least two functionally identical indexes of one table.
///
/// Indexes are kept sorted by table, name and size, so two groups built from the same
/// indexes in a different order are equal.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicatedIndexes {
    table_name: String,
    total_size: i64,
    indexes: Vec<IndexWithSize>,
    #[serde(skip)]
    name: String,
}

impl DuplicatedIndexes {
    pub fn of(indexes: impl IntoIterator<Item = IndexWithSize>) -> Result<Self> {
        let mut indexes: Vec<IndexWithSize> = indexes.into_iter().collect();
        ensure!(
            indexes.len() >= 2,
            NotEnoughRowsSnafu {
                field: "duplicated_indexes",
                count: indexes.len()
            }
        );
        same_table(indexes.iter().map(|i| i.table_name()))?;
        indexes.sort_by(IndexWithSize::canonical_cmp);

        let table_name = indexes[0].table_name().to_string();
        let total_size = indexes.iter().map(|i| i.index_size_in_bytes()).sum();
        let name = indexes.iter().map(|i| i.index_name()).join(",");
        Ok(Self {
            table_name,
            total_size,
            indexes,
            name,
        })
    }

    /// Builds the group from the raw description the catalog query reports for a table,
    /// e.g. `idx=i_a, size=16384; idx=i_b, size=8192`.
    pub fn from_raw(table_name: &str, duplicated_as_string: &str) -> Result<Self> {
        let table_name = not_blank(table_name, "table_name")?;
        let indexes = parse_index_name_and_size(duplicated_as_string)?
            .into_iter()
            .map(|(index_name, size)| IndexWithSize::of(&table_name, &index_name, size))
            .collect::<Result<Vec<_>>>()?;
        Self::of(indexes)
    }

    pub fn duplicated_indexes(&self) -> &[IndexWithSize] {
        &self.indexes
    }

    pub fn total_size(&self) -> i64 {
        self.total_size
    }

    pub fn index_names(&self) -> Vec<&str> {
        self.indexes.iter().map(|i| i.index_name()).collect()
    }
}

impl PartialEq for DuplicatedIndexes {
    fn eq(&self, other: &Self) -> bool {
        self.indexes == other.indexes
    }
}

impl Eq for DuplicatedIndexes {}

impl Hash for DuplicatedIndexes {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.indexes.hash(state);
    }
}

impl TableNameAware for DuplicatedIndexes {
    fn table_name(&self) -> &str {
        &self.table_name
    }
}

impl IndexesAware for DuplicatedIndexes {
    fn index_names(&self) -> Vec<&str> {
        DuplicatedIndexes::index_names(self)
    }
}

impl IndexSizeAware for DuplicatedIndexes {
    fn index_size_in_bytes(&self) -> i64 {
        self.total_size
    }
}

impl DbObject for DuplicatedIndexes {
    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for DuplicatedIndexes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on {} (total {} bytes)",
            self.index_names().join(", "),
            self.table_name,
            self.total_size
        )
    }
}

/// Splits `idx=<name>, size=<bytes>; ...` into ordered `(name, size)` pairs.
pub fn parse_index_name_and_size(raw: &str) -> Result<Vec<(String, i64)>> {
    let raw = not_blank(raw, "duplicated_as_string")?;
    raw.split(ENTRY_SEPARATOR)
        .map(|entry| parse_entry(&raw, entry.trim()))
        .collect()
}

fn parse_entry(raw: &str, entry: &str) -> Result<(String, i64)> {
    let malformed = |reason: String| {
        MalformedDuplicatedIndexesSnafu {
            input: raw,
            reason,
        }
        .build()
    };

    let (name_part, size_part) = entry
        .split_once(FIELD_SEPARATOR)
        .ok_or_else(|| malformed(format!("entry '{entry}' has no size")))?;
    let index_name = name_part
        .trim()
        .strip_prefix(INDEX_NAME_PREFIX)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| malformed(format!("entry '{entry}' has no index name")))?;
    let size = size_part
        .trim()
        .strip_prefix(SIZE_PREFIX)
        .and_then(|size| size.trim().parse::<i64>().ok())
        .filter(|size| *size >= 0)
        .ok_or_else(|| malformed(format!("entry '{entry}' has an invalid size")))?;

    Ok((index_name.to_string(), size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ValidationError;
    use rstest::rstest;
    use std::collections::HashSet;

    fn index(table: &str, name: &str, size: i64) -> IndexWithSize {
        IndexWithSize::of(table, name, size).unwrap()
    }

    #[test]
    fn sorts_indexes_and_sums_sizes() {
        let duplicated = DuplicatedIndexes::of(vec![
            index("t", "i3", 3),
            index("t", "i1", 1),
            index("t", "i2", 2),
        ])
        .unwrap();

        assert_eq!(duplicated.table_name(), "t");
        assert_eq!(duplicated.total_size(), 6);
        assert_eq!(duplicated.index_names(), vec!["i1", "i2", "i3"]);
        assert_eq!(duplicated.name(), "i1,i2,i3");
        assert_eq!(
            duplicated.to_string(),
            "i1, i2, i3 on t (total 6 bytes)"
        );
    }

    #[test]
    fn equality_does_not_depend_on_input_order() {
        let first = DuplicatedIndexes::of(vec![index("t", "a", 1), index("t", "b", 2)]).unwrap();
        let second = DuplicatedIndexes::of(vec![index("t", "b", 2), index("t", "a", 1)]).unwrap();
        assert_eq!(first, second);

        let set: HashSet<DuplicatedIndexes> = [first, second].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn total_size_is_exact_for_large_indexes() {
        let big = i64::MAX / 4;
        let duplicated =
            DuplicatedIndexes::of(vec![index("t", "a", big), index("t", "b", big)]).unwrap();
        assert_eq!(duplicated.total_size(), big * 2);
    }

    #[test]
    fn rejects_single_index() {
        assert_eq!(
            DuplicatedIndexes::of(vec![index("t", "a", 1)]).unwrap_err(),
            ValidationError::NotEnoughRows {
                field: "duplicated_indexes",
                count: 1
            }
        );
    }

    #[test]
    fn rejects_indexes_of_different_tables() {
        let err = DuplicatedIndexes::of(vec![index("t1", "a", 1), index("t2", "b", 1)]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TableMismatch {
                expected: "t1".into(),
                actual: "t2".into()
            }
        );
    }

    #[test]
    fn builds_from_raw_description() {
        let duplicated = DuplicatedIndexes::from_raw(
            "accounts",
            "idx=i_accounts_number, size=16384; idx=accounts_number_key, size=8192",
        )
        .unwrap();

        assert_eq!(
            duplicated.index_names(),
            vec!["accounts_number_key", "i_accounts_number"]
        );
        assert_eq!(duplicated.total_size(), 24576);
        assert_eq!(
            duplicated,
            DuplicatedIndexes::of(vec![
                index("accounts", "accounts_number_key", 0),
                index("accounts", "i_accounts_number", 0),
            ])
            .unwrap()
        );
    }

    #[test]
    fn parser_keeps_reported_order() {
        assert_eq!(
            parse_index_name_and_size("idx=b, size=2; idx=a, size=1").unwrap(),
            vec![("b".to_string(), 2), ("a".to_string(), 1)]
        );
    }

    #[rstest]
    #[case("")]
    #[case("idx=a")]
    #[case("idx=a, size=1; idx=b")]
    #[case("name=a, size=1")]
    #[case("idx=, size=1")]
    #[case("idx=a, size=abc")]
    #[case("idx=a, size=-5")]
    #[case("idx=a, bytes=5")]
    fn parser_rejects_malformed_input(#[case] raw: &str) {
        assert!(parse_index_name_and_size(raw).is_err());
    }

    #[test]
    fn malformed_error_names_the_entry() {
        let err = parse_index_name_and_size("idx=a, size=1; idx=b").unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot parse duplicated indexes from 'idx=a, size=1; idx=b': entry 'idx=b' has no size"
        );
    }

    #[test]
    fn from_raw_with_single_entry_is_not_a_group() {
        assert!(matches!(
            DuplicatedIndexes::from_raw("t", "idx=a, size=1").unwrap_err(),
            ValidationError::NotEnoughRows { .. }
        ));
    }
}
