use super::options::{GeneratingOptions, IdxPosition};
use crate::models::{Column, ColumnsAware};

/// PostgreSQL truncates identifiers longer than this many bytes.
pub const MAX_IDENTIFIER_LENGTH: usize = 63;
pub const DELIMITER: &str = "_";

const IDX: &str = "idx";
const WITHOUT_NULLS: &str = "without_nulls";

/// Derives index names for a set of columns of one table.
///
/// The full name lists every column. When it does not fit into an identifier, the
/// columns are replaced by a fingerprint and the table name is cut to fit.
/// Quoted table and column names contribute their unquoted text.
#[derive(Debug, Clone)]
pub struct PgIdentifierNameGenerator {
    table_name: String,
    column_names: Vec<String>,
    without_nulls: bool,
    idx_position: IdxPosition,
}

impl PgIdentifierNameGenerator {
    pub fn of<C: ColumnsAware>(source: &C, options: &GeneratingOptions) -> Self {
        let columns = source.columns();
        Self {
            table_name: table_name_without_schema(source.table_name()),
            column_names: columns
                .iter()
                .map(|column| unquote(column.column_name()))
                .collect(),
            without_nulls: options.marks_without_nulls(columns.iter().any(Column::is_nullable)),
            idx_position: options.idx_position(),
        }
    }

    pub fn full_index_name(&self) -> String {
        self.compose(&self.table_name, &self.column_names.join(DELIMITER))
    }

    pub fn truncated_index_name(&self) -> String {
        let fingerprint = self.fingerprint();
        let reserved = self.compose("", &fingerprint).len();
        let table_name = truncate_at_char_boundary(
            &self.table_name,
            MAX_IDENTIFIER_LENGTH.saturating_sub(reserved),
        );
        self.compose(table_name, &fingerprint)
    }

    pub fn needs_truncation(&self) -> bool {
        self.full_index_name().len() > MAX_IDENTIFIER_LENGTH
    }

    /// The full name when it fits, the truncated one otherwise.
    pub fn index_name(&self) -> String {
        let full = self.full_index_name();
        if full.len() <= MAX_IDENTIFIER_LENGTH {
            full
        } else {
            self.truncated_index_name()
        }
    }

    /// [`Self::index_name`] as it has to appear in DDL, quoted when needed.
    pub fn index_identifier(&self) -> String {
        quote_if_needed(&self.index_name())
    }

    fn fingerprint(&self) -> String {
        string_hash(&self.column_names.join(DELIMITER))
            .unsigned_abs()
            .to_string()
    }

    fn compose(&self, table_name: &str, body: &str) -> String {
        let mut parts = Vec::with_capacity(5);
        if self.idx_position == IdxPosition::Prefix {
            parts.push(IDX);
        }
        parts.push(table_name);
        parts.push(body);
        if self.without_nulls {
            parts.push(WITHOUT_NULLS);
        }
        if self.idx_position == IdxPosition::Suffix {
            parts.push(IDX);
        }
        parts.join(DELIMITER)
    }
}

/// Last part of a possibly schema-qualified name. Dots inside quotes do not split.
fn table_name_without_schema(table_name: &str) -> String {
    let mut in_quotes = false;
    let mut start = 0;
    for (i, ch) in table_name.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '.' if !in_quotes => start = i + 1,
            _ => {}
        }
    }
    unquote(&table_name[start..])
}

/// `"Some""Name"` becomes `Some"Name`; unquoted names are returned as is.
pub(crate) fn unquote(identifier: &str) -> String {
    match identifier
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        Some(inner) => inner.replace("\"\"", "\""),
        None => identifier.to_string(),
    }
}

/// Wraps the name in double quotes unless PostgreSQL would read it unchanged.
pub(crate) fn quote_if_needed(identifier: &str) -> String {
    let mut chars = identifier.chars();
    let plain_start = chars
        .next()
        .is_some_and(|ch| ch.is_ascii_lowercase() || ch == '_' || !ch.is_ascii());
    let plain_rest =
        chars.all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' || ch == '$' || !ch.is_ascii());
    if plain_start && plain_rest {
        identifier.to_string()
    } else {
        format!("\"{}\"", identifier.replace('"', "\"\""))
    }
}

/// 32-bit polynomial hash over UTF-16 code units (`h = 31 * h + c`).
pub(crate) fn string_hash(value: &str) -> i32 {
    value
        .encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

fn truncate_at_char_boundary(value: &str, max_len: usize) -> &str {
    if value.len() <= max_len {
        return value;
    }
    let mut end = max_len;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}
