use crate::models::validation::{IndentationOutOfRangeSnafu, Result, ValidationError};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use snafu::ensure;

pub const MAX_INDENTATION: u8 = 8;
pub const DEFAULT_INDENTATION: u8 = 4;

/// Where the `idx` marker goes in a generated index name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IdxPosition {
    Prefix,
    #[default]
    Suffix,
    None,
}

/// Rendering options for generated `create index` statements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGeneratingOptions")]
pub struct GeneratingOptions {
    concurrently: bool,
    exclude_nulls: bool,
    break_lines: bool,
    indentation: u8,
    uppercase_for_keywords: bool,
    name_without_nulls: bool,
    idx_position: IdxPosition,
    always_comment: bool,
}

impl Default for GeneratingOptions {
    fn default() -> Self {
        Self {
            concurrently: true,
            exclude_nulls: true,
            break_lines: true,
            indentation: DEFAULT_INDENTATION,
            uppercase_for_keywords: false,
            name_without_nulls: true,
            idx_position: IdxPosition::Suffix,
            always_comment: false,
        }
    }
}

/// Deserialized form, validated into [`GeneratingOptions`]. Missing fields take defaults.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawGeneratingOptions {
    concurrently: bool,
    exclude_nulls: bool,
    break_lines: bool,
    indentation: u8,
    uppercase_for_keywords: bool,
    name_without_nulls: bool,
    idx_position: IdxPosition,
    always_comment: bool,
}

impl Default for RawGeneratingOptions {
    fn default() -> Self {
        let defaults = GeneratingOptions::default();
        Self {
            concurrently: defaults.concurrently,
            exclude_nulls: defaults.exclude_nulls,
            break_lines: defaults.break_lines,
            indentation: defaults.indentation,
            uppercase_for_keywords: defaults.uppercase_for_keywords,
            name_without_nulls: defaults.name_without_nulls,
            idx_position: defaults.idx_position,
            always_comment: defaults.always_comment,
        }
    }
}

impl TryFrom<RawGeneratingOptions> for GeneratingOptions {
    type Error = ValidationError;

    fn try_from(raw: RawGeneratingOptions) -> Result<Self> {
        let mut options = GeneratingOptions::builder()
            .with_indentation(raw.indentation)?
            .build();
        options.concurrently = raw.concurrently;
        options.exclude_nulls = raw.exclude_nulls;
        options.break_lines = raw.break_lines;
        options.uppercase_for_keywords = raw.uppercase_for_keywords;
        options.name_without_nulls = raw.name_without_nulls;
        options.idx_position = raw.idx_position;
        options.always_comment = raw.always_comment;
        Ok(options)
    }
}

impl GeneratingOptions {
    pub fn builder() -> GeneratingOptionsBuilder {
        GeneratingOptionsBuilder::default()
    }

    pub fn is_concurrently(&self) -> bool {
        self.concurrently
    }

    pub fn is_exclude_nulls(&self) -> bool {
        self.exclude_nulls
    }

    pub fn is_break_lines(&self) -> bool {
        self.break_lines
    }

    pub fn indentation(&self) -> u8 {
        self.indentation
    }

    pub fn is_uppercase_for_keywords(&self) -> bool {
        self.uppercase_for_keywords
    }

    pub fn is_name_without_nulls(&self) -> bool {
        self.name_without_nulls
    }

    pub fn idx_position(&self) -> IdxPosition {
        self.idx_position
    }

    pub fn is_always_comment(&self) -> bool {
        self.always_comment
    }

    /// Whether generated names carry the `without_nulls` marker for these columns.
    pub(crate) fn marks_without_nulls(&self, has_nullable_column: bool) -> bool {
        self.exclude_nulls && self.name_without_nulls && has_nullable_column
    }
}

#[derive(Debug, Clone, Default)]
pub struct GeneratingOptionsBuilder {
    options: GeneratingOptions,
}

impl GeneratingOptionsBuilder {
    pub fn concurrently(mut self) -> Self {
        self.options.concurrently = true;
        self
    }

    pub fn normally(mut self) -> Self {
        self.options.concurrently = false;
        self
    }

    pub fn exclude_nulls(mut self) -> Self {
        self.options.exclude_nulls = true;
        self
    }

    pub fn include_nulls(mut self) -> Self {
        self.options.exclude_nulls = false;
        self
    }

    pub fn break_lines(mut self) -> Self {
        self.options.break_lines = true;
        self
    }

    pub fn do_not_break_lines(mut self) -> Self {
        self.options.break_lines = false;
        self
    }

    pub fn with_indentation(mut self, indentation: u8) -> Result<Self> {
        ensure!(
            indentation <= MAX_INDENTATION,
            IndentationOutOfRangeSnafu { indentation }
        );
        self.options.indentation = indentation;
        Ok(self)
    }

    pub fn uppercase_for_keywords(mut self) -> Self {
        self.options.uppercase_for_keywords = true;
        self
    }

    pub fn lowercase_for_keywords(mut self) -> Self {
        self.options.uppercase_for_keywords = false;
        self
    }

    pub fn name_without_nulls(mut self) -> Self {
        self.options.name_without_nulls = true;
        self
    }

    pub fn do_not_name_without_nulls(mut self) -> Self {
        self.options.name_without_nulls = false;
        self
    }

    pub fn with_idx_position(mut self, idx_position: IdxPosition) -> Self {
        self.options.idx_position = idx_position;
        self
    }

    pub fn always_comment(mut self) -> Self {
        self.options.always_comment = true;
        self
    }

    pub fn comment_only_truncated(mut self) -> Self {
        self.options.always_comment = false;
        self
    }

    pub fn build(self) -> GeneratingOptions {
        self.options
    }
}
