use super::validation::{not_blank, percentage, Result};
use serde::Serialize;

pub const DEFAULT_SCHEMA_NAME: &str = "public";
pub const DEFAULT_BLOAT_PERCENTAGE_THRESHOLD: f64 = 10.0;

/// Schema and thresholds a single check invocation runs with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PgContext {
    schema_name: String,
    bloat_percentage_threshold: f64,
}

impl PgContext {
    pub fn of(schema_name: &str) -> Result<Self> {
        Self::with_bloat_threshold(schema_name, DEFAULT_BLOAT_PERCENTAGE_THRESHOLD)
    }

    pub fn with_bloat_threshold(schema_name: &str, bloat_percentage_threshold: f64) -> Result<Self> {
        Ok(Self {
            schema_name: not_blank(schema_name, "schema_name")?.to_lowercase(),
            bloat_percentage_threshold: percentage(
                bloat_percentage_threshold,
                "bloat_percentage_threshold",
            )?,
        })
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    pub fn bloat_percentage_threshold(&self) -> f64 {
        self.bloat_percentage_threshold
    }

    pub fn is_default_schema(&self) -> bool {
        self.schema_name == DEFAULT_SCHEMA_NAME
    }

    /// Qualifies a bare object name with the schema unless it lives in the default schema
    /// or is already qualified.
    pub fn enrich_with_schema(&self, object_name: &str) -> String {
        if self.is_default_schema() {
            return object_name.to_string();
        }
        let prefix = format!("{}.", self.schema_name);
        if object_name.to_lowercase().starts_with(&prefix) {
            return object_name.to_string();
        }
        format!("{}{}", prefix, object_name)
    }
}

impl Default for PgContext {
    fn default() -> Self {
        Self {
            schema_name: DEFAULT_SCHEMA_NAME.to_string(),
            bloat_percentage_threshold: DEFAULT_BLOAT_PERCENTAGE_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("public", "accounts", "accounts")]
    #[case("custom", "accounts", "custom.accounts")]
    #[case("custom", "custom.accounts", "custom.accounts")]
    #[case("custom", "CUSTOM.accounts", "CUSTOM.accounts")]
    #[case("CuStOm", "accounts", "custom.accounts")]
    fn enriches_object_names(#[case] schema: &str, #[case] name: &str, #[case] expected: &str) {
        let ctx = PgContext::of(schema).unwrap();
        assert_eq!(ctx.enrich_with_schema(name), expected);
    }

    #[test]
    fn default_context_uses_public_schema() {
        let ctx = PgContext::default();
        assert!(ctx.is_default_schema());
        assert_eq!(ctx.schema_name(), DEFAULT_SCHEMA_NAME);
        assert_eq!(ctx.bloat_percentage_threshold(), 10.0);
        assert_eq!(ctx, PgContext::of("public").unwrap());
    }

    #[test]
    fn rejects_invalid_arguments() {
        assert!(PgContext::of("  ").is_err());
        assert!(PgContext::with_bloat_threshold("public", -1.0).is_err());
        assert!(PgContext::with_bloat_threshold("public", 101.0).is_err());
    }
}
