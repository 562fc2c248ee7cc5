use crate::checker::{DiagnosticResult, HealthReport};
use clap::ValueEnum;
use itertools::Itertools;
use snafu::{ResultExt, Snafu};
use std::io::Write;

#[derive(Debug, Snafu)]
pub enum ReporterError {
    #[snafu(display("Failed to write output: {}", source))]
    OutputError { source: std::io::Error },

    #[snafu(display("Failed to serialize report: {}", source))]
    JsonError { source: serde_json::Error },
}

type Result<T, E = ReporterError> = std::result::Result<T, E>;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReportFormat {
    /// Markdown formatted report
    Markdown,
    /// JSON formatted report
    Json,
    /// Plain text summary
    Text,
}

pub struct Reporter {
    format: ReportFormat,
}

impl Reporter {
    pub fn new(format: ReportFormat) -> Self {
        Self { format }
    }

    pub fn report(&self, report: &HealthReport) -> Result<()> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        self.write_report(&mut handle, report)
    }

    pub fn write_report<W: Write>(&self, out: &mut W, report: &HealthReport) -> Result<()> {
        match self.format {
            ReportFormat::Markdown => self.report_markdown(out, report),
            ReportFormat::Json => self.report_json(out, report),
            ReportFormat::Text => self.report_text(out, report),
        }
    }

    pub fn report_migrations(&self, statements: &[String]) -> Result<()> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        self.write_migrations(&mut handle, statements)
    }

    /// Prints generated statements separated by blank lines.
    pub fn write_migrations<W: Write>(&self, out: &mut W, statements: &[String]) -> Result<()> {
        match self.format {
            ReportFormat::Json => {
                serde_json::to_writer_pretty(&mut *out, statements).context(JsonSnafu)?;
                writeln!(out).context(OutputSnafu)?;
            }
            ReportFormat::Markdown => {
                writeln!(out, "```sql").context(OutputSnafu)?;
                writeln!(out, "{}", statements.join("\n\n")).context(OutputSnafu)?;
                writeln!(out, "```").context(OutputSnafu)?;
            }
            ReportFormat::Text => {
                for statement in statements {
                    writeln!(out, "{}\n", statement).context(OutputSnafu)?;
                }
            }
        }
        Ok(())
    }

    fn report_markdown<W: Write>(&self, out: &mut W, report: &HealthReport) -> Result<()> {
        writeln!(out, "# PostgreSQL Index Health Report\n").context(OutputSnafu)?;

        writeln!(out, "- **Cluster**: {}", report.cluster).context(OutputSnafu)?;
        writeln!(out, "- **Schema**: {}", report.schema).context(OutputSnafu)?;
        writeln!(out, "- **Hosts**: {}", report.hosts.iter().join(", ")).context(OutputSnafu)?;
        writeln!(out, "- **Statistics Reset**: {}", format_stats_reset(report)).context(OutputSnafu)?;
        writeln!(out, "- **Total Findings**: {}", report.total_findings()).context(OutputSnafu)?;
        writeln!(out).context(OutputSnafu)?;

        writeln!(out, "| Diagnostic | Type | Findings |").context(OutputSnafu)?;
        writeln!(out, "|------------|------|----------|").context(OutputSnafu)?;
        for result in &report.results {
            writeln!(
                out,
                "| {} | {} | {} |",
                result.diagnostic,
                result.execution_type.as_str(),
                result.findings.len()
            )
            .context(OutputSnafu)?;
        }

        for result in report.results.iter().filter(|r| !r.is_healthy()) {
            writeln!(out).context(OutputSnafu)?;
            self.write_result_markdown(out, result)?;
        }

        Ok(())
    }

    fn write_result_markdown<W: Write>(&self, out: &mut W, result: &DiagnosticResult) -> Result<()> {
        writeln!(
            out,
            "## {} (`{}`)\n",
            result.diagnostic.description(),
            result.diagnostic
        )
        .context(OutputSnafu)?;
        for finding in &result.findings {
            writeln!(out, "- `{}`", finding.summary).context(OutputSnafu)?;
        }
        Ok(())
    }

    fn report_json<W: Write>(&self, out: &mut W, report: &HealthReport) -> Result<()> {
        serde_json::to_writer_pretty(&mut *out, report).context(JsonSnafu)?;
        writeln!(out).context(OutputSnafu)?;
        Ok(())
    }

    fn report_text<W: Write>(&self, out: &mut W, report: &HealthReport) -> Result<()> {
        writeln!(out, "PostgreSQL Index Health Report").context(OutputSnafu)?;
        writeln!(out, "==============================\n").context(OutputSnafu)?;

        writeln!(out, "Cluster:  {}", report.cluster).context(OutputSnafu)?;
        writeln!(out, "Schema:   {}", report.schema).context(OutputSnafu)?;
        writeln!(out, "Hosts:    {}", report.hosts.iter().join(", ")).context(OutputSnafu)?;
        writeln!(out, "Reset:    {}", format_stats_reset(report)).context(OutputSnafu)?;
        writeln!(out, "Findings: {}", report.total_findings()).context(OutputSnafu)?;
        writeln!(out).context(OutputSnafu)?;

        for result in &report.results {
            writeln!(
                out,
                "[{}] {} ({}): {}",
                self.format_status(result),
                result.diagnostic,
                result.execution_type.as_str(),
                result.findings.len()
            )
            .context(OutputSnafu)?;
            for finding in &result.findings {
                writeln!(out, "    {}", finding.summary).context(OutputSnafu)?;
            }
        }

        Ok(())
    }

    fn format_status(&self, result: &DiagnosticResult) -> &str {
        if result.is_healthy() {
            " OK "
        } else {
            "FAIL"
        }
    }
}

fn format_stats_reset(report: &HealthReport) -> String {
    match report.stats_reset {
        Some(reset) => reset.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "never".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::Finding;
    use crate::connection::PgHost;
    use crate::diagnostic::Diagnostic;
    use crate::models::{IndexWithSize, Table, TableWithBloat};
    use chrono::{TimeZone, Utc};

    fn sample_report() -> HealthReport {
        let index = IndexWithSize::of("accounts", "accounts_number_idx", 16384).unwrap();
        let table =
            TableWithBloat::of(Table::of("clients", 81920).unwrap(), 40960, 50.0).unwrap();
        HealthReport {
            cluster: "orders".into(),
            schema: "public".into(),
            hosts: vec![PgHost::new("primary", 5432), PgHost::new("replica", 5433)],
            stats_reset: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).single(),
            results: vec![
                DiagnosticResult::new(
                    Diagnostic::InvalidIndexes,
                    vec![Finding::of(&index).unwrap()],
                ),
                DiagnosticResult::new(Diagnostic::DuplicatedIndexes, vec![]),
                DiagnosticResult::new(
                    Diagnostic::BloatedTables,
                    vec![Finding::of(&table).unwrap()],
                ),
            ],
        }
    }

    fn render(format: ReportFormat) -> String {
        let mut out = Vec::new();
        Reporter::new(format)
            .write_report(&mut out, &sample_report())
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn markdown_report() {
        insta::assert_snapshot!(render(ReportFormat::Markdown), @r###"
        # PostgreSQL Index Health Report

        - **Cluster**: orders
        - **Schema**: public
        - **Hosts**: primary:5432, replica:5433
        - **Statistics Reset**: 2024-05-01 12:30:00 UTC
        - **Total Findings**: 2

        | Diagnostic | Type | Findings |
        |------------|------|----------|
        | invalid_indexes | static | 1 |
        | duplicated_indexes | static | 0 |
        | bloated_tables | runtime | 1 |

        ## Invalid (broken) indexes (`invalid_indexes`)

        - `accounts_number_idx on accounts (16384 bytes)`

        ## Tables with bloat (`bloated_tables`)

        - `clients (81920 bytes), bloat 40960 bytes (50.0%)`
        "###);
    }

    #[test]
    fn text_report() {
        insta::assert_snapshot!(render(ReportFormat::Text), @r###"
        PostgreSQL Index Health Report
        ==============================

        Cluster:  orders
        Schema:   public
        Hosts:    primary:5432, replica:5433
        Reset:    2024-05-01 12:30:00 UTC
        Findings: 2

        [FAIL] invalid_indexes (static): 1
            accounts_number_idx on accounts (16384 bytes)
        [ OK ] duplicated_indexes (static): 0
        [FAIL] bloated_tables (runtime): 1
            clients (81920 bytes), bloat 40960 bytes (50.0%)
        "###);
    }

    #[test]
    fn json_report_round_trips_findings() {
        let json: serde_json::Value =
            serde_json::from_str(&render(ReportFormat::Json)).unwrap();

        assert_eq!(json["cluster"], "orders");
        assert_eq!(json["hosts"][1]["port"], 5433);
        assert_eq!(json["stats_reset"], "2024-05-01T12:30:00Z");
        assert_eq!(json["results"][0]["diagnostic"], "invalid_indexes");
        assert_eq!(json["results"][2]["execution_type"], "runtime");
        assert_eq!(
            json["results"][2]["findings"][0]["object"]["bloat_percentage"],
            50.0
        );
    }

    #[test]
    fn missing_stats_reset_is_reported_as_never() {
        let mut report = sample_report();
        report.stats_reset = None;
        let mut out = Vec::new();
        Reporter::new(ReportFormat::Text)
            .write_report(&mut out, &report)
            .unwrap();

        assert!(String::from_utf8(out).unwrap().contains("Reset:    never\n"));
    }

    #[test]
    fn migrations_are_separated_by_blank_lines() {
        let statements = vec![
            "create index concurrently if not exists a_b_idx\n    on a (b);".to_string(),
            "create index concurrently if not exists c_d_idx\n    on c (d);".to_string(),
        ];
        let mut out = Vec::new();
        Reporter::new(ReportFormat::Text)
            .write_migrations(&mut out, &statements)
            .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "create index concurrently if not exists a_b_idx\n    on a (b);\n\n\
             create index concurrently if not exists c_d_idx\n    on c (d);\n\n"
        );
    }
}
