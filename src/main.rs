use clap::{Args, Parser, Subcommand};
use pg_index_health::checker::HealthChecker;
use pg_index_health::config::{ClusterConfig, DbConfig};
use pg_index_health::diagnostic::Diagnostic;
use pg_index_health::generator::{GeneratingOptions, IdxPosition, DEFAULT_INDENTATION};
use pg_index_health::reporter::{ReportFormat, Reporter};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// PostgreSQL index health checker - finds index and table problems across a cluster
#[derive(Parser, Debug)]
#[command(name = "pg-index-health")]
#[command(version = "0.1.0")]
#[command(about = "PostgreSQL index health checker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value = "markdown")]
    format: ReportFormat,

    /// Enable verbose logging
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Args, Debug)]
struct ConnectionArgs {
    /// Database host
    #[arg(
        short = 'H',
        long = "host",
        env = "POSTGRES_HOST",
        default_value = "localhost"
    )]
    host: String,

    /// Database port
    #[arg(long = "port", env = "POSTGRES_PORT", default_value = "5432")]
    port: u16,

    /// Database name
    #[arg(short = 'd', long = "database", env = "POSTGRES_DATABASE")]
    database: String,

    /// Username
    #[arg(short = 'u', long = "username", env = "POSTGRES_USER")]
    username: String,

    /// Password
    #[arg(short = 'p', long = "password", env = "POSTGRES_PASSWORD")]
    password: String,

    /// Schema to inspect
    #[arg(short = 's', long = "schema", default_value = "public")]
    schema: String,

    /// Abort any diagnostic query running longer than this
    #[arg(long = "statement-timeout-secs")]
    statement_timeout_secs: Option<u64>,
}

impl ConnectionArgs {
    fn into_cluster_config(self) -> ClusterConfig {
        let primary = DbConfig::from_connection_params(
            self.host,
            self.port,
            self.database,
            self.username,
            self.password,
        );
        let mut config = ClusterConfig::single_host(primary);
        config.schema = self.schema;
        config.statement_timeout_secs = self.statement_timeout_secs;
        config
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run diagnostics against a single PostgreSQL database
    Check {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Diagnostics to run (all when omitted)
        #[arg(long = "diagnostic", value_enum)]
        diagnostics: Vec<Diagnostic>,
    },
    /// Run all diagnostics on every cluster of a YAML config file
    Config {
        /// Path to YAML config file
        #[arg(short = 'c', long = "config")]
        config_path: String,
    },
    /// Generate indexes for foreign keys that are not covered by one
    Migrate {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Build indexes without `concurrently`
        #[arg(long = "normally", default_value_t = false)]
        normally: bool,

        /// Index null values of nullable columns too
        #[arg(long = "include-nulls", default_value_t = false)]
        include_nulls: bool,

        /// Keep each statement on a single line
        #[arg(long = "single-line", default_value_t = false)]
        single_line: bool,

        /// Spaces before the `on` clause when breaking lines
        #[arg(long = "indentation", default_value_t = DEFAULT_INDENTATION)]
        indentation: u8,

        /// Uppercase SQL keywords
        #[arg(long = "uppercase", default_value_t = false)]
        uppercase: bool,

        /// Do not mark names of partial indexes with `without_nulls`
        #[arg(long = "no-without-nulls-suffix", default_value_t = false)]
        no_without_nulls_suffix: bool,

        /// Where to put the `idx` marker in generated names
        #[arg(long = "idx-position", value_enum, default_value = "suffix")]
        idx_position: IdxPosition,

        /// Prefix every statement with the full index name, not only truncated ones
        #[arg(long = "always-comment", default_value_t = false)]
        always_comment: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let reporter = Reporter::new(cli.format);

    match cli.command {
        Commands::Check {
            connection,
            diagnostics,
        } => {
            info!("Checking database: {}", connection.database);
            let diagnostics = if diagnostics.is_empty() {
                Diagnostic::ALL.to_vec()
            } else {
                diagnostics
            };

            let checker = HealthChecker::new(connection.into_cluster_config()).await?;
            let report = checker.check(&diagnostics).await?;
            reporter.report(&report)?;
        }
        Commands::Config { config_path } => {
            info!("Loading config from: {}", config_path);
            let configs = ClusterConfig::from_config_file(&config_path)?;

            for config in configs {
                info!("Checking cluster: {}", config.name);
                let checker = HealthChecker::new(config).await?;
                let report = checker.check(&Diagnostic::ALL).await?;
                reporter.report(&report)?;
            }
        }
        Commands::Migrate {
            connection,
            normally,
            include_nulls,
            single_line,
            indentation,
            uppercase,
            no_without_nulls_suffix,
            idx_position,
            always_comment,
        } => {
            info!("Generating migrations for database: {}", connection.database);
            let mut builder = GeneratingOptions::builder()
                .with_indentation(indentation)?
                .with_idx_position(idx_position);
            if normally {
                builder = builder.normally();
            }
            if include_nulls {
                builder = builder.include_nulls();
            }
            if single_line {
                builder = builder.do_not_break_lines();
            }
            if uppercase {
                builder = builder.uppercase_for_keywords();
            }
            if no_without_nulls_suffix {
                builder = builder.do_not_name_without_nulls();
            }
            if always_comment {
                builder = builder.always_comment();
            }

            let checker = HealthChecker::new(connection.into_cluster_config()).await?;
            let statements = checker.foreign_key_migrations(builder.build()).await?;
            reporter.report_migrations(&statements)?;
        }
    }

    Ok(())
}
