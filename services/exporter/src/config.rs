//! Command-line and environment configuration.

use std::path::PathBuf;

use clap::Parser;
use tracing::Level;

use crate::error::Result;
use crate::pipeline::{PipelineConfig, DEFAULT_RECORDS_PER_INSERT};

#[derive(Parser, Debug)]
#[command(name = "era5-exporter")]
#[command(about = "Export ERA5 reanalysis data to VictoriaMetrics")]
pub struct Args {
    /// Path to an ERA5 file in NetCDF format
    #[arg(long, env = "ERA5_FILE")]
    pub file: PathBuf,

    /// Number of concurrent requests to VictoriaMetrics (default: CPU count)
    #[arg(long, env = "ERA5_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Number of records sent to VictoriaMetrics in one request
    #[arg(long, env = "ERA5_RECS_PER_INSERT", default_value_t = DEFAULT_RECORDS_PER_INSERT)]
    pub recs_per_insert: usize,

    /// VictoriaMetrics insert API URL; the path selects the wire format
    ///
    /// Supported paths:
    ///   /influx/write, /influx/api/v2/write, /write, /api/v2/write
    ///     InfluxDB line protocol
    ///   /api/v1/import/csv
    ///     CSV, with the `format` column mapping appended to the query
    #[arg(
        long,
        env = "VM_INSERT_URL",
        default_value = "http://localhost:8428/write",
        verbatim_doc_comment
    )]
    pub vm_insert_url: String,

    /// Prefix added to metric names (alphanumeric, cannot be empty)
    #[arg(long, env = "ERA5_METRIC_PREFIX", default_value = "era5")]
    pub metric_prefix: String,

    /// Export only this many hours of data (0: no limit)
    #[arg(long, env = "ERA5_LIMIT_HOURS", default_value_t = 0)]
    pub limit_hours: usize,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Serve Prometheus metrics on this port
    #[arg(long, env = "METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

/// Validated exporter settings.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub file: PathBuf,
    pub pipeline: PipelineConfig,
    pub vm_insert_url: String,
    pub metric_prefix: String,
    pub limit_hours: Option<usize>,
    pub log_level: Level,
    pub metrics_port: Option<u16>,
}

impl Args {
    pub fn into_config(self) -> Result<ExporterConfig> {
        let concurrency = self
            .concurrency
            .unwrap_or_else(|| PipelineConfig::default().concurrency);
        let pipeline = PipelineConfig::new(concurrency, self.recs_per_insert)?;

        Ok(ExporterConfig {
            file: self.file,
            pipeline,
            vm_insert_url: self.vm_insert_url,
            metric_prefix: self.metric_prefix,
            limit_hours: (self.limit_hours > 0).then_some(self.limit_hours),
            log_level: parse_level(&self.log_level),
            metrics_port: self.metrics_port,
        })
    }
}

/// Unknown names fall back to INFO.
pub fn parse_level(name: &str) -> Level {
    match name.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("era5-exporter").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--file", "era5.nc"]).into_config().unwrap();

        assert_eq!(config.file, PathBuf::from("era5.nc"));
        assert_eq!(config.pipeline.records_per_insert, 500);
        assert!(config.pipeline.concurrency >= 1);
        assert_eq!(config.vm_insert_url, "http://localhost:8428/write");
        assert_eq!(config.metric_prefix, "era5");
        assert_eq!(config.limit_hours, None);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.metrics_port, None);
    }

    #[test]
    fn test_explicit_values() {
        let config = parse(&[
            "--file",
            "/data/era5.nc",
            "--concurrency",
            "3",
            "--recs-per-insert",
            "1000",
            "--vm-insert-url",
            "http://vm:8428/api/v1/import/csv",
            "--metric-prefix",
            "reanalysis",
            "--limit-hours",
            "24",
            "--log-level",
            "DEBUG",
            "--metrics-port",
            "9100",
        ])
        .into_config()
        .unwrap();

        assert_eq!(config.pipeline, PipelineConfig::new(3, 1000).unwrap());
        assert_eq!(config.vm_insert_url, "http://vm:8428/api/v1/import/csv");
        assert_eq!(config.metric_prefix, "reanalysis");
        assert_eq!(config.limit_hours, Some(24));
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.metrics_port, Some(9100));
    }

    #[test]
    fn test_file_is_required() {
        assert!(Args::try_parse_from(["era5-exporter"]).is_err());
    }

    #[test]
    fn test_zero_sizes_rejected() {
        let err = parse(&["--file", "a.nc", "--concurrency", "0"])
            .into_config()
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));

        let err = parse(&["--file", "a.nc", "--recs-per-insert", "0"])
            .into_config()
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn test_log_level_available_when_config_invalid() {
        let args = parse(&["--file", "a.nc", "--concurrency", "0", "--log-level", "debug"]);
        assert_eq!(parse_level(&args.log_level), Level::DEBUG);
        assert!(args.into_config().is_err());
    }

    #[test]
    fn test_help_lists_supported_paths() {
        let help = Args::command().render_long_help().to_string();
        for path in vm_client::supported_paths() {
            assert!(help.contains(path), "{path} missing from --help");
        }
    }

    #[test]
    fn test_parse_level_fallback() {
        assert_eq!(parse_level("warn"), Level::WARN);
        assert_eq!(parse_level("verbose"), Level::INFO);
    }
}
