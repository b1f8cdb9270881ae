//! barscan runtime configuration handling

use crate::decoder::{Backend, QR_CODE, SymbolFilter};
use crate::error::{Error, Result};
use crate::policy::{
    DEFAULT_DIVISOR_LIMIT, DEFAULT_TILE_STRIDE, DecodePolicy, PolicyKind, RoiSweep,
};
use crate::report::{DEFAULT_REPORT_PREFIX, report_file_name};
use crate::store::Source;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration structure persisted to disk or environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BarscanConfig {
    /// Decode policy and sweep geometry
    pub scan: ScanOptions,
    /// Report file placement
    pub report: ReportOptions,
    /// Logging configuration
    pub logging: LoggingOptions,
}

impl BarscanConfig {
    /// Load configuration from an explicit path or fall back to discovered defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = explicit_path {
            Self::from_file(path)?
        } else if let Some(path) = Self::discover_file()? {
            tracing::info!("Using configuration file: {}", path.display());
            Self::from_file(&path)?
        } else {
            tracing::debug!("No barscan.toml / barscan.yaml found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Attempt to locate a configuration file in common locations.
    fn discover_file() -> Result<Option<PathBuf>> {
        let cwd =
            env::current_dir().map_err(|e| Error::Config(format!("Failed to read cwd: {e}")))?;
        for candidate in ["barscan.toml", "barscan.yaml", "barscan.yml"] {
            let path = cwd.join(candidate);
            if path.exists() {
                return Ok(Some(path));
            }
        }

        if let Some(xdg_config) = env::var_os("XDG_CONFIG_HOME") {
            let base = PathBuf::from(xdg_config).join("barscan");
            for candidate in ["config.toml", "config.yaml"] {
                let path = base.join(candidate);
                if path.exists() {
                    return Ok(Some(path));
                }
            }
        }

        Ok(None)
    }

    /// Read configuration from a concrete file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;

        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase()
            .as_str()
        {
            "toml" => toml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse TOML {}: {e}", path.display()))
            }),
            "yaml" | "yml" => serde_yaml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse YAML {}: {e}", path.display()))
            }),
            other => Err(Error::Config(format!(
                "Unsupported config format '{}', expected toml/yaml",
                other
            ))),
        }
    }

    /// Apply environment variable overrides after file/default loading.
    fn apply_env_overrides(&mut self) {
        self.scan.apply_env_overrides();
        self.report.apply_env_overrides();
        self.logging.apply_env_overrides();
    }

    /// Validate the options and freeze them into the configuration of one run.
    pub fn run_config(&self, source: Source) -> Result<RunConfig> {
        let sweep = RoiSweep::new(self.scan.tile_stride, self.scan.divisor_limit)?;
        let prefix = self.report.prefix.trim();
        if prefix.is_empty() {
            return Err(Error::Config("report prefix must not be empty".to_string()));
        }

        Ok(RunConfig {
            source,
            policy: DecodePolicy::from_kind(self.scan.policy, sweep),
            filter: SymbolFilter::excluding(self.scan.exclude_types.iter().map(|t| t.trim())),
            background: self.scan.background,
            report_dir: self.report.output_dir.clone(),
            report_prefix: prefix.to_string(),
        })
    }
}

/// Decoding behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// Decoding engine
    pub backend: Backend,
    /// Direct or iterative decoding
    pub policy: PolicyKind,
    /// Pixels between region origins during the sweep
    pub tile_stride: u32,
    /// Exclusive bound on the region divisor sequence
    pub divisor_limit: u32,
    /// Symbol kinds left out of the report text
    pub exclude_types: Vec<String>,
    /// Decode each image on a blocking worker thread
    pub background: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            backend: Backend::Zbar,
            policy: PolicyKind::Direct,
            tile_stride: DEFAULT_TILE_STRIDE,
            divisor_limit: DEFAULT_DIVISOR_LIMIT,
            exclude_types: vec![QR_CODE.to_string()],
            background: true,
        }
    }
}

impl ScanOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(backend) = env::var("BARSCAN_BACKEND") {
            if let Some(parsed) = Backend::parse(&backend) {
                self.backend = parsed;
            }
        }
        if let Ok(policy) = env::var("BARSCAN_POLICY") {
            if let Some(parsed) = PolicyKind::parse(&policy) {
                self.policy = parsed;
            }
        }
        if let Ok(stride) = env::var("BARSCAN_TILE_STRIDE") {
            if let Ok(parsed) = stride.parse::<u32>() {
                self.tile_stride = parsed;
            }
        }
        if let Ok(limit) = env::var("BARSCAN_DIVISOR_LIMIT") {
            if let Ok(parsed) = limit.parse::<u32>() {
                self.divisor_limit = parsed;
            }
        }
        if let Ok(types) = env::var("BARSCAN_EXCLUDE_TYPES") {
            self.exclude_types = types
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(background) = env::var("BARSCAN_BACKGROUND") {
            if let Some(parsed) = parse_flag(&background) {
                self.background = parsed;
            }
        }
    }
}

/// Report file placement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    /// Directory receiving report files
    pub output_dir: PathBuf,
    /// Leading component of report file names
    pub prefix: String,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            prefix: DEFAULT_REPORT_PREFIX.to_string(),
        }
    }
}

impl ReportOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(dir) = env::var("BARSCAN_REPORT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Ok(prefix) = env::var("BARSCAN_REPORT_PREFIX") {
            self.prefix = prefix;
        }
    }
}

/// Structured logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingOptions {
    /// Level for barscan's own events, or full `EnvFilter` directives
    /// (overridable via `BARSCAN_LOG_LEVEL`)
    pub level: String,
    /// Optional log file path for teeing structured logs
    pub file: Option<PathBuf>,
    /// Force ANSI colors in terminal logging
    pub color: bool,
    /// Optional log rotation strategy applied to `file`
    pub rotation: Option<LogRotation>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            color: true,
            rotation: None,
        }
    }
}

impl LoggingOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(level) = env::var("BARSCAN_LOG_LEVEL") {
            self.level = level;
        }
        if let Ok(file) = env::var("BARSCAN_LOG_FILE") {
            self.file = Some(PathBuf::from(file));
        }
        if let Ok(color) = env::var("BARSCAN_LOG_COLOR") {
            if let Some(parsed) = parse_flag(&color) {
                self.color = parsed;
            }
        }
        if let Ok(rotation) = env::var("BARSCAN_LOG_ROTATION") {
            if let Some(parsed) = LogRotation::parse(&rotation) {
                self.rotation = Some(parsed);
            }
        }
    }
}

/// Supported log rotation policies for file sinks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// Rotate log files once per hour
    Hourly,
    /// Rotate log files once per day
    Daily,
}

impl LogRotation {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            _ => None,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" => Some(true),
        "0" | "false" | "off" => Some(false),
        _ => None,
    }
}

/// Everything one run needs, fixed before the first file is read
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Where the file list comes from
    pub source: Source,
    /// How each image is decoded
    pub policy: DecodePolicy,
    /// Which symbol kinds reach the report
    pub filter: SymbolFilter,
    /// Decode on a blocking worker while the loop waits
    pub background: bool,
    /// Directory receiving the report file
    pub report_dir: PathBuf,
    /// Leading component of the report file name
    pub report_prefix: String,
}

impl RunConfig {
    /// Default options for `source` with the given policy
    pub fn new(source: Source, policy: DecodePolicy) -> Self {
        Self {
            source,
            policy,
            filter: SymbolFilter::default(),
            background: true,
            report_dir: PathBuf::from("."),
            report_prefix: DEFAULT_REPORT_PREFIX.to_string(),
        }
    }

    /// Report location for a run over `total` files
    pub fn report_path(&self, total: usize) -> PathBuf {
        self.report_dir.join(report_file_name(
            &self.report_prefix,
            total,
            &self.source.label(),
            self.policy.kind(),
        ))
    }
}
