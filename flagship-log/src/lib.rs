//! Flagship Logging
//!
//! Structured logging shared by the evaluation engine and the experiment
//! engine. Output goes to stderr and is controlled entirely through
//! `FLAGSHIP_*` environment variables, so the hot evaluation path pays only an
//! atomic load when a level is disabled.
//!
//! # Usage
//!
//! ```rust
//! use flagship_log::{debug, info, warn, Fields, targets};
//!
//! info!("Evaluator ready");
//! debug!(target: targets::EVALUATION, "Evaluating flag {}", "new-ui");
//!
//! let fields = Fields::new().with("flag", "new-ui").with("variant", "treatment");
//! info!(target: targets::EXPOSURE, fields: fields, "Exposure recorded");
//! warn!("Exposure sink slow");
//! ```
//!
//! # Environment Variables
//!
//! - `FLAGSHIP_DEBUG=1` - Enable debug logging
//! - `FLAGSHIP_LOG_LEVEL=trace|debug|info|warn|error|off` - Minimum level
//! - `FLAGSHIP_LOG_FORMAT=pretty|compact|json` - Output format (default `json`)
//! - `FLAGSHIP_LOG_COLOR=1|0` - Colored level names in pretty output
//! - `FLAGSHIP_LOG_TIMESTAMPS=1|0` - Prefix entries with a timestamp

use once_cell::sync::Lazy;
use std::env;
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

// ============================================================================
// Levels and formats
// ============================================================================

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    /// Disables all output.
    Off = 5,
}

impl Level {
    /// Upper-case name used in every output format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Off => "OFF",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Level::Trace,
            1 => Level::Debug,
            2 => Level::Info,
            3 => Level::Warn,
            4 => Level::Error,
            _ => Level::Off,
        }
    }

    #[cfg(feature = "color")]
    fn colored(&self) -> colored::ColoredString {
        use colored::Colorize;
        match self {
            Level::Trace => self.as_str().magenta(),
            Level::Debug => self.as_str().blue(),
            Level::Info => self.as_str().green(),
            Level::Warn => self.as_str().yellow(),
            Level::Error => self.as_str().red().bold(),
            Level::Off => self.as_str().white(),
        }
    }
}

impl FromStr for Level {
    type Err = UnknownSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "off" | "none" => Ok(Level::Off),
            _ => Err(UnknownSetting(s.to_string())),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output layout of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Human-readable, one entry per line with full timestamp.
    Pretty,
    /// Short timestamp and a single-letter level.
    Compact,
    /// One JSON object per line.
    Json,
}

impl FromStr for Format {
    type Err = UnknownSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Format::Pretty),
            "compact" => Ok(Format::Compact),
            "json" => Ok(Format::Json),
            _ => Err(UnknownSetting(s.to_string())),
        }
    }
}

/// A level or format name that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSetting(pub String);

impl fmt::Display for UnknownSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown log setting: {}", self.0)
    }
}

impl std::error::Error for UnknownSetting {}

/// Well-known log targets used across the Flagship crates.
pub mod targets {
    pub const EVALUATION: &str = "flagship::evaluation";
    pub const EXPOSURE: &str = "flagship::exposure";
    pub const EXPERIMENT: &str = "flagship::experiment";
    pub const CLIENT: &str = "flagship::client";
    pub const CONFIG: &str = "flagship::config";
}

// ============================================================================
// Structured fields
// ============================================================================

/// Ordered key-value pairs attached to a single log entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    pairs: Vec<(&'static str, String)>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field. Later duplicates are kept; JSON output keeps the last.
    pub fn with(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.pairs.push((key, value.to_string()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.pairs.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

impl fmt::Display for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}

// ============================================================================
// Global configuration
// ============================================================================

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);
static LOG_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);
static CONFIG: Lazy<LogConfig> = Lazy::new(|| {
    let config = LogConfig::from_env();
    DEBUG_ENABLED.store(config.debug, Ordering::SeqCst);
    LOG_LEVEL.store(config.level as u8, Ordering::SeqCst);
    config
});

/// Logging configuration resolved from the environment.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub debug: bool,
    pub level: Level,
    pub format: Format,
    pub color: bool,
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Json,
            color: false,
            timestamps: true,
        }
    }
}

impl LogConfig {
    /// Read `FLAGSHIP_*` variables, falling back to defaults for anything
    /// missing or unparseable.
    pub fn from_env() -> Self {
        let debug = env_flag("FLAGSHIP_DEBUG").unwrap_or(false);
        let level = env::var("FLAGSHIP_LOG_LEVEL")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(if debug { Level::Debug } else { Level::Info });
        let format = env::var("FLAGSHIP_LOG_FORMAT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(Format::Json);
        let color = env_flag("FLAGSHIP_LOG_COLOR")
            .unwrap_or_else(|| env::var("NO_COLOR").is_err() && env::var("TERM").is_ok());
        let timestamps = env_flag("FLAGSHIP_LOG_TIMESTAMPS").unwrap_or(true);

        Self {
            debug,
            level,
            format,
            color,
            timestamps,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

// ============================================================================
// Public API
// ============================================================================

/// Resolve configuration eagerly. Otherwise this happens on first use.
pub fn init() {
    Lazy::force(&CONFIG);
}

/// Resolved configuration.
pub fn config() -> &'static LogConfig {
    &CONFIG
}

#[inline]
pub fn is_debug_enabled() -> bool {
    init();
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

#[inline]
pub fn is_level_enabled(level: Level) -> bool {
    init();
    if level == Level::Off {
        return false;
    }
    level as u8 >= LOG_LEVEL.load(Ordering::Relaxed)
        || (level == Level::Debug && DEBUG_ENABLED.load(Ordering::Relaxed))
}

pub fn current_level() -> Level {
    init();
    Level::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

/// Override the minimum level at runtime.
pub fn set_level(level: Level) {
    init();
    LOG_LEVEL.store(level as u8, Ordering::SeqCst);
}

/// Toggle debug mode at runtime. Enabling it lowers the level to `Debug`.
pub fn set_debug(enabled: bool) {
    init();
    DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    if enabled && current_level() > Level::Debug {
        set_level(Level::Debug);
    }
}

// ============================================================================
// Output
// ============================================================================

#[doc(hidden)]
pub fn log(level: Level, target: &str, message: &str) {
    log_fields(level, target, message, &Fields::default());
}

#[doc(hidden)]
pub fn log_fields(level: Level, target: &str, message: &str, fields: &Fields) {
    if !is_level_enabled(level) {
        return;
    }
    let line = render(config(), level, target, message, fields);
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr, "{}", line);
}

fn render(config: &LogConfig, level: Level, target: &str, message: &str, fields: &Fields) -> String {
    match config.format {
        Format::Pretty => render_pretty(config, level, target, message, fields),
        Format::Compact => render_compact(config, level, target, message, fields),
        Format::Json => render_json(level, target, message, fields),
    }
}

fn render_pretty(
    config: &LogConfig,
    level: Level,
    target: &str,
    message: &str,
    fields: &Fields,
) -> String {
    let mut out = String::new();
    if config.timestamps {
        out.push_str(&chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f ").to_string());
    }

    #[cfg(feature = "color")]
    let level_name = if config.color {
        level.colored().to_string()
    } else {
        level.as_str().to_string()
    };
    #[cfg(not(feature = "color"))]
    let level_name = level.as_str().to_string();

    out.push_str(&format!("{:5} ", level_name));
    if !target.is_empty() {
        out.push_str(&format!("[{}] ", target));
    }
    out.push_str(message);
    if !fields.is_empty() {
        out.push_str(&format!(" {}", fields));
    }
    out
}

fn render_compact(
    config: &LogConfig,
    level: Level,
    target: &str,
    message: &str,
    fields: &Fields,
) -> String {
    let mut out = String::new();
    if config.timestamps {
        out.push_str(&chrono::Local::now().format("%H:%M:%S ").to_string());
    }
    out.push(level.as_str().chars().next().unwrap_or('?'));
    out.push(' ');
    if !target.is_empty() {
        out.push_str(target);
        out.push_str(": ");
    }
    out.push_str(message);
    if !fields.is_empty() {
        out.push_str(&format!(" {}", fields));
    }
    out
}

#[cfg(feature = "json")]
fn render_json(level: Level, target: &str, message: &str, fields: &Fields) -> String {
    let mut entry = serde_json::Map::new();
    entry.insert(
        "timestamp".into(),
        serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
    );
    entry.insert("level".into(), level.as_str().into());
    entry.insert("target".into(), target.into());
    entry.insert("message".into(), message.into());
    if !fields.is_empty() {
        let map: serde_json::Map<String, serde_json::Value> = fields
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
            .collect();
        entry.insert("fields".into(), serde_json::Value::Object(map));
    }
    serde_json::Value::Object(entry).to_string()
}

#[cfg(not(feature = "json"))]
fn render_json(level: Level, target: &str, message: &str, fields: &Fields) -> String {
    let mut out = format!(
        r#"{{"timestamp":"{}","level":"{}","target":"{}","message":"{}""#,
        chrono::Utc::now().to_rfc3339(),
        level.as_str(),
        escape_json(target),
        escape_json(message)
    );
    if !fields.is_empty() {
        out.push_str(r#","fields":{"#);
        for (i, (key, value)) in fields.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&format!(r#""{}":"{}""#, escape_json(key), escape_json(value)));
        }
        out.push('}');
    }
    out.push('}');
    out
}

#[cfg(not(feature = "json"))]
fn escape_json(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if c.is_control() => escaped.push_str(&format!("\\u{:04x}", c as u32)),
            c => escaped.push(c),
        }
    }
    escaped
}

// ============================================================================
// Macros
// ============================================================================

#[doc(hidden)]
#[macro_export]
macro_rules! __flagship_log {
    ($level:expr, target: $target:expr, fields: $fields:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($level) {
            $crate::log_fields($level, $target, &format!($($arg)+), &$fields);
        }
    };
    ($level:expr, target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($level) {
            $crate::log($level, $target, &format!($($arg)+));
        }
    };
    ($level:expr, fields: $fields:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($level) {
            $crate::log_fields($level, module_path!(), &format!($($arg)+), &$fields);
        }
    };
    ($level:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($level) {
            $crate::log($level, module_path!(), &format!($($arg)+));
        }
    };
}

/// Log at trace level.
#[macro_export]
macro_rules! trace {
    ($($arg:tt)+) => { $crate::__flagship_log!($crate::Level::Trace, $($arg)+) };
}

/// Log at debug level. Also emitted whenever `FLAGSHIP_DEBUG=1`.
///
/// ```rust
/// use flagship_log::debug;
///
/// let flag = "checkout-v2";
/// debug!("Bucketing user for {}", flag);
/// debug!(target: "flagship::evaluation", "Rollout check for {}", flag);
/// ```
#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => { $crate::__flagship_log!($crate::Level::Debug, $($arg)+) };
}

/// Log at info level.
#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => { $crate::__flagship_log!($crate::Level::Info, $($arg)+) };
}

/// Log at warn level.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)+) => { $crate::__flagship_log!($crate::Level::Warn, $($arg)+) };
}

/// Log at error level.
#[macro_export]
macro_rules! error {
    ($($arg:tt)+) => { $crate::__flagship_log!($crate::Level::Error, $($arg)+) };
}

// ============================================================================
// Tracing bridge
// ============================================================================

#[cfg(feature = "tracing")]
pub mod tracing_compat {
    //! A `tracing` subscriber honoring the `FLAGSHIP_*` level settings.

    use super::*;

    pub fn subscriber() -> impl tracing::Subscriber {
        use tracing_subscriber::prelude::*;
        use tracing_subscriber::{EnvFilter, fmt};

        let config = config();
        let directive = match config.level {
            Level::Off => "off".to_string(),
            other => other.as_str().to_ascii_lowercase(),
        };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_ansi(config.color).with_writer(std::io::stderr))
    }
}
