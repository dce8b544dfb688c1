use crate::errors::TrackerError;
use crate::runtime::FileSystem;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_REFRESH_PERIOD_SECONDS: f64 = 1.0;
pub const DEFAULT_REFRESH_TOLERANCE_SECONDS: f64 = 0.1;
pub const DEFAULT_ANIMATION_DURATION_SECONDS: f64 = 3.0;
pub const DEFAULT_FRAMES_PER_SECOND: u32 = 60;
pub const DEFAULT_JITTER: f64 = 0.5;
/// Longest period, tolerance, duration or deadline accepted anywhere.
pub const MAX_TIMER_SECONDS: f64 = 7.0 * 24.0 * 60.0 * 60.0;

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub rows: Option<u16>,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub refresh: RefreshConfig,
    pub animation: AnimationConfig,
    pub screen: ScreenConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshConfig {
    pub period_seconds: f64,
    pub tolerance_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnimationConfig {
    pub duration_seconds: f64,
    pub frames_per_second: u32,
    pub jitter: f64,
    pub element_size: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScreenConfig {
    /// Falls back to the terminal width when unset.
    pub width: Option<u16>,
    /// Falls back to the terminal height when unset.
    pub height: Option<u16>,
    pub rows: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    pub path: Option<PathBuf>,
    pub max_payload_bytes: usize,
    pub budget_bytes: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            refresh: RefreshConfig {
                period_seconds: DEFAULT_REFRESH_PERIOD_SECONDS,
                tolerance_seconds: DEFAULT_REFRESH_TOLERANCE_SECONDS,
            },
            animation: AnimationConfig {
                duration_seconds: DEFAULT_ANIMATION_DURATION_SECONDS,
                frames_per_second: DEFAULT_FRAMES_PER_SECOND,
                jitter: DEFAULT_JITTER,
                element_size: 3.0,
            },
            screen: ScreenConfig {
                width: None,
                height: None,
                rows: 10,
            },
            logging: LoggingConfig {
                path: None,
                max_payload_bytes: 4096,
                budget_bytes: crate::logging::DEFAULT_DISK_BUDGET_BYTES,
            },
        }
    }
}

impl RefreshConfig {
    pub fn period(&self) -> Duration {
        bounded_duration(self.period_seconds)
    }

    pub fn tolerance(&self) -> Duration {
        bounded_duration(self.tolerance_seconds)
    }
}

impl AnimationConfig {
    pub fn duration(&self) -> Duration {
        bounded_duration(self.duration_seconds)
    }

    pub fn frame_period(&self) -> Duration {
        bounded_duration(1.0 / f64::from(self.frames_per_second.max(1)))
    }
}

/// Converts seconds to a `Duration`, clamped to `0..=MAX_TIMER_SECONDS`.
/// Unrepresentable input (NaN) maps to zero.
pub fn bounded_duration(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds.clamp(0.0, MAX_TIMER_SECONDS)).unwrap_or(Duration::ZERO)
}

/// Parses a user-supplied number of seconds, rejecting values that are
/// negative, non-finite or above `MAX_TIMER_SECONDS`.
pub fn seconds_to_duration(field: &str, seconds: f64) -> Result<Duration, String> {
    if !is_non_negative(seconds) || seconds > MAX_TIMER_SECONDS {
        return Err(format!(
            "{field} must be between 0 and {MAX_TIMER_SECONDS} seconds"
        ));
    }
    Duration::try_from_secs_f64(seconds).map_err(|e| format!("{field}: {e}"))
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialAppConfig {
    refresh: Option<PartialRefreshConfig>,
    animation: Option<PartialAnimationConfig>,
    screen: Option<PartialScreenConfig>,
    logging: Option<PartialLoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialRefreshConfig {
    period_seconds: Option<f64>,
    tolerance_seconds: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialAnimationConfig {
    duration_seconds: Option<f64>,
    frames_per_second: Option<u32>,
    jitter: Option<f64>,
    element_size: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialScreenConfig {
    width: Option<u16>,
    height: Option<u16>,
    rows: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialLoggingConfig {
    path: Option<PathBuf>,
    max_payload_bytes: Option<usize>,
    budget_bytes: Option<u64>,
}

pub fn load_config(
    overrides: &CliOverrides,
    fs: &dyn FileSystem,
) -> Result<AppConfig, TrackerError> {
    let mut cfg = AppConfig::default();

    if let Some(path) = &overrides.config_path {
        let file_contents = fs.read_to_string(path)?;
        let partial: PartialAppConfig = toml::from_str(&file_contents)
            .map_err(|e| TrackerError::ConfigParse(e.to_string()))?;
        merge_partial_config(&mut cfg, partial);
    }

    apply_cli_overrides(&mut cfg, overrides);
    validate_config(&cfg)?;
    Ok(cfg)
}

fn merge_partial_config(cfg: &mut AppConfig, partial: PartialAppConfig) {
    if let Some(refresh) = partial.refresh {
        if let Some(value) = refresh.period_seconds {
            cfg.refresh.period_seconds = value;
        }
        if let Some(value) = refresh.tolerance_seconds {
            cfg.refresh.tolerance_seconds = value;
        }
    }

    if let Some(animation) = partial.animation {
        if let Some(value) = animation.duration_seconds {
            cfg.animation.duration_seconds = value;
        }
        if let Some(value) = animation.frames_per_second {
            cfg.animation.frames_per_second = value;
        }
        if let Some(value) = animation.jitter {
            cfg.animation.jitter = value;
        }
        if let Some(value) = animation.element_size {
            cfg.animation.element_size = value;
        }
    }

    if let Some(screen) = partial.screen {
        if screen.width.is_some() {
            cfg.screen.width = screen.width;
        }
        if screen.height.is_some() {
            cfg.screen.height = screen.height;
        }
        if let Some(value) = screen.rows {
            cfg.screen.rows = value;
        }
    }

    if let Some(logging) = partial.logging {
        if logging.path.is_some() {
            cfg.logging.path = logging.path;
        }
        if let Some(value) = logging.max_payload_bytes {
            cfg.logging.max_payload_bytes = value;
        }
        if let Some(value) = logging.budget_bytes {
            cfg.logging.budget_bytes = value;
        }
    }
}

fn apply_cli_overrides(cfg: &mut AppConfig, overrides: &CliOverrides) {
    if let Some(rows) = overrides.rows {
        cfg.screen.rows = rows;
    }
    if let Some(path) = &overrides.log_file {
        cfg.logging.path = Some(path.clone());
    }
}

fn validate_config(cfg: &AppConfig) -> Result<(), TrackerError> {
    for (field, seconds) in [
        ("refresh.period_seconds", cfg.refresh.period_seconds),
        ("refresh.tolerance_seconds", cfg.refresh.tolerance_seconds),
        ("animation.duration_seconds", cfg.animation.duration_seconds),
    ] {
        if seconds > MAX_TIMER_SECONDS {
            return Err(TrackerError::InvalidConfig(format!(
                "{field} must not exceed {MAX_TIMER_SECONDS} seconds"
            )));
        }
    }
    if !is_positive(cfg.refresh.period_seconds) {
        return Err(TrackerError::InvalidConfig(
            "refresh.period_seconds must be greater than zero".to_string(),
        ));
    }
    if !is_non_negative(cfg.refresh.tolerance_seconds) {
        return Err(TrackerError::InvalidConfig(
            "refresh.tolerance_seconds must not be negative".to_string(),
        ));
    }
    if !is_positive(cfg.animation.duration_seconds) {
        return Err(TrackerError::InvalidConfig(
            "animation.duration_seconds must be greater than zero".to_string(),
        ));
    }
    if cfg.animation.frames_per_second == 0 {
        return Err(TrackerError::InvalidConfig(
            "animation.frames_per_second must be greater than zero".to_string(),
        ));
    }
    if !is_non_negative(cfg.animation.jitter) {
        return Err(TrackerError::InvalidConfig(
            "animation.jitter must not be negative".to_string(),
        ));
    }
    if !is_positive(cfg.animation.element_size) {
        return Err(TrackerError::InvalidConfig(
            "animation.element_size must be greater than zero".to_string(),
        ));
    }
    if cfg.screen.rows == 0 {
        return Err(TrackerError::InvalidConfig(
            "screen.rows must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn is_non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

#[cfg(test)]
mod tests {
    use super::{
        bounded_duration, load_config, seconds_to_duration, AppConfig, CliOverrides,
        MAX_TIMER_SECONDS,
    };
    use crate::errors::TrackerError;
    use crate::runtime::FakeFileSystem;
    use std::path::PathBuf;
    use std::time::Duration;

    fn overrides_for(path: &str) -> CliOverrides {
        CliOverrides {
            config_path: Some(PathBuf::from(path)),
            ..CliOverrides::default()
        }
    }

    #[test]
    fn defaults_match_reference_timings() {
        let cfg = load_config(&CliOverrides::default(), &FakeFileSystem::default())
            .expect("defaults");
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.refresh.period(), Duration::from_secs(1));
        assert_eq!(cfg.refresh.tolerance(), Duration::from_millis(100));
        assert_eq!(cfg.animation.duration(), Duration::from_secs(3));
        assert!(cfg.animation.frame_period() < Duration::from_millis(17));
    }

    #[test]
    fn partial_file_merges_over_defaults_and_cli_wins() {
        let fs = FakeFileSystem::with_file(
            "/cfg.toml",
            "[animation]\nduration_seconds = 1.5\n\n[screen]\nrows = 4\nheight = 30\n",
        );
        let mut overrides = overrides_for("/cfg.toml");
        overrides.rows = Some(7);
        let cfg = load_config(&overrides, &fs).expect("config");

        assert_eq!(cfg.animation.duration_seconds, 1.5);
        assert_eq!(cfg.animation.frames_per_second, 60);
        assert_eq!(cfg.screen.height, Some(30));
        assert_eq!(cfg.screen.width, None);
        assert_eq!(cfg.screen.rows, 7);
    }

    #[test]
    fn rejects_non_positive_timings() {
        let fs = FakeFileSystem::with_file("/cfg.toml", "[refresh]\nperiod_seconds = 0.0\n");
        let err = load_config(&overrides_for("/cfg.toml"), &fs).expect_err("must reject");
        assert!(matches!(err, TrackerError::InvalidConfig(message) if message.contains("period_seconds")));

        let fs = FakeFileSystem::with_file("/cfg.toml", "[animation]\njitter = -1.0\n");
        let err = load_config(&overrides_for("/cfg.toml"), &fs).expect_err("must reject");
        assert!(matches!(err, TrackerError::InvalidConfig(message) if message.contains("jitter")));
    }

    #[test]
    fn huge_finite_timings_are_rejected_not_converted() {
        for (section, key) in [
            ("refresh", "period_seconds"),
            ("refresh", "tolerance_seconds"),
            ("animation", "duration_seconds"),
        ] {
            let fs = FakeFileSystem::with_file("/cfg.toml", format!("[{section}]\n{key} = 1e30\n"));
            let err = load_config(&overrides_for("/cfg.toml"), &fs).expect_err("must reject");
            assert!(
                matches!(&err, TrackerError::InvalidConfig(message) if message.contains(key)),
                "{err:?}"
            );
        }
    }

    #[test]
    fn duration_helpers_clamp_instead_of_panicking() {
        let max = Duration::from_secs_f64(MAX_TIMER_SECONDS);
        assert_eq!(bounded_duration(1e30), max);
        assert_eq!(bounded_duration(f64::NAN), Duration::ZERO);
        assert_eq!(bounded_duration(-5.0), Duration::ZERO);

        assert_eq!(seconds_to_duration("x", 2.5), Ok(Duration::from_millis(2500)));
        assert!(seconds_to_duration("x", 1e30).is_err());
        assert!(seconds_to_duration("x", f64::INFINITY).is_err());
        assert!(seconds_to_duration("x", -1.0).is_err());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let fs = FakeFileSystem::with_file("/cfg.toml", "[refresh\nperiod_seconds = ");
        let err = load_config(&overrides_for("/cfg.toml"), &fs).expect_err("must reject");
        assert!(matches!(err, TrackerError::ConfigParse(_)));
    }
}
