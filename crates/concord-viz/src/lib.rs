//! Render configuration surface for the interactive dashboard.
//!
//! The dashboard renderer itself is out of scope: this crate only
//! defines the configuration shape `concord-cli`'s `dashboard`/`dash`/
//! `observe` command parses `-m/--mode` and `-r/--refresh` into, plus
//! the small set of presentation-agnostic summaries the renderer would
//! consume from the observation bus. No terminal/TUI dependency lives
//! here.

use std::time::Duration;

use concord_core::{FlowType, Severity};
use serde::{Deserialize, Serialize};

/// Dashboard backend selected by `-m/--mode`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DashboardMode {
    /// Plain-text terminal output, refreshed on an interval.
    Terminal,
    /// Single summary snapshot, no refresh loop (suitable for piping).
    Snapshot,
}

impl Default for DashboardMode {
    fn default() -> Self {
        DashboardMode::Terminal
    }
}

/// Render configuration for the dashboard/observe command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub mode: DashboardMode,
    /// Refresh cadence, `-r/--refresh SEC`.
    pub refresh: Duration,
    /// Maximum width for a rendered line.
    pub max_width: usize,
    pub use_unicode: bool,
    pub use_colors: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { mode: DashboardMode::default(), refresh: Duration::from_secs(2), max_width: 100, use_unicode: true, use_colors: true }
    }
}

impl RenderConfig {
    pub fn terminal(refresh_seconds: u64) -> Self {
        Self { mode: DashboardMode::Terminal, refresh: Duration::from_secs(refresh_seconds.max(1)), ..Self::default() }
    }

    pub fn snapshot() -> Self {
        Self { mode: DashboardMode::Snapshot, use_colors: false, ..Self::default() }
    }
}

/// A presentation-agnostic count of recent events by `(flow_type,
/// severity)`, the shape a renderer would group rows by.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventCategoryCount {
    pub flow_type: FlowType,
    pub severity: Severity,
    pub count: u64,
}

/// Glyph convention a renderer should use for a severity level, kept
/// here so multiple dashboard backends agree on meaning.
pub fn severity_glyph(severity: Severity, use_unicode: bool) -> &'static str {
    match (severity, use_unicode) {
        (Severity::Critical, true) => "\u{2716}",
        (Severity::Critical, false) => "X",
        (Severity::Error, true) => "\u{2717}",
        (Severity::Error, false) => "x",
        (Severity::Warning, true) => "\u{26a0}",
        (Severity::Warning, false) => "!",
        (Severity::Info, true) => "\u{2139}",
        (Severity::Info, false) => "i",
        (Severity::Debug, _) => ".",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_config_defaults() {
        let config = RenderConfig::default();
        assert_eq!(config.mode, DashboardMode::Terminal);
        assert_eq!(config.refresh, Duration::from_secs(2));
    }

    #[test]
    fn terminal_preset_floors_refresh_at_one_second() {
        let config = RenderConfig::terminal(0);
        assert_eq!(config.refresh, Duration::from_secs(1));
    }

    #[test]
    fn snapshot_preset_disables_colors() {
        let config = RenderConfig::snapshot();
        assert_eq!(config.mode, DashboardMode::Snapshot);
        assert!(!config.use_colors);
    }

    #[test]
    fn severity_glyph_has_unicode_and_ascii_forms() {
        assert_ne!(severity_glyph(Severity::Critical, true), severity_glyph(Severity::Critical, false));
    }
}
