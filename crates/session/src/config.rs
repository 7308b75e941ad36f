use std::env;
use std::time::Duration;

use markers::{DEFAULT_MERGE_THRESHOLD_DEG, ReconcileConfig, VisibilityPolicy};
use serde::{Deserialize, Serialize};
use streaming::FetchConfig;

/// Tuning for one map session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Quiet period (ms) before a viewport counts as settled.
    pub debounce_ms: u64,

    /// Minimum bound delta (degrees) that makes a settled viewport worth a fetch.
    pub significance_deg: f64,

    /// Coordinate moves below this (degrees, both axes) keep the known position.
    pub merge_threshold_deg: f64,

    /// Marker position changes at or below this (degrees) are not re-applied.
    pub render_epsilon_deg: f64,

    /// Render places that have no category.
    pub show_uncategorized: bool,

    /// Category filter sent with every fetch; empty means all.
    pub categories: Vec<i64>,

    pub fetch: FetchConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 250,
            significance_deg: 0.001,
            merge_threshold_deg: DEFAULT_MERGE_THRESHOLD_DEG,
            render_epsilon_deg: 1e-7,
            show_uncategorized: false,
            categories: Vec::new(),
            fetch: FetchConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by `TOUR_MAP_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`SessionConfig::from_env`], reading variables through `lookup`.
    ///
    /// Unparseable values fall back to the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        Self {
            debounce_ms: env_var_u64(&lookup, "TOUR_MAP_DEBOUNCE_MS", d.debounce_ms),
            significance_deg: env_var_f64(&lookup, "TOUR_MAP_SIGNIFICANCE_DEG", d.significance_deg),
            merge_threshold_deg: env_var_f64(
                &lookup,
                "TOUR_MAP_MERGE_THRESHOLD_DEG",
                d.merge_threshold_deg,
            ),
            render_epsilon_deg: env_var_f64(
                &lookup,
                "TOUR_MAP_RENDER_EPSILON_DEG",
                d.render_epsilon_deg,
            ),
            show_uncategorized: env_var_bool(
                &lookup,
                "TOUR_MAP_SHOW_UNCATEGORIZED",
                d.show_uncategorized,
            ),
            categories: env_var_list(&lookup, "TOUR_MAP_CATEGORIES").unwrap_or(d.categories),
            fetch: FetchConfig {
                page_size: env_var_u32(&lookup, "TOUR_MAP_PAGE_SIZE", d.fetch.page_size),
                coalesce_ms: env_var_u64(&lookup, "TOUR_MAP_COALESCE_MS", d.fetch.coalesce_ms),
                request_timeout_ms: env_var_u64(
                    &lookup,
                    "TOUR_MAP_TIMEOUT_MS",
                    d.fetch.request_timeout_ms,
                ),
            },
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn reconcile(&self) -> ReconcileConfig {
        ReconcileConfig {
            render_epsilon_deg: self.render_epsilon_deg,
            visibility: VisibilityPolicy {
                show_uncategorized: self.show_uncategorized,
            },
        }
    }
}

fn env_var_u32(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u32) -> u32 {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_var_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> u64 {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_var_f64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: f64) -> f64 {
    lookup(key)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(default)
}

fn env_var_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    match lookup(key).as_deref().map(str::trim) {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

/// Comma-separated integers; `None` if unset or any entry fails to parse.
fn env_var_list(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Vec<i64>> {
    let raw = lookup(key)?;
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::SessionConfig;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_map_client() {
        let c = SessionConfig::default();
        assert_eq!(c.debounce_ms, 250);
        assert_eq!(c.significance_deg, 0.001);
        assert_eq!(c.merge_threshold_deg, 0.0001);
        assert_eq!(c.render_epsilon_deg, 1e-7);
        assert_eq!(c.fetch.page_size, 50);
        assert!(!c.show_uncategorized);
    }

    #[test]
    fn env_overrides_apply() {
        let c = SessionConfig::from_lookup(lookup(&[
            ("TOUR_MAP_DEBOUNCE_MS", "100"),
            ("TOUR_MAP_SIGNIFICANCE_DEG", "0.01"),
            ("TOUR_MAP_SHOW_UNCATEGORIZED", "true"),
            ("TOUR_MAP_CATEGORIES", "1, 4,7"),
            ("TOUR_MAP_PAGE_SIZE", "20"),
        ]));
        assert_eq!(c.debounce_ms, 100);
        assert_eq!(c.significance_deg, 0.01);
        assert!(c.show_uncategorized);
        assert_eq!(c.categories, vec![1, 4, 7]);
        assert_eq!(c.fetch.page_size, 20);
        assert!(c.reconcile().visibility.show_uncategorized);
    }

    #[test]
    fn bad_values_fall_back_to_defaults() {
        let c = SessionConfig::from_lookup(lookup(&[
            ("TOUR_MAP_DEBOUNCE_MS", "soon"),
            ("TOUR_MAP_SIGNIFICANCE_DEG", "-1"),
            ("TOUR_MAP_CATEGORIES", "1,x"),
        ]));
        assert_eq!(c, SessionConfig::default());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let c: SessionConfig = serde_json::from_str(r#"{"debounce_ms": 10}"#).unwrap();
        assert_eq!(c.debounce_ms, 10);
        assert_eq!(c.fetch, SessionConfig::default().fetch);
    }
}
