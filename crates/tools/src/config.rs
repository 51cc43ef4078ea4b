use std::env;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use cluster::{ClusterConfig, DEFAULT_CLUSTER_RADIUS_PX};
use foundation::math::DEFAULT_TILE_SIZE;
use ingest::{DEFAULT_BATCH_SIZE, ProcessorConfig};
use serde::Deserialize;

/// Point count of the generated stress load.
pub const DEFAULT_GENERATED_POINTS: u64 = 50_000;

/// Engine settings: JSON file first, then `MARKERS_*` environment overrides.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub batch_size: usize,
    pub cluster_radius_px: f64,
    pub remove_outside_visible_bounds: bool,
    pub tile_size: f64,
    /// REST root of the favorites store. Unset means an in-memory store.
    pub sync_url: Option<String>,
    pub sync_api_key: Option<String>,
    pub generated_points: u64,
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            cluster_radius_px: DEFAULT_CLUSTER_RADIUS_PX,
            remove_outside_visible_bounds: true,
            tile_size: DEFAULT_TILE_SIZE,
            sync_url: None,
            sync_api_key: None,
            generated_points: DEFAULT_GENERATED_POINTS,
            seed: 0,
        }
    }
}

impl EngineConfig {
    /// Reads `path` if given, then applies the process environment.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let base = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => Self::default(),
        };
        Ok(base.with_env(|key| env::var(key).ok()))
    }

    /// Applies `MARKERS_*` overrides looked up through `lookup`. Unparseable
    /// values keep the current setting.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        self.batch_size = env_or(&lookup, "MARKERS_BATCH_SIZE", self.batch_size);
        self.cluster_radius_px = env_or(&lookup, "MARKERS_CLUSTER_RADIUS_PX", self.cluster_radius_px);
        self.remove_outside_visible_bounds = env_flag(
            &lookup,
            "MARKERS_REMOVE_OUTSIDE_BOUNDS",
            self.remove_outside_visible_bounds,
        );
        if let Some(url) = lookup("MARKERS_SYNC_URL").filter(|v| !v.is_empty()) {
            self.sync_url = Some(url);
        }
        if let Some(key) = lookup("MARKERS_SYNC_API_KEY").filter(|v| !v.is_empty()) {
            self.sync_api_key = Some(key);
        }
        self
    }

    pub fn processor(&self) -> ProcessorConfig {
        ProcessorConfig {
            batch_size: self.batch_size.max(1),
        }
    }

    pub fn cluster(&self) -> ClusterConfig {
        ClusterConfig {
            cluster_radius_px: self.cluster_radius_px,
            remove_outside_visible_bounds: self.remove_outside_visible_bounds,
            tile_size: self.tile_size,
        }
    }
}

fn env_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_flag(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    match lookup(key).as_deref().map(str::trim) {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
