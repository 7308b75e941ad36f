use std::path::Path;

use anyhow::{Context, Result};
use foundation::{PlaceId, Viewport};
use serde::Deserialize;

/// One step of a replayed map interaction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// A raw pan/zoom tick.
    View { viewport: Viewport, zoom: f64 },
    Wait { ms: u64 },
    /// Simulated user click on a rendered marker.
    Click { place_id: PlaceId },
    /// Host-driven selection; `null` clears it.
    Select { place_id: Option<PlaceId> },
    Categories { ids: Vec<i64> },
    Refresh,
    Clear,
}

pub async fn load_script(path: &Path) -> Result<Vec<Step>> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading script {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing script {}", path.display()))
}
