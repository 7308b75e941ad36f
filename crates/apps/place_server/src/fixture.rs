use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use streaming::Place;

/// A fixture is either a bare place array or a recorded API response.
#[derive(Deserialize)]
#[serde(untagged)]
enum FixtureFile {
    Places(Vec<Place>),
    Response { items: Vec<Place> },
}

pub async fn load_fixture(path: &Path) -> Result<Vec<Place>> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading fixture {}", path.display()))?;
    parse_fixture(&bytes).with_context(|| format!("parsing fixture {}", path.display()))
}

pub fn parse_fixture(bytes: &[u8]) -> Result<Vec<Place>> {
    let places = match serde_json::from_slice::<FixtureFile>(bytes)? {
        FixtureFile::Places(places) => places,
        FixtureFile::Response { items } => items,
    };
    Ok(places)
}
