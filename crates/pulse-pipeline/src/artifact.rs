//! Artifact persistence
//!
//! One `{market}_data.json` per market plus an `all_markets.json` index.
//! Every write goes through write-temp-then-rename, so a crashed run
//! leaves either the previous artifact or the new one, never a partial
//! file. Overwrites are idempotent.

use crate::error::Result;
use chrono::Utc;
use pulse_models::{BatchIndex, CombinedArtifact};
use pulse_sources::write_atomic;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const INDEX_FILE: &str = "all_markets.json";

/// File-backed artifact store.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Open (creating if needed) the output directory.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Path of one market's artifact file.
    pub fn market_path(&self, market_key: &str) -> PathBuf {
        self.dir.join(format!("{market_key}_data.json"))
    }

    /// Path of the batch index file.
    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    /// Persist one market's artifact.
    pub fn save_market(&self, artifact: &CombinedArtifact) -> Result<PathBuf> {
        let path = self.market_path(&artifact.market);
        write_json(&path, artifact)?;
        info!(market = %artifact.market, path = %path.display(), "artifact saved");
        Ok(path)
    }

    /// Persist the batch index over all successfully produced artifacts.
    pub fn save_index(&self, artifacts: &[CombinedArtifact]) -> Result<PathBuf> {
        let index = BatchIndex {
            generated_at: Utc::now(),
            markets: artifacts.iter().map(|a| a.market.clone()).collect(),
            data: artifacts
                .iter()
                .map(|a| (a.market.clone(), a.clone()))
                .collect::<BTreeMap<_, _>>(),
        };

        let path = self.index_path();
        write_json(&path, &index)?;
        info!(markets = index.markets.len(), path = %path.display(), "batch index saved");
        Ok(path)
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_models::{ForecastList, NewsBatch, PopupBundle, ReportDocument};
    use tempfile::TempDir;

    fn artifact(key: &str) -> CombinedArtifact {
        CombinedArtifact {
            market: key.to_string(),
            market_name: "Crude Oil".to_string(),
            market_name_th: "น้ำมันดิบ".to_string(),
            symbol: "CL=F".to_string(),
            unit: "USD/barrel".to_string(),
            generated_at: Utc::now(),
            news: NewsBatch::default(),
            forecasts: ForecastList::default(),
            popup: PopupBundle {
                key_metrics: vec![],
                quick_summary: String::new(),
                regional_impacts: vec![],
                recommendations: vec![],
                top_news: None,
                price_forecasts: vec![],
            },
            report: ReportDocument::placeholder("น้ำมันดิบ"),
        }
    }

    #[test]
    fn test_save_market_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();

        let path = store.save_market(&artifact("crude_oil")).unwrap();
        assert_eq!(path.file_name().unwrap(), "crude_oil_data.json");

        let raw = fs::read_to_string(&path).unwrap();
        let loaded: CombinedArtifact = serde_json::from_str(&raw).unwrap();
        assert_eq!(loaded.market, "crude_oil");
        assert!(raw.contains("\"marketNameTh\""));
    }

    #[test]
    fn test_save_market_overwrite_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();

        store.save_market(&artifact("sugar")).unwrap();
        store.save_market(&artifact("sugar")).unwrap();

        let files: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_index_lists_all_markets() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();

        let artifacts = vec![artifact("crude_oil"), artifact("sugar")];
        let path = store.save_index(&artifacts).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let index: BatchIndex = serde_json::from_str(&raw).unwrap();
        assert_eq!(index.markets, ["crude_oil", "sugar"]);
        assert!(index.data.contains_key("sugar"));
        assert!(raw.contains("\"generatedAt\""));
    }

    #[test]
    fn test_no_tmp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        store.save_market(&artifact("usd_thb")).unwrap();
        store.save_index(&[artifact("usd_thb")]).unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
