//! Saving and loading the best evolved controller
//!
//! A champion file is a bincode blob holding a format version, the fitness
//! the controller reached, and its weights.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::controller::FeedForwardController;

/// Bumped whenever the on-disk layout changes
pub const CHAMPION_VERSION: u32 = 1;

#[derive(Debug, Error, PartialEq)]
pub enum ChampionError {
    #[error("champion file version {found} is not supported (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("champion file has {trailing} trailing bytes")]
    TrailingBytes { trailing: usize },

    #[error("champion controller has {found} weights, its layout needs {expected}")]
    WeightCount { expected: usize, found: usize },
}

/// A controller together with how well it did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Champion {
    pub version: u32,
    pub fitness: f32,
    /// Seed of the episode the fitness was measured on
    pub seed: u64,
    pub controller: FeedForwardController,
}

impl Champion {
    pub fn new(controller: FeedForwardController, fitness: f32, seed: u64) -> Self {
        Self {
            version: CHAMPION_VERSION,
            fitness,
            seed,
            controller,
        }
    }
}

/// Write a champion to disk
pub fn save(path: &Path, champion: &Champion) -> Result<()> {
    let data = bincode_next::serde::encode_to_vec(champion, bincode_next::config::standard())
        .context("Failed to serialize champion")?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context("Failed to create champion directory")?;
    }

    // Atomic write: write to temp file, then rename
    let temp_path = path.with_extension("tmp");
    std::fs::write(&temp_path, &data).context("Failed to write champion temp file")?;
    std::fs::rename(&temp_path, path).context("Failed to rename champion file")?;

    log::info!(
        "Saved champion (fitness {:.2}, {} bytes) to {:?}",
        champion.fitness,
        data.len(),
        path
    );
    Ok(())
}

/// Read a champion back from disk
pub fn load(path: &Path) -> Result<Champion> {
    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read champion file {:?}", path))?;

    let (champion, read): (Champion, usize) =
        bincode_next::serde::decode_from_slice(&data, bincode_next::config::standard())
            .context("Failed to deserialize champion")?;

    if read != data.len() {
        return Err(ChampionError::TrailingBytes {
            trailing: data.len() - read,
        }
        .into());
    }

    if champion.version != CHAMPION_VERSION {
        return Err(ChampionError::UnsupportedVersion {
            found: champion.version,
            expected: CHAMPION_VERSION,
        }
        .into());
    }

    let expected = FeedForwardController::weight_count(champion.controller.hidden_dim());
    let found = champion.controller.weights().len();
    if found != expected {
        return Err(ChampionError::WeightCount { expected, found }.into());
    }

    log::debug!(
        "Loaded champion with fitness {:.2} from {:?}",
        champion.fitness,
        path
    );
    Ok(champion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;
    use tempfile::TempDir;

    fn champion() -> Champion {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(9);
        Champion::new(FeedForwardController::random(5, &mut rng), 1234.5, 9)
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("winner.bin");

        let saved = champion();
        save(&path, &saved).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());

        let loaded = load(&path).unwrap();
        assert_eq!(loaded, saved);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(load(&dir.path().join("absent.bin")).is_err());
    }

    #[test]
    fn test_rejects_other_versions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("old.bin");

        let mut old = champion();
        old.version = CHAMPION_VERSION + 1;
        save(&path, &old).unwrap();

        let err = load(&path).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ChampionError>(),
            Some(&ChampionError::UnsupportedVersion {
                found: CHAMPION_VERSION + 1,
                expected: CHAMPION_VERSION,
            })
        );
    }

    #[test]
    fn test_rejects_trailing_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("padded.bin");
        save(&path, &champion()).unwrap();

        let mut data = std::fs::read(&path).unwrap();
        data.extend_from_slice(&[0, 0, 0]);
        std::fs::write(&path, data).unwrap();

        let err = load(&path).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ChampionError>(),
            Some(&ChampionError::TrailingBytes { trailing: 3 })
        );
    }

    #[test]
    fn test_rejects_mismatched_weight_count() {
        // Same field order as Champion, with a controller too short for its hidden layer
        #[derive(Serialize)]
        struct RawController {
            weights: Vec<f32>,
            hidden_dim: usize,
        }

        #[derive(Serialize)]
        struct RawChampion {
            version: u32,
            fitness: f32,
            seed: u64,
            controller: RawController,
        }

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short.bin");
        let raw = RawChampion {
            version: CHAMPION_VERSION,
            fitness: 1.0,
            seed: 0,
            controller: RawController {
                weights: vec![0.1; 3],
                hidden_dim: 6,
            },
        };
        let data =
            bincode_next::serde::encode_to_vec(&raw, bincode_next::config::standard()).unwrap();
        std::fs::write(&path, data).unwrap();

        let err = load(&path).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ChampionError>(),
            Some(&ChampionError::WeightCount {
                expected: FeedForwardController::weight_count(6),
                found: 3,
            })
        );
    }
}
