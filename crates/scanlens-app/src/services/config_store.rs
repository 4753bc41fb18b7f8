// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration persisted as pretty JSON in the data directory.

use std::path::{Path, PathBuf};

use scanlens_core::config::PipelineConfig;
use scanlens_core::error::Result;
use tracing::{debug, warn};

const CONFIG_FILE: &str = "config.json";

pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE)
}

/// Load the saved config, or defaults when the file is missing, unreadable,
/// or fails validation.
pub fn load_config(data_dir: &Path) -> PipelineConfig {
    let path = config_path(data_dir);
    let data = match std::fs::read_to_string(&path) {
        Ok(data) => data,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "no saved config; using defaults");
            return PipelineConfig::default();
        }
    };
    let parsed: PipelineConfig = match serde_json::from_str(&data) {
        Ok(config) => config,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "config unreadable; using defaults");
            return PipelineConfig::default();
        }
    };
    match parsed.validate() {
        Ok(()) => parsed,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "config invalid; using defaults");
            PipelineConfig::default()
        }
    }
}

pub fn persist_config(data_dir: &Path, config: &PipelineConfig) -> Result<()> {
    config.validate()?;
    std::fs::create_dir_all(data_dir)?;
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(config_path(data_dir), json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanlens_core::types::{CameraPosition, Mode};

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(load_config(dir.path()), PipelineConfig::default());
    }

    #[test]
    fn persisted_config_is_reloaded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = PipelineConfig {
            initial_mode: Mode::FacePitch,
            camera: CameraPosition::Front,
            ..PipelineConfig::default()
        };
        persist_config(dir.path(), &config).expect("persist");
        assert_eq!(load_config(dir.path()), config);
    }

    #[test]
    fn garbage_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(config_path(dir.path()), "{ not json").expect("write");
        assert_eq!(load_config(dir.path()), PipelineConfig::default());
    }

    #[test]
    fn invalid_config_is_not_persisted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = PipelineConfig::default();
        config.gate.rectangle_capture_min = 1.5;
        assert!(persist_config(dir.path(), &config).is_err());
        assert!(!config_path(dir.path()).exists());
    }
}
