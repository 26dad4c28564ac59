// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::channel::AudioChannel;
use crate::Error;
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Parameters of one simulation run.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct RunConfig {
    /// Raw sample payload loaded into sample memory.
    pub sample_path: PathBuf,
    /// Time budget of the run, in simulation time units.
    pub test_duration: u64,
    /// Stop after this many stereo frames; unbounded when absent.
    #[serde(default = "unbounded_sample_count")]
    pub sample_count: u64,
}

fn unbounded_sample_count() -> u64 {
    u64::MAX
}

impl RunConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        read_config(path)
    }

    /// Read the raw sample payload named by this config.
    pub fn load_samples(&self) -> anyhow::Result<Vec<u8>> {
        if self.sample_path.as_os_str().is_empty() {
            return Err(Error::MissingSamplePath.into());
        }
        std::fs::read(&self.sample_path).with_context(|| {
            format!("Failed to open sample file: {}", self.sample_path.display())
        })
    }
}

/// Read the ordered list of channel descriptions.
pub fn load_channels(path: &Path) -> anyhow::Result<Vec<AudioChannel>> {
    read_config(path)
}

/// Deserialize a configuration file. YAML is accepted for `.yaml`/`.yml`
/// files, everything else is read as JSON.
pub fn read_config<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open config file: {}", path.display()))?;
    let reader = BufReader::new(file);
    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    );
    let config = if is_yaml {
        serde_yaml::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?
    } else {
        serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?
    };
    log::debug!("loaded config {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        File::create(&path)
            .unwrap()
            .write_all(contents.as_bytes())
            .unwrap();
        path
    }

    #[test]
    fn sample_count_defaults_to_unbounded() {
        let dir = tempfile::tempdir().unwrap();
        let implicit = write_file(
            dir.path(),
            "implicit.json",
            r#"{"sample_path": "pcm.bin", "test_duration": 5000}"#,
        );
        let explicit = write_file(
            dir.path(),
            "explicit.json",
            r#"{"sample_path": "pcm.bin", "test_duration": 5000, "sample_count": 18446744073709551615}"#,
        );
        let implicit = RunConfig::from_file(&implicit).unwrap();
        assert_eq!(implicit.sample_count, u64::MAX);
        assert_eq!(implicit, RunConfig::from_file(&explicit).unwrap());
    }

    #[test]
    fn read_yaml_channels() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "channels.yaml",
            "---
- sample_start_address: 0
  sample_end_address: 4096
  sample_loop_address: 2048
  flags: 1
  volume_left: 64
  volume_right: -64
  pitch: 4096
- sample_start_address: 8192
  sample_end_address: 16384
  sample_loop_address: 8192
  flags: 0
  volume_left: 127
  volume_right: 127
  pitch: 2048
",
        );
        let channels = load_channels(&path).unwrap();
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].sample_loop_address, 2048);
        assert_eq!(channels[0].volumes.right, -64);
        assert_eq!(channels[1].sample_start_address, 8192);
        assert_eq!(channels[1].pitch, 2048);
    }

    #[test]
    fn missing_sample_path_is_fatal() {
        let config = RunConfig {
            sample_path: PathBuf::new(),
            test_duration: 1,
            sample_count: 1,
        };
        let err = config.load_samples().unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::MissingSamplePath)
        );
    }

    #[test]
    fn missing_config_file_is_fatal() {
        let err = RunConfig::from_file(Path::new("/nonexistent/test.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/test.json"));
    }
}
