use scout_core::FetchConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub apk: ApkConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApkConfig {
    /// apk executable, looked up on PATH unless it is a path
    #[serde(default = "default_program")]
    pub program: PathBuf,

    /// Privilege wrapper the program is run through (e.g. "doas", "sudo")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevate: Option<String>,

    /// Seconds before a single apk invocation is killed
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_program() -> PathBuf {
    PathBuf::from("apk")
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApkConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            elevate: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    /// Return a list of non-fatal issues.
    pub fn warnings(&self, cores: usize) -> Vec<String> {
        let mut warnings = self.fetch.warnings(cores);

        if let Some(elevate) = &self.apk.elevate {
            if elevate.trim().is_empty() {
                warnings.push("apk.elevate is set but empty; it will not resolve".into());
            }
        }

        if let Some(call) = self.fetch.call_timeout_secs {
            if call > self.apk.timeout_secs {
                warnings.push(format!(
                    "fetch.call_timeout_secs ({call}) exceeds apk.timeout_secs ({}); \
                     apk is killed first",
                    self.apk.timeout_secs
                ));
            }
        }

        warnings
    }
}
