//! Alpine `apk` integration: the catalog and provider the fetch engine runs
//! against.

mod catalog;
mod command;
mod provider;

pub use catalog::{parse_package_names, ApkCatalog};
pub use command::{ToolCommand, ToolOutput};
pub use provider::{parse_provides, ApkProvider};

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use scout_core::{Error, Result};

use crate::config::ApkConfig;

/// A resolved `apk` executable, optionally run through a privilege wrapper
/// such as `doas` or `sudo`.
#[derive(Debug, Clone)]
pub struct ApkTool {
    program: PathBuf,
    elevate: Option<PathBuf>,
    timeout: Duration,
}

impl ApkTool {
    /// Resolve the configured program (and elevate wrapper) on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tool`] if either executable cannot be found.
    pub fn from_config(config: &ApkConfig) -> Result<Self> {
        let program = resolve(&config.program)?;
        let elevate = config.elevate.as_deref().map(resolve).transpose()?;

        Ok(Self {
            program,
            elevate,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn elevate(&self) -> Option<&Path> {
        self.elevate.as_deref()
    }

    /// Build an apk invocation with `args`, wrapped in the elevate tool if
    /// one is configured, and bounded by the configured timeout.
    pub fn command<I, S>(&self, args: I) -> ToolCommand
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut cmd = match &self.elevate {
            Some(wrapper) => {
                let mut cmd = ToolCommand::new(wrapper.clone());
                cmd.arg(self.program.to_string_lossy());
                cmd
            }
            None => ToolCommand::new(self.program.clone()),
        };
        cmd.args(args).timeout(self.timeout);
        cmd
    }
}

fn resolve(name: impl AsRef<Path>) -> Result<PathBuf> {
    let name = name.as_ref();
    which::which(name).map_err(|_| {
        let display = name.display();
        Error::tool(
            display.to_string(),
            format!("{display} not found; is it installed and in PATH?"),
        )
    })
}

/// Availability information for one external tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Name as configured.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// First line of `--version` output, if the tool reported one.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// Check the apk program and, if configured, the elevate wrapper.
pub fn check_tools(config: &ApkConfig) -> Vec<ToolInfo> {
    let mut tools = vec![check_tool(&config.program)];
    if let Some(elevate) = &config.elevate {
        tools.push(check_tool(elevate));
    }
    tools
}

fn check_tool(name: impl AsRef<Path>) -> ToolInfo {
    let name = name.as_ref();
    match which::which(name) {
        Ok(path) => ToolInfo {
            name: name.display().to_string(),
            available: true,
            version: detect_version(&path),
            path: Some(path),
        },
        Err(_) => ToolInfo {
            name: name.display().to_string(),
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Run `<tool> --version` and return the first line of stdout.
fn detect_version(path: &Path) -> Option<String> {
    let output = Command::new(path).arg("--version").output().ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(program: &str, elevate: Option<&str>) -> ApkConfig {
        ApkConfig {
            program: PathBuf::from(program),
            elevate: elevate.map(str::to_string),
            ..ApkConfig::default()
        }
    }

    #[test]
    fn missing_program_is_tool_error() {
        let err = ApkTool::from_config(&config("nonexistent_apk_12345", None)).unwrap_err();
        assert!(matches!(err, Error::Tool { .. }));
        assert!(err.to_string().contains("not found"), "unexpected error: {err}");
    }

    #[test]
    fn check_tool_not_found() {
        let tools = check_tools(&config("nonexistent_apk_12345", Some("nonexistent_doas_12345")));
        assert_eq!(tools.len(), 2);
        assert!(tools.iter().all(|t| !t.available));
        assert!(tools.iter().all(|t| t.path.is_none() && t.version.is_none()));
    }

    #[cfg(unix)]
    #[test]
    fn elevate_wraps_program() {
        // `env` runs its first argument as a command, standing in for doas.
        let tool = ApkTool::from_config(&config("echo", Some("env"))).unwrap();
        assert!(tool.elevate().is_some());

        let out = tool.command(["search", "curl"]).execute().unwrap();
        assert_eq!(out.stdout.trim(), "search curl");
    }

    #[cfg(unix)]
    #[test]
    fn command_without_elevate() {
        let tool = ApkTool::from_config(&config("echo", None)).unwrap();
        assert!(tool.elevate().is_none());

        let out = tool.command(["info", "--provides", "zlib"]).execute().unwrap();
        assert_eq!(out.stdout.trim(), "info --provides zlib");
    }
}
