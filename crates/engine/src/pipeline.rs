// SPDX-License-Identifier: MIT

//! Preparation Pipeline (spec 4.4): deterministically brings a sandbox from
//! created to "agent server reachable", emitting one progress event per
//! step and driving the `Idle -> Cloning -> Installing -> Running` DAG on
//! its `ProviderRunState` slot via the [`ProviderSink`].
//!
//! Grounded in the teacher's `oj-engine::runtime::agent_run` standalone
//! agent lifecycle (spawn -> monitor -> terminate), generalized from a
//! single local/Docker agent spawn to the nine-step remote-sandbox
//! bring-up sequence of spec 4.4.

use crate::sink::ProviderSink;
use fleet_adapters::gateway::{DriverError, DriverGateway, ExecOptions, SandboxHandle};
use fleet_core::{EventData, ProviderStatus, RepoLocation};
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

/// The fixed TCP port the agent server listens on inside every sandbox.
pub const AGENT_PORT: u16 = 4096;

/// Schema URL embedded in the agent configuration file (spec 6). The
/// server ignores unknown `$schema` values; it exists for editor tooling.
pub const AGENT_CONFIG_SCHEMA: &str = "https://opencode.ai/config.json";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error("preparation step `{step}` failed: {message}")]
    StepFailed { step: &'static str, message: String },
}

/// Per-step timeout tiers (spec 4.4: "short for probes, long for clones and
/// installs, longest for compilation").
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub probe_timeout: Duration,
    pub clone_timeout: Duration,
    pub install_timeout: Duration,
    pub compile_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(15),
            clone_timeout: Duration::from_secs(120),
            install_timeout: Duration::from_secs(300),
            compile_timeout: Duration::from_secs(900),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineCtx {
    pub provider: fleet_core::Provider,
    pub repo: RepoLocation,
    pub branch: String,
    pub task: String,
}

/// What the pipeline hands off to the Iteration Engine once preparation
/// completes: the sandbox handle, its workspace directory, and the
/// (possibly absent) public agent server URL.
#[derive(Debug, Clone)]
pub struct PreparedAgent {
    pub sandbox: SandboxHandle,
    pub workspace_dir: String,
    pub agent_server_url: Option<String>,
}

/// Detected project type from a workspace's top-level file listing (spec
/// 4.4 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectKind {
    Node,
    PythonRequirements,
    PythonPyproject,
    Rust,
    Go,
    Unknown,
}

/// Which `npm`-compatible package manager to use for a Node project, chosen
/// by lockfile presence (spec 4.4 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodePackageManager {
    Npm,
    Pnpm,
    Yarn,
    Bun,
}

impl NodePackageManager {
    pub fn install_command(&self) -> &'static str {
        match self {
            NodePackageManager::Npm => "npm install",
            NodePackageManager::Pnpm => "pnpm install",
            NodePackageManager::Yarn => "yarn install",
            NodePackageManager::Bun => "bun install",
        }
    }

    pub fn binary(&self) -> &'static str {
        match self {
            NodePackageManager::Npm => "npm",
            NodePackageManager::Pnpm => "pnpm",
            NodePackageManager::Yarn => "yarn",
            NodePackageManager::Bun => "bun",
        }
    }
}

pub fn detect_project(files: &[String]) -> ProjectKind {
    let has = |name: &str| files.iter().any(|f| f == name);
    if has("package.json") {
        ProjectKind::Node
    } else if has("requirements.txt") {
        ProjectKind::PythonRequirements
    } else if has("pyproject.toml") {
        ProjectKind::PythonPyproject
    } else if has("Cargo.toml") {
        ProjectKind::Rust
    } else if has("go.mod") {
        ProjectKind::Go
    } else {
        ProjectKind::Unknown
    }
}

pub fn detect_node_package_manager(files: &[String]) -> NodePackageManager {
    let has = |name: &str| files.iter().any(|f| f == name);
    if has("bun.lockb") || has("bun.lock") {
        NodePackageManager::Bun
    } else if has("pnpm-lock.yaml") {
        NodePackageManager::Pnpm
    } else if has("yarn.lock") {
        NodePackageManager::Yarn
    } else {
        NodePackageManager::Npm
    }
}

/// The install command for a detected project, or `None` for
/// [`ProjectKind::Unknown`] (spec 4.4 step 4: "no-op with an explanatory
/// event").
pub fn install_command(kind: ProjectKind, files: &[String]) -> Option<String> {
    match kind {
        ProjectKind::Node => Some(detect_node_package_manager(files).install_command().to_string()),
        ProjectKind::PythonRequirements => Some("pip install -r requirements.txt".to_string()),
        ProjectKind::PythonPyproject => Some("pip install .".to_string()),
        ProjectKind::Rust => Some("cargo build".to_string()),
        ProjectKind::Go => Some("go mod download".to_string()),
        ProjectKind::Unknown => None,
    }
}

/// The exact agent configuration JSON written to `.opencode/opencode.json`
/// (spec 6). `question`/`plan_enter`/`plan_exit` are denied — the entry
/// that keeps the agent non-interactive — everything else is allowed.
pub fn agent_config_json() -> serde_json::Value {
    serde_json::json!({
        "$schema": AGENT_CONFIG_SCHEMA,
        "permission": {
            "read": "allow",
            "edit": "allow",
            "glob": "allow",
            "grep": "allow",
            "list": "allow",
            "bash": "allow",
            "task": "allow",
            "webfetch": "allow",
            "websearch": "allow",
            "codesearch": "allow",
            "todowrite": "allow",
            "todoread": "allow",
            "lsp": "allow",
            "external_directory": "allow",
            "question": "deny",
            "plan_enter": "deny",
            "plan_exit": "deny",
        }
    })
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

pub struct Pipeline {
    gateway: DriverGateway,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(gateway: DriverGateway, config: PipelineConfig) -> Self {
        Self { gateway, config }
    }

    /// Runs all nine steps of spec 4.4, emitting progress events and DAG
    /// transitions on `sink` as it goes. Any step failure fails the
    /// provider (spec 7: "preparation is linear and does not retry on its
    /// own — failure of a step fails the provider but leaves the sandbox
    /// subject to normal teardown").
    pub async fn run(&self, ctx: PipelineCtx, sink: &dyn ProviderSink) -> Result<PreparedAgent, PipelineError> {
        let driver = self.gateway.driver(ctx.provider)?.clone();

        // Step 1: create sandbox.
        let handle = timeout(self.config.probe_timeout, driver.create(ctx.provider.default_base_image()))
            .await
            .map_err(|_| DriverError::Timeout(self.config.probe_timeout))??;
        sink.set_sandbox_id(handle.sandbox_id.clone());
        sink.set_status(ProviderStatus::Cloning);
        sink.emit(EventData::Status {
            status: ProviderStatus::Cloning,
            message: Some(format!("sandbox {} created", handle.sandbox_id)),
        });

        // Step 2: ensure source-control tooling is present.
        self.ensure_tool(&driver, &handle, "git --version", "apt-get install -y git", sink, "ensure_git").await?;

        // Step 3: create workspace root and clone.
        let workspace_dir = format!("/workspace/{}", ctx.repo.dir_name());
        let _ = driver.mkdir(&handle, "/workspace").await;
        sink.emit(EventData::CloneProgress {
            step: "clone".to_string(),
            message: format!("cloning {} (branch {})", ctx.repo, ctx.branch),
        });
        let clone_cmd = format!(
            "git clone --branch {} --single-branch --depth 1 {} {}",
            shell_quote(&ctx.branch),
            shell_quote(&ctx.repo.clone_url()),
            shell_quote(&workspace_dir),
        );
        let result = timeout(self.config.clone_timeout, driver.run(&handle, &clone_cmd, ExecOptions::default()))
            .await
            .map_err(|_| DriverError::Timeout(self.config.clone_timeout))??;
        if result.exit_code != 0 {
            return Err(PipelineError::StepFailed { step: "clone", message: result.stderr });
        }
        sink.emit(EventData::CloneProgress { step: "clone".to_string(), message: "clone complete".to_string() });

        // Step 4: detect project type and install dependencies.
        sink.set_status(ProviderStatus::Installing);
        sink.emit(EventData::Status { status: ProviderStatus::Installing, message: None });
        let files = driver.list_dir(&handle, &workspace_dir).await?;
        let kind = detect_project(&files);
        match install_command(kind, &files) {
            Some(cmd) => {
                sink.emit(EventData::InstallProgress {
                    step: "dependencies".to_string(),
                    message: format!("installing dependencies via `{cmd}`"),
                });
                let opts = ExecOptions { cwd: Some(workspace_dir.clone()), ..Default::default() };
                let result = timeout(self.config.compile_timeout, driver.run(&handle, &cmd, opts))
                    .await
                    .map_err(|_| DriverError::Timeout(self.config.compile_timeout))??;
                if result.exit_code != 0 {
                    return Err(PipelineError::StepFailed { step: "dependencies", message: result.stderr });
                }
            }
            None => {
                sink.emit(EventData::InstallProgress {
                    step: "dependencies".to_string(),
                    message: "no recognized manifest; skipping dependency install".to_string(),
                });
            }
        }

        // Step 5: install the agent runtime (JS runtime + the agent itself).
        self.install_agent_runtime(&driver, &handle, &workspace_dir, sink).await?;

        // Step 6: write agent configuration.
        let config_path = format!("{workspace_dir}/.opencode/opencode.json");
        driver.write_file(&handle, &config_path, agent_config_json().to_string().as_bytes()).await?;

        // Step 7: write the task prompt (a reference aid; the Iteration
        // Engine builds the iteration prompt separately).
        driver.write_file(&handle, &format!("{workspace_dir}/prompt.md"), ctx.task.as_bytes()).await?;

        // Step 8: start the agent server in the background.
        sink.set_status(ProviderStatus::Running);
        sink.emit(EventData::Status { status: ProviderStatus::Running, message: None });
        let start_cmd = format!(
            "nohup opencode serve --port {} > {}/.opencode/server.log 2>&1 & disown",
            AGENT_PORT, workspace_dir
        );
        let opts = ExecOptions { cwd: Some(workspace_dir.clone()), background: true, ..Default::default() };
        driver.run(&handle, &start_cmd, opts).await?;

        // Step 9: resolve the public URL for the agent port.
        let urls = match driver.get_process_urls(&handle, &[AGENT_PORT]).await {
            Ok(urls) => urls,
            Err(DriverError::CapabilityUnsupported(_)) => Default::default(),
            Err(e) => return Err(e.into()),
        };
        let agent_server_url = urls.get(&AGENT_PORT).cloned();
        sink.set_agent_server_url(agent_server_url.clone());
        match &agent_server_url {
            Some(url) => sink.emit(EventData::OpencodeReady { url: url.clone() }),
            None => sink.emit(EventData::Error {
                message: "agent server URL could not be resolved".to_string(),
                kind: Some("agent_unreachable".to_string()),
            }),
        }

        Ok(PreparedAgent { sandbox: handle, workspace_dir, agent_server_url })
    }

    /// Probes for a tool; installs it via the platform package manager if
    /// absent. Tolerates environments where the tool is pre-installed
    /// (spec 4.4 step 2).
    async fn ensure_tool(
        &self,
        driver: &std::sync::Arc<dyn fleet_adapters::gateway::SandboxDriver>,
        handle: &SandboxHandle,
        probe_cmd: &str,
        install_cmd: &str,
        sink: &dyn ProviderSink,
        step: &'static str,
    ) -> Result<(), PipelineError> {
        let probe = timeout(self.config.probe_timeout, driver.run(handle, probe_cmd, ExecOptions::default()))
            .await
            .map_err(|_| DriverError::Timeout(self.config.probe_timeout))??;
        if probe.exit_code == 0 {
            return Ok(());
        }
        sink.emit(EventData::InstallProgress {
            step: step.to_string(),
            message: format!("installing via `{install_cmd}`"),
        });
        let install = timeout(self.config.install_timeout, driver.run(handle, install_cmd, ExecOptions::default()))
            .await
            .map_err(|_| DriverError::Timeout(self.config.install_timeout))??;
        if install.exit_code != 0 {
            return Err(PipelineError::StepFailed { step, message: install.stderr });
        }
        Ok(())
    }

    /// Installs the JS runtime and the agent binary with best-effort
    /// fallback invocations. Failure here is emitted but only fails the
    /// provider if the agent binary still can't be confirmed present
    /// afterwards (spec 4.4 step 5).
    async fn install_agent_runtime(
        &self,
        driver: &std::sync::Arc<dyn fleet_adapters::gateway::SandboxDriver>,
        handle: &SandboxHandle,
        workspace_dir: &str,
        sink: &dyn ProviderSink,
    ) -> Result<(), PipelineError> {
        sink.emit(EventData::InstallProgress {
            step: "agent_runtime".to_string(),
            message: "installing node runtime".to_string(),
        });
        let node_probe =
            timeout(self.config.probe_timeout, driver.run(handle, "node --version", ExecOptions::default()))
                .await
                .map_err(|_| DriverError::Timeout(self.config.probe_timeout))??;
        if node_probe.exit_code != 0 {
            let fallbacks = [
                "curl -fsSL https://deb.nodesource.com/setup_20.x | bash - && apt-get install -y nodejs",
                "apt-get install -y nodejs npm",
            ];
            for cmd in fallbacks {
                let res = timeout(self.config.install_timeout, driver.run(handle, cmd, ExecOptions::default()))
                    .await
                    .map_err(|_| DriverError::Timeout(self.config.install_timeout))??;
                if res.exit_code == 0 {
                    break;
                }
                sink.emit(EventData::InstallProgress {
                    step: "agent_runtime".to_string(),
                    message: format!("node install attempt failed: {}", res.stderr),
                });
            }
        }

        sink.emit(EventData::InstallProgress {
            step: "agent_runtime".to_string(),
            message: "installing opencode agent".to_string(),
        });
        let install_cmds = ["npm install -g opencode-ai", "curl -fsSL https://opencode.ai/install | bash"];
        for cmd in install_cmds {
            let res = timeout(self.config.install_timeout, driver.run(handle, cmd, ExecOptions::default()))
                .await
                .map_err(|_| DriverError::Timeout(self.config.install_timeout))??;
            if res.exit_code == 0 {
                break;
            }
            sink.emit(EventData::InstallProgress {
                step: "agent_runtime".to_string(),
                message: format!("agent install attempt failed: {}", res.stderr),
            });
        }

        let opts = ExecOptions { cwd: Some(workspace_dir.to_string()), ..Default::default() };
        let confirm = timeout(self.config.probe_timeout, driver.run(handle, "opencode --version", opts))
            .await
            .map_err(|_| DriverError::Timeout(self.config.probe_timeout))??;
        if confirm.exit_code != 0 {
            return Err(PipelineError::StepFailed {
                step: "agent_runtime",
                message: "opencode binary not present after install attempts".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
