// SPDX-License-Identifier: MIT

use super::*;
use crate::sink::test_support::RecordingSink;
use fleet_adapters::fake_driver::FakeDriver;
use fleet_core::Provider;
use std::collections::HashMap;
use std::sync::Arc;
use yare::parameterized;

#[parameterized(
    node = { &["package.json".to_string()], ProjectKind::Node },
    python_requirements = { &["requirements.txt".to_string()], ProjectKind::PythonRequirements },
    python_pyproject = { &["pyproject.toml".to_string()], ProjectKind::PythonPyproject },
    rust = { &["Cargo.toml".to_string()], ProjectKind::Rust },
    go = { &["go.mod".to_string()], ProjectKind::Go },
    unknown = { &["README.md".to_string()], ProjectKind::Unknown },
)]
fn detects_project_kind(files: &[String], expected: ProjectKind) {
    assert_eq!(detect_project(files), expected);
}

#[parameterized(
    bun = { &["bun.lockb".to_string()], NodePackageManager::Bun },
    pnpm = { &["pnpm-lock.yaml".to_string()], NodePackageManager::Pnpm },
    yarn = { &["yarn.lock".to_string()], NodePackageManager::Yarn },
    npm_default = { &[], NodePackageManager::Npm },
)]
fn chooses_node_package_manager_by_lockfile(files: &[String], expected: NodePackageManager) {
    assert_eq!(detect_node_package_manager(files), expected);
}

#[test]
fn unknown_project_has_no_install_command() {
    assert!(install_command(ProjectKind::Unknown, &[]).is_none());
}

#[test]
fn agent_config_denies_interactive_prompts_and_plan_mode() {
    let cfg = agent_config_json();
    assert_eq!(cfg["permission"]["question"], "deny");
    assert_eq!(cfg["permission"]["plan_enter"], "deny");
    assert_eq!(cfg["permission"]["plan_exit"], "deny");
    assert_eq!(cfg["permission"]["bash"], "allow");
    assert_eq!(cfg["permission"]["read"], "allow");
}

fn gateway_with_fake() -> (DriverGateway, Arc<FakeDriver>) {
    let fake = Arc::new(FakeDriver::new());
    let mut m: HashMap<Provider, Arc<dyn fleet_adapters::gateway::SandboxDriver>> = HashMap::new();
    m.insert(Provider::Docker, fake.clone());
    (DriverGateway::new(m, Default::default()), fake)
}

fn ctx() -> PipelineCtx {
    PipelineCtx {
        provider: Provider::Docker,
        repo: RepoLocation { owner: "foo".into(), repo: "bar".into() },
        branch: "main".into(),
        task: "fix the bug".into(),
    }
}

#[tokio::test]
async fn happy_path_reaches_running_with_agent_url_absent_by_default() {
    let (gateway, _fake) = gateway_with_fake();
    let pipeline = Pipeline::new(gateway, PipelineConfig::default());
    let sink = RecordingSink::new();
    let prepared = pipeline.run(ctx(), &sink).await.unwrap();
    assert_eq!(sink.statuses(), vec![ProviderStatus::Cloning, ProviderStatus::Installing, ProviderStatus::Running]);
    assert!(sink.sandbox_id.lock().is_some());
    assert_eq!(prepared.workspace_dir, "/workspace/bar");
    // FakeDriver has no get_process_urls override, so it degrades to
    // an empty map (spec 7 capability_unsupported policy).
    assert!(prepared.agent_server_url.is_none());
}

#[tokio::test]
async fn clone_failure_fails_the_provider() {
    let (gateway, fake) = gateway_with_fake();
    fake.fail_commands_containing("git clone");
    let pipeline = Pipeline::new(gateway, PipelineConfig::default());
    let sink = RecordingSink::new();
    let err = pipeline.run(ctx(), &sink).await.unwrap_err();
    assert!(matches!(err, PipelineError::StepFailed { step: "clone", .. }));
}
