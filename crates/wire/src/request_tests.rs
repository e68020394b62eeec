// SPDX-License-Identifier: MIT

use super::*;

fn req() -> StartRunRequest {
    StartRunRequest {
        repo_url: "foo/bar".into(),
        branch: None,
        task: "fix the bug".into(),
        providers: vec!["docker".into(), "modal".into()],
        config: None,
        user_id: None,
    }
}

#[test]
fn validates_happy_path() {
    let v = req().validate().unwrap();
    assert_eq!(v.providers, vec![Provider::Docker, Provider::Modal]);
    assert_eq!(v.max_iterations, DEFAULT_MAX_ITERATIONS);
    assert!(v.use_sse);
}

#[test]
fn rejects_empty_task() {
    let mut r = req();
    r.task = "   ".into();
    assert_eq!(r.validate().unwrap_err(), ValidationError::EmptyTask);
}

#[test]
fn rejects_empty_providers() {
    let mut r = req();
    r.providers = vec![];
    assert_eq!(r.validate().unwrap_err(), ValidationError::EmptyProviders);
}

#[test]
fn rejects_unknown_provider() {
    let mut r = req();
    r.providers = vec!["fly".into()];
    assert_eq!(r.validate().unwrap_err(), ValidationError::UnknownProvider("fly".into()));
}

#[test]
fn rejects_malformed_repo_url() {
    let mut r = req();
    r.repo_url = "not a repo".into();
    assert!(matches!(r.validate().unwrap_err(), ValidationError::RepoUrl(_)));
}

#[test]
fn config_overrides_apply() {
    let mut r = req();
    r.config = Some(RunConfigInput {
        max_iterations: Some(5),
        idle_timeout_ms: Some(1000),
        use_sse: Some(false),
    });
    let v = r.validate().unwrap();
    assert_eq!(v.max_iterations, 5);
    assert_eq!(v.idle_timeout_ms, 1000);
    assert!(!v.use_sse);
}
