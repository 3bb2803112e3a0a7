// tests/config_loading.rs

use std::io::Write;

use tempfile::NamedTempFile;

use stagegate::config::{load_and_validate, parse_str};
use stagegate::dag::PipelineProcessor;
use stagegate::errors::StagegateError;
use stagegate::types::{
    AccessLevel, DeclaredKind, DeploymentStatus, JobStatus, PolicyScope, SuffixStrategy, When,
};

const SNAPSHOT: &str = r#"
[config]
approvals_enabled = true
strict_post_stage = false

[pipeline]
stages = ["build", "test", "deploy"]

[job.regular_job]
stage = "build"

[job.bridge_dag_job]
stage = "test"
needs = []
kind = "bridge"

[job.release]
stage = "deploy"
when = "manual"

[job."production:deploy"]
id = 7
stage = "deploy"
environment = "production"
status = "manual"
deployment_status = "blocked"

[[policy]]
source = "compliance-42"
scope = "namespace"
suffix = "never"
[policy.job.policy_job]
stage = ".pipeline-policy-pre"

[environment.production]
[[environment.production.approval_rule]]
required_approvals = 2
access_level = "maintainer"
approvals = 1
"#;

#[test]
fn snapshot_file_loads_with_defaults_applied() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{SNAPSHOT}").unwrap();

    let snapshot = load_and_validate(file.path()).unwrap();

    assert!(snapshot.config.approvals_enabled);
    assert!(snapshot.config.policies_enabled);
    assert!(!snapshot.config.strict_post_stage);
    assert!(!snapshot.config.dag_jobs_wait_for_policy_pre);

    let names: Vec<&str> = snapshot.job.keys().map(|k| k.as_str()).collect();
    assert_eq!(names, vec!["regular_job", "bridge_dag_job", "release", "production:deploy"]);

    let regular = &snapshot.job["regular_job"];
    assert_eq!(regular.needs, None);
    assert_eq!(regular.status, JobStatus::Created);
    assert!(!regular.effective_allow_failure());

    let bridge = &snapshot.job["bridge_dag_job"];
    assert_eq!(bridge.needs, Some(Vec::new()));
    assert_eq!(bridge.kind, DeclaredKind::Bridge);

    let release = &snapshot.job["release"];
    assert_eq!(release.when, When::Manual);
    assert!(release.effective_allow_failure());

    let deploy = &snapshot.job["production:deploy"];
    assert_eq!(deploy.id, Some(7));
    assert_eq!(deploy.status, JobStatus::Manual);
    assert_eq!(deploy.deployment_status, Some(DeploymentStatus::Blocked));

    let policy = &snapshot.policy[0];
    assert_eq!(policy.source, "compliance-42");
    assert_eq!(policy.scope, PolicyScope::Namespace);
    assert_eq!(policy.suffix, SuffixStrategy::Never);

    let rule = &snapshot.environment["production"].approval_rule[0];
    assert_eq!(rule.required_approvals, 2);
    assert_eq!(rule.access_level, AccessLevel::Maintainer);
    assert_eq!(rule.approvals, 1);
}

#[test]
fn loaded_snapshot_gates_legacy_jobs_behind_the_pre_stage() {
    let snapshot = PipelineProcessor::from_snapshot(
        &stagegate::config::PipelineSnapshot::try_from(parse_str(SNAPSHOT).unwrap()).unwrap(),
    );
    let mut processor = snapshot.unwrap();

    let outcome = processor.process();
    assert_eq!(outcome.status_of("policy_job"), Some(JobStatus::Pending));
    assert_eq!(outcome.status_of("bridge_dag_job"), Some(JobStatus::Pending));
    assert_eq!(processor.status_of("regular_job"), Some(JobStatus::Created));
    // Still one approval short.
    assert_eq!(processor.status_of("production:deploy"), Some(JobStatus::Manual));
    assert_eq!(
        processor.deployment_status_of("production:deploy"),
        Some(DeploymentStatus::Blocked)
    );
}

#[test]
fn non_positive_required_approvals_are_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[job.deploy]
stage = "deploy"
environment = "production"

[environment.production]
[[environment.production.approval_rule]]
required_approvals = -1
"#
    )
    .unwrap();

    let result = load_and_validate(file.path());

    match result {
        Err(StagegateError::InvalidApprovalRule {
            environment,
            required,
        }) => {
            assert_eq!(environment, "production");
            assert_eq!(required, -1);
        }
        Err(e) => panic!("Expected InvalidApprovalRule, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[job.a\nstage = ").unwrap();

    let result = load_and_validate(file.path());
    assert!(matches!(result, Err(StagegateError::TomlError(_))));
}

#[test]
fn unknown_status_value_is_rejected() {
    let result = parse_str(
        r#"
[job.a]
status = "exploded"
"#,
    );
    assert!(matches!(result, Err(StagegateError::TomlError(_))));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_and_validate(dir.path().join("Pipeline.toml"));
    assert!(matches!(result, Err(StagegateError::IoError(_))));
}

#[test]
fn duplicate_explicit_ids_are_rejected() {
    let raw = parse_str(
        r#"
[job.a]
id = 3
stage = "build"

[job.b]
id = 3
stage = "test"
"#,
    )
    .unwrap();

    let err = stagegate::config::PipelineSnapshot::try_from(raw).unwrap_err();
    match err {
        StagegateError::ConfigError(msg) => assert!(msg.contains("reuses id 3")),
        other => panic!("Expected ConfigError, got: {other:?}"),
    }
}
