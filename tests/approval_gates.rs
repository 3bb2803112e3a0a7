// tests/approval_gates.rs

use stagegate::engine::JobOutcome;
use stagegate::types::{AccessLevel, DeploymentStatus, JobStatus, PipelineStatus};
use stagegate_test_utils::builders::{EnvironmentBuilder, JobBuilder, PipelineBuilder};
use stagegate_test_utils::init_tracing;

/// `compile` has passed; `staging` is unprotected, `production` needs two
/// maintainer approvals, and `smoke` needs the production deploy.
fn deploy_pipeline(approvals: u32) -> PipelineBuilder {
    PipelineBuilder::new()
        .with_job("compile", JobBuilder::new("build").status(JobStatus::Success).build())
        .with_job(
            "deploy_staging",
            JobBuilder::new("deploy").environment("staging").build(),
        )
        .with_job(
            "deploy_production",
            JobBuilder::new("deploy").environment("production").build(),
        )
        .with_job("smoke", JobBuilder::new(".post").needs("deploy_production").build())
        .with_environment(
            "production",
            EnvironmentBuilder::new()
                .rule(2, AccessLevel::Maintainer, approvals)
                .build(),
        )
}

#[test]
fn unprotected_deploy_starts_and_protected_deploy_is_blocked() {
    init_tracing();

    let mut processor = deploy_pipeline(0).processor();
    let outcome = processor.process();

    assert_eq!(outcome.status_of("deploy_staging"), Some(JobStatus::Pending));
    assert_eq!(
        processor.deployment_status_of("deploy_staging"),
        Some(DeploymentStatus::Created)
    );

    assert_eq!(outcome.status_of("deploy_production"), Some(JobStatus::Manual));
    assert_eq!(
        processor.deployment_status_of("deploy_production"),
        Some(DeploymentStatus::Blocked)
    );
    assert!(
        outcome
            .deployment_updates
            .iter()
            .any(|u| u.environment == "production" && u.to == DeploymentStatus::Blocked)
    );

    assert_eq!(processor.status_of("smoke"), Some(JobStatus::Created));
    assert_eq!(outcome.pipeline_status, PipelineStatus::Running);
}

#[test]
fn blocked_deploy_cannot_be_played() {
    init_tracing();

    let mut processor = deploy_pipeline(0).processor();
    processor.process();

    let outcome = processor.play("deploy_production");
    assert!(outcome.is_empty());
    assert_eq!(processor.status_of("deploy_production"), Some(JobStatus::Manual));
}

#[test]
fn dependents_stay_created_while_approvals_are_missing() {
    init_tracing();

    let mut processor = deploy_pipeline(0).processor();
    processor.process();
    processor.job_finished("deploy_staging", JobOutcome::Success);

    // One approval out of two.
    let outcome = processor.record_approvals("production", AccessLevel::Maintainer, 1);
    assert!(outcome.status_updates.is_empty());
    assert_eq!(processor.status_of("deploy_production"), Some(JobStatus::Manual));
    assert_eq!(processor.status_of("smoke"), Some(JobStatus::Created));
    assert_eq!(processor.pipeline_status(), PipelineStatus::Blocked);
}

#[test]
fn approvals_from_another_access_level_do_not_count() {
    init_tracing();

    let mut processor = deploy_pipeline(0).processor();
    processor.process();

    processor.record_approvals("production", AccessLevel::Developer, 5);
    assert_eq!(processor.status_of("deploy_production"), Some(JobStatus::Manual));
}

#[test]
fn reaching_required_approvals_unblocks_the_deploy() {
    init_tracing();

    let mut processor = deploy_pipeline(0).processor();
    processor.process();

    let outcome = processor.record_approvals("production", AccessLevel::Maintainer, 2);
    assert_eq!(outcome.status_of("deploy_production"), Some(JobStatus::Pending));
    assert_eq!(
        processor.deployment_status_of("deploy_production"),
        Some(DeploymentStatus::Created)
    );

    processor.job_started("deploy_production");
    assert_eq!(
        processor.deployment_status_of("deploy_production"),
        Some(DeploymentStatus::Running)
    );

    let outcome = processor.job_finished("deploy_production", JobOutcome::Success);
    assert_eq!(outcome.status_of("smoke"), Some(JobStatus::Pending));
    assert_eq!(
        processor.deployment_status_of("deploy_production"),
        Some(DeploymentStatus::Success)
    );
}

#[test]
fn partial_approvals_keep_the_deploy_held() {
    init_tracing();

    let mut processor = deploy_pipeline(0).processor();
    processor.process();

    let outcome = processor.record_approvals("production", AccessLevel::Maintainer, 1);
    assert_eq!(outcome.status_of("deploy_production"), None);
    assert_eq!(processor.status_of("deploy_production"), Some(JobStatus::Manual));

    let rule = &processor
        .pipeline()
        .environment("production")
        .expect("production is protected")
        .rules[0];
    assert_eq!(rule.approvals, 1);
    assert_eq!(rule.missing_approvals(), 1);
    assert!(!rule.is_satisfied());

    processor.record_approvals("production", AccessLevel::Maintainer, 3);
    let rule = &processor
        .pipeline()
        .environment("production")
        .expect("production is protected")
        .rules[0];
    assert_eq!(rule.missing_approvals(), 0);
    assert_eq!(processor.status_of("deploy_production"), Some(JobStatus::Pending));
}

#[test]
fn approvals_already_present_in_the_snapshot_are_honoured() {
    init_tracing();

    let mut processor = deploy_pipeline(2).processor();
    processor.process();

    assert_eq!(processor.status_of("deploy_production"), Some(JobStatus::Pending));
    assert_eq!(
        processor.deployment_status_of("deploy_production"),
        Some(DeploymentStatus::Created)
    );
}

#[test]
fn succeeded_but_unapproved_deploy_keeps_dependents_waiting() {
    init_tracing();

    let mut processor = PipelineBuilder::new()
        .with_job(
            "deploy_production",
            JobBuilder::new("deploy")
                .environment("production")
                .status(JobStatus::Success)
                .build(),
        )
        .with_job("smoke", JobBuilder::new(".post").build())
        .with_environment(
            "production",
            EnvironmentBuilder::new()
                .rule(2, AccessLevel::Maintainer, 0)
                .build(),
        )
        .processor();

    let outcome = processor.process();

    assert_eq!(processor.status_of("smoke"), Some(JobStatus::Created));
    assert_eq!(
        processor.deployment_status_of("deploy_production"),
        Some(DeploymentStatus::Blocked)
    );
    assert_eq!(outcome.pipeline_status, PipelineStatus::Blocked);
}

#[test]
fn every_rule_of_an_environment_must_be_met() {
    init_tracing();

    let mut processor = PipelineBuilder::new()
        .with_job("deploy", JobBuilder::new("deploy").environment("production").build())
        .with_environment(
            "production",
            EnvironmentBuilder::new()
                .rule(1, AccessLevel::Maintainer, 0)
                .rule(1, AccessLevel::Admin, 0)
                .build(),
        )
        .processor();

    processor.process();
    processor.record_approvals("production", AccessLevel::Maintainer, 1);
    assert_eq!(processor.status_of("deploy"), Some(JobStatus::Manual));

    processor.record_approvals("production", AccessLevel::Admin, 1);
    assert_eq!(processor.status_of("deploy"), Some(JobStatus::Pending));
}

#[test]
fn approval_gates_can_be_disabled() {
    init_tracing();

    let mut processor = deploy_pipeline(0).approvals_enabled(false).processor();
    processor.process();

    assert_eq!(processor.status_of("deploy_production"), Some(JobStatus::Pending));
    assert_eq!(
        processor.deployment_status_of("deploy_production"),
        Some(DeploymentStatus::Created)
    );
}

#[test]
fn failed_deploy_reports_a_failed_deployment_even_when_unapproved() {
    init_tracing();

    let mut processor = deploy_pipeline(0).processor();
    processor.process();
    processor.record_approvals("production", AccessLevel::Maintainer, 2);
    processor.job_finished("deploy_production", JobOutcome::Failed);

    assert_eq!(
        processor.deployment_status_of("deploy_production"),
        Some(DeploymentStatus::Failed)
    );
    assert_eq!(processor.status_of("smoke"), Some(JobStatus::Skipped));
}

#[test]
fn approvals_for_unknown_environment_are_ignored() {
    init_tracing();

    let mut processor = deploy_pipeline(0).processor();
    processor.process();

    let outcome = processor.record_approvals("qa", AccessLevel::Maintainer, 3);
    assert!(outcome.is_empty());
}
