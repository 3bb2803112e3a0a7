// tests/events_and_cancel.rs

use stagegate::engine::JobOutcome;
use stagegate::types::{AccessLevel, DeploymentStatus, JobStatus, PipelineStatus, When};
use stagegate_test_utils::builders::{EnvironmentBuilder, JobBuilder, PipelineBuilder};
use stagegate_test_utils::init_tracing;

fn three_stage_pipeline() -> PipelineBuilder {
    PipelineBuilder::new()
        .with_job("compile", JobBuilder::new("build").build())
        .with_job("unit", JobBuilder::new("test").build())
        .with_job("lint", JobBuilder::new("test").build())
        .with_job("ship", JobBuilder::new("deploy").environment("production").build())
}

#[test]
fn cancel_transitions_every_non_terminal_job_in_one_step() {
    init_tracing();

    let mut processor = PipelineBuilder::new()
        .with_job("compile", JobBuilder::new("build").status(JobStatus::Success).build())
        .with_job("unit", JobBuilder::new("test").status(JobStatus::Running).build())
        .with_job("lint", JobBuilder::new("test").status(JobStatus::Failed).allow_failure(true).build())
        .with_job("release", JobBuilder::new("deploy").manual().status(JobStatus::Manual).build())
        .with_job("ship", JobBuilder::new("deploy").environment("production").build())
        .processor();

    let outcome = processor.cancel();

    let canceled: Vec<&str> = outcome
        .status_updates
        .iter()
        .filter(|u| u.to == JobStatus::Canceled)
        .map(|u| u.name.as_str())
        .collect();
    assert_eq!(canceled, vec!["unit", "release", "ship"]);
    assert_eq!(outcome.status_updates.len(), 3);
    assert_eq!(outcome.passes, 0);
    assert_eq!(processor.status_of("compile"), Some(JobStatus::Success));
    assert_eq!(processor.status_of("lint"), Some(JobStatus::Failed));
    assert_eq!(
        processor.deployment_status_of("ship"),
        Some(DeploymentStatus::Canceled)
    );
    assert_eq!(outcome.pipeline_status, PipelineStatus::Canceled);
    assert!(processor.is_settled());

    // Nothing left to move.
    assert!(processor.process().is_empty());
}

#[test]
fn cancel_also_releases_approval_held_deployments() {
    init_tracing();

    let mut processor = PipelineBuilder::new()
        .with_job("ship", JobBuilder::new("deploy").environment("production").build())
        .with_environment(
            "production",
            EnvironmentBuilder::new()
                .rule(1, AccessLevel::Maintainer, 0)
                .build(),
        )
        .processor();

    processor.process();
    assert_eq!(
        processor.deployment_status_of("ship"),
        Some(DeploymentStatus::Blocked)
    );

    let outcome = processor.cancel();
    assert_eq!(outcome.status_of("ship"), Some(JobStatus::Canceled));
    assert_eq!(
        processor.deployment_status_of("ship"),
        Some(DeploymentStatus::Canceled)
    );
}

#[test]
fn updates_are_ordered_by_stage_then_declaration() {
    init_tracing();

    let mut processor = PipelineBuilder::new()
        .with_job("late_dag", JobBuilder::new("deploy").no_needs().build())
        .with_job("compile", JobBuilder::new("build").build())
        .with_job("early_dag", JobBuilder::new("test").no_needs().build())
        .processor();

    let outcome = processor.process();
    let names: Vec<&str> = outcome.status_updates.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["compile", "early_dag", "late_dag"]);
}

#[test]
fn full_run_through_events_reaches_success() {
    init_tracing();

    let mut processor = three_stage_pipeline().processor();

    processor.process();
    for job in ["compile", "unit", "lint", "ship"] {
        assert_eq!(processor.status_of(job), Some(JobStatus::Pending), "{job}");
        processor.job_started(job);
        assert_eq!(processor.pipeline_status(), PipelineStatus::Running);
        processor.job_finished(job, JobOutcome::Success);
        if job == "unit" {
            // `lint` is still pending.
            assert_eq!(processor.status_of("ship"), Some(JobStatus::Created));
        }
    }

    assert_eq!(processor.pipeline_status(), PipelineStatus::Success);
    assert_eq!(
        processor.deployment_status_of("ship"),
        Some(DeploymentStatus::Success)
    );
}

#[test]
fn failure_in_the_middle_fails_the_pipeline() {
    init_tracing();

    let mut processor = three_stage_pipeline().processor();

    processor.process();
    processor.job_finished("compile", JobOutcome::Success);
    // `ship` waits for `unit` before reacting to the failure.
    let outcome = processor.job_finished("lint", JobOutcome::Failed);
    assert_eq!(outcome.status_of("ship"), None);
    assert_eq!(processor.status_of("ship"), Some(JobStatus::Created));
    assert_eq!(
        processor.deployment_status_of("ship"),
        Some(DeploymentStatus::Created)
    );
    assert_eq!(outcome.pipeline_status, PipelineStatus::Running);

    let outcome = processor.job_finished("unit", JobOutcome::Success);
    assert_eq!(outcome.status_of("ship"), Some(JobStatus::Skipped));
    assert_eq!(
        processor.deployment_status_of("ship"),
        Some(DeploymentStatus::Skipped)
    );
    assert_eq!(outcome.pipeline_status, PipelineStatus::Failed);
}

#[test]
fn events_that_do_not_apply_are_ignored() {
    init_tracing();

    let mut processor = three_stage_pipeline().processor();
    processor.process();

    assert!(processor.job_started("nope").is_empty());
    assert!(processor.job_started("unit").is_empty());
    assert!(processor.job_finished("unit", JobOutcome::Success).is_empty());
    assert!(processor.play("compile").is_empty());
    assert_eq!(processor.status_of("unit"), Some(JobStatus::Created));
}

#[test]
fn pending_job_next_to_held_job_keeps_pipeline_running() {
    init_tracing();

    let mut processor = PipelineBuilder::new()
        .with_job("docs", JobBuilder::new("deploy").no_needs().build())
        .with_job(
            "ship",
            JobBuilder::new("deploy").no_needs().environment("production").build(),
        )
        .with_environment(
            "production",
            EnvironmentBuilder::new()
                .rule(2, AccessLevel::Maintainer, 0)
                .build(),
        )
        .processor();

    let outcome = processor.process();
    assert_eq!(outcome.status_of("docs"), Some(JobStatus::Pending));
    assert_eq!(outcome.status_of("ship"), Some(JobStatus::Manual));
    assert_eq!(outcome.pipeline_status, PipelineStatus::Running);

    let outcome = processor.job_finished("docs", JobOutcome::Success);
    assert_eq!(outcome.pipeline_status, PipelineStatus::Blocked);
}

#[test]
fn pipeline_of_only_skipped_jobs_is_skipped() {
    init_tracing();

    let mut processor = PipelineBuilder::new()
        .with_job("report", JobBuilder::new("build").when(When::OnFailure).build())
        .processor();

    let outcome = processor.process();
    assert_eq!(outcome.status_of("report"), Some(JobStatus::Skipped));
    assert_eq!(outcome.pipeline_status, PipelineStatus::Skipped);
}

#[test]
fn unprocessed_pipeline_is_created() {
    init_tracing();

    let processor = three_stage_pipeline().processor();
    assert_eq!(processor.pipeline_status(), PipelineStatus::Created);
    assert!(processor.is_settled());
}
