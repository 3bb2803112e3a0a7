// tests/core_runtime.rs

use stagegate::engine::{CoreCommand, CoreRuntime, JobOutcome, PipelineEvent, RuntimeOptions};
use stagegate::types::{AccessLevel, JobStatus};
use stagegate_test_utils::builders::{EnvironmentBuilder, JobBuilder, PipelineBuilder};
use stagegate_test_utils::init_tracing;

fn names(step: &stagegate::engine::CoreStep) -> Vec<String> {
    step.dispatched().map(|j| j.name.clone()).collect()
}

#[test]
fn process_dispatches_pending_jobs_once() {
    init_tracing();

    let processor = PipelineBuilder::new()
        .with_job("compile", JobBuilder::new("build").build())
        .with_job("docs", JobBuilder::new("deploy").no_needs().build())
        .processor();
    let mut core = CoreRuntime::new(
        processor,
        RuntimeOptions {
            exit_when_settled: false,
        },
    );

    let step = core.step(PipelineEvent::Process);
    assert!(step.keep_running);
    assert_eq!(names(&step), vec!["compile", "docs"]);
    assert!(matches!(step.commands.first(), Some(CoreCommand::Persist(_))));

    let step = core.step(PipelineEvent::Process);
    assert!(step.commands.is_empty());
    assert!(core.was_dispatched("docs"));
}

#[test]
fn finishing_a_job_dispatches_the_next_stage() {
    init_tracing();

    let processor = PipelineBuilder::new()
        .with_job("compile", JobBuilder::new("build").build())
        .with_job("unit", JobBuilder::new("test").build())
        .processor();
    let mut core = CoreRuntime::new(
        processor,
        RuntimeOptions {
            exit_when_settled: true,
        },
    );

    core.step(PipelineEvent::Process);
    let step = core.step(PipelineEvent::JobStarted {
        job: "compile".to_string(),
    });
    assert!(names(&step).is_empty());
    assert!(step.keep_running);

    let step = core.step(PipelineEvent::JobFinished {
        job: "compile".to_string(),
        outcome: JobOutcome::Success,
    });
    assert_eq!(names(&step), vec!["unit"]);
    assert!(!step.requests_exit());

    let step = core.step(PipelineEvent::JobFinished {
        job: "unit".to_string(),
        outcome: JobOutcome::Success,
    });
    assert!(step.requests_exit());
    assert!(!step.keep_running);
    assert!(core.is_settled());
}

#[test]
fn approvals_event_dispatches_the_unblocked_deploy() {
    init_tracing();

    let processor = PipelineBuilder::new()
        .with_job("ship", JobBuilder::new("deploy").environment("production").build())
        .with_environment(
            "production",
            EnvironmentBuilder::new()
                .rule(2, AccessLevel::Maintainer, 0)
                .build(),
        )
        .processor();
    let mut core = CoreRuntime::new(
        processor,
        RuntimeOptions {
            exit_when_settled: false,
        },
    );

    let step = core.step(PipelineEvent::Process);
    assert!(names(&step).is_empty());

    let step = core.step(PipelineEvent::ApprovalsUpdated {
        environment: "production".to_string(),
        access_level: AccessLevel::Maintainer,
        approvals: 2,
    });
    assert_eq!(names(&step), vec!["ship"]);

    let outcome = step.outcomes().next().expect("persisted outcome");
    assert_eq!(outcome.status_of("ship"), Some(JobStatus::Pending));
}

#[test]
fn playing_a_manual_job_dispatches_it() {
    init_tracing();

    let processor = PipelineBuilder::new()
        .with_job("release", JobBuilder::new("deploy").manual().build())
        .processor();
    let mut core = CoreRuntime::new(
        processor,
        RuntimeOptions {
            exit_when_settled: false,
        },
    );

    core.step(PipelineEvent::Process);
    let step = core.step(PipelineEvent::JobPlayed {
        job: "release".to_string(),
    });
    assert_eq!(names(&step), vec!["release"]);
}

#[test]
fn cancel_and_shutdown_stop_the_loop() {
    init_tracing();

    let processor = PipelineBuilder::new()
        .with_job("compile", JobBuilder::new("build").build())
        .processor();
    let mut core = CoreRuntime::new(
        processor,
        RuntimeOptions {
            exit_when_settled: false,
        },
    );

    core.step(PipelineEvent::Process);
    let step = core.step(PipelineEvent::CancelRequested);
    assert!(!step.keep_running);
    assert!(step.requests_exit());
    assert_eq!(
        core.processor().status_of("compile"),
        Some(JobStatus::Canceled)
    );

    let step = core.step(PipelineEvent::ShutdownRequested);
    assert!(!step.keep_running);
    assert!(step.commands.is_empty());
}
