mod common;
use crate::common::builders::{OutputCapture, StagesBuilder, emit, input_fd};
use crate::common::{init_tracing, with_timeout};

use std::error::Error;

use digenv::engine::PipelineOrchestrator;
use digenv::exec::ForkLauncher;
use digenv::types::{RunState, Stage, StageOutcome};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn source_sort_pager_delivers_sorted_lines() -> TestResult {
    init_tracing();
    let out = OutputCapture::new();
    let stages = StagesBuilder::new()
        .emit("b\na\nc\n")
        .program("sort")
        .program("cat")
        .build();

    let mut orchestrator = PipelineOrchestrator::new(ForkLauncher::new()).with_stdout(out.fd());
    let result = with_timeout(orchestrator.run(&stages)).await?;

    assert!(result.all_exited_cleanly);
    assert_eq!(result.aggregate_exit_code, 0);
    assert_eq!(result.statuses.len(), 3);
    assert_eq!(out.contents(), "a\nb\nc\n");
    assert_eq!(orchestrator.state(), RunState::Done { success: true });

    Ok(())
}

#[tokio::test]
async fn filter_stage_receives_its_arguments() -> TestResult {
    init_tracing();
    let out = OutputCapture::new();
    let stages = StagesBuilder::new()
        .emit("apple\nbanana\navocado\n")
        .program_with_args("grep", &["^a"])
        .program("sort")
        .program("cat")
        .build();

    let mut orchestrator = PipelineOrchestrator::new(ForkLauncher::new()).with_stdout(out.fd());
    let result = with_timeout(orchestrator.run(&stages)).await?;

    assert!(result.all_exited_cleanly);
    assert_eq!(result.statuses.len(), 4);
    assert_eq!(out.contents(), "apple\navocado\n");

    Ok(())
}

#[tokio::test]
async fn substring_filter_keeps_every_matching_line() -> TestResult {
    let out = OutputCapture::new();
    let stages = StagesBuilder::new()
        .emit("cherry\napple\nbanana\nfig\navocado\n")
        .program_with_args("grep", &["a"])
        .program("sort")
        .program("cat")
        .build();

    let mut orchestrator = PipelineOrchestrator::new(ForkLauncher::new()).with_stdout(out.fd());
    let result = with_timeout(orchestrator.run(&stages)).await?;

    assert!(result.all_exited_cleanly);
    assert_eq!(out.contents(), "apple\navocado\nbanana\n");

    Ok(())
}

#[tokio::test]
async fn single_stage_needs_no_channels() -> TestResult {
    let out = OutputCapture::new();
    let stages = vec![emit("only\n")];

    let mut orchestrator = PipelineOrchestrator::new(ForkLauncher::new()).with_stdout(out.fd());
    let result = with_timeout(orchestrator.run(&stages)).await?;

    assert!(result.all_exited_cleanly);
    assert_eq!(result.outcome_of(0), Some(&StageOutcome::Exited(0)));
    assert_eq!(out.contents(), "only\n");

    Ok(())
}

#[tokio::test]
async fn first_stage_reads_the_supplied_stdin() -> TestResult {
    let out = OutputCapture::new();
    let (_input_file, input) = input_fd("zeta\nalpha\n");
    let stages = StagesBuilder::new().program("cat").program("sort").build();

    let mut orchestrator = PipelineOrchestrator::new(ForkLauncher::new())
        .with_stdin(input)
        .with_stdout(out.fd());
    let result = with_timeout(orchestrator.run(&stages)).await?;

    assert!(result.all_exited_cleanly);
    assert_eq!(out.contents(), "alpha\nzeta\n");

    Ok(())
}

#[tokio::test]
async fn large_output_flows_through_bounded_pipes() -> TestResult {
    // Far more than one pipe buffer; a stage blocked on a full pipe must be
    // drained by its consumer for the run to finish.
    let out = OutputCapture::new();
    let stages = vec![
        Stage::new("seq").with_args(["1", "200000"]),
        Stage::new("cat"),
        Stage::new("wc").with_args(["-l"]),
    ];

    let mut orchestrator = PipelineOrchestrator::new(ForkLauncher::new()).with_stdout(out.fd());
    let result = with_timeout(orchestrator.run(&stages)).await?;

    assert!(result.all_exited_cleanly);
    assert_eq!(out.contents().trim(), "200000");

    Ok(())
}

#[tokio::test]
async fn clean_non_zero_exit_is_not_a_pipeline_failure() -> TestResult {
    let out = OutputCapture::new();
    let stages = StagesBuilder::new()
        .sh("printf 'partial\\n'; exit 3")
        .program("cat")
        .build();

    let mut orchestrator = PipelineOrchestrator::new(ForkLauncher::new()).with_stdout(out.fd());
    let result = with_timeout(orchestrator.run(&stages)).await?;

    assert!(result.all_exited_cleanly);
    assert_eq!(result.aggregate_exit_code, 0);
    assert_eq!(result.outcome_of(0), Some(&StageOutcome::Exited(3)));
    assert_eq!(result.outcome_of(1), Some(&StageOutcome::Exited(0)));
    assert_eq!(out.contents(), "partial\n");

    Ok(())
}

#[tokio::test]
async fn downstream_sees_end_of_input_when_upstream_fails_early() -> TestResult {
    // `sort` only finishes once every write end of its input is closed.
    let out = OutputCapture::new();
    let stages = StagesBuilder::new()
        .sh("exit 1")
        .program("sort")
        .program("cat")
        .build();

    let mut orchestrator = PipelineOrchestrator::new(ForkLauncher::new()).with_stdout(out.fd());
    let result = with_timeout(orchestrator.run(&stages)).await?;

    assert!(result.all_exited_cleanly);
    assert_eq!(result.outcome_of(0), Some(&StageOutcome::Exited(1)));
    assert_eq!(out.contents(), "");

    Ok(())
}
