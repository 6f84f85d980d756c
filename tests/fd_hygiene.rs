// Kept as the only test in this binary: it inspects descriptor numbers of the
// whole process, which concurrently running tests would reuse.

mod common;
use crate::common::builders::{OutputCapture, StagesBuilder};
use crate::common::recording_launcher::RecordingLauncher;
use crate::common::with_timeout;

use std::error::Error;

use nix::errno::Errno;
use nix::libc;

type TestResult = Result<(), Box<dyn Error>>;

fn is_open(fd: i32) -> bool {
    // SAFETY: F_GETFD only inspects the descriptor table.
    let rc = unsafe { libc::fcntl(fd, libc::F_GETFD) };
    !(rc == -1 && Errno::last() == Errno::EBADF)
}

#[tokio::test]
async fn parent_holds_no_channel_handles_after_run() -> TestResult {
    let out = OutputCapture::new();
    let stages = StagesBuilder::new()
        .emit("b\na\n")
        .program_with_args("grep", &["a"])
        .program("sort")
        .program("cat")
        .build();

    let launcher = RecordingLauncher::new();
    let records = launcher.records_handle();
    let mut orchestrator =
        digenv::engine::PipelineOrchestrator::new(launcher).with_stdout(out.fd());
    let result = with_timeout(orchestrator.run(&stages)).await?;
    assert!(result.all_exited_cleanly);

    let records = records.lock().unwrap().clone();
    let close_handles = &records[0].close_handles;
    // Three channels; the trailing entry is the replaced stdout.
    let channel_handles = &close_handles[..6];
    for &fd in channel_handles {
        assert!(!is_open(fd), "channel handle {fd} still open in parent");
    }

    Ok(())
}
