#![allow(dead_code)]

use std::fs::File;
use std::os::fd::OwnedFd;

use digenv::types::Stage;
use tempfile::NamedTempFile;

/// A stage that runs `script` with `sh -c`.
pub fn sh(script: &str) -> Stage {
    Stage::new("sh").with_args(["-c", script])
}

/// A stage that writes `text` to stdout verbatim.
pub fn emit(text: &str) -> Stage {
    Stage::new("sh").with_args(["-c", "printf '%s' \"$1\"", "sh", text])
}

/// A program name that does not exist on any `PATH`.
pub fn missing_program(tag: &str) -> String {
    format!("digenv-test-missing-{tag}-{}", std::process::id())
}

/// Builder for stage lists to simplify test setup.
pub struct StagesBuilder {
    stages: Vec<Stage>,
}

impl StagesBuilder {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn emit(mut self, text: &str) -> Self {
        self.stages.push(emit(text));
        self
    }

    pub fn sh(mut self, script: &str) -> Self {
        self.stages.push(sh(script));
        self
    }

    pub fn program(mut self, program: &str) -> Self {
        self.stages.push(Stage::new(program));
        self
    }

    pub fn program_with_args(mut self, program: &str, args: &[&str]) -> Self {
        self.stages.push(Stage::new(program).with_args(args.iter().copied()));
        self
    }

    pub fn pager(mut self, program: &str, fallback: &str) -> Self {
        self.stages.push(Stage::new(program).with_fallback(fallback));
        self
    }

    pub fn build(self) -> Vec<Stage> {
        self.stages
    }
}

impl Default for StagesBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Temporary file standing in for the pipeline's stdout.
pub struct OutputCapture {
    file: NamedTempFile,
}

impl OutputCapture {
    pub fn new() -> Self {
        Self {
            file: NamedTempFile::new().expect("Failed to create output capture file"),
        }
    }

    /// A fresh handle on the capture file, for `with_stdout`.
    pub fn fd(&self) -> OwnedFd {
        let file: File = self
            .file
            .reopen()
            .expect("Failed to reopen output capture file");
        OwnedFd::from(file)
    }

    pub fn contents(&self) -> String {
        std::fs::read_to_string(self.file.path()).expect("Failed to read output capture file")
    }
}

impl Default for OutputCapture {
    fn default() -> Self {
        Self::new()
    }
}

/// Temporary file standing in for the pipeline's stdin.
pub fn input_fd(contents: &str) -> (NamedTempFile, OwnedFd) {
    let file = NamedTempFile::new().expect("Failed to create input file");
    std::fs::write(file.path(), contents).expect("Failed to write input file");
    let reader = File::open(file.path()).expect("Failed to open input file");
    (file, OwnedFd::from(reader))
}
