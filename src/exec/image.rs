// src/exec/image.rs

//! Pre-built `execvp` arguments for a stage.
//!
//! Everything the child needs is allocated here, in the parent, before
//! `fork()`. After the fork the child only touches raw pointers into these
//! buffers, so it never allocates.

use std::ffi::{CString, c_char};
use std::ptr;

use nix::libc;

use crate::errors::{PipelineError, Result};
use crate::types::Stage;

/// Exit status of a stage whose program and fallback both failed to execute.
pub const LAUNCH_FAILURE_EXIT_CODE: i32 = 1;

/// A NUL-terminated argv, ready for `execvp`.
#[derive(Debug)]
struct Argv {
    // `ptrs` points into these buffers; the heap allocations of a `CString`
    // never move, even when the `Vec` holding them does.
    _strings: Vec<CString>,
    ptrs: Vec<*const c_char>,
}

impl Argv {
    fn new(program: &str, parts: &[&str]) -> Result<Self> {
        let strings = parts
            .iter()
            .map(|part| {
                CString::new(*part).map_err(|_| PipelineError::InvalidStage {
                    program: program.to_string(),
                    reason: format!("argument {part:?} contains a NUL byte"),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut ptrs: Vec<*const c_char> = strings.iter().map(|s| s.as_ptr()).collect();
        ptrs.push(ptr::null());

        Ok(Self {
            _strings: strings,
            ptrs,
        })
    }

    fn program(&self) -> *const c_char {
        self.ptrs[0]
    }

    fn as_ptr(&self) -> *const *const c_char {
        self.ptrs.as_ptr()
    }
}

/// Program image for one stage: the preferred program, an optional fallback
/// and the diagnostic written when neither can be executed.
#[derive(Debug)]
pub struct ExecImage {
    primary: Argv,
    fallback: Option<Argv>,
    failure_message: Vec<u8>,
}

impl ExecImage {
    pub fn prepare(stage: &Stage) -> Result<Self> {
        if stage.program.is_empty() {
            return Err(PipelineError::InvalidStage {
                program: stage.program.clone(),
                reason: "program name is empty".to_string(),
            });
        }

        let primary = Argv::new(&stage.program, &stage.argv())?;

        // Retrying the program that just failed would not be a fallback.
        let fallback = match stage.fallback.as_deref() {
            Some(alt) if !alt.is_empty() && alt != stage.program => {
                Some(Argv::new(alt, &[alt])?)
            }
            _ => None,
        };

        let failure_message = match (&fallback, stage.fallback.as_deref()) {
            (Some(_), Some(alt)) => format!(
                "digenv: cannot execute '{}' or fallback '{}'\n",
                stage.program, alt
            ),
            _ => format!("digenv: cannot execute '{}'\n", stage.program),
        };

        Ok(Self {
            primary,
            fallback,
            failure_message: failure_message.into_bytes(),
        })
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Replace the current process image. Child side only.
    ///
    /// Tries the program, then the fallback once. If both fail, writes the
    /// diagnostic to stderr and exits with [`LAUNCH_FAILURE_EXIT_CODE`].
    pub fn exec(&self) -> ! {
        // SAFETY: every pointer refers to a live, NUL-terminated buffer owned by
        // `self`, and each argv array is terminated by a null pointer.
        unsafe {
            libc::execvp(self.primary.program(), self.primary.as_ptr());
            if let Some(fallback) = &self.fallback {
                libc::execvp(fallback.program(), fallback.as_ptr());
            }
        }
        self.abort(&self.failure_message)
    }

    /// Write `message` to stderr and `_exit`. Child side only.
    pub fn abort(&self, message: &[u8]) -> ! {
        // SAFETY: `write` and `_exit` are async-signal-safe.
        unsafe {
            libc::write(
                libc::STDERR_FILENO,
                message.as_ptr().cast(),
                message.len(),
            );
            libc::_exit(LAUNCH_FAILURE_EXIT_CODE)
        }
    }
}
