// src/exec/pipe_set.rs

//! Inter-stage channels.
//!
//! A pipeline of `N` stages needs `N - 1` channels. The first stage reads the
//! orchestrator's own stdin and the last one writes its stdout, so neither
//! end needs a channel.

use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};

use tracing::{debug, trace};

use crate::errors::{PipelineError, Result};

/// One unidirectional OS pipe between two adjacent stages.
#[derive(Debug)]
pub struct Channel {
    read: OwnedFd,
    write: OwnedFd,
}

impl Channel {
    fn open() -> nix::Result<Self> {
        let (read, write) = open_pipe()?;
        Ok(Self { read, write })
    }

    pub fn read_end(&self) -> BorrowedFd<'_> {
        self.read.as_fd()
    }

    pub fn write_end(&self) -> BorrowedFd<'_> {
        self.write.as_fd()
    }
}

// Close-on-exec keeps the handles out of processes forked concurrently by
// other threads. `dup2` onto stdin/stdout clears the flag for the two ends a
// stage actually binds.
#[cfg(not(any(target_os = "macos", target_os = "ios")))]
fn open_pipe() -> nix::Result<(OwnedFd, OwnedFd)> {
    nix::unistd::pipe2(nix::fcntl::OFlag::O_CLOEXEC)
}

#[cfg(any(target_os = "macos", target_os = "ios"))]
fn open_pipe() -> nix::Result<(OwnedFd, OwnedFd)> {
    use nix::libc;

    let (read, write) = nix::unistd::pipe()?;
    for fd in [&read, &write] {
        // SAFETY: `fd` is an open descriptor owned by this function.
        let rc = unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_SETFD, libc::FD_CLOEXEC) };
        if rc < 0 {
            return Err(nix::Error::last());
        }
    }
    Ok((read, write))
}

/// Owns every channel of one pipeline run.
///
/// The set is threaded explicitly through launching and cleanup. Dropping it
/// (or calling [`PipeSet::close_all`]) closes the parent's copy of every
/// handle.
#[derive(Debug, Default)]
pub struct PipeSet {
    channels: Vec<Channel>,
}

impl PipeSet {
    /// Allocate `n` fresh channels.
    ///
    /// All-or-nothing: if any `pipe()` call fails, the channels created so far
    /// are closed and `ResourceExhausted` is returned.
    pub fn allocate(n: usize) -> Result<Self> {
        let mut channels = Vec::with_capacity(n);
        for index in 0..n {
            let channel = Channel::open().map_err(|source| PipelineError::ResourceExhausted {
                index,
                requested: n,
                source,
            })?;
            trace!(
                channel = index,
                read = channel.read.as_raw_fd(),
                write = channel.write.as_raw_fd(),
                "allocated channel"
            );
            channels.push(channel);
        }
        debug!(channels = n, "channels allocated");
        Ok(Self { channels })
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn read_end(&self, index: usize) -> Option<BorrowedFd<'_>> {
        self.channels.get(index).map(Channel::read_end)
    }

    pub fn write_end(&self, index: usize) -> Option<BorrowedFd<'_>> {
        self.channels.get(index).map(Channel::write_end)
    }

    /// Every raw handle in the set, both ends of every channel.
    ///
    /// This is the close list handed to each launched stage.
    pub fn handles(&self) -> Vec<RawFd> {
        self.channels
            .iter()
            .flat_map(|c| [c.read.as_raw_fd(), c.write.as_raw_fd()])
            .collect()
    }

    /// Close the parent's copy of every handle.
    ///
    /// Consumes the set, so no handle can be used or closed twice.
    pub fn close_all(self) {
        let count = self.channels.len();
        drop(self.channels);
        debug!(channels = count, "parent closed all channel handles");
    }
}
