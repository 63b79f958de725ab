// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pid-addressed signal delivery.

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use pp_core::Fault;

/// Deliver `signal` (an OS signal number) to `pid`.
///
/// `ESRCH` is benign: signal delivery may race the child's exit and the
/// supervisor observes the outcome through `wait` regardless.
pub fn send_signal(pid: u32, signal: i32) -> Result<(), Fault> {
    let signal = Signal::try_from(signal)
        .map_err(|_| Fault::user(format!("unknown signal number: {}", signal)))?;
    match kill(Pid::from_raw(pid as i32), signal) {
        Ok(()) => Ok(()),
        Err(Errno::ESRCH) => {
            tracing::debug!(pid, signal = %signal, "signal target already exited");
            Ok(())
        }
        Err(e) => Err(Fault::application(format!("unable to signal pid {}: {}", pid, e))),
    }
}

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
