//! External Process Invocation
//!
//! Runs one codec command line as a blocking, scoped operation: spawn, wait,
//! measure wall-clock time. With a deadline configured, a watchdog thread
//! sends SIGTERM when it expires and SIGKILL after a short grace period, and
//! the invocation reports [`CodecError::Timeout`]. The child is only reaped
//! after the watchdog has stopped.
//!
//! Commands are executed directly from an argument vector. No shell is
//! involved, so paths containing spaces need no quoting.

use crate::error::CodecError;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Time a terminated process gets to exit before it is killed outright.
const KILL_GRACE: Duration = Duration::from_millis(500);

/// A fully resolved command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: OsString,
    args: Vec<OsString>,
}

impl Invocation {
    /// Start a command line for `program`
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append a whitespace-separated option string such as `-m 2 -B 4096`
    pub fn options(self, options: &str) -> Self {
        self.args(options.split_whitespace())
    }

    /// Program to execute
    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// Arguments, in order
    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_quoted(f, &self.program)?;
        for arg in &self.args {
            f.write_str(" ")?;
            write_quoted(f, arg)?;
        }
        Ok(())
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, value: &OsStr) -> fmt::Result {
    let text = value.to_string_lossy();
    if text.is_empty() || text.contains(char::is_whitespace) {
        write!(f, "\"{}\"", text)
    } else {
        f.write_str(&text)
    }
}

/// Run `invocation` to completion and return its wall-clock duration.
///
/// The clock starts just before the spawn and stops when the process has
/// exited, so process start-up cost is part of the measurement. The tool's
/// stdio is discarded; only the exit status is observed.
pub fn run_timed(invocation: &Invocation, timeout: Option<Duration>) -> Result<Duration, CodecError> {
    let mut command = Command::new(&invocation.program);
    command
        .args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    debug!(command = %invocation, "spawning codec process");

    let start = Instant::now();
    let mut child = command.spawn().map_err(|source| CodecError::SpawnFailed {
        program: invocation.program.to_string_lossy().into_owned(),
        source,
    })?;

    let (status, elapsed) = match timeout {
        None => {
            let status = child.wait()?;
            (status, start.elapsed())
        }
        Some(limit) => {
            let watchdog = Watchdog::arm(child.id(), limit);
            let exited = wait_exited(child.id());
            let elapsed = start.elapsed();
            // The child stays a zombie until the watchdog is joined, so its
            // pid cannot be reused by the time a late signal is sent.
            let fired = watchdog.disarm();
            let status = child.wait()?;
            exited?;
            if timed_out(fired, elapsed, limit) {
                return Err(CodecError::Timeout {
                    command: invocation.to_string(),
                    timeout: limit,
                });
            }
            (status, elapsed)
        }
    };

    if !status.success() {
        return Err(CodecError::NonZeroExit {
            command: invocation.to_string(),
            status,
        });
    }

    debug!(command = %invocation, elapsed_ms = elapsed.as_secs_f64() * 1000.0, "codec process finished");
    Ok(elapsed)
}

/// A watchdog that fires after the process already exited signals a zombie,
/// which is harmless; only an exit at or past the deadline counts.
fn timed_out(fired: bool, elapsed: Duration, limit: Duration) -> bool {
    fired && elapsed >= limit
}

/// Block until process `pid` has exited without reaping it.
#[cfg(unix)]
fn wait_exited(pid: u32) -> Result<(), std::io::Error> {
    loop {
        let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
        let ret = unsafe {
            libc::waitid(
                libc::P_PID,
                pid as libc::id_t,
                &mut info,
                libc::WEXITED | libc::WNOWAIT,
            )
        };
        if ret == 0 {
            return Ok(());
        }
        let err = std::io::Error::last_os_error();
        if err.kind() != std::io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

#[cfg(not(unix))]
fn wait_exited(_pid: u32) -> Result<(), std::io::Error> {
    Ok(())
}

/// Deadline enforcement for one child process.
struct Watchdog {
    done: mpsc::Sender<()>,
    fired: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Watchdog {
    fn arm(pid: u32, limit: Duration) -> Self {
        let (done, rx) = mpsc::channel::<()>();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);

        let handle = thread::spawn(move || {
            if let Err(RecvTimeoutError::Timeout) = rx.recv_timeout(limit) {
                flag.store(true, Ordering::SeqCst);
                if let Err(e) = send_signal(pid, Signal::Terminate) {
                    warn!(pid, error = %e, "failed to terminate timed-out codec process");
                }
                if let Err(RecvTimeoutError::Timeout) = rx.recv_timeout(KILL_GRACE) {
                    if let Err(e) = send_signal(pid, Signal::Kill) {
                        warn!(pid, error = %e, "failed to kill timed-out codec process");
                    }
                }
            }
        });

        Self {
            done,
            fired,
            handle,
        }
    }

    /// Stop the watchdog; returns whether the deadline expired.
    fn disarm(self) -> bool {
        let _ = self.done.send(());
        let _ = self.handle.join();
        self.fired.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    Terminate,
    Kill,
}

#[cfg(unix)]
fn send_signal(pid: u32, signal: Signal) -> Result<(), std::io::Error> {
    let signo = match signal {
        Signal::Terminate => libc::SIGTERM,
        Signal::Kill => libc::SIGKILL,
    };
    let ret = unsafe { libc::kill(pid as libc::pid_t, signo) };
    if ret == -1 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

#[cfg(not(unix))]
fn send_signal(_pid: u32, _signal: Signal) -> Result<(), std::io::Error> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "process signals are only available on unix",
    ))
}
