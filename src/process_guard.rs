//! Cleanup of spawned host commands
//!
//! Every command runs as leader of its own process group with a parent-death
//! signal, and its PID sits in a global registry while it runs. If bindsetup
//! is interrupted, or `main` unwinds past its `ProcessGuard`, each registered
//! group gets SIGTERM and, after a grace period, SIGKILL. An `apt-get`
//! left running would keep holding the dpkg lock.

use nix::libc;
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;
use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

static CHILDREN: OnceLock<Mutex<ChildRegistry>> = OnceLock::new();

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// PIDs (and so process group ids) of commands currently running
#[derive(Debug, Default)]
pub struct ChildRegistry {
    pids: HashSet<u32>,
    stopping: bool,
}

impl ChildRegistry {
    pub fn global() -> &'static Mutex<ChildRegistry> {
        CHILDREN.get_or_init(Mutex::default)
    }

    pub fn register(&mut self, pid: u32) {
        self.pids.insert(pid);
        debug!(pid, "child registered");
    }

    pub fn unregister(&mut self, pid: u32) {
        self.pids.remove(&pid);
        debug!(pid, "child unregistered");
    }

    /// SIGTERM every group, then SIGKILL whatever outlives `grace`.
    /// Only the first call does anything.
    pub fn terminate_all(&mut self, grace: Duration) {
        if std::mem::replace(&mut self.stopping, true) || self.pids.is_empty() {
            return;
        }

        let groups: Vec<Pid> = self.pids.drain().map(|p| Pid::from_raw(p as i32)).collect();
        info!("Stopping {} running command(s)", groups.len());
        signal_groups(&groups, Signal::SIGTERM);

        let deadline = Instant::now() + grace;
        while Instant::now() < deadline {
            if !groups.iter().any(|&pid| is_alive(pid)) {
                return;
            }
            thread::sleep(POLL_INTERVAL);
        }

        let stragglers: Vec<Pid> = groups.into_iter().filter(|&pid| is_alive(pid)).collect();
        warn!("{} command(s) ignored SIGTERM, killing", stragglers.len());
        signal_groups(&stragglers, Signal::SIGKILL);
    }
}

fn signal_groups(groups: &[Pid], sig: Signal) {
    for &pid in groups {
        // The leader may have left its group already
        if let Err(e) = killpg(pid, sig).or_else(|_| kill(pid, sig)) {
            debug!(%pid, ?sig, "signal not delivered: {}", e);
        }
    }
}

/// Running and not a zombie
fn is_alive(pid: Pid) -> bool {
    if kill(pid, None).is_err() {
        return false;
    }
    // /proc/<pid>/stat: "pid (comm) state ..."
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => stat
            .rsplit(')')
            .next()
            .and_then(|rest| rest.split_whitespace().next())
            .is_none_or(|state| !matches!(state, "Z" | "X")),
        Err(_) => true,
    }
}

/// Terminates registered children when dropped; `main` holds one for the run
#[derive(Debug)]
pub struct ProcessGuard {
    grace: Duration,
}

impl ProcessGuard {
    pub fn new() -> Self {
        Self {
            grace: Duration::from_secs(5),
        }
    }
}

impl Default for ProcessGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.terminate_all(self.grace);
        }
    }
}

/// On SIGINT, SIGTERM or SIGHUP: stop children, then exit with `128 + signal`
pub fn init_signal_handlers() -> Result<(), std::io::Error> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;

    thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            info!("Received signal {}, stopping", sig);
            if let Ok(mut registry) = ChildRegistry::global().lock() {
                registry.terminate_all(Duration::from_secs(3));
            }
            std::process::exit(128 + sig);
        }
    });

    Ok(())
}

/// Extension trait for `std::process::Command` to set up process groups
pub trait CommandProcessGroup {
    /// Run the command as leader of a new process group, killed if we die
    fn in_new_process_group(&mut self) -> &mut Self;
}

impl CommandProcessGroup for std::process::Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        // SAFETY: only async-signal-safe calls (setpgid, prctl) between fork and exec
        unsafe {
            self.pre_exec(|| {
                nix::unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0))
                    .map_err(std::io::Error::other)?;
                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    fn reaped_within(child: &mut std::process::Child, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(Some(_)) = child.try_wait() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_register_unregister() {
        let mut registry = ChildRegistry::default();
        registry.register(1234);
        registry.register(5678);
        registry.unregister(1234);
        assert_eq!(registry.pids, HashSet::from([5678]));
    }

    #[test]
    fn test_terminate_all_stops_process_group() {
        let mut child = Command::new("sh")
            .args(["-c", "sleep 60"])
            .in_new_process_group()
            .spawn()
            .expect("Failed to spawn sleep");
        let pid = child.id();
        assert!(is_alive(Pid::from_raw(pid as i32)));

        let mut registry = ChildRegistry::default();
        registry.register(pid);
        registry.terminate_all(Duration::from_millis(500));

        assert!(reaped_within(&mut child, Duration::from_secs(2)));
        assert!(registry.pids.is_empty());
    }

    #[test]
    fn test_terminate_all_runs_once() {
        let mut registry = ChildRegistry::default();
        registry.register(999_999);
        registry.terminate_all(Duration::from_millis(10));
        assert!(registry.stopping);

        registry.register(999_998);
        registry.terminate_all(Duration::from_millis(10));
        assert!(registry.pids.contains(&999_998));
    }

    #[test]
    fn test_missing_pid_is_not_alive() {
        assert!(!is_alive(Pid::from_raw(999_999)));
    }
}
