//! Process-resource-group isolation and non-blocking command spawning.
//!
//! At startup the engine creates a child control group nested under the
//! group of the current process. Every spawned external command is moved
//! into it right after spawn, so children are accounted for (and can be
//! cleaned up in bulk) without the event loop ever reaping them
//! synchronously.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use tokio::process::{Child, Command};
use tracing::{debug, trace, warn};

use crate::{Error, Result};

/// Location of the unified cgroup hierarchy.
const CGROUP_ROOT: &str = "/sys/fs/cgroup";
/// Membership file inside a cgroup directory.
const CGROUP_PROCS: &str = "cgroup.procs";
/// Source of the current process's own group.
const SELF_CGROUP: &str = "/proc/self/cgroup";

/// An isolated process-resource group for spawned child commands.
///
/// Creation failure leaves the group detached: spawning still works, the
/// children just stay in the parent's group.
pub struct ResourceGroup {
    procs: Option<PathBuf>,
}

impl ResourceGroup {
    /// Create a group named `scope` as a sibling of the current process's
    /// own control group.
    pub fn create(scope: &str) -> Self {
        match Self::try_create(scope) {
            Ok(procs) => {
                debug!("spawning child processes into {}", procs.display());
                Self { procs: Some(procs) }
            }
            Err(e) => {
                warn!("cannot create resource group for child processes: {}", e);
                Self { procs: None }
            }
        }
    }

    /// A group that performs no isolation.
    pub fn detached() -> Self {
        Self { procs: None }
    }

    fn try_create(scope: &str) -> io::Result<PathBuf> {
        let contents = fs::read_to_string(SELF_CGROUP)?;
        let own = parse_cgroup(&contents).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "unparseable /proc/self/cgroup")
        })?;
        let parent = Path::new(&own).parent().unwrap_or_else(|| Path::new("/"));
        let relative = parent.strip_prefix("/").unwrap_or(parent);
        let dir = Path::new(CGROUP_ROOT).join(relative).join(scope);
        fs::create_dir_all(&dir)?;
        Ok(dir.join(CGROUP_PROCS))
    }

    /// Move `pid` into the group. Failure is logged, never fatal.
    pub fn assign(&self, pid: u32) {
        let Some(procs) = self.procs.as_ref() else {
            return;
        };
        if let Err(e) = fs::write(procs, format!("{}\n", pid)) {
            warn!(pid, "cannot move child process into resource group: {}", e);
        }
    }
}

/// Extract the group path from `/proc/self/cgroup` contents (the field
/// after the last colon of the last entry).
fn parse_cgroup(contents: &str) -> Option<String> {
    let line = contents.lines().rev().find(|l| !l.trim().is_empty())?;
    let (_, group) = line.rsplit_once(':')?;
    Some(group.trim().to_string())
}

/// Search `$PATH` for an executable named `exe`; falls back to the name
/// itself when nothing matches.
fn expand_executable(exe: &str) -> PathBuf {
    if exe.contains('/') {
        return PathBuf::from(exe);
    }
    let path = env::var("PATH").unwrap_or_default();
    for base in path.split(':').filter(|p| !p.is_empty()) {
        let candidate = Path::new(base).join(exe);
        let Ok(meta) = fs::metadata(&candidate) else {
            continue;
        };
        if meta.is_file() && is_executable(&meta) {
            return candidate;
        }
    }
    PathBuf::from(exe)
}

#[cfg(unix)]
fn is_executable(meta: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt as _;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &fs::Metadata) -> bool {
    true
}

/// Spawns external commands without blocking the event loop.
///
/// Children are moved into the [`ResourceGroup`] immediately after spawn
/// and reaped by a fire-and-forget task.
#[derive(Clone)]
pub struct CommandSpawner {
    group: Arc<ResourceGroup>,
}

impl CommandSpawner {
    /// Create a spawner placing children into `group`.
    pub fn new(group: Arc<ResourceGroup>) -> Self {
        Self { group }
    }

    /// A spawner without resource-group isolation.
    pub fn detached() -> Self {
        Self::new(Arc::new(ResourceGroup::detached()))
    }

    fn launch(&self, cmdline: &str) -> Result<Child> {
        let mut parts = cmdline.split_whitespace();
        let exe = parts
            .next()
            .ok_or_else(|| Error::Msg("empty command".to_string()))?;
        let child = Command::new(expand_executable(exe)).args(parts).spawn()?;
        if let Some(pid) = child.id() {
            self.group.assign(pid);
        }
        Ok(child)
    }

    /// Spawn `cmdline` and forget about it; the exit status is only logged.
    pub fn spawn(&self, cmdline: &str) -> Result<()> {
        let mut child = self.launch(cmdline)?;
        let cmdline = cmdline.to_string();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => trace!(cmd = %cmdline, "command finished"),
                Ok(status) => warn!(cmd = %cmdline, %status, "command failed"),
                Err(e) => warn!(cmd = %cmdline, "cannot reap command: {}", e),
            }
        });
        Ok(())
    }

    /// Spawn `cmdline` as a state probe: when it exits, `flag` is set to
    /// whether it succeeded.
    pub fn probe(&self, cmdline: &str, flag: Arc<AtomicBool>) {
        let child = match self.launch(cmdline) {
            Ok(child) => child,
            Err(e) => {
                warn!(cmd = %cmdline, "cannot spawn probe: {}", e);
                return;
            }
        };
        let cmdline = cmdline.to_string();
        let mut child = child;
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => flag.store(status.success(), Ordering::Relaxed),
                Err(e) => warn!(cmd = %cmdline, "cannot reap probe: {}", e),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_unified_hierarchy_entry() {
        let contents = "0::/user.slice/user-1000.slice/session-2.scope\n";
        assert_eq!(
            parse_cgroup(contents).as_deref(),
            Some("/user.slice/user-1000.slice/session-2.scope")
        );
    }

    #[test]
    fn parses_last_entry_of_hybrid_hierarchy() {
        let contents = "12:cpuset:/\n1:name=systemd:/init.scope\n0::/init.scope\n";
        assert_eq!(parse_cgroup(contents).as_deref(), Some("/init.scope"));
        assert_eq!(parse_cgroup(""), None);
    }

    #[test]
    fn expands_executables_from_path() {
        // `sh` exists on every unix test host.
        let resolved = expand_executable("sh");
        assert!(resolved.is_absolute(), "resolved: {}", resolved.display());
        assert!(resolved.ends_with("sh"));

        // Paths with separators are kept as-is.
        assert_eq!(
            expand_executable("./local/tool"),
            PathBuf::from("./local/tool")
        );
        // Unknown names fall through unchanged.
        assert_eq!(
            expand_executable("definitely-not-a-real-binary"),
            PathBuf::from("definitely-not-a-real-binary")
        );
    }

    #[tokio::test]
    async fn spawn_returns_before_the_child_exits() {
        let spawner = CommandSpawner::detached();
        let started = std::time::Instant::now();
        spawner.spawn("sleep 5").unwrap();
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }

    #[tokio::test]
    async fn probe_records_exit_status() {
        let spawner = CommandSpawner::detached();
        let ok = Arc::new(AtomicBool::new(false));
        spawner.probe("true", ok.clone());

        let failed = Arc::new(AtomicBool::new(true));
        spawner.probe("false", failed.clone());

        for _ in 0..100 {
            if ok.load(Ordering::Relaxed) && !failed.load(Ordering::Relaxed) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("probe results not observed");
    }
}
