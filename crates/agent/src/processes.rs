use std::sync::Mutex;
use sysinfo::{Pid, System, Users};

// Matches the bound the dashboard expects; longer command lines are cut.
const COMMAND_MAX_CHARS: usize = 500;

/// Identity of a process that was still alive at lookup time.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProcess {
    pub username: String,
    pub command: String,
}

/// Best-effort pid resolution. `None` means the process vanished between
/// enumeration and lookup; callers drop the entry rather than report it.
pub trait ProcessResolver: Send + Sync {
    fn resolve(&self, pid: u32) -> Option<ResolvedProcess>;
}

struct ResolverState {
    system: System,
    users: Users,
}

/// Resolver backed by the OS process table.
pub struct SystemProcessResolver {
    state: Mutex<ResolverState>,
}

impl SystemProcessResolver {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ResolverState {
                system: System::new(),
                users: Users::new_with_refreshed_list(),
            }),
        }
    }
}

impl Default for SystemProcessResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessResolver for SystemProcessResolver {
    fn resolve(&self, pid: u32) -> Option<ResolvedProcess> {
        let mut state = self.state.lock().unwrap();
        let state = &mut *state;

        let target = Pid::from_u32(pid);
        if !state.system.refresh_process(target) {
            return None;
        }
        let process = state.system.process(target)?;
        let uid = process.user_id()?;

        if state.users.get_user_by_id(uid).is_none() {
            state.users.refresh_list();
        }
        let username = state.users.get_user_by_id(uid)?.name().to_string();
        let command = truncate_command(process.cmd());

        Some(ResolvedProcess { username, command })
    }
}

fn truncate_command(cmd: &[String]) -> String {
    cmd.join(" ").chars().take(COMMAND_MAX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_command_joins_arguments() {
        let cmd = vec![
            "python".to_string(),
            "train.py".to_string(),
            "--epochs=10".to_string(),
        ];
        assert_eq!(truncate_command(&cmd), "python train.py --epochs=10");
    }

    #[test]
    fn test_truncate_command_caps_length() {
        let cmd = vec!["x".repeat(2000)];
        let truncated = truncate_command(&cmd);
        assert_eq!(truncated.chars().count(), COMMAND_MAX_CHARS);
    }

    #[test]
    fn test_truncate_command_empty() {
        assert_eq!(truncate_command(&[]), "");
    }

    #[test]
    fn test_resolve_missing_pid_is_none() {
        let resolver = SystemProcessResolver::new();
        // Linux pids top out well below this
        assert!(resolver.resolve(u32::MAX - 1).is_none());
    }
}
