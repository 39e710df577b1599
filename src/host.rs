//! # Host Actions
//!
//! Privileged commands run when a hold gesture completes.
//!
//! Both actions are fire-and-forget: the command is spawned and its exit
//! status is collected on a detached thread and only logged, since a
//! successful reboot or shutdown ends this process anyway.

use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;

use tracing::{debug, error, info, warn};

use crate::config::HostConfig;

/// Host-level actions triggered from the gamepad.
pub trait HostActions: Send + Sync {
    fn reboot_host(&self);
    fn shutdown_host(&self);
}

/// Runs the configured reboot/shutdown commands.
#[derive(Debug, Clone)]
pub struct SystemHost {
    reboot_command: Vec<String>,
    shutdown_command: Vec<String>,
}

impl SystemHost {
    #[must_use]
    pub fn new(config: &HostConfig) -> Self {
        Self {
            reboot_command: config.reboot_command.clone(),
            shutdown_command: config.shutdown_command.clone(),
        }
    }

    /// Spawns `argv` detached from our stdio.
    ///
    /// Returns the thread waiting on the child, or `None` if the command did
    /// not start.
    fn spawn(argv: &[String]) -> Option<JoinHandle<Option<ExitStatus>>> {
        let Some((program, args)) = argv.split_first() else {
            error!("Host command is empty");
            return None;
        };

        match Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .spawn()
        {
            Ok(child) => {
                info!("Started `{}` (pid {})", argv.join(" "), child.id());
                Self::reap(child, argv.join(" "))
            }
            Err(e) => {
                error!("Failed to run `{}`: {}", argv.join(" "), e);
                None
            }
        }
    }

    /// Waits for `child` on a detached thread so it never lingers as a zombie.
    fn reap(mut child: Child, command: String) -> Option<JoinHandle<Option<ExitStatus>>> {
        let reaper = std::thread::Builder::new()
            .name("host-command".to_string())
            .spawn(move || match child.wait() {
                Ok(status) if status.success() => {
                    debug!("`{}` finished", command);
                    Some(status)
                }
                Ok(status) => {
                    error!("`{}` failed: {}", command, status);
                    Some(status)
                }
                Err(e) => {
                    error!("Failed to wait for `{}`: {}", command, e);
                    None
                }
            });

        match reaper {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Could not start waiter thread: {}", e);
                None
            }
        }
    }
}

impl HostActions for SystemHost {
    fn reboot_host(&self) {
        info!("Rebooting host...");
        Self::spawn(&self.reboot_command);
    }

    fn shutdown_host(&self) {
        info!("Shutting down host...");
        Self::spawn(&self.shutdown_command);
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Counts host action invocations.
    #[derive(Clone, Default)]
    pub struct RecordingHost {
        pub reboots: Arc<AtomicUsize>,
        pub shutdowns: Arc<AtomicUsize>,
    }

    impl RecordingHost {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reboots(&self) -> usize {
            self.reboots.load(Ordering::SeqCst)
        }

        pub fn shutdowns(&self) -> usize {
            self.shutdowns.load(Ordering::SeqCst)
        }
    }

    impl HostActions for RecordingHost {
        fn reboot_host(&self) {
            self.reboots.fetch_add(1, Ordering::SeqCst);
        }

        fn shutdown_host(&self) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }
}
