//! Detached process launching.
//!
//! Commands run through `sh -c` in their own session so they survive the
//! window manager and never share its controlling terminal. The launcher
//! never waits on a child; exited children are collected between events
//! when reaping is enabled.

use std::process::{Command, Stdio};

use crate::display::ProcessLauncher;

/// Launches commands through the user's shell
pub struct ShellLauncher {
    reap_children: bool,
}

impl ShellLauncher {
    pub fn new(reap_children: bool) -> Self {
        Self { reap_children }
    }

    fn command_for(command_line: &str) -> Command {
        // Handle shell expansion for paths like ~/bin/tool
        let expanded = shellexpand::tilde(command_line);

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(expanded.as_ref()).stdin(Stdio::null());

        // Detach from bebop's process group so apps survive if bebop exits
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            unsafe {
                cmd.pre_exec(|| {
                    // Create new session to detach from terminal
                    libc::setsid();
                    Ok(())
                });
            }
        }

        cmd
    }
}

impl ProcessLauncher for ShellLauncher {
    fn spawn_detached(&mut self, command_line: &str) {
        if command_line.trim().is_empty() {
            log::warn!("Refusing to spawn an empty command");
            return;
        }

        log::info!("Spawning '{}'", command_line);
        match Self::command_for(command_line).spawn() {
            Ok(child) => log::debug!("Spawned '{}' as pid {}", command_line, child.id()),
            Err(e) => log::error!("Failed to spawn '{}': {}", command_line, e),
        }
    }

    fn reap(&mut self) -> usize {
        if !self.reap_children {
            return 0;
        }

        let mut reaped = 0;
        loop {
            let mut status: libc::c_int = 0;
            let pid = unsafe { libc::waitpid(-1, &mut status, libc::WNOHANG) };
            if pid <= 0 {
                break;
            }
            log::debug!("Reaped child {} (status {})", pid, status);
            reaped += 1;
        }
        reaped
    }
}
