use super::PortProber;
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::process::Command;

/// A process observed listening on a probed port.
#[derive(Debug, Clone)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub command: Option<String>,
}

impl ProcessInfo {
    /// One line of listing text, as fed to the gateway classifier.
    fn listing_line(&self) -> String {
        match &self.command {
            Some(cmd) => format!("{} {} {}", self.pid, self.name, cmd),
            None => format!("{} {}", self.pid, self.name),
        }
    }
}

/// Production prober backed by `lsof` (macOS) and `ss`/`lsof` (Linux).
///
/// On platforms without a supported listing tool every port reads as
/// available; the launch path then relies on the gateway itself failing to
/// bind if the optimism was misplaced.
pub struct SystemPortProber;

#[async_trait]
impl PortProber for SystemPortProber {
    async fn is_port_available(&self, port: u16) -> bool {
        find_processes_on_port(port).await.is_empty()
    }

    async fn port_listing(&self, port: u16) -> String {
        find_processes_on_port(port)
            .await
            .iter()
            .map(ProcessInfo::listing_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Find all processes listening on a port (cross-platform).
async fn find_processes_on_port(port: u16) -> Vec<ProcessInfo> {
    #[cfg(target_os = "macos")]
    {
        find_processes_lsof(port).await
    }

    #[cfg(target_os = "linux")]
    {
        // Combine ss and lsof results for completeness
        let mut processes = find_processes_linux_ss(port).await;
        let seen: HashSet<u32> = processes.iter().map(|p| p.pid).collect();
        for p in find_processes_lsof(port).await {
            if !seen.contains(&p.pid) {
                processes.push(p);
            }
        }
        processes
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        Vec::new()
    }
}

#[cfg(any(target_os = "macos", target_os = "linux"))]
async fn find_processes_lsof(port: u16) -> Vec<ProcessInfo> {
    let output = match Command::new("lsof")
        .args([
            "-i",
            &format!(":{}", port),
            "-sTCP:LISTEN",
            "-P",
            "-n",
            "-F",
            "pcn",
        ])
        .output()
        .await
    {
        Ok(o) => o,
        Err(_) => return Vec::new(),
    };

    if !output.status.success() {
        return Vec::new();
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut processes = Vec::new();
    let mut seen_pids = HashSet::new();
    let mut current_pid: Option<u32> = None;
    let mut current_command: Option<String> = None;

    // Parse lsof field output (pPID, cCOMMAND, nNAME); each process block
    // starts with a 'p' line.
    for line in stdout.lines() {
        if let Some(stripped) = line.strip_prefix('p') {
            if let Some(pid) = current_pid {
                if seen_pids.insert(pid) {
                    processes.push(ProcessInfo {
                        pid,
                        name: current_command
                            .clone()
                            .unwrap_or_else(|| "unknown".to_string()),
                        command: current_command.clone(),
                    });
                }
            }
            current_pid = stripped.parse::<u32>().ok();
            current_command = None;
        } else if let Some(stripped) = line.strip_prefix('c') {
            current_command = Some(stripped.to_string());
        }
    }

    if let Some(pid) = current_pid {
        if seen_pids.insert(pid) {
            processes.push(ProcessInfo {
                pid,
                name: current_command
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string()),
                command: current_command,
            });
        }
    }

    processes
}

#[cfg(target_os = "linux")]
async fn find_processes_linux_ss(port: u16) -> Vec<ProcessInfo> {
    let output = match Command::new("ss")
        .args(["-tlnp", &format!("sport = :{}", port)])
        .output()
        .await
    {
        Ok(o) => o,
        Err(_) => return Vec::new(),
    };

    if !output.status.success() {
        return Vec::new();
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut processes = Vec::new();
    let mut seen_pids = HashSet::new();

    // Parse ss output: look for pid=PID in the trailing users: field.
    for line in stdout.lines().skip(1) {
        let Some(users_part) = line.split_whitespace().last() else {
            continue;
        };
        for part in users_part.split(',') {
            let Some(pid_str) = part.strip_prefix("pid=") else {
                continue;
            };
            let Ok(pid) = pid_str.parse::<u32>() else {
                continue;
            };
            if !seen_pids.insert(pid) {
                continue;
            }
            let name = std::fs::read_to_string(format!("/proc/{}/comm", pid))
                .ok()
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let command = std::fs::read_to_string(format!("/proc/{}/cmdline", pid))
                .ok()
                .map(|s| s.replace('\0', " ").trim().to_string());
            processes.push(ProcessInfo { pid, name, command });
        }
    }

    processes
}
