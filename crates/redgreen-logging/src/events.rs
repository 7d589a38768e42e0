use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// The three phases of one TDD cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Red,
    Green,
    Refactor,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Red => write!(f, "RED"),
            Phase::Green => write!(f, "GREEN"),
            Phase::Refactor => write!(f, "REFACTOR"),
        }
    }
}

/// Role emitting an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Tester,
    Implementer,
    Refactorer,
}

impl Role {
    pub fn phase(&self) -> Phase {
        match self {
            Role::Tester => Phase::Red,
            Role::Implementer => Phase::Green,
            Role::Refactorer => Phase::Refactor,
        }
    }

    fn styled(&self) -> ColoredString {
        match self {
            Role::Tester => "TESTER".bright_yellow().bold(),
            Role::Implementer => "IMPLEMENTER".bright_magenta().bold(),
            Role::Refactorer => "REFACTORER".bright_cyan().bold(),
        }
    }

    fn short(&self) -> &'static str {
        match self {
            Role::Tester => "T",
            Role::Implementer => "I",
            Role::Refactorer => "R",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Tester => write!(f, "tester"),
            Role::Implementer => write!(f, "implementer"),
            Role::Refactorer => write!(f, "refactorer"),
        }
    }
}

/// Structured log events for the TDD cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    RunStarted {
        work_dir: PathBuf,
        language: String,
        max_cycles: usize,
    },
    SetupCompleted {
        work_dir: PathBuf,
    },
    CycleStarted {
        cycle: usize,
        max_cycles: usize,
    },
    RoleStarted {
        cycle: usize,
        role: Role,
    },
    AttemptStarted {
        role: Role,
        attempt: usize,
        max_attempts: usize,
    },
    FileWritten {
        role: Role,
        path: String,
    },
    PathRejected {
        role: Role,
        path: String,
    },
    TestsCompleted {
        role: Role,
        success: bool,
        exit_code: i32,
        duration_secs: f64,
    },
    RedConfirmed {
        path: String,
    },
    Overshot {
        path: String,
    },
    Committed {
        role: Role,
        message: String,
    },
    Reverted {
        role: Role,
    },
    RoleCompleted {
        cycle: usize,
        role: Role,
        status: String,
    },
    CycleCompleted {
        cycle: usize,
    },
    MaxCyclesReached {
        cycles: usize,
    },
    KataComplete {
        cycles: usize,
    },
    RunCompleted {
        cycles: usize,
        duration_secs: f64,
    },
    ErrorEncountered {
        role: Role,
        error: String,
    },
}

impl LogEvent {
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Console output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable output with role colors
    #[default]
    Pretty,
    /// JSON lines for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("unknown log format: {}", s)),
        }
    }
}

/// Event sink for the TDD cycle - renders to the console and optionally
/// mirrors every event to a JSONL file.
pub struct Logger {
    format: LogFormat,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            file_writer: None,
        }
    }

    /// Mirror events to a JSONL file in addition to the console.
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn log(&self, event: &LogEvent) {
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::RunStarted {
                work_dir,
                language,
                max_cycles,
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(stderr, "{}", "redgreen".bold().bright_white());
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "Workspace:".dimmed(),
                    work_dir.display()
                );
                let _ = writeln!(
                    stderr,
                    "  {} {} ({} cycles max)",
                    "Language:".dimmed(),
                    language,
                    max_cycles
                );
                let _ = writeln!(stderr);
            }
            LogEvent::SetupCompleted { .. } => {
                let _ = writeln!(stderr, "{} Setup complete", "✓".bright_green());
            }
            LogEvent::CycleStarted { cycle, max_cycles } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    format!("── Cycle {}/{} ──────────────────────", cycle, max_cycles)
                        .bright_blue()
                        .bold()
                );
            }
            LogEvent::RoleStarted { role, .. } => {
                let _ = writeln!(
                    stderr,
                    "  {} {} ({})",
                    "▶".bright_blue(),
                    role.styled(),
                    role.phase()
                );
            }
            LogEvent::AttemptStarted {
                attempt,
                max_attempts,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} attempt {}/{}",
                    "·".dimmed(),
                    attempt,
                    max_attempts
                );
            }
            LogEvent::FileWritten { path, .. } => {
                let _ = writeln!(stderr, "    {} wrote {}", "·".dimmed(), path);
            }
            LogEvent::PathRejected { path, .. } => {
                let _ = writeln!(
                    stderr,
                    "    {} rejected {} (outside allowed area)",
                    "!".bright_red(),
                    path
                );
            }
            LogEvent::TestsCompleted {
                success,
                exit_code,
                duration_secs,
                ..
            } => {
                if *success {
                    let _ = writeln!(
                        stderr,
                        "    {} tests passed ({:.1}s)",
                        "✓".bright_green(),
                        duration_secs
                    );
                } else {
                    let _ = writeln!(
                        stderr,
                        "    {} tests failed, exit {} ({:.1}s)",
                        "✗".bright_red(),
                        exit_code,
                        duration_secs
                    );
                }
            }
            LogEvent::RedConfirmed { path } => {
                let _ = writeln!(
                    stderr,
                    "    {} {} is failing as intended",
                    "RED".bright_red().bold(),
                    path
                );
            }
            LogEvent::Overshot { path } => {
                let _ = writeln!(
                    stderr,
                    "    {} {} passed unexpectedly; wasting this cycle",
                    "⚠".bright_yellow(),
                    path
                );
            }
            LogEvent::Committed { message, .. } => {
                let _ = writeln!(stderr, "    {} committed: {}", "✓".bright_green(), message);
            }
            LogEvent::Reverted { .. } => {
                let _ = writeln!(
                    stderr,
                    "    {} reverted working tree to last commit",
                    "↩".bright_yellow()
                );
            }
            LogEvent::RoleCompleted { role, status, .. } => {
                let _ = writeln!(stderr, "  {} {} → {}", "◀".dimmed(), role.styled(), status);
            }
            LogEvent::CycleCompleted { cycle } => {
                let _ = writeln!(stderr, "{}", format!("── Cycle {} done ──", cycle).dimmed());
            }
            LogEvent::MaxCyclesReached { cycles } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Cycle budget exhausted ({})",
                    "⚠".bright_yellow(),
                    cycles
                );
            }
            LogEvent::KataComplete { cycles } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Kata complete after {} cycle(s)",
                    "✓".bright_green(),
                    cycles
                );
            }
            LogEvent::RunCompleted {
                cycles,
                duration_secs,
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Finished: {} cycle(s) in {:.1}s",
                    "✓".bright_green(),
                    cycles,
                    duration_secs
                );
            }
            LogEvent::ErrorEncountered { role, error } => {
                let _ = writeln!(
                    stderr,
                    "  {} {}: {}",
                    "✗".bright_red(),
                    role.styled(),
                    error.bright_red()
                );
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::RunStarted { max_cycles, .. } => {
                format!("[{}] run:start max={}", timestamp, max_cycles)
            }
            LogEvent::SetupCompleted { .. } => format!("[{}] setup:done", timestamp),
            LogEvent::CycleStarted { cycle, max_cycles } => {
                format!("[{}] cycle:start:{}/{}", timestamp, cycle, max_cycles)
            }
            LogEvent::RoleStarted { role, .. } => {
                format!("[{}] {}:start", timestamp, role.short())
            }
            LogEvent::AttemptStarted {
                role,
                attempt,
                max_attempts,
            } => format!(
                "[{}] {}:attempt:{}/{}",
                timestamp,
                role.short(),
                attempt,
                max_attempts
            ),
            LogEvent::FileWritten { role, path } => {
                format!("[{}] {}:write:{}", timestamp, role.short(), path)
            }
            LogEvent::PathRejected { role, path } => {
                format!("[{}] {}:reject:{}", timestamp, role.short(), path)
            }
            LogEvent::TestsCompleted {
                role,
                success,
                exit_code,
                ..
            } => format!(
                "[{}] {}:tests:{} exit={}",
                timestamp,
                role.short(),
                if *success { "pass" } else { "fail" },
                exit_code
            ),
            LogEvent::RedConfirmed { path } => format!("[{}] red:{}", timestamp, path),
            LogEvent::Overshot { path } => format!("[{}] overshot:{}", timestamp, path),
            LogEvent::Committed { role, message } => {
                format!("[{}] {}:commit:{}", timestamp, role.short(), message)
            }
            LogEvent::Reverted { role } => format!("[{}] {}:revert", timestamp, role.short()),
            LogEvent::RoleCompleted { role, status, .. } => {
                format!("[{}] {}:done:{}", timestamp, role.short(), status)
            }
            LogEvent::CycleCompleted { cycle } => format!("[{}] cycle:done:{}", timestamp, cycle),
            LogEvent::MaxCyclesReached { cycles } => {
                format!("[{}] run:limit:{}", timestamp, cycles)
            }
            LogEvent::KataComplete { cycles } => {
                format!("[{}] run:kata-complete:{}", timestamp, cycles)
            }
            LogEvent::RunCompleted {
                cycles,
                duration_secs,
            } => format!("[{}] run:done:{} {:.1}s", timestamp, cycles, duration_secs),
            LogEvent::ErrorEncountered { role, error } => {
                format!("[{}] {}:error:{}", timestamp, role.short(), error)
            }
        };
        let _ = writeln!(stderr, "{}", msg);
    }
}
