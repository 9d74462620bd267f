// src/runner.rs
use std::future::Future;
use std::io;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command as TokioCommand;

/// Printed by the CLI when it cannot reach its backend at all.
pub const NO_NETWORK_PHRASE: &str = "Please check your internet connection and try again";

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("'{command}' did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("no network connection")]
    NoNetwork,

    #[error("'{command}' exited with {status}: {output}")]
    ProcessFailure {
        command: String,
        status: String,
        output: String,
    },

    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
}

/// Runs one external command to completion and returns its cleaned output.
///
/// Implementations spawn exactly one process per call and never retry.
pub trait CommandRunner: Send + Sync + 'static {
    fn run(
        &self,
        timeout: Duration,
        program: &str,
        args: &[&str],
    ) -> impl Future<Output = Result<String, RunError>> + Send;
}

/// Runs real child processes through tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct CliRunner;

impl CommandRunner for CliRunner {
    async fn run(
        &self,
        timeout: Duration,
        program: &str,
        args: &[&str],
    ) -> Result<String, RunError> {
        let command = describe(program, args);

        // The child is owned by the wait future; dropping it on timeout kills the process.
        let child = TokioCommand::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunError::Spawn {
                command: command.clone(),
                source,
            })?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| RunError::Spawn {
                command: command.clone(),
                source,
            })?,
            Err(_) => return Err(RunError::Timeout { command, timeout }),
        };

        let mut raw = String::from_utf8_lossy(&output.stdout).into_owned();
        raw.push_str(&String::from_utf8_lossy(&output.stderr));
        let cleaned = clean_cli_output(&raw);

        if !output.status.success() {
            if cleaned.contains(NO_NETWORK_PHRASE) {
                return Err(RunError::NoNetwork);
            }
            return Err(RunError::ProcessFailure {
                command,
                status: output.status.to_string(),
                output: cleaned.trim().to_string(),
            });
        }

        Ok(cleaned)
    }
}

fn describe(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

/// Strips the terminal noise the CLI emits while it shows a progress spinner.
///
/// Spinner frames (`-`, `\`, `|`, `/` followed by a carriage return), backspace
/// erasures and ANSI CSI sequences are removed, and every line is reduced to
/// the text that would remain visible on a terminal after its carriage returns.
pub fn clean_cli_output(raw: &str) -> String {
    let mut text = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            // A backspace never crosses a line boundary.
            '\u{8}' => {
                if !text.ends_with('\n') {
                    text.pop();
                }
            }
            '\u{1b}' => {
                if chars.peek() == Some(&'[') {
                    chars.next();
                    for next in chars.by_ref() {
                        if ('@'..='~').contains(&next) {
                            break;
                        }
                    }
                }
            }
            '-' | '\\' | '|' | '/'
                if chars.peek() == Some(&'\r')
                    && matches!(text.chars().next_back(), None | Some('\r') | Some('\n')) =>
            {
                chars.next();
            }
            _ => text.push(c),
        }
    }

    text.split('\n')
        .map(visible_segment)
        .collect::<Vec<_>>()
        .join("\n")
}

fn visible_segment(line: &str) -> &str {
    line.split('\r')
        .rev()
        .find(|segment| !segment.trim().is_empty())
        .unwrap_or("")
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_spinner_frames() {
        let raw = "\r-\r  \r\r\\\r  \r\r|\r  \rStatus: Connected\nCurrent server: de1.nordvpn.com\n";
        assert_eq!(
            clean_cli_output(raw),
            "Status: Connected\nCurrent server: de1.nordvpn.com\n"
        );
    }

    #[test]
    fn keeps_dashes_inside_text() {
        let raw = "Current server: us-west-1\r\nStatus: Connected\r\n";
        assert_eq!(
            clean_cli_output(raw),
            "Current server: us-west-1\nStatus: Connected\n"
        );
    }

    #[test]
    fn applies_backspaces_and_drops_escape_sequences() {
        let raw = "Stat\u{8}\u{8}\u{8}\u{8}\u{1b}[32mStatus: Disconnected\u{1b}[0m\n";
        assert_eq!(clean_cli_output(raw), "Status: Disconnected\n");
    }

    #[test]
    fn backspace_at_line_start_keeps_lines_apart() {
        let raw = "Status: Connected\n\u{8}Current server: x1\n";
        assert_eq!(
            clean_cli_output(raw),
            "Status: Connected\nCurrent server: x1\n"
        );
    }

    #[test]
    fn describe_joins_arguments() {
        assert_eq!(describe("nordvpn", &[]), "nordvpn");
        assert_eq!(
            describe("nordvpn", &["set", "killswitch", "on"]),
            "nordvpn set killswitch on"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn returns_cleaned_output_on_success() {
        let out = CliRunner
            .run(
                Duration::from_secs(5),
                "sh",
                &["-c", "printf '\\r-\\r  \\rStatus: Connected\\n'"],
            )
            .await
            .unwrap();
        assert_eq!(out, "Status: Connected\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn detects_missing_network() {
        let script = format!("echo '{NO_NETWORK_PHRASE}.'; exit 1");
        let err = CliRunner
            .run(Duration::from_secs(5), "sh", &["-c", script.as_str()])
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::NoNetwork), "{err:?}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn reports_non_zero_exit_with_output() {
        let err = CliRunner
            .run(Duration::from_secs(5), "sh", &["-c", "echo boom >&2; exit 3"])
            .await
            .unwrap_err();
        match err {
            RunError::ProcessFailure { output, status, .. } => {
                assert_eq!(output, "boom");
                assert!(status.contains('3'), "{status}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn times_out_slow_commands() {
        let started = std::time::Instant::now();
        let err = CliRunner
            .run(Duration::from_millis(200), "sleep", &["5"])
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Timeout { .. }), "{err:?}");
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let err = CliRunner
            .run(
                Duration::from_secs(1),
                "nordtray-definitely-not-installed",
                &["status"],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Spawn { .. }), "{err:?}");
    }
}
