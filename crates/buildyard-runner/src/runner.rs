//! Single-action process execution.
//!
//! Launches one invocation, routes its combined stdout/stderr through an
//! [`OutputClassifier`], and hands back the classified [`RunResult`]. The
//! caller blocks until the child exits; the only tasks spawned here drain
//! the two pipes so neither can fill up and deadlock the child.

use anyhow::Context;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::debug;

use buildyard_core::classifier::{OutputClassifier, RunResult};
use buildyard_core::invocation::{Invocation, OutputMode};

/// Everything one execution produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Classified result (exit code + counters + diagnostics).
    pub result: RunResult,

    /// The captured stdout blob, present only for capture-mode runs.
    pub captured: Option<String>,

    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Runner for a single invocation.
pub struct ActionRunner;

impl ActionRunner {
    /// Execute an invocation to completion and classify its output.
    ///
    /// Stream mode feeds lines into the classifier as they arrive; capture
    /// mode collects the output first and classifies the blob afterwards,
    /// returning it to the caller as well. A timeout of zero disables the
    /// deadline.
    pub async fn execute(invocation: Invocation, timeout_secs: u64) -> anyhow::Result<RunOutcome> {
        let start = Instant::now();

        if invocation.tokens.is_empty() {
            anyhow::bail!("invocation has an empty command");
        }

        let Invocation {
            tokens,
            cwd,
            env,
            rules,
            mode,
        } = invocation;
        let mut classifier = OutputClassifier::new(rules);

        let mut command = Command::new(&tokens[0]);
        command
            .args(&tokens[1..])
            .current_dir(&cwd)
            .envs(&env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        match mode {
            OutputMode::Capture => {
                let child = command
                    .spawn()
                    .with_context(|| format!("failed to spawn {}", tokens[0]))?;

                let output = if timeout_secs > 0 {
                    tokio::time::timeout(
                        Duration::from_secs(timeout_secs),
                        child.wait_with_output(),
                    )
                    .await
                    .map_err(|_| {
                        anyhow::anyhow!("{} timed out after {} seconds", tokens[0], timeout_secs)
                    })??
                } else {
                    child.wait_with_output().await?
                };

                let stdout = String::from_utf8_lossy(&output.stdout).to_string();
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                classifier.feed_text(&stdout);
                classifier.feed_text(&stderr);

                let exit_code = output.status.code().unwrap_or(-1);
                Ok(RunOutcome {
                    result: classifier.finalize(exit_code),
                    captured: Some(stdout),
                    duration_ms: start.elapsed().as_millis() as u64,
                })
            }
            OutputMode::Stream => {
                let mut child = command
                    .spawn()
                    .with_context(|| format!("failed to spawn {}", tokens[0]))?;

                let stdout = child
                    .stdout
                    .take()
                    .context("child stdout was not piped")?;
                let stderr = child
                    .stderr
                    .take()
                    .context("child stderr was not piped")?;

                // Both pipes feed one consumer; the channel closes when the
                // child closes its streams, then we reap the exit status.
                let run = async {
                    let (tx, mut rx) = mpsc::channel::<String>(256);
                    let stderr_tx = tx.clone();
                    futures::join!(
                        drain_lines(stdout, tx),
                        drain_lines(stderr, stderr_tx),
                        async {
                            while let Some(line) = rx.recv().await {
                                debug!(line = %line, "child output");
                                classifier.feed_line(&line);
                            }
                        }
                    );
                    child.wait().await
                };

                let status = if timeout_secs > 0 {
                    match tokio::time::timeout(Duration::from_secs(timeout_secs), run).await {
                        Ok(status) => status?,
                        Err(_) => {
                            child.kill().await.ok();
                            anyhow::bail!(
                                "{} timed out after {} seconds",
                                tokens[0],
                                timeout_secs
                            );
                        }
                    }
                } else {
                    run.await?
                };

                let exit_code = status.code().unwrap_or(-1);
                Ok(RunOutcome {
                    result: classifier.finalize(exit_code),
                    captured: None,
                    duration_ms: start.elapsed().as_millis() as u64,
                })
            }
        }
    }
}

async fn drain_lines<R>(reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(line).await.is_err() {
            break;
        }
    }
}
