//! `git` subprocess runner.
//!
//! Output is streamed line by line while the process runs: stdout and stderr
//! are each drained on a reader thread and funnelled through a channel, so the
//! caller's line sink runs on the calling thread in arrival order.

use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;

use crate::error::GitError;
use crate::redact::redact_secrets;

/// Runs one git command, feeding each output line to `on_line`.
pub trait GitRunner {
    fn run(&self, args: &[&str], on_line: &mut dyn FnMut(&str)) -> Result<(), GitError>;
}

/// [`GitRunner`] backed by the `git` binary on `PATH` (or an explicit path).
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl GitCli {
    pub fn new() -> Self {
        Self::with_program("git")
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl GitRunner for GitCli {
    fn run(&self, args: &[&str], on_line: &mut dyn FnMut(&str)) -> Result<(), GitError> {
        let command = redact_secrets(&args.join(" ")).into_owned();
        tracing::info!("RUN: git {command}");

        let mut child = Command::new(&self.program)
            .args(args)
            // Never block on an interactive credential prompt.
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| GitError::Spawn {
                command: command.clone(),
                source,
            })?;

        let (tx, rx) = mpsc::channel::<String>();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_line_reader(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_line_reader(stderr, tx.clone()));
        }
        drop(tx);

        let mut last_line = None;
        for line in rx {
            let line = redact_secrets(&line).into_owned();
            on_line(&line);
            last_line = Some(line);
        }
        join_readers(readers, &command);

        let status = child.wait().map_err(|source| GitError::Io {
            command: command.clone(),
            source,
        })?;
        if !status.success() {
            return Err(GitError::Failed {
                command,
                status: status.to_string(),
                last_line,
            });
        }
        Ok(())
    }
}

/// Wait for the reader threads. A panicked reader means some output was lost;
/// it is logged and the exit status still decides the result. Returns the
/// number of readers that panicked.
fn join_readers(readers: Vec<thread::JoinHandle<()>>, command: &str) -> usize {
    let mut panicked = 0;
    for reader in readers {
        if reader.join().is_err() {
            panicked += 1;
            tracing::warn!(command, "git output reader panicked; output may be incomplete");
        }
    }
    panicked
}

/// Forward every non-empty line of `pipe` to `tx`. Git rewrites progress
/// lines with `\r`, so both `\r` and `\n` terminate a line.
fn spawn_line_reader<R: Read + Send + 'static>(
    pipe: R,
    tx: mpsc::Sender<String>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match read_until_either(&mut reader, &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&buf);
                    let line = text.trim_end_matches(['\r', '\n']).trim_end();
                    if !line.is_empty() && tx.send(line.to_owned()).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    })
}

fn read_until_either<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<usize> {
    let mut read = 0;
    loop {
        let available = reader.fill_buf()?;
        if available.is_empty() {
            return Ok(read);
        }
        match available.iter().position(|b| *b == b'\n' || *b == b'\r') {
            Some(i) => {
                buf.extend_from_slice(&available[..=i]);
                reader.consume(i + 1);
                return Ok(read + i + 1);
            }
            None => {
                let len = available.len();
                buf.extend_from_slice(available);
                reader.consume(len);
                read += len;
            }
        }
    }
}
