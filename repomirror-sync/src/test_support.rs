//! In-memory fakes for the transport and git seams, shared by unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use crate::error::{GitError, TransportError};
use crate::git::GitRunner;
use crate::http::{ApiRequest, ApiResponse, Transport};

/// Replays canned responses in order and records every request.
pub(crate) struct ScriptedTransport {
    responses: RefCell<VecDeque<Result<ApiResponse, TransportError>>>,
    pub requests: RefCell<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<ApiResponse, TransportError>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests.borrow().iter().map(|r| r.url.clone()).collect()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests.borrow_mut().push(request.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| {
                panic!(
                    "unexpected request: {} {}",
                    request.method.as_str(),
                    request.url
                )
            })
    }
}

pub(crate) fn ok(status: u16, body: &str) -> Result<ApiResponse, TransportError> {
    Ok(ApiResponse {
        status,
        body: body.to_owned(),
    })
}

/// Records git invocations; subcommands listed in `failing` exit non-zero.
///
/// A successful `clone` creates the target directory so later calls see an
/// existing mirror, the way real git would.
#[derive(Default)]
pub(crate) struct RecordingGit {
    pub failing: Vec<&'static str>,
    pub calls: RefCell<Vec<Vec<String>>>,
}

impl RecordingGit {
    pub fn failing(subcommands: &[&'static str]) -> Self {
        Self {
            failing: subcommands.to_vec(),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// The git subcommand of each recorded call, skipping `--git-dir <path>`.
    pub fn subcommands(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|args| {
                let skip = if args.first().map(String::as_str) == Some("--git-dir") {
                    2
                } else {
                    0
                };
                args.get(skip).cloned().unwrap_or_default()
            })
            .collect()
    }
}

impl GitRunner for RecordingGit {
    fn run(&self, args: &[&str], on_line: &mut dyn FnMut(&str)) -> Result<(), GitError> {
        self.calls
            .borrow_mut()
            .push(args.iter().map(|a| a.to_string()).collect());
        let sub = if args.first() == Some(&"--git-dir") { args[2] } else { args[0] };
        on_line(&format!("fake git {sub}"));
        if self.failing.contains(&sub) {
            return Err(GitError::Failed {
                command: args.join(" "),
                status: "exit status: 128".into(),
                last_line: Some(format!("fatal: {sub} failed")),
            });
        }
        if sub == "clone" {
            if let Some(path) = args.last() {
                fs::create_dir_all(Path::new(path)).expect("create fake mirror dir");
            }
        }
        Ok(())
    }
}
