//! Advisory checker.
//!
//! Runs the oxc semantic checker on compiled-script sources on its own
//! thread. Jobs are submitted without blocking and results land in a
//! shared sink; nothing here ever holds up emission.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam::channel::{Receiver, Sender, unbounded};
use oxc::allocator::Allocator;
use oxc::parser::Parser;
use oxc::semantic::SemanticBuilder;
use parking_lot::Mutex;
use serde::Serialize;

use super::script::ScriptLang;
use crate::log;

/// Advisory finding. Never fails a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeDiagnostic {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for TypeDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

pub struct CheckJob {
    pub path: String,
    pub source: String,
    pub lang: ScriptLang,
}

/// Handle to the checker thread. Dropping it closes the queue and lets the
/// thread finish the jobs already queued.
pub struct Checker {
    tx: Option<Sender<CheckJob>>,
    pending: Arc<AtomicUsize>,
    sink: Arc<Mutex<Vec<TypeDiagnostic>>>,
    handle: Option<JoinHandle<()>>,
    /// Path substrings never checked.
    exclude: Vec<String>,
}

impl Checker {
    pub fn spawn() -> Self {
        let (tx, rx) = unbounded();
        let pending = Arc::new(AtomicUsize::new(0));
        let sink = Arc::new(Mutex::new(Vec::new()));

        let handle = {
            let pending = Arc::clone(&pending);
            let sink = Arc::clone(&sink);
            std::thread::Builder::new()
                .name("rivet-check".into())
                .spawn(move || run(&rx, &pending, &sink))
                .ok()
        };
        if handle.is_none() {
            log!("check"; "could not start checker thread, type checks disabled");
        }

        Self {
            tx: handle.is_some().then_some(tx),
            pending,
            sink,
            handle,
            exclude: Vec::new(),
        }
    }

    pub fn excluding(mut self, patterns: &[String]) -> Self {
        self.exclude = patterns.to_vec();
        self
    }

    pub fn submit(&self, job: CheckJob) {
        if self.exclude.iter().any(|p| job.path.contains(p.as_str())) {
            return;
        }
        if let Some(tx) = &self.tx {
            self.pending.fetch_add(1, Ordering::SeqCst);
            if tx.send(job).is_err() {
                self.pending.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    /// Take everything reported so far.
    pub fn drain(&self) -> Vec<TypeDiagnostic> {
        std::mem::take(&mut *self.sink.lock())
    }

    /// Wait up to `timeout` for queued jobs to finish. Returns whether the
    /// queue emptied in time.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.pending.load(Ordering::SeqCst) > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        true
    }
}

impl Drop for Checker {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run(rx: &Receiver<CheckJob>, pending: &AtomicUsize, sink: &Mutex<Vec<TypeDiagnostic>>) {
    for job in rx {
        for message in check(&job.source, job.lang) {
            let diag = TypeDiagnostic {
                path: job.path.clone(),
                message,
            };
            log!("check"; "{diag}");
            sink.lock().push(diag);
        }
        pending.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Semantic errors in `source`: redeclarations, invalid assignments,
/// misplaced `await` and the like.
pub fn check(source: &str, lang: ScriptLang) -> Vec<String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, lang.source_type()).parse();
    if !ret.errors.is_empty() {
        return ret.errors.iter().map(ToString::to_string).collect();
    }
    SemanticBuilder::new()
        .with_check_syntax_error(true)
        .build(&ret.program)
        .errors
        .iter()
        .map(ToString::to_string)
        .collect()
}
