//! Structured reporting of query measurements.
//!
//! A thread-local reporter collects key/value pairs into a JSON object,
//! nested through RAII context guards, and prints the finished object when
//! the reporting guard is dropped. Reporting is off unless a caller sets it
//! up through `enable_reporting`, so library code can report unconditionally
//! at negligible cost.

use serde_json::{Map, Value};
use std::{cell::RefCell, mem::swap};

pub use serde_json::json;

#[derive(Debug)]
struct Reporter {
    current: Map<String, Value>,
    // (key to insert the nested object under, the parent object), innermost last;
    // a `None` key marks a blocked context whose reports are thrown away
    context_stack: Vec<(Option<String>, Map<String, Value>)>,
}

impl Reporter {
    fn new() -> Reporter {
        Reporter {
            current: Map::new(),
            context_stack: Vec::new(),
        }
    }

    fn blocked(&self) -> bool {
        self.context_stack.iter().any(|(key, _)| key.is_none())
    }

    fn push_context(&mut self, key: Option<String>) {
        let mut parent = Map::new();
        swap(&mut parent, &mut self.current);
        self.context_stack.push((key, parent));
    }

    fn pop_context(&mut self) {
        let (key, mut parent) = self.context_stack.pop().expect("tried to pop from empty context");
        swap(&mut parent, &mut self.current);
        if let Some(key) = key {
            let prev = self.current.insert(key, Value::Object(parent));
            assert!(prev.is_none());
        }
    }

    fn report(&mut self, key: String, val: Value) {
        if self.blocked() {
            return;
        }
        let prev = self.current.insert(key, val);
        if !cfg!(feature = "report-allow-override") {
            assert!(prev.is_none());
        }
    }
}

thread_local! {
    static REPORTER: RefCell<Option<Reporter>> = const { RefCell::new(None) };
}

#[must_use]
pub struct ContextGuard(());

impl Drop for ContextGuard {
    fn drop(&mut self) {
        REPORTER.with(|reporter| {
            if let Some(r) = reporter.borrow_mut().as_mut() {
                r.pop_context()
            }
        });
    }
}

/// Nest subsequent reports under the given key until the guard is dropped.
pub fn push_context(key: String) -> ContextGuard {
    REPORTER.with(|reporter| {
        if let Some(r) = reporter.borrow_mut().as_mut() {
            r.push_context(Some(key))
        }
    });
    ContextGuard(())
}

/// Throw away all reports until the guard is dropped.
pub fn block_reporting() -> ContextGuard {
    REPORTER.with(|reporter| {
        if let Some(r) = reporter.borrow_mut().as_mut() {
            r.push_context(None)
        }
    });
    ContextGuard(())
}

pub fn report(key: String, val: Value) {
    if cfg!(feature = "report-to-stderr") {
        eprintln!("{}: {}", key, val);
    }
    report_silent(key, val)
}

pub fn report_silent(key: String, val: Value) {
    REPORTER.with(|reporter| {
        if let Some(r) = reporter.borrow_mut().as_mut() {
            r.report(key, val)
        }
    });
}

#[must_use]
pub struct ReportingGuard(());

impl Drop for ReportingGuard {
    fn drop(&mut self) {
        REPORTER.with(|reporter| {
            if let Some(mut r) = reporter.borrow_mut().take() {
                assert!(r.context_stack.is_empty());
                let mut object = Map::new();
                swap(&mut object, &mut r.current);
                println!("{}", Value::Object(object));
            };
        });
    }
}

#[macro_export]
macro_rules! report {
    ($k:expr, $($json:tt)+) => { report($k.to_string(), json!($($json)+)) };
}

#[macro_export]
macro_rules! report_silent {
    ($k:expr, $($json:tt)+) => { report_silent($k.to_string(), json!($($json)+)) };
}

/// Install a reporter for the current thread. The returned guard prints the
/// collected JSON object on drop.
pub fn enable_reporting(program: &str) -> ReportingGuard {
    REPORTER.with(|reporter| reporter.replace(Some(Reporter::new())));

    report!("program", program);
    report!("start_time", time::OffsetDateTime::now_utc().to_string());
    report!("args", std::env::args().collect::<Vec<String>>());

    ReportingGuard(())
}

pub mod benchmark;
pub use benchmark::*;
