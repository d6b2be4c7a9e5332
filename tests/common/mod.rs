#![allow(dead_code)]

use std::error::Error;

pub use stayopen_test_utils::{init_tracing, with_timeout};

pub type TestResult = Result<(), Box<dyn Error>>;

/// Arguments as owned strings, the way strategies take them.
pub fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
