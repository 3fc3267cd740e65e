//! Builds the observer and transform stages from their textual options.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{info, warn};
use regex::bytes::Regex;

use super::pipeline::{Matcher, Replacer};
use crate::error_handling::types::ConfigError;
use crate::logger::LogSink;

/// Separator between the pattern and the replacement in `--replace`.
pub const REPLACE_SEPARATOR: char = '~';

/// Compiles `pattern` into an observer that reports every match to `sink`.
///
/// Matches are numbered with a counter shared by every session using the
/// returned function.
pub fn compile_matcher(pattern: &str, sink: Arc<dyn LogSink>) -> Result<Matcher, ConfigError> {
    let re = Regex::new(pattern)
        .map_err(|e| ConfigError::BadPattern(format!("invalid match regex({}): {}", pattern, e)))?;
    let match_id = AtomicU64::new(0);

    Ok(Arc::new(move |input: &[u8]| {
        for m in re.find_iter(input) {
            let n = match_id.fetch_add(1, Ordering::Relaxed) + 1;
            sink.info(format_args!(
                "Matched #{}: {}",
                n,
                String::from_utf8_lossy(m.as_bytes())
            ));
        }
    }))
}

/// Compiles a `regex~replacement` option into a transform.
///
/// The replacement supports `$1` / `${name}` group references.
pub fn compile_replacer(option: &str) -> Result<Replacer, ConfigError> {
    let parts: Vec<&str> = option.split(REPLACE_SEPARATOR).collect();
    if parts.len() != 2 {
        return Err(ConfigError::BadPattern(format!(
            "invalid replace option:'{}'",
            option
        )));
    }

    let re = Regex::new(parts[0])
        .map_err(|e| ConfigError::BadPattern(format!("invalid replace regex({}): {}", parts[0], e)))?;
    let replacement = parts[1].as_bytes().to_vec();

    Ok(Arc::new(move |input: &[u8]| {
        re.replace_all(input, replacement.as_slice()).into_owned()
    }))
}

/// Like [`compile_matcher`], but an empty option means "no observer" and an
/// invalid one is logged and dropped.
pub fn create_matcher(pattern: &str, sink: Arc<dyn LogSink>) -> Option<Matcher> {
    if pattern.is_empty() {
        return None;
    }
    match compile_matcher(pattern, sink) {
        Ok(matcher) => {
            info!("matching {}", pattern);
            Some(matcher)
        }
        Err(e) => {
            warn!("{}", e);
            None
        }
    }
}

/// Like [`compile_replacer`], but an empty option means "no transform" and an
/// invalid one is logged and dropped.
pub fn create_replacer(option: &str) -> Option<Replacer> {
    if option.is_empty() {
        return None;
    }
    match compile_replacer(option) {
        Ok(replacer) => {
            if let Some((re, repl)) = option.split_once(REPLACE_SEPARATOR) {
                info!("replacing {} with {}", re, repl);
            }
            Some(replacer)
        }
        Err(e) => {
            warn!("{}", e);
            None
        }
    }
}
