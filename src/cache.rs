//! Thread-local compilation cache for anchor regexes.
//!
//! Rule files routinely repeat the same anchor across changes (a marker and
//! the rule that establishes it often share a pattern). Compiled regexes are
//! cached per thread, capped at 256 entries; when full the cache is cleared
//! and rebuilt on demand.

use regex::{Regex, RegexBuilder};
use std::cell::RefCell;
use std::collections::HashMap;

const MAX_CACHE_ENTRIES: usize = 256;

thread_local! {
    static REGEX_CACHE: RefCell<HashMap<String, Regex>> = RefCell::new(HashMap::new());
}

/// Get a compiled regex from cache, or compile and cache it.
///
/// Anchors are compiled in multi-line mode so `^` and `$` match at line
/// boundaries, with `\r\n` treated as one terminator. Compile failures are
/// not cached.
pub fn get_or_compile_regex(pattern: &str) -> Result<Regex, regex::Error> {
    REGEX_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();

        if let Some(re) = cache.get(pattern) {
            return Ok(re.clone());
        }

        if cache.len() >= MAX_CACHE_ENTRIES {
            cache.clear();
        }

        let compiled = RegexBuilder::new(pattern)
            .multi_line(true)
            .crlf(true)
            .build()?;
        cache.insert(pattern.to_string(), compiled.clone());
        Ok(compiled)
    })
}

/// Clear the regex cache (mainly for testing).
pub fn clear_cache() {
    REGEX_CACHE.with(|cache| {
        cache.borrow_mut().clear();
    });
}

pub fn cache_size() -> usize {
    REGEX_CACHE.with(|cache| cache.borrow().len())
}
