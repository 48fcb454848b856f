//! Cache key construction.
//!
//! Keys look like `inspire_cache_{type}_{arg}_{arg}`. Every component is
//! escaped before joining (`%` becomes `%25`, `_` becomes `%5F`) so that the
//! `_` separators are unambiguous: equal logical identities produce equal
//! keys and different identities never collide.

use std::fmt::Display;

/// Prefix shared by every cache entry key.
pub const CACHE_PREFIX: &str = "inspire_cache_";

/// Reserved key under which the cache index is persisted.
pub const CACHE_INDEX_KEY: &str = "inspire_cache_index";

/// Type tag that would spell the index key; always written escaped.
const RESERVED_KIND: &str = "index";

// == Make Key ==
/// Builds the cache key for a logical `kind` and its ordered arguments.
///
/// Arguments are rendered with `Display`, so the number `1` and the string
/// `"1"` name the same entry.
pub fn make_key(kind: &str, args: &[&dyn Display]) -> String {
    let mut key = String::from(CACHE_PREFIX);

    if kind == RESERVED_KIND {
        key.push_str("%69ndex");
    } else {
        push_escaped(&mut key, kind);
    }

    for arg in args {
        key.push('_');
        push_escaped(&mut key, &arg.to_string());
    }
    key
}

/// Builds a cache key from a type tag and any number of `Display` arguments.
///
/// ```
/// use inspire_cache::cache_key;
///
/// let key = cache_key!("lyrics", "netease", 1_859_245_776u64);
/// assert_eq!(key, "inspire_cache_lyrics_netease_1859245776");
/// ```
#[macro_export]
macro_rules! cache_key {
    ($kind:expr $(, $arg:expr)* $(,)?) => {
        $crate::cache::make_key($kind, &[$(&$arg as &dyn ::std::fmt::Display),*])
    };
}

/// True for keys the engine is allowed to manage.
pub fn is_entry_key(key: &str) -> bool {
    key.starts_with(CACHE_PREFIX) && key != CACHE_INDEX_KEY
}

/// Human-readable form of a key: prefix stripped, escapes undone.
///
/// Separators and literal underscores look the same afterwards, so the
/// result is for display only and never maps back to a key.
pub fn display_key(key: &str) -> String {
    let rest = key.strip_prefix(CACHE_PREFIX).unwrap_or(key);
    let mut out = String::with_capacity(rest.len());
    let mut chars = rest.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let escape: String = chars.clone().take(2).collect();
        match escape.as_str() {
            "25" => out.push('%'),
            "5F" => out.push('_'),
            "69" => out.push('i'),
            _ => {
                out.push('%');
                continue;
            }
        }
        chars.nth(1);
    }
    out
}

fn push_escaped(out: &mut String, component: &str) {
    for c in component.chars() {
        match c {
            '%' => out.push_str("%25"),
            '_' => out.push_str("%5F"),
            other => out.push(other),
        }
    }
}
