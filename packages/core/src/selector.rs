//! CSS-selector shorthand parsing with a bounded, instrumented cache.

use std::cell::{Cell, RefCell};
use std::num::NonZeroUsize;

use lru::LruCache;

/// Parsed form of the builder's selector shorthand:
/// `tag?(.class)*(#id)?([name(=value)?])*`, in any order after the tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<(String, Option<String>)>,
}

impl Selector {
    /// Parses a selector without touching the cache.
    pub fn parse(input: &str) -> Selector {
        let input = input.trim();
        let mut tag = String::new();
        let mut id = None;
        let mut classes = Vec::new();
        let mut attrs = Vec::new();

        let mut chars = input.char_indices().peekable();
        // leading tag segment
        while let Some((_, c)) = chars.peek() {
            if matches!(c, '.' | '#' | '[') {
                break;
            }
            tag.push(*c);
            chars.next();
        }
        while let Some((start, marker)) = chars.next() {
            match marker {
                '.' | '#' => {
                    let mut name = String::new();
                    while let Some((_, c)) = chars.peek() {
                        if matches!(c, '.' | '#' | '[') {
                            break;
                        }
                        name.push(*c);
                        chars.next();
                    }
                    if marker == '.' {
                        classes.push(name);
                    } else {
                        id = Some(name);
                    }
                }
                '[' => {
                    let rest = &input[start + 1..];
                    let close = rest.find(']').unwrap_or(rest.len());
                    let body = &rest[..close];
                    match body.split_once('=') {
                        Some((name, value)) => attrs.push((
                            name.trim().to_string(),
                            Some(
                                value
                                    .trim()
                                    .trim_matches(|c| c == '"' || c == '\'')
                                    .to_string(),
                            ),
                        )),
                        None => attrs.push((body.trim().to_string(), None)),
                    }
                    // skip to the closing bracket
                    for (_, c) in chars.by_ref() {
                        if c == ']' {
                            break;
                        }
                    }
                }
                _ => {}
            }
        }

        if tag.is_empty() {
            tag = "div".to_string();
        }
        Selector {
            tag,
            id,
            classes,
            attrs,
        }
    }
}

const SELECTOR_CACHE_CAPACITY: usize = 256;

thread_local! {
    static CACHE: RefCell<LruCache<String, Selector>> = RefCell::new(LruCache::new(
        NonZeroUsize::new(SELECTOR_CACHE_CAPACITY).unwrap(),
    ));
    static HITS: Cell<u64> = const { Cell::new(0) };
    static MISSES: Cell<u64> = const { Cell::new(0) };
}

/// Parses through the bounded selector cache.
pub fn parse_selector(input: &str) -> Selector {
    CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        if let Some(parsed) = cache.get(input) {
            HITS.with(|h| h.set(h.get() + 1));
            return parsed.clone();
        }
        MISSES.with(|m| m.set(m.get() + 1));
        let parsed = Selector::parse(input);
        cache.put(input.to_string(), parsed.clone());
        parsed
    })
}

/// Hit/miss counters of the selector cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

pub fn selector_cache_stats() -> CacheStats {
    CacheStats {
        hits: HITS.with(|h| h.get()),
        misses: MISSES.with(|m| m.get()),
    }
}

/// Clears the cache and counters. Intended for tests.
pub fn reset_selector_cache() {
    CACHE.with(|cache| cache.borrow_mut().clear());
    HITS.with(|h| h.set(0));
    MISSES.with(|m| m.set(0));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_word_is_a_tag() {
        let s = Selector::parse("button");
        assert_eq!(s.tag, "button");
        assert!(s.classes.is_empty() && s.id.is_none() && s.attrs.is_empty());
    }

    #[test]
    fn tag_defaults_to_div() {
        let s = Selector::parse(".card.active#main");
        assert_eq!(s.tag, "div");
        assert_eq!(s.classes, vec!["card", "active"]);
        assert_eq!(s.id.as_deref(), Some("main"));
    }

    #[test]
    fn attribute_forms() {
        let s = Selector::parse("input[type=text][disabled]");
        assert_eq!(s.tag, "input");
        assert_eq!(
            s.attrs,
            vec![
                ("type".to_string(), Some("text".to_string())),
                ("disabled".to_string(), None),
            ]
        );
    }

    #[test]
    fn cache_counts_hits() {
        reset_selector_cache();
        parse_selector("ul.list");
        parse_selector("ul.list");
        parse_selector("ul.list");
        let stats = selector_cache_stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
        assert!(stats.hit_rate() > 0.6);
    }
}
