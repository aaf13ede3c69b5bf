//! Pattern core module - compiled route patterns and capture maps.
//!
//! Patterns are parsed into a small AST once, at registration time, and the
//! AST is lowered to a single anchored regex. Matching a request path is then
//! one regex evaluation; nothing is recompiled per request.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::RouteError;

/// Maximum number of named captures before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated storage for named captures.
///
/// Param names use `Arc<str>` because they come from the compiled pattern and
/// are shared by every match; values are per-request data from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Named token in the specificity key.
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"@\w+").expect("valid token regex")
});

/// Captured route parameters.
///
/// Named tokens (`@id`) are kept in pattern order; every wildcard (`*`)
/// capture is appended to one ordered list, reachable through
/// [`Params::wildcard`]. The same type is the argument of reverse URL
/// building, so a match can be fed straight back into [`build`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    named: ParamVec,
    wildcard: SmallVec<[String; 2]>,
}

impl Params {
    /// Empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a named value.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Builder-style append of wildcard values.
    #[must_use]
    pub fn with_wildcard<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.wildcard.extend(values.into_iter().map(Into::into));
        self
    }

    /// Insert or replace a named value.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(slot) = self.named.iter_mut().find(|(k, _)| k.as_ref() == name) {
            slot.1 = value;
        } else {
            self.named.push((Arc::from(name), value));
        }
    }

    pub(crate) fn insert_shared(&mut self, name: &Arc<str>, value: String) {
        self.named.push((Arc::clone(name), value));
    }

    /// Append one wildcard capture.
    pub fn push_wildcard(&mut self, value: impl Into<String>) {
        self.wildcard.push(value.into());
    }

    /// Value of a named token.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.named
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Wildcard captures in pattern order.
    #[inline]
    #[must_use]
    pub fn wildcard(&self) -> &[String] {
        &self.wildcard
    }

    /// Named captures in pattern order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.named.iter().map(|(k, v)| (k.as_ref(), v.as_str()))
    }

    /// `true` when there are neither named nor wildcard values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.named.is_empty() && self.wildcard.is_empty()
    }

    /// Convert named captures to a HashMap.
    /// Note: This allocates - use get() in hot paths instead
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, String> {
        self.named
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// One element of a parsed pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text matched verbatim (case-folded when the router is caseless)
    Literal(String),
    /// `@name` or `{@name}`: any run of characters except `/` and `?`
    Named(Arc<str>),
    /// `*`: any run of characters except `?`
    Wildcard,
}

/// A route pattern compiled at registration time.
#[derive(Clone)]
pub struct CompiledPattern {
    source: String,
    segments: Vec<Segment>,
    regex: Regex,
    key: String,
}

impl fmt::Debug for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledPattern")
            .field("source", &self.source)
            .field("regex", &self.regex.as_str())
            .field("key", &self.key)
            .finish()
    }
}

impl CompiledPattern {
    /// Parse and compile a pattern.
    ///
    /// # Errors
    ///
    /// [`RouteError::InvalidPattern`] for an empty pattern, a token without a
    /// name, an unterminated `{@name` token or a repeated token name.
    pub fn compile(pattern: &str, caseless: bool) -> Result<Self, RouteError> {
        let segments = parse(pattern)?;
        let regex = lower(pattern, &segments, caseless)?;
        Ok(Self {
            source: pattern.to_string(),
            key: specificity_key(pattern),
            segments,
            regex,
        })
    }

    /// The pattern text as registered.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Ordering key; larger keys are tried first.
    #[must_use]
    pub fn specificity_key(&self) -> &str {
        &self.key
    }

    /// `true` if the pattern contains at least one wildcard.
    #[must_use]
    pub fn has_wildcard(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Wildcard))
    }

    /// Match a decoded request path, returning the captures on success.
    ///
    /// A single trailing slash on the path is always tolerated.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<Params> {
        let caps = self.regex.captures(path)?;
        let mut params = Params::new();
        let mut group = 1;
        for segment in &self.segments {
            match segment {
                Segment::Literal(_) => continue,
                Segment::Named(name) => {
                    let value = caps.get(group).map(|m| m.as_str()).unwrap_or_default();
                    params.insert_shared(name, value.to_string());
                }
                Segment::Wildcard => {
                    let value = caps.get(group).map(|m| m.as_str()).unwrap_or_default();
                    params.push_wildcard(value);
                }
            }
            group += 1;
        }
        Some(params)
    }
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Split a pattern into literal, named and wildcard segments.
fn parse(pattern: &str) -> Result<Vec<Segment>, RouteError> {
    if pattern.trim().is_empty() {
        return Err(RouteError::pattern(pattern, "empty pattern"));
    }

    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut names: Vec<Arc<str>> = Vec::new();
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let braced = c == '{' && chars.get(i + 1) == Some(&'@');
        if c == '@' || braced {
            let start = if braced { i + 2 } else { i + 1 };
            let mut end = start;
            while end < chars.len() && is_word(chars[end]) {
                end += 1;
            }
            if end == start {
                return Err(RouteError::pattern(pattern, "token without a name"));
            }
            let name: String = chars[start..end].iter().collect();
            if braced {
                if chars.get(end) != Some(&'}') {
                    return Err(RouteError::pattern(pattern, format!("unterminated token '{{@{name}'")));
                }
                end += 1;
            }
            if names.iter().any(|n| n.as_ref() == name) {
                return Err(RouteError::pattern(pattern, format!("duplicate token '@{name}'")));
            }
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            let name: Arc<str> = Arc::from(name);
            names.push(Arc::clone(&name));
            segments.push(Segment::Named(name));
            i = end;
        } else if c == '*' {
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Wildcard);
            i += 1;
        } else {
            literal.push(c);
            i += 1;
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

/// Lower parsed segments to an anchored regex.
fn lower(pattern: &str, segments: &[Segment], caseless: bool) -> Result<Regex, RouteError> {
    let mut re = String::with_capacity(pattern.len() * 2 + 8);
    re.push('^');
    for segment in segments {
        match segment {
            Segment::Literal(text) => re.push_str(&regex::escape(text)),
            Segment::Named(_) => re.push_str("([^/?]+)"),
            Segment::Wildcard => re.push_str("([^?]*)"),
        }
    }
    re.push_str("/?$");
    RegexBuilder::new(&re)
        .case_insensitive(caseless)
        .build()
        .map_err(|e| RouteError::pattern(pattern, e.to_string()))
}

/// Ordering key used to try specific patterns before generic ones.
///
/// Named tokens become `*@`; patterns that do not end in a wildcard get a
/// `+` weight. Sorting keys in descending byte order puts literal segments
/// ahead of tokens and tokens ahead of trailing wildcards.
#[must_use]
pub fn specificity_key(pattern: &str) -> String {
    let mut key = TOKEN_RE.replace_all(pattern, "*@").into_owned();
    if !key.ends_with('*') {
        key.push('+');
    }
    key
}

fn encode_segments(value: &str) -> String {
    value
        .split('/')
        .map(|part| urlencoding::encode(part).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Replace tokens in a URL template with parameter values.
///
/// Named tokens take the matching named value; each `*` takes the next
/// wildcard value. Values are URL-encoded per path segment. Tokens without a
/// value are left in the output unchanged.
#[must_use]
pub fn build(template: &str, params: &Params) -> String {
    let chars: Vec<char> = template.chars().collect();
    let mut out = String::with_capacity(template.len() + 16);
    let mut wildcard = 0;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let braced = c == '{' && chars.get(i + 1) == Some(&'@');
        if c == '@' || braced {
            let start = if braced { i + 2 } else { i + 1 };
            let mut end = start;
            while end < chars.len() && is_word(chars[end]) {
                end += 1;
            }
            let closed = !braced || chars.get(end) == Some(&'}');
            if end > start && closed {
                let name: String = chars[start..end].iter().collect();
                let token_end = if braced { end + 1 } else { end };
                match params.get(&name) {
                    Some(value) => out.push_str(&encode_segments(value)),
                    None => out.extend(&chars[i..token_end]),
                }
                i = token_end;
                continue;
            }
            out.push(c);
            i += 1;
        } else if c == '*' {
            match params.wildcard().get(wildcard) {
                Some(value) => out.push_str(&encode_segments(value)),
                None => out.push('*'),
            }
            wildcard += 1;
            i += 1;
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}
