use smallvec::SmallVec;
use std::sync::Arc;

/// Maximum inline headers before heap allocation.
/// Most requests and responses carry ≤16 headers.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage.
///
/// Header names use `Arc<str>` because the same names (`Cache-Control`,
/// `Vary`, the CORS family) are set over and over; values are per-message.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Multi-value header set.
///
/// Names keep the case they were first written with; lookups are
/// case-insensitive per RFC 7230. A name may carry several values, each
/// stored as its own entry and emitted as its own header line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: HeaderVec,
}

impl Headers {
    /// Empty header set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// First value of a header.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values of a header in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values joined with `", "`.
    #[must_use]
    pub fn get_line(&self, name: &str) -> String {
        self.get_all(name).collect::<Vec<_>>().join(", ")
    }

    /// `true` if at least one value exists for `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// Replace every value of `name` with `value`.
    ///
    /// The original spelling of the name is kept when the header already
    /// exists.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let stored: Arc<str> = self
            .entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(k, _)| Arc::clone(k))
            .unwrap_or_else(|| Arc::from(name));
        self.entries.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.entries.push((stored, value.into()));
    }

    /// Add a value without touching existing ones.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        let stored: Arc<str> = self
            .entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(k, _)| Arc::clone(k))
            .unwrap_or_else(|| Arc::from(name));
        self.entries.push((stored, value.into()));
    }

    /// Remove every value of `name`.
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    /// Iterate `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_ref(), v.as_str()))
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when no header is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Headers {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup_preserves_case() {
        let mut h = Headers::new();
        h.set("Cache-Control", "no-cache");
        assert_eq!(h.get("cache-control"), Some("no-cache"));
        h.set("CACHE-CONTROL", "max-age=60");
        assert_eq!(h.len(), 1);
        assert_eq!(h.iter().next(), Some(("Cache-Control", "max-age=60")));
    }

    #[test]
    fn test_multi_value() {
        let mut h = Headers::new();
        h.append("Set-Cookie", "a=1");
        h.append("set-cookie", "b=2");
        assert_eq!(h.get_all("SET-COOKIE").collect::<Vec<_>>(), vec!["a=1", "b=2"]);
        assert_eq!(h.get_line("set-cookie"), "a=1, b=2");
        h.remove("Set-Cookie");
        assert!(h.is_empty());
    }
}
