use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::error::RouteError;
use crate::pattern::{build, Params};

/// `@name(k=v,...)?query#fragment`
static TARGET_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^@([^/()?#]+)(?:\((.+?)\))?(\?[^#]+)?(#.+)?").expect("valid alias target regex")
});

/// A named URL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    /// Alias name
    pub name: String,
    /// URL template (group prefix applied)
    pub url: String,
    /// Prefix of the group the alias was declared in
    pub group: String,
}

/// Name → URL template map.
#[derive(Debug, Default)]
pub struct AliasRegistry {
    entries: HashMap<String, AliasEntry>,
}

impl AliasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a new alias.
    ///
    /// # Errors
    ///
    /// [`RouteError::InvalidAlias`] for a name that is not a word;
    /// [`RouteError::DuplicateAlias`] if the name is taken.
    pub fn declare(&mut self, name: &str, url: &str, group: &str) -> Result<(), RouteError> {
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(RouteError::InvalidAlias { name: name.to_string() });
        }
        if self.entries.contains_key(name) {
            return Err(RouteError::DuplicateAlias { name: name.to_string() });
        }
        self.entries.insert(
            name.to_string(),
            AliasEntry {
                name: name.to_string(),
                url: url.to_string(),
                group: group.to_string(),
            },
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&AliasEntry> {
        self.entries.get(name)
    }

    /// Template of `name`.
    ///
    /// # Errors
    ///
    /// [`RouteError::UndefinedAlias`] when no such alias exists.
    pub fn template(&self, name: &str) -> Result<&str, RouteError> {
        self.entries
            .get(name)
            .map(|e| e.url.as_str())
            .ok_or_else(|| RouteError::UndefinedAlias { name: name.to_string() })
    }

    /// Build the URL of `name`, then append `?query` and `#fragment`.
    ///
    /// # Errors
    ///
    /// [`RouteError::UndefinedAlias`] when no such alias exists.
    pub fn url(
        &self,
        name: &str,
        params: &Params,
        query: Option<&[(&str, &str)]>,
        fragment: Option<&str>,
    ) -> Result<String, RouteError> {
        let mut url = build(self.template(name)?, params);
        if let Some(pairs) = query.filter(|q| !q.is_empty()) {
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs.iter().copied())
                .finish();
            url.push('?');
            url.push_str(&encoded);
        }
        if let Some(fragment) = fragment.filter(|f| !f.is_empty()) {
            url.push('#');
            url.push_str(fragment);
        }
        Ok(url)
    }

    /// Declared aliases, unordered.
    pub fn iter(&self) -> impl Iterator<Item = &AliasEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse `k=v,k2=v2` argument lists. A `*` key fills the wildcard list.
#[must_use]
pub fn parse_args(args: &str) -> Params {
    let mut params = Params::new();
    for pair in args.split(',') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        if key == "*" {
            params.push_wildcard(value);
        } else if !key.is_empty() {
            params.insert(key, value);
        }
    }
    params
}

/// A reroute target written as `@name(args)?query#fragment`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTarget<'a> {
    /// Alias name
    pub name: &'a str,
    /// Parsed arguments
    pub args: Params,
    /// `?query` including the question mark
    pub query: &'a str,
    /// `#fragment` including the hash
    pub fragment: &'a str,
}

impl<'a> AliasTarget<'a> {
    /// Parse a target; `None` when it does not start with `@name`.
    #[must_use]
    pub fn parse(target: &'a str) -> Option<Self> {
        let caps = TARGET_RE.captures(target)?;
        Some(Self {
            name: caps.get(1)?.as_str(),
            args: caps.get(2).map(|m| parse_args(m.as_str())).unwrap_or_default(),
            query: caps.get(3).map_or("", |m| m.as_str()),
            fragment: caps.get(4).map_or("", |m| m.as_str()),
        })
    }
}
