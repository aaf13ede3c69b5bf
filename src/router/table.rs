use http::Method;
use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

use crate::dispatcher::Handler;
use crate::error::RouteError;
use crate::middleware::{Middleware, MiddlewareChain};
use crate::pattern::CompiledPattern;

/// Methods a route may be registered for.
pub const VERBS: [&str; 8] = ["GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "CONNECT", "OPTIONS"];

/// `VERBS [alias:] pattern [channel]`
static EXPRESSION_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(
        r"^\s*([|,;\w]+)[ \t]+(?:(?:@?(.+?)[ \t]*:[ \t]*)?(@(\w+)|\S+))(?:[ \t]+\[(?i:(sync|ajax|cli))\])?\s*$",
    )
    .expect("valid route expression regex")
});

/// Request origin class used to pick between handlers at the same path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Channel {
    /// Registered without a channel tag; the fallback for every channel
    Any = 0,
    /// Synchronous browser navigation
    Sync = 1,
    /// Asynchronous/programmatic call
    Ajax = 2,
    /// Command-line invocation
    Cli = 4,
}

impl Channel {
    /// Parse a `[sync]`, `[ajax]` or `[cli]` tag (without brackets).
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "sync" => Some(Channel::Sync),
            "ajax" => Some(Channel::Ajax),
            "cli" => Some(Channel::Cli),
            _ => None,
        }
    }

    /// Tag text, empty for [`Channel::Any`].
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Any => "",
            Channel::Sync => "sync",
            Channel::Ajax => "ajax",
            Channel::Cli => "cli",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Any => write!(f, "any"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// Per-route caching and throttling hints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteOptions {
    /// Client/page cache lifetime in seconds (0 = no caching)
    pub ttl: u32,
    /// Emission rate limit in KB/s (0 = unthrottled)
    pub kbps: u32,
}

impl RouteOptions {
    /// Cache for `ttl` seconds.
    #[must_use]
    pub fn ttl(ttl: u32) -> Self {
        Self { ttl, kbps: 0 }
    }

    /// Throttle to `kbps`.
    #[must_use]
    pub fn kbps(kbps: u32) -> Self {
        Self { ttl: 0, kbps }
    }
}

/// One registered `(pattern, channel, verb)` binding.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    /// Pattern as stored in the table (group prefix applied)
    pub pattern: String,
    /// Method
    pub verb: Method,
    /// Channel restriction
    pub channel: Channel,
    /// What runs when the route matches
    pub handler: Handler,
    /// Cache lifetime in seconds
    pub ttl: u32,
    /// Throttle rate in KB/s
    pub kbps: u32,
    /// Alias declared or referenced by the registration
    pub alias: Option<String>,
    /// Prefix of the group the route was registered under
    pub group: String,
    /// Group interceptors followed by route-specific ones
    pub middleware: MiddlewareChain,
}

impl RouteEntry {
    /// Copy with `mw` appended to the route's chain.
    #[must_use]
    pub fn with_middleware(&self, mw: Arc<dyn Middleware>) -> Self {
        Self {
            middleware: self.middleware.with(mw),
            ..self.clone()
        }
    }
}

/// Verb → entry map of one channel, in registration order.
pub type VerbMap = SmallVec<[(Method, Arc<RouteEntry>); 4]>;

/// A pattern and everything registered under it.
#[derive(Debug)]
pub struct RouteSlot {
    pattern: CompiledPattern,
    channels: SmallVec<[(Channel, VerbMap); 2]>,
}

impl RouteSlot {
    /// Compiled pattern.
    #[must_use]
    pub fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }

    /// Verb map of `channel`, if any route uses it.
    #[must_use]
    pub fn verbs(&self, channel: Channel) -> Option<&VerbMap> {
        self.channels.iter().find(|(c, _)| *c == channel).map(|(_, m)| m)
    }

    /// Channels with at least one route, in registration order.
    pub fn channels(&self) -> impl Iterator<Item = (Channel, &VerbMap)> {
        self.channels.iter().map(|(c, m)| (*c, m))
    }

    /// Every entry in the slot.
    pub fn entries(&self) -> impl Iterator<Item = &Arc<RouteEntry>> {
        self.channels.iter().flat_map(|(_, m)| m.iter().map(|(_, e)| e))
    }

    fn upsert(&mut self, entry: Arc<RouteEntry>) {
        let map = match self.channels.iter().position(|(c, _)| *c == entry.channel) {
            Some(i) => &mut self.channels[i].1,
            None => {
                self.channels.push((entry.channel, VerbMap::new()));
                let last = self.channels.len() - 1;
                &mut self.channels[last].1
            }
        };
        match map.iter_mut().find(|(m, _)| *m == entry.verb) {
            Some(slot) => slot.1 = entry,
            None => map.push((entry.verb.clone(), entry)),
        }
    }
}

/// Look up a verb in a channel map.
#[must_use]
pub fn find_verb<'a>(map: &'a VerbMap, verb: &Method) -> Option<&'a Arc<RouteEntry>> {
    map.iter().find(|(m, _)| m == verb).map(|(_, e)| e)
}

/// Pattern slots in match order.
///
/// Slots are kept sorted by descending specificity key; a new pattern is
/// inserted after every slot whose key is not smaller, so ties keep
/// registration order.
#[derive(Debug, Default)]
pub struct RouteTable {
    slots: Vec<RouteSlot>,
}

impl RouteTable {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the entry for its `(pattern, channel, verb)`.
    ///
    /// # Errors
    ///
    /// [`RouteError::InvalidPattern`] when the pattern does not compile.
    pub fn insert(&mut self, entry: RouteEntry, caseless: bool) -> Result<Arc<RouteEntry>, RouteError> {
        let entry = Arc::new(entry);
        let index = match self.slots.iter().position(|s| s.pattern.as_str() == entry.pattern) {
            Some(i) => i,
            None => {
                let pattern = CompiledPattern::compile(&entry.pattern, caseless)?;
                let at = self
                    .slots
                    .iter()
                    .position(|s| s.pattern.specificity_key() < pattern.specificity_key())
                    .unwrap_or(self.slots.len());
                self.slots.insert(
                    at,
                    RouteSlot {
                        pattern,
                        channels: SmallVec::new(),
                    },
                );
                at
            }
        };
        self.slots[index].upsert(Arc::clone(&entry));
        Ok(entry)
    }

    /// Replace a stored entry with `next` (same pattern, channel and verb).
    pub(crate) fn replace(&mut self, next: Arc<RouteEntry>) {
        if let Some(slot) = self.slots.iter_mut().find(|s| s.pattern.as_str() == next.pattern) {
            slot.upsert(next);
        }
    }

    /// Slots in match order.
    #[must_use]
    pub fn slots(&self) -> &[RouteSlot] {
        &self.slots
    }

    /// Number of distinct patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// The entries created by one registration call.
///
/// Used to attach route-specific interceptors.
pub struct RouteSet<'a> {
    table: &'a mut RouteTable,
    entries: Vec<Arc<RouteEntry>>,
}

impl<'a> RouteSet<'a> {
    pub(crate) fn new(table: &'a mut RouteTable, entries: Vec<Arc<RouteEntry>>) -> Self {
        Self { table, entries }
    }

    /// Append `mw` to every entry of the set.
    pub fn add(mut self, mw: Arc<dyn Middleware>) -> Self {
        for entry in &mut self.entries {
            let next = Arc::new(entry.with_middleware(Arc::clone(&mw)));
            self.table.replace(Arc::clone(&next));
            *entry = next;
        }
        self
    }

    /// The entries, one per verb.
    #[must_use]
    pub fn entries(&self) -> &[Arc<RouteEntry>] {
        &self.entries
    }
}

impl fmt::Debug for RouteSet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteSet").field("entries", &self.entries).finish()
    }
}

/// A parsed registration expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    /// Verbs, upper-cased and validated
    pub verbs: Vec<Method>,
    /// Alias declared inline (`name: /pattern`)
    pub declares: Option<String>,
    /// Alias referenced instead of a pattern (`@name`)
    pub references: Option<String>,
    /// Pattern text (empty when `references` is set)
    pub pattern: String,
    /// Channel restriction
    pub channel: Channel,
}

impl Expression {
    /// Parse `"VERBS [alias:] pattern [channel]"`.
    ///
    /// # Errors
    ///
    /// [`RouteError::InvalidPattern`] when the expression does not have that
    /// shape, [`RouteError::InvalidAlias`] for an alias that is not a word,
    /// [`RouteError::InvalidVerb`] for a verb outside [`VERBS`].
    pub fn parse(expr: &str) -> Result<Self, RouteError> {
        let caps = EXPRESSION_RE
            .captures(expr)
            .ok_or_else(|| RouteError::pattern(expr, "expected 'VERBS [alias:] pattern [channel]'"))?;

        let verbs = caps
            .get(1)
            .map(|m| m.as_str())
            .unwrap_or_default()
            .split(['|', ',', ';'])
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(parse_verb)
            .collect::<Result<Vec<_>, _>>()?;
        if verbs.is_empty() {
            return Err(RouteError::pattern(expr, "no verb"));
        }

        let declares = match caps.get(2).map(|m| m.as_str()) {
            Some(name) if !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_') => {
                Some(name.to_string())
            }
            Some(name) if !name.is_empty() => {
                return Err(RouteError::InvalidAlias { name: name.to_string() })
            }
            _ => None,
        };
        let references = if declares.is_none() {
            caps.get(4).map(|m| m.as_str().to_string())
        } else {
            None
        };
        let pattern = if references.is_some() {
            String::new()
        } else {
            caps.get(3).map(|m| m.as_str().to_string()).unwrap_or_default()
        };
        let channel = caps
            .get(5)
            .and_then(|m| Channel::from_tag(m.as_str()))
            .unwrap_or(Channel::Any);

        Ok(Self {
            verbs,
            declares,
            references,
            pattern,
            channel,
        })
    }
}

fn parse_verb(token: &str) -> Result<Method, RouteError> {
    let upper = token.to_ascii_uppercase();
    if !VERBS.contains(&upper.as_str()) {
        return Err(RouteError::InvalidVerb { verb: token.to_string() });
    }
    Method::from_bytes(upper.as_bytes()).map_err(|_| RouteError::InvalidVerb { verb: token.to_string() })
}
