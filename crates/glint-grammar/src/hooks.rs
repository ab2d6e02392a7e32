//! Match callbacks.
//!
//! A mode may attach a hook to its begin and end matches. The hook sees the
//! match and can veto it with [`HookResponse::ignore_match`]; it can also
//! stash values in a per-mode data map, which is how a mode remembers what its
//! begin looked like until its end is tested.
//!
//! ## Learning: Blanket Implementations
//!
//! [`ModeHook`] is implemented for every suitable closure, so grammars can pass
//! plain functions or closures without defining a type.

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// The match a hook is asked about.
#[derive(Debug, Clone, Copy)]
pub struct HookMatch<'t> {
    input: &'t str,
    start: usize,
    end: usize,
    groups: &'t [Option<Range<usize>>],
}

impl<'t> HookMatch<'t> {
    /// `groups[0]` covers the whole match; later entries are the pattern's own
    /// capture groups.
    pub fn new(input: &'t str, start: usize, end: usize, groups: &'t [Option<Range<usize>>]) -> Self {
        Self { input, start, end, groups }
    }

    pub fn as_str(&self) -> &'t str {
        &self.input[self.start..self.end]
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Capture group `index` of the matching pattern, if it participated.
    pub fn group(&self, index: usize) -> Option<&'t str> {
        let range = self.groups.get(index)?.clone()?;
        self.input.get(range)
    }

    /// The whole text being scanned.
    pub fn input(&self) -> &'t str {
        self.input
    }

    pub fn preceding_char(&self) -> Option<char> {
        self.input[..self.start].chars().next_back()
    }

    pub fn following_char(&self) -> Option<char> {
        self.input[self.end..].chars().next()
    }
}

/// What a hook can do about a match.
#[derive(Debug)]
pub struct HookResponse<'d> {
    ignored: bool,
    data: &'d mut HashMap<String, String>,
}

impl<'d> HookResponse<'d> {
    pub fn new(data: &'d mut HashMap<String, String>) -> Self {
        Self { ignored: false, data }
    }

    /// Rejects the match; the engine keeps looking.
    pub fn ignore_match(&mut self) {
        self.ignored = true;
    }

    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    /// Scratch space shared by the begin and end hooks of one mode.
    pub fn data(&mut self) -> &mut HashMap<String, String> {
        &mut *self.data
    }
}

/// A begin or end callback.
pub trait ModeHook: Send + Sync {
    fn call(&self, found: &HookMatch<'_>, response: &mut HookResponse<'_>);
}

impl<F> ModeHook for F
where
    F: Fn(&HookMatch<'_>, &mut HookResponse<'_>) + Send + Sync,
{
    fn call(&self, found: &HookMatch<'_>, response: &mut HookResponse<'_>) {
        self(found, response)
    }
}

/// Shared handle to a [`ModeHook`].
#[derive(Clone)]
pub struct Hook(Arc<dyn ModeHook>);

impl Hook {
    pub fn new(hook: impl ModeHook + 'static) -> Self {
        Self(Arc::new(hook))
    }

    /// Wraps a closure. Prefer this over [`Hook::new`] for closures so their
    /// argument types are inferred.
    pub fn from_fn<F>(hook: F) -> Self
    where
        F: Fn(&HookMatch<'_>, &mut HookResponse<'_>) + Send + Sync + 'static,
    {
        Self(Arc::new(hook))
    }

    pub fn call(&self, found: &HookMatch<'_>, response: &mut HookResponse<'_>) {
        self.0.call(found, response);
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Hook(..)")
    }
}

/// Rejects a keyword-started mode when the keyword is part of a dotted path,
/// as in `object.class`.
pub fn skip_if_dot_adjacent(found: &HookMatch<'_>, response: &mut HookResponse<'_>) {
    if found.preceding_char() == Some('.') || found.following_char() == Some('.') {
        response.ignore_match();
    }
}
