//! The scanning loop.
//!
//! A [`Scanner`] walks the text once, left to right. At each step it asks the
//! innermost open mode's matcher for the earliest rule match, flushes the text
//! before it, and then either opens a child mode, closes modes, or reports
//! illegal text. Text between matches accumulates in a buffer that is flushed
//! through the keyword scanner, or through an embedded language, whenever the
//! mode stack is about to change.
//!
//! ## Learning: Arc Clones to Split Borrows
//!
//! The compiled language is read while the scanner's own state is mutated.
//! Holding the language behind an `Arc` and cloning the handle locally lets a
//! method keep `&CompiledMode` references alive across `&mut self` calls.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use fancy_regex::Regex;
use glint_grammar::matcher::next_char_boundary;
use glint_grammar::pattern::escape;
use glint_grammar::{
    CompiledLanguage, CompiledMode, HookMatch, HookResponse, MatchFailure, ModeId, RuleKind, RuleMatch, ScanCursor,
    SubLanguage, lang_re,
};

use crate::highlighter::{Highlighter, ScanPolicy};
use crate::result::{Continuation, HighlightResult, IllegalBy, SavedFrame};
use crate::tree::TokenTree;
use crate::{EngineFault, HighlightError};

/// Iterations allowed before the runaway check kicks in.
const MIN_RUNAWAY_ITERATIONS: usize = 100_000;
/// Bytes of context kept either side of an illegal match.
const CONTEXT_RADIUS: usize = 100;
const UNNAMED_MODE: &str = "<unnamed>";

struct Frame {
    saved: SavedFrame,
    cursor: ScanCursor,
}

impl Frame {
    fn new(saved: SavedFrame) -> Self {
        Self {
            saved,
            cursor: ScanCursor::default(),
        }
    }
}

pub(crate) struct Scanner<'a> {
    highlighter: &'a Highlighter<'a>,
    name: String,
    language: Arc<CompiledLanguage>,
    code: &'a str,
    policy: ScanPolicy,
    stack: Vec<Frame>,
    emitter: TokenTree,
    mode_buffer: String,
    relevance: u32,
    index: usize,
    iterations: usize,
    resume_at_same_position: bool,
    finished: bool,
    last_match: Option<(RuleKind, usize)>,
    continuations: HashMap<String, Continuation>,
    mode_data: HashMap<ModeId, HashMap<String, String>>,
}

impl<'a> Scanner<'a> {
    pub fn new(
        highlighter: &'a Highlighter<'a>,
        name: &str,
        language: Arc<CompiledLanguage>,
        code: &'a str,
        policy: ScanPolicy,
        continuation: Option<&Continuation>,
    ) -> Self {
        let root = SavedFrame {
            mode: ModeId::ROOT,
            end_override: None,
        };
        let frames = match continuation {
            Some(saved) if saved.belongs_to(&language) && !saved.frames.is_empty() => saved.frames.clone(),
            Some(saved) => {
                tracing::warn!(
                    language = %language.name,
                    continuation = saved.language_name(),
                    "Ignoring continuation from another language"
                );
                vec![root]
            }
            None => vec![root],
        };

        Self {
            highlighter,
            name: name.to_string(),
            language,
            code,
            policy,
            stack: frames.into_iter().map(Frame::new).collect(),
            emitter: TokenTree::new(),
            mode_buffer: String::new(),
            relevance: 0,
            index: 0,
            iterations: 0,
            resume_at_same_position: false,
            finished: false,
            last_match: None,
            continuations: HashMap::new(),
            mode_data: HashMap::new(),
        }
    }

    pub fn run(&mut self) -> Result<(), HighlightError> {
        tracing::trace!(language = %self.name, bytes = self.code.len(), "Scanning");
        self.open_continuation_scopes();

        let language = Arc::clone(&self.language);
        let code = self.code;

        while !self.finished {
            self.iterations += 1;
            if self.iterations > MIN_RUNAWAY_ITERATIONS && self.iterations > self.index * 3 {
                return Err(EngineFault::RunawayLoop {
                    iterations: self.iterations,
                    offset: self.index,
                }
                .into());
            }

            let resume = std::mem::take(&mut self.resume_at_same_position);
            let Some(frame) = self.stack.last_mut() else {
                break;
            };
            if !resume {
                frame.cursor.consider_all();
            }
            frame.cursor.last_index = self.index;
            let matcher = &language.mode(frame.saved.mode).matcher;
            let Some(found) = matcher.exec(code, &mut frame.cursor).map_err(EngineFault::from)? else {
                break;
            };

            self.mode_buffer.push_str(&code[self.index..found.start]);
            let consumed = self.process_lexeme(&found)?;
            self.index = found.start + consumed;
        }

        self.mode_buffer.push_str(&code[self.index..]);
        self.process_buffer()?;
        self.emitter.close_all_nodes();
        Ok(())
    }

    fn top_mode(&self) -> ModeId {
        self.stack.last().map_or(ModeId::ROOT, |frame| frame.saved.mode)
    }

    fn open_continuation_scopes(&mut self) {
        let language = Arc::clone(&self.language);
        for frame in self.stack.iter().skip(1) {
            if let Some(class) = &language.mode(frame.saved.mode).class_name {
                self.emitter.open_node(class);
            }
        }
    }

    /// Handles one rule match. Returns how many bytes from the match start
    /// were consumed.
    fn process_lexeme(&mut self, found: &RuleMatch) -> Result<usize, HighlightError> {
        let code = self.code;
        let lexeme = &code[found.start..found.end];

        // an empty end right where an empty begin matched would loop forever
        if let Some((RuleKind::Begin(_), start)) = self.last_match {
            if found.kind == RuleKind::End && start == found.start && lexeme.is_empty() {
                if self.policy.propagate_faults {
                    return Err(EngineFault::ZeroWidthMatch { offset: found.start }.into());
                }
                return Ok(self.advance_one_char(found.start));
            }
        }
        self.last_match = Some((found.kind, found.start));

        match found.kind {
            RuleKind::Begin(mode) => return self.do_begin_match(found, mode),
            RuleKind::Illegal if !self.policy.ignore_illegals => return Err(self.illegal_error(found)),
            RuleKind::End => {
                if let Some(consumed) = self.do_end_match(found)? {
                    return Ok(consumed);
                }
            }
            RuleKind::Illegal => {}
        }

        // An end match its mode did not confirm, or an ignored illegal match.
        if lexeme.is_empty() {
            return Ok(self.advance_one_char(found.start));
        }
        self.mode_buffer.push_str(lexeme);
        Ok(lexeme.len())
    }

    /// Moves the character at `at` into the buffer, or stops the scan at the
    /// end of the text.
    fn advance_one_char(&mut self, at: usize) -> usize {
        let code = self.code;
        match next_char_boundary(code, at) {
            Some(next) => {
                self.mode_buffer.push_str(&code[at..next]);
                next - at
            }
            None => {
                self.finished = true;
                0
            }
        }
    }

    fn illegal_error(&self, found: &RuleMatch) -> HighlightError {
        let mode = self
            .language
            .mode(self.top_mode())
            .class_name
            .clone()
            .unwrap_or_else(|| UNNAMED_MODE.to_string());
        HighlightError::IllegalLexeme {
            lexeme: self.code[found.start..found.end].to_string(),
            mode,
            offset: found.start,
            context: context_window(self.code, self.index),
        }
    }

    fn do_begin_match(&mut self, found: &RuleMatch, mode_id: ModeId) -> Result<usize, HighlightError> {
        let language = Arc::clone(&self.language);
        let mode = language.mode(mode_id);
        let code = self.code;
        let lexeme = &code[found.start..found.end];

        let hook_match = HookMatch::new(code, found.start, found.end, &found.groups);
        let mut response = HookResponse::new(self.mode_data.entry(mode_id).or_default());
        for hook in [&mode.before_begin, &mode.on_begin].into_iter().flatten() {
            hook.call(&hook_match, &mut response);
            if response.is_ignored() {
                break;
            }
        }
        if response.is_ignored() {
            return Ok(self.do_ignore(found.start));
        }

        let end_override = if mode.end_same_as_begin {
            // literal and case-sensitive, even in case-insensitive grammars
            Some(Arc::new(lang_re(&escape(lexeme), false)?))
        } else {
            None
        };

        if mode.skip {
            self.mode_buffer.push_str(lexeme);
        } else {
            if mode.exclude_begin {
                self.mode_buffer.push_str(lexeme);
            }
            self.process_buffer()?;
            if !mode.return_begin && !mode.exclude_begin {
                self.mode_buffer = lexeme.to_string();
            }
        }
        self.start_new_mode(mode_id, end_override);

        Ok(if mode.return_begin { 0 } else { lexeme.len() })
    }

    /// A begin match was vetoed by a hook.
    fn do_ignore(&mut self, at: usize) -> usize {
        let all_rules_tried = self
            .stack
            .last()
            .is_none_or(|frame| frame.cursor.regex_index() == 0);
        if all_rules_tried {
            self.advance_one_char(at)
        } else {
            self.resume_at_same_position = true;
            0
        }
    }

    fn start_new_mode(&mut self, mode_id: ModeId, end_override: Option<Arc<Regex>>) {
        if let Some(class) = &self.language.mode(mode_id).class_name {
            self.emitter.open_node(class);
        }
        self.stack.push(Frame::new(SavedFrame {
            mode: mode_id,
            end_override,
        }));
    }

    /// Stack index of the frame `found` ends, if any mode confirms the end.
    fn end_of_mode(&mut self, found: &RuleMatch) -> Result<Option<usize>, HighlightError> {
        let language = Arc::clone(&self.language);
        let code = self.code;
        let Some(mut depth) = self.stack.len().checked_sub(1) else {
            return Ok(None);
        };

        loop {
            let mode_id = self.stack[depth].saved.mode;
            let mode = language.mode(mode_id);
            let end_override = self.stack[depth].saved.end_override.clone();

            let mut matched = match end_override.as_deref().or(mode.end_re.as_ref()) {
                Some(end) => matches_at(end, code, found.start)?,
                None => false,
            };
            if matched {
                if let Some(hook) = &mode.on_end {
                    let hook_match = HookMatch::new(code, found.start, found.end, &found.groups);
                    let mut response = HookResponse::new(self.mode_data.entry(mode_id).or_default());
                    hook.call(&hook_match, &mut response);
                    matched = !response.is_ignored();
                }
            }

            if matched {
                // the root can never be ended
                while depth > 1 && language.mode(self.stack[depth].saved.mode).ends_parent {
                    depth -= 1;
                }
                return Ok(Some(depth));
            }
            if mode.ends_with_parent && depth > 0 {
                depth -= 1;
                continue;
            }
            return Ok(None);
        }
    }

    fn do_end_match(&mut self, found: &RuleMatch) -> Result<Option<usize>, HighlightError> {
        let Some(end_depth) = self.end_of_mode(found)? else {
            return Ok(None);
        };

        let language = Arc::clone(&self.language);
        let code = self.code;
        let lexeme = &code[found.start..found.end];
        let origin = language.mode(self.top_mode());

        if origin.skip {
            self.mode_buffer.push_str(lexeme);
        } else {
            if !(origin.return_end || origin.exclude_end) {
                self.mode_buffer.push_str(lexeme);
            }
            self.process_buffer()?;
            if origin.exclude_end && !origin.return_end {
                self.mode_buffer = lexeme.to_string();
            }
        }

        let ended = self.stack[end_depth].saved.clone();
        while self.stack.len() > end_depth {
            let Some(frame) = self.stack.pop() else {
                break;
            };
            let mode = language.mode(frame.saved.mode);
            if mode.class_name.is_some() {
                self.emitter.close_node();
            }
            if !mode.skip && mode.sub_language.is_none() {
                self.relevance = self.relevance.saturating_add(mode.relevance);
            }
        }

        let end_mode = language.mode(ended.mode);
        if let Some(starts) = end_mode.starts {
            let inherited = if end_mode.end_same_as_begin {
                ended.end_override
            } else {
                None
            };
            self.start_new_mode(starts, inherited);
        }

        Ok(Some(if origin.return_end { 0 } else { lexeme.len() }))
    }

    fn process_buffer(&mut self) -> Result<(), HighlightError> {
        let language = Arc::clone(&self.language);
        let mode = language.mode(self.top_mode());
        if mode.sub_language.is_some() {
            self.process_sub_language(mode)
        } else {
            self.process_keywords(mode)
        }
    }

    fn process_keywords(&mut self, mode: &CompiledMode) -> Result<(), HighlightError> {
        let buffer = std::mem::take(&mut self.mode_buffer);
        let Some(keywords) = &mode.keywords else {
            self.emitter.add_text(&buffer);
            return Ok(());
        };

        let mut pending = String::new();
        let mut last_index = 0;
        let mut pos = 0;
        while let Some(word) = mode
            .keyword_pattern
            .find_from_pos(&buffer, pos)
            .map_err(|err| EngineFault::from(MatchFailure::from(err)))?
        {
            pending.push_str(&buffer[last_index..word.start()]);
            let key = if self.language.case_insensitive {
                Cow::Owned(word.as_str().to_lowercase())
            } else {
                Cow::Borrowed(word.as_str())
            };

            match keywords.get(&key) {
                Some(data) => {
                    self.emitter.add_text(&pending);
                    pending.clear();
                    self.relevance = self.relevance.saturating_add(data.relevance);
                    self.emitter.add_keyword(word.as_str(), &data.category);
                }
                None => pending.push_str(word.as_str()),
            }

            last_index = word.end();
            pos = if word.end() > word.start() {
                word.end()
            } else {
                match next_char_boundary(&buffer, word.end()) {
                    Some(next) => next,
                    None => break,
                }
            };
        }

        pending.push_str(&buffer[last_index..]);
        self.emitter.add_text(&pending);
        Ok(())
    }

    fn process_sub_language(&mut self, mode: &CompiledMode) -> Result<(), HighlightError> {
        if self.mode_buffer.is_empty() {
            return Ok(());
        }
        let buffer = std::mem::take(&mut self.mode_buffer);
        let Some(sub_language) = &mode.sub_language else {
            self.emitter.add_text(&buffer);
            return Ok(());
        };

        let result = match sub_language {
            SubLanguage::Named(name) => {
                let Ok((resolved, language)) = self.highlighter.registry().resolve(name) else {
                    tracing::warn!(language = %name, "Embedded language is not registered");
                    self.emitter.add_text(&buffer);
                    return Ok(());
                };
                let policy = ScanPolicy {
                    ignore_illegals: true,
                    propagate_illegal: false,
                    propagate_faults: self.policy.propagate_faults,
                };
                let result =
                    self.highlighter
                        .scan(resolved, language, &buffer, policy, self.continuations.get(resolved))?;
                match &result.continuation {
                    Some(next) => {
                        self.continuations.insert(resolved.to_string(), next.clone());
                    }
                    None => {
                        self.continuations.remove(resolved);
                    }
                }
                result
            }
            SubLanguage::Candidates(candidates) => {
                let subset = (!candidates.is_empty()).then_some(candidates.as_slice());
                self.highlighter
                    .auto_scan(&buffer, subset, self.policy.propagate_faults)?
                    .best
            }
        };

        if self.highlighter.counts_sublanguage(mode.relevance) {
            self.relevance = self.relevance.saturating_add(result.relevance);
        }
        self.emitter.add_sublanguage(result.tree, result.language.as_deref());
        Ok(())
    }

    fn continuation(&self) -> Continuation {
        Continuation {
            language: Arc::clone(&self.language),
            frames: self.stack.iter().map(|frame| frame.saved.clone()).collect(),
        }
    }

    pub fn into_result(self) -> HighlightResult {
        let continuation = self.continuation();
        HighlightResult {
            language: Some(self.name),
            relevance: self.relevance,
            tree: self.emitter,
            illegal: false,
            illegal_by: None,
            error_raised: None,
            continuation: Some(continuation),
            code: self.code.to_string(),
        }
    }

    pub fn into_illegal_result(mut self, err: HighlightError) -> HighlightResult {
        self.emitter.close_all_nodes();
        let context = match &err {
            HighlightError::IllegalLexeme { context, .. } => context.clone(),
            _ => String::new(),
        };
        let mode = self.language.mode(self.top_mode()).class_name.clone();

        HighlightResult {
            illegal: true,
            illegal_by: Some(IllegalBy {
                message: err.to_string(),
                context,
                mode,
                sofar: self.emitter,
            }),
            ..HighlightResult::plain(Some(self.name), self.code)
        }
    }

    pub fn into_fallback_result(self, err: HighlightError) -> HighlightResult {
        HighlightResult {
            error_raised: Some(err),
            ..HighlightResult::plain(Some(self.name), self.code)
        }
    }
}

fn matches_at(regex: &Regex, text: &str, at: usize) -> Result<bool, HighlightError> {
    let found = regex
        .find_from_pos(text, at)
        .map_err(|err| EngineFault::from(MatchFailure::from(err)))?;
    Ok(found.is_some_and(|m| m.start() == at))
}

/// Up to `CONTEXT_RADIUS` bytes either side of `index`, widened to character
/// boundaries.
fn context_window(code: &str, index: usize) -> String {
    let mut start = index.saturating_sub(CONTEXT_RADIUS).min(code.len());
    while !code.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = index.saturating_add(CONTEXT_RADIUS).min(code.len());
    while !code.is_char_boundary(end) {
        end += 1;
    }
    code[start..end].to_string()
}
