//! Grammar-aware completion for the operator console.
//!
//! Completion walks the same catalog tree as the parser, so suggestions follow
//! whatever slot the cursor sits in: command keywords, opcode names, channel
//! names, switch actions or help topics.

use super::catalog::{self, ChoiceBranch, Node, ValueSpec};
use super::grammar::{self, Token, TokenKind};
use crate::channel::channels;
use crate::protocol::Opcode;
use heapless::Vec as HeaplessVec;

/// Upper bound on candidates returned at once. Large enough for the full
/// channel catalog.
pub const MAX_SUGGESTIONS: usize = 72;

/// Completion result returned to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionResult {
    /// Replacement to apply when only one candidate matches or when the
    /// candidates share a longer prefix than what was typed.
    pub replacement: Option<Replacement>,
    /// Candidates for the current cursor position. Empty when nothing matched.
    pub options: HeaplessVec<&'static str, MAX_SUGGESTIONS>,
}

impl CompletionResult {
    fn empty() -> Self {
        Self {
            replacement: None,
            options: HeaplessVec::new(),
        }
    }
}

/// Portion of the buffer to substitute with a completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Replacement {
    pub start: usize,
    pub end: usize,
    pub value: &'static str,
    pub append_space: bool,
}

/// Stateless completion engine that mirrors the console grammar.
#[derive(Default)]
pub struct CompletionEngine;

impl CompletionEngine {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes completions for `buffer` with the cursor at byte `cursor`.
    ///
    /// The cursor must sit on a UTF-8 boundary.
    #[must_use]
    pub fn complete(&self, buffer: &str, cursor: usize) -> CompletionResult {
        if cursor > buffer.len() || !buffer.is_char_boundary(cursor) {
            return CompletionResult::empty();
        }

        let upto_cursor = &buffer[..cursor];
        let prefix_start = token_start(upto_cursor);
        let prefix = &upto_cursor[prefix_start..];
        let leading = &upto_cursor[..prefix_start];

        let Ok(leading_tokens) = grammar::lex(leading) else {
            return CompletionResult::empty();
        };
        if leading_tokens
            .iter()
            .any(|token| token.kind == TokenKind::Error)
        {
            return CompletionResult::empty();
        }

        let context = determine_context(leading_tokens.as_slice());
        let mut matches: HeaplessVec<&'static str, MAX_SUGGESTIONS> = HeaplessVec::new();
        match context {
            CompletionContext::Root | CompletionContext::HelpTopic => collect(
                catalog::commands().iter().map(|spec| spec.name),
                prefix,
                &mut matches,
            ),
            CompletionContext::OpcodeName => {
                collect(Opcode::ALL.iter().map(|op| op.name()), prefix, &mut matches);
            }
            CompletionContext::ChannelName => {
                collect(channels().iter().map(|info| info.name), prefix, &mut matches);
            }
            CompletionContext::Choice(branches) => collect(
                branches.iter().map(|branch| branch.keyword),
                prefix,
                &mut matches,
            ),
            CompletionContext::None => {}
        }

        if matches.is_empty() {
            return CompletionResult::empty();
        }

        let mut append_space = false;
        let replacement_value = if let [candidate] = matches.as_slice() {
            append_space = should_append_space(context, candidate);
            Some(*candidate)
        } else {
            let lcp = longest_common_prefix(matches.as_slice());
            let shared = common_prefix_len_ignore_case(prefix, lcp);
            (lcp.len() > shared).then_some(lcp)
        };

        CompletionResult {
            replacement: replacement_value.map(|value| Replacement {
                start: prefix_start,
                end: cursor,
                value,
                append_space,
            }),
            options: matches,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CompletionContext {
    Root,
    OpcodeName,
    ChannelName,
    Choice(&'static [ChoiceBranch]),
    HelpTopic,
    None,
}

fn determine_context(tokens: &[Token<'_>]) -> CompletionContext {
    let Some((first, rest)) = tokens.split_first() else {
        return CompletionContext::Root;
    };
    match catalog::find(first.lexeme) {
        Some(spec) => walk(spec.grammar, rest),
        None => CompletionContext::None,
    }
}

fn walk(node: &'static Node, tokens: &[Token<'_>]) -> CompletionContext {
    match node {
        Node::End | Node::Repeat { .. } => CompletionContext::None,
        Node::Choice(branches) => match tokens.split_first() {
            None => CompletionContext::Choice(branches),
            Some((token, rest)) => branches
                .iter()
                .find(|branch| branch.keyword.eq_ignore_ascii_case(token.lexeme))
                .map_or(CompletionContext::None, |branch| walk(branch.next, rest)),
        },
        Node::Value { spec, next, .. } => match tokens.split_first() {
            None => value_context(*spec),
            Some((_, rest)) => walk(next, rest),
        },
        Node::Topic { next, .. } => match tokens.split_first() {
            None => CompletionContext::HelpTopic,
            Some((_, rest)) => walk(next, rest),
        },
    }
}

const fn value_context(spec: ValueSpec) -> CompletionContext {
    match spec {
        ValueSpec::Opcode => CompletionContext::OpcodeName,
        ValueSpec::Channel => CompletionContext::ChannelName,
        _ => CompletionContext::None,
    }
}

fn collect(
    candidates: impl Iterator<Item = &'static str>,
    prefix: &str,
    matches: &mut HeaplessVec<&'static str, MAX_SUGGESTIONS>,
) {
    for candidate in candidates {
        if starts_with_ignore_ascii_case(candidate, prefix) && matches.push(candidate).is_err() {
            break;
        }
    }
}

fn token_start(buffer: &str) -> usize {
    buffer
        .rfind([' ', '\t'])
        .map_or(0, |index| index + 1)
}

fn starts_with_ignore_ascii_case(candidate: &str, prefix: &str) -> bool {
    candidate
        .as_bytes()
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
}

fn common_prefix_len_ignore_case(lhs: &str, rhs: &str) -> usize {
    lhs.as_bytes()
        .iter()
        .zip(rhs.as_bytes())
        .take_while(|(l, r)| l.eq_ignore_ascii_case(r))
        .count()
}

fn longest_common_prefix(candidates: &[&'static str]) -> &'static str {
    let Some((first, rest)) = candidates.split_first() else {
        return "";
    };
    let mut prefix = *first;
    for candidate in rest {
        let len = common_prefix_len_ignore_case(prefix, candidate);
        prefix = &prefix[..len];
        if prefix.is_empty() {
            break;
        }
    }
    prefix
}

// Only command keywords that take arguments get a trailing space.
fn should_append_space(context: CompletionContext, candidate: &'static str) -> bool {
    if context != CompletionContext::Root {
        return false;
    }
    catalog::find(candidate).is_some_and(|spec| !matches!(spec.grammar, Node::End))
}
