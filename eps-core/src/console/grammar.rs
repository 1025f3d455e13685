#![allow(clippy::module_name_repetitions)]

//! Lexer and parser for the operator console.
//!
//! The lexer uses `regal` to produce a bounded token stream, while the parser
//! walks the static catalog with `winnow` combinators over those tokens to
//! build structured command values.

use super::catalog::{self, ChoiceBranch, ChoiceTag, CommandTag, HelpTopics, Node, ValueSpec};
use core::fmt;
use core::ops::Range;
use core::time::Duration;

use heapless::Vec as HeaplessVec;
use regal::IncrementalError;
use regal::TokenCache;
use regal_macros::RegalLexer;
#[allow(deprecated)]
use winnow::error::ErrorKind;
use winnow::error::{ErrMode, ParserError};
use winnow::prelude::*;
use winnow::stream::Stream;

use crate::channel::ChannelCode;
use crate::channel::registry::find_by_name;
use crate::protocol::{Frame, Opcode};

/// Maximum number of tokens produced per console line.
pub const MAX_TOKENS: usize = 32;
const MAX_CACHE_RECORDS: usize = MAX_TOKENS * 2;

/// Lexical token kinds recognized by the console grammar.
#[derive(RegalLexer, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TokenKind {
    /// Duration literal ending in `ms` or `s`.
    #[regex(r"[0-9]+(?:ms|s)", priority = 2)]
    Duration,
    /// Hexadecimal literal with a `0x` prefix.
    #[regex(r"0[xX][0-9A-Fa-f]+", priority = 3)]
    Hex,
    /// Signed or fractional number.
    #[regex(r"-?[0-9]+\.[0-9]+|-[0-9]+")]
    Decimal,
    /// Unsuffixed decimal integer.
    #[regex(r"[0-9]+")]
    Integer,
    /// Identifier or keyword (case-insensitive match performed later).
    #[regex(r"[A-Za-z][A-Za-z0-9_-]*")]
    Ident,
    /// Inline whitespace is ignored.
    #[regex(r"[ \t]+", skip)]
    Whitespace,
    /// End-of-line token (`\r`, `\n`, or `\r\n`).
    #[token("\r\n")]
    #[token("\n")]
    #[token("\r")]
    Eol,
    /// Pseudo variant used when the lexer encounters unsupported input.
    #[default]
    #[regex(r".", priority = 1024)]
    Error,
}

/// Token emitted by the lexer with a byte span back into the source line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub lexeme: &'a str,
    pub span: Range<usize>,
}

/// Bounded token buffer to avoid dynamic allocation in `no_std` environments.
pub type TokenBuffer<'a> = HeaplessVec<Token<'a>, MAX_TOKENS>;

/// Lexer errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LexError {
    /// Input produced more tokens than the static buffer allows.
    TooManyTokens { processed: usize },
    /// Underlying lexer reported an unrecoverable error.
    Engine,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::TooManyTokens { processed } => {
                write!(f, "token buffer exhausted after {processed} items")
            }
            LexError::Engine => write!(f, "lexer engine error"),
        }
    }
}

/// Grammar errors emitted by the parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GrammarErrorKind<'a> {
    UnexpectedToken {
        expected: &'static str,
        found: Option<TokenKind>,
        span: Range<usize>,
    },
    UnexpectedEnd {
        expected: &'static str,
    },
    InvalidInteger {
        span: Range<usize>,
    },
    InvalidNumber {
        span: Range<usize>,
    },
    InvalidDuration {
        span: Range<usize>,
    },
    UnknownName {
        expected: &'static str,
        lexeme: &'a str,
    },
    InvalidToken {
        span: Range<usize>,
        lexeme: &'a str,
    },
}

impl fmt::Display for GrammarErrorKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarErrorKind::UnexpectedToken {
                expected,
                found,
                span,
            } => write!(f, "expected {expected}, found {found:?} at {span:?}"),
            GrammarErrorKind::UnexpectedEnd { expected } => {
                write!(f, "unexpected end of input, expected {expected}")
            }
            GrammarErrorKind::InvalidInteger { span } => {
                write!(f, "invalid integer literal at {span:?}")
            }
            GrammarErrorKind::InvalidNumber { span } => {
                write!(f, "invalid number at {span:?}")
            }
            GrammarErrorKind::InvalidDuration { span } => {
                write!(f, "invalid duration literal at {span:?}")
            }
            GrammarErrorKind::UnknownName { expected, lexeme } => {
                write!(f, "unknown {expected} `{lexeme}`")
            }
            GrammarErrorKind::InvalidToken { span, lexeme } => {
                write!(f, "unsupported token `{lexeme}` at {span:?}")
            }
        }
    }
}

/// Wrapper type enabling a consistent error surface for consumers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrammarError<'a> {
    pub kind: GrammarErrorKind<'a>,
}

impl fmt::Display for GrammarError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl<'a> GrammarError<'a> {
    fn unexpected(expected: &'static str, token: Option<&Token<'a>>) -> Self {
        GrammarError {
            kind: match token {
                Some(tok) => GrammarErrorKind::UnexpectedToken {
                    expected,
                    found: Some(tok.kind),
                    span: tok.span.clone(),
                },
                None => GrammarErrorKind::UnexpectedEnd { expected },
            },
        }
    }

    fn invalid_integer(token: &Token<'a>) -> Self {
        GrammarError {
            kind: GrammarErrorKind::InvalidInteger {
                span: token.span.clone(),
            },
        }
    }

    fn invalid_number(token: &Token<'a>) -> Self {
        GrammarError {
            kind: GrammarErrorKind::InvalidNumber {
                span: token.span.clone(),
            },
        }
    }

    fn invalid_duration(token: &Token<'a>) -> Self {
        GrammarError {
            kind: GrammarErrorKind::InvalidDuration {
                span: token.span.clone(),
            },
        }
    }

    fn unknown_name(expected: &'static str, token: &Token<'a>) -> Self {
        GrammarError {
            kind: GrammarErrorKind::UnknownName {
                expected,
                lexeme: token.lexeme,
            },
        }
    }

    fn invalid_token(token: &Token<'a>) -> Self {
        GrammarError {
            kind: GrammarErrorKind::InvalidToken {
                span: token.span.clone(),
                lexeme: token.lexeme,
            },
        }
    }
}

type Input<'src, 'slice> = &'slice [Token<'src>];

#[allow(deprecated)]
impl<'src, 'slice> ParserError<Input<'src, 'slice>> for GrammarError<'src>
where
    'src: 'slice,
{
    fn from_error_kind(input: &Input<'src, 'slice>, _kind: ErrorKind) -> Self {
        GrammarError::unexpected("token", input.first())
    }

    fn append(
        self,
        _input: &Input<'src, 'slice>,
        _token_start: &<Input<'src, 'slice> as Stream>::Checkpoint,
        _kind: ErrorKind,
    ) -> Self {
        self
    }

    fn or(self, other: Self) -> Self {
        other
    }
}

/// Combined lex/parse error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseError<'a> {
    Lex(LexError),
    Grammar(GrammarError<'a>),
}

impl fmt::Display for ParseError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Lex(err) => err.fmt(f),
            ParseError::Grammar(err) => err.fmt(f),
        }
    }
}

/// Structured commands produced by the parser.
#[derive(Clone, Debug, PartialEq)]
pub enum Command<'a> {
    Cmd(CmdCommand),
    Write(Frame),
    Read,
    Tick(Option<TickAmount>),
    Time,
    Tlm(TlmCommand),
    Switch(SwitchCommand),
    Status,
    Help(HelpCommand<'a>),
}

/// Protocol command addressed by raw opcode. Unknown opcodes are kept so the
/// board can reject them itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CmdCommand {
    pub opcode: u8,
    pub param: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickAmount {
    Duration(Duration),
    Ticks(u32),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TlmCommand {
    pub channel: Option<ChannelCode>,
    pub value: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwitchAction {
    On,
    Off,
    InitialOn,
    InitialOff,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwitchCommand {
    /// One-based switch number as typed.
    pub number: u8,
    pub action: SwitchAction,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HelpCommand<'a> {
    pub topic: Option<&'a str>,
}

pub(crate) fn parse_tokens_partial<'src, 'slice>(
    tokens: &'slice [Token<'src>],
) -> Result<(Command<'src>, &'slice [Token<'src>]), GrammarError<'src>>
where
    'src: 'slice,
{
    let mut input = tokens;
    match command().parse_next(&mut input) {
        Ok(cmd) => Ok((cmd, input)),
        Err(ErrMode::Backtrack(err) | ErrMode::Cut(err)) => Err(err),
        Err(ErrMode::Incomplete(_)) => Err(GrammarError::unexpected("token", input.first())),
    }
}

/// Tokenize the provided line.
pub fn lex(line: &str) -> Result<TokenBuffer<'_>, LexError> {
    let compiled = TokenKind::lexer();
    let mut cache: TokenCache<TokenKind, MAX_CACHE_RECORDS> = TokenCache::new();
    let partial = cache
        .rebuild(compiled, line)
        .map_err(map_incremental_error)?;
    let mut buffer = TokenBuffer::new();

    for record in cache.tokens() {
        if record.skipped {
            continue;
        }

        let span = record.start..record.end;
        let lexeme = &line[span.clone()];
        if buffer
            .push(Token {
                kind: record.token,
                lexeme,
                span,
            })
            .is_err()
        {
            return Err(LexError::TooManyTokens {
                processed: buffer.len() + 1,
            });
        }
    }

    if let Some(partial) = partial.filter(|partial| !partial.fragment.is_empty()) {
        let start = partial.start;
        let end = start + partial.fragment.len();
        if buffer
            .push(Token {
                kind: TokenKind::Error,
                lexeme: partial.fragment,
                span: start..end,
            })
            .is_err()
        {
            return Err(LexError::TooManyTokens {
                processed: buffer.len() + 1,
            });
        }
    }

    Ok(buffer)
}

fn map_incremental_error(error: IncrementalError) -> LexError {
    match error {
        IncrementalError::TokenOverflow => LexError::TooManyTokens {
            processed: MAX_TOKENS,
        },
        _ => LexError::Engine,
    }
}

/// Parse a console command from the provided line.
pub fn parse(line: &str) -> Result<Command<'_>, ParseError<'_>> {
    let tokens = lex(line).map_err(ParseError::Lex)?;

    if let Some(token) = tokens.iter().find(|token| token.kind == TokenKind::Error) {
        return Err(ParseError::Grammar(GrammarError::invalid_token(token)));
    }

    let (command, mut rest) =
        parse_tokens_partial(tokens.as_slice()).map_err(ParseError::Grammar)?;

    while let Some((token, remaining)) = rest.split_first() {
        if token.kind == TokenKind::Eol {
            rest = remaining;
        } else {
            return Err(ParseError::Grammar(GrammarError::unexpected(
                "end of command",
                Some(token),
            )));
        }
    }

    Ok(command)
}

fn command<'src, 'slice>() -> impl Parser<Input<'src, 'slice>, Command<'src>, GrammarError<'src>>
where
    'src: 'slice,
{
    move |input: &mut Input<'src, 'slice>| {
        let snapshot = *input;
        let command_token = expect_kind(TokenKind::Ident, "command keyword").parse_next(input)?;

        if let Some(spec) = catalog::find(command_token.lexeme) {
            let mut state = CommandState::new(spec.tag);
            parse_node(spec.grammar, input, &mut state)?;
            state.finish()
        } else {
            *input = snapshot;
            Err(ErrMode::Backtrack(GrammarError::unexpected(
                "command keyword",
                Some(&command_token),
            )))
        }
    }
}

fn parse_node<'src, 'slice>(
    node: &'static Node,
    input: &mut Input<'src, 'slice>,
    state: &mut CommandState<'src>,
) -> Result<(), ErrMode<GrammarError<'src>>>
where
    'src: 'slice,
{
    match node {
        Node::End => Ok(()),
        Node::Choice(choices) => parse_choice(input, choices, state),
        Node::Value {
            spec,
            optional,
            next,
        } => {
            if *optional && at_line_end(input) {
                return Ok(());
            }
            let value = parse_value(input, *spec)?;
            state.apply_value(value)?;
            parse_node(next, input, state)
        }
        Node::Repeat { spec, max } => {
            let mut count = 0;
            while count < *max && (count == 0 || !at_line_end(input)) {
                let value = parse_value(input, *spec)?;
                state.apply_value(value)?;
                count += 1;
            }
            Ok(())
        }
        Node::Topic { topics, next } => {
            parse_topic(*topics, input, state)?;
            parse_node(next, input, state)
        }
    }
}

fn at_line_end(input: &Input<'_, '_>) -> bool {
    input
        .first()
        .is_none_or(|token| token.kind == TokenKind::Eol)
}

fn parse_choice<'src, 'slice>(
    input: &mut Input<'src, 'slice>,
    choices: &'static [ChoiceBranch],
    state: &mut CommandState<'src>,
) -> Result<(), ErrMode<GrammarError<'src>>>
where
    'src: 'slice,
{
    let label = choice_expected_label(choices);
    match input.split_first() {
        Some((token, rest)) if token.kind == TokenKind::Ident => {
            if let Some(branch) = find_choice(choices, token.lexeme) {
                *input = rest;
                state.apply_choice(branch.tag)?;
                parse_node(branch.next, input, state)
            } else {
                Err(ErrMode::Backtrack(GrammarError::unexpected(
                    label,
                    Some(token),
                )))
            }
        }
        Some((token, _)) if token.kind == TokenKind::Eol => Err(ErrMode::Backtrack(
            GrammarError::unexpected(label, None),
        )),
        Some((token, _)) => Err(ErrMode::Backtrack(GrammarError::unexpected(
            label,
            Some(token),
        ))),
        None => Err(ErrMode::Backtrack(GrammarError::unexpected(label, None))),
    }
}

fn parse_topic<'src, 'slice>(
    _topics: HelpTopics,
    input: &mut Input<'src, 'slice>,
    state: &mut CommandState<'src>,
) -> Result<(), ErrMode<GrammarError<'src>>>
where
    'src: 'slice,
{
    state.set_topic(None);

    match input.split_first() {
        Some((token, rest)) if token.kind == TokenKind::Ident => {
            state.set_topic(Some(token.lexeme));
            *input = rest;
            Ok(())
        }
        Some((token, _)) if token.kind == TokenKind::Eol => Ok(()),
        Some((token, _)) => Err(ErrMode::Backtrack(GrammarError::unexpected(
            "identifier",
            Some(token),
        ))),
        None => Ok(()),
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum SlotValue {
    Opcode(u8),
    Param(u32),
    Byte(u8),
    Interval(TickAmount),
    Channel(ChannelCode),
    Reading(f64),
    Switch(u8),
}

fn parse_value<'src, 'slice>(
    input: &mut Input<'src, 'slice>,
    spec: ValueSpec,
) -> Result<SlotValue, ErrMode<GrammarError<'src>>>
where
    'src: 'slice,
{
    let label = value_label(spec);
    let Some((token, rest)) = input.split_first() else {
        return Err(ErrMode::Backtrack(GrammarError::unexpected(label, None)));
    };
    if token.kind == TokenKind::Eol {
        return Err(ErrMode::Backtrack(GrammarError::unexpected(label, None)));
    }

    let numeric = matches!(token.kind, TokenKind::Integer | TokenKind::Hex);
    let value = match (spec, token.kind) {
        (ValueSpec::Opcode, TokenKind::Ident) => Opcode::find(token.lexeme)
            .map(|opcode| SlotValue::Opcode(opcode.to_raw()))
            .ok_or_else(|| GrammarError::unknown_name("opcode", token)),
        (ValueSpec::Opcode, _) if numeric => parse_byte(token).map(SlotValue::Opcode),
        (ValueSpec::Param, _) if numeric => parse_unsigned(token).map(SlotValue::Param),
        (ValueSpec::Byte, _) if numeric => parse_byte(token).map(SlotValue::Byte),
        (ValueSpec::Interval, TokenKind::Duration) => parse_duration(token)
            .map(|duration| SlotValue::Interval(TickAmount::Duration(duration))),
        (ValueSpec::Interval, TokenKind::Integer) => {
            parse_unsigned(token).map(|ticks| SlotValue::Interval(TickAmount::Ticks(ticks)))
        }
        (ValueSpec::Channel, TokenKind::Ident) => find_by_name(token.lexeme)
            .map(|info| SlotValue::Channel(info.code))
            .ok_or_else(|| GrammarError::unknown_name("channel", token)),
        (ValueSpec::Channel, _) if numeric => parse_unsigned(token).and_then(|raw| {
            u16::try_from(raw)
                .map(|raw| SlotValue::Channel(ChannelCode::new(raw)))
                .map_err(|_| GrammarError::invalid_integer(token))
        }),
        (ValueSpec::Reading, TokenKind::Decimal | TokenKind::Integer) => token
            .lexeme
            .parse::<f64>()
            .map(SlotValue::Reading)
            .map_err(|_| GrammarError::invalid_number(token)),
        (ValueSpec::Reading, TokenKind::Hex) => {
            parse_unsigned(token).map(|raw| SlotValue::Reading(f64::from(raw)))
        }
        (ValueSpec::Switch, TokenKind::Integer) => parse_byte(token).map(SlotValue::Switch),
        _ => {
            return Err(ErrMode::Backtrack(GrammarError::unexpected(
                label,
                Some(token),
            )));
        }
    };

    *input = rest;
    value.map_err(ErrMode::Cut)
}

const fn value_label(spec: ValueSpec) -> &'static str {
    match spec {
        ValueSpec::Opcode => "opcode",
        ValueSpec::Param => "parameter",
        ValueSpec::Byte => "byte",
        ValueSpec::Interval => "duration or tick count",
        ValueSpec::Channel => "channel",
        ValueSpec::Reading => "value",
        ValueSpec::Switch => "switch number",
    }
}

fn find_choice(choices: &'static [ChoiceBranch], lexeme: &str) -> Option<&'static ChoiceBranch> {
    choices
        .iter()
        .find(|choice| choice.keyword.eq_ignore_ascii_case(lexeme))
}

fn choice_expected_label(choices: &'static [ChoiceBranch]) -> &'static str {
    choices.first().map_or("keyword", |choice| choice.keyword)
}

enum CommandState<'a> {
    Cmd {
        opcode: Option<u8>,
        param: Option<u32>,
    },
    Write {
        frame: Frame,
    },
    Read,
    Tick {
        amount: Option<TickAmount>,
    },
    Time,
    Tlm {
        channel: Option<ChannelCode>,
        value: Option<f64>,
    },
    Switch {
        number: Option<u8>,
        action: Option<SwitchAction>,
    },
    Status,
    Help {
        topic: Option<&'a str>,
    },
}

impl<'a> CommandState<'a> {
    fn new(tag: CommandTag) -> Self {
        match tag {
            CommandTag::Cmd => CommandState::Cmd {
                opcode: None,
                param: None,
            },
            CommandTag::Write => CommandState::Write {
                frame: Frame::new(),
            },
            CommandTag::Read => CommandState::Read,
            CommandTag::Tick => CommandState::Tick { amount: None },
            CommandTag::Time => CommandState::Time,
            CommandTag::Tlm => CommandState::Tlm {
                channel: None,
                value: None,
            },
            CommandTag::Switch => CommandState::Switch {
                number: None,
                action: None,
            },
            CommandTag::Status => CommandState::Status,
            CommandTag::Help => CommandState::Help { topic: None },
        }
    }

    fn apply_value(&mut self, value: SlotValue) -> Result<(), ErrMode<GrammarError<'a>>> {
        match (self, value) {
            (CommandState::Cmd { opcode, .. }, SlotValue::Opcode(raw)) => *opcode = Some(raw),
            (CommandState::Cmd { param, .. }, SlotValue::Param(raw)) => *param = Some(raw),
            (CommandState::Write { frame }, SlotValue::Byte(byte)) => {
                if frame.push(byte).is_err() {
                    return Err(ErrMode::Cut(GrammarError::unexpected(
                        "end of command",
                        None,
                    )));
                }
            }
            (CommandState::Tick { amount }, SlotValue::Interval(interval)) => {
                *amount = Some(interval);
            }
            (CommandState::Tlm { channel, .. }, SlotValue::Channel(code)) => {
                *channel = Some(code);
            }
            (CommandState::Tlm { value: slot, .. }, SlotValue::Reading(reading)) => {
                *slot = Some(reading);
            }
            (CommandState::Switch { number, .. }, SlotValue::Switch(raw)) => *number = Some(raw),
            _ => {
                return Err(ErrMode::Backtrack(GrammarError::unexpected("value", None)));
            }
        }
        Ok(())
    }

    fn apply_choice(&mut self, tag: ChoiceTag) -> Result<(), ErrMode<GrammarError<'a>>> {
        let CommandState::Switch { action, .. } = self else {
            return Err(ErrMode::Backtrack(GrammarError::unexpected("choice", None)));
        };
        *action = Some(match tag {
            ChoiceTag::SwitchOn => SwitchAction::On,
            ChoiceTag::SwitchOff => SwitchAction::Off,
            ChoiceTag::SwitchInitialOn => SwitchAction::InitialOn,
            ChoiceTag::SwitchInitialOff => SwitchAction::InitialOff,
        });
        Ok(())
    }

    fn set_topic(&mut self, topic: Option<&'a str>) {
        if let CommandState::Help { topic: slot } = self {
            *slot = topic;
        }
    }

    fn finish(self) -> Result<Command<'a>, ErrMode<GrammarError<'a>>> {
        match self {
            CommandState::Cmd {
                opcode: Some(opcode),
                param,
            } => Ok(Command::Cmd(CmdCommand { opcode, param })),
            CommandState::Cmd { opcode: None, .. } => Err(ErrMode::Backtrack(
                GrammarError::unexpected("opcode", None),
            )),
            CommandState::Write { frame } if frame.is_empty() => Err(ErrMode::Backtrack(
                GrammarError::unexpected("byte", None),
            )),
            CommandState::Write { frame } => Ok(Command::Write(frame)),
            CommandState::Read => Ok(Command::Read),
            CommandState::Tick { amount } => Ok(Command::Tick(amount)),
            CommandState::Time => Ok(Command::Time),
            CommandState::Tlm { channel, value } => Ok(Command::Tlm(TlmCommand { channel, value })),
            CommandState::Switch {
                number: Some(number),
                action: Some(action),
            } => Ok(Command::Switch(SwitchCommand { number, action })),
            CommandState::Switch { number: None, .. } => Err(ErrMode::Backtrack(
                GrammarError::unexpected("switch number", None),
            )),
            CommandState::Switch { action: None, .. } => Err(ErrMode::Backtrack(
                GrammarError::unexpected("switch action", None),
            )),
            CommandState::Status => Ok(Command::Status),
            CommandState::Help { topic } => Ok(Command::Help(HelpCommand { topic })),
        }
    }
}

fn expect_kind<'src, 'slice>(
    kind: TokenKind,
    label: &'static str,
) -> impl Parser<Input<'src, 'slice>, Token<'src>, GrammarError<'src>>
where
    'src: 'slice,
{
    move |input: &mut Input<'src, 'slice>| match input.split_first() {
        Some((token, rest)) if token.kind == kind => {
            *input = rest;
            Ok(token.clone())
        }
        Some((token, _)) => Err(ErrMode::Backtrack(GrammarError::unexpected(
            label,
            Some(token),
        ))),
        None => Err(ErrMode::Backtrack(GrammarError::unexpected(label, None))),
    }
}

fn parse_unsigned<'a>(token: &Token<'a>) -> Result<u32, GrammarError<'a>> {
    let parsed = match token.kind {
        TokenKind::Hex => u32::from_str_radix(&token.lexeme[2..], 16),
        _ => token.lexeme.parse::<u32>(),
    };
    parsed.map_err(|_| GrammarError::invalid_integer(token))
}

fn parse_byte<'a>(token: &Token<'a>) -> Result<u8, GrammarError<'a>> {
    let value = parse_unsigned(token)?;
    u8::try_from(value).map_err(|_| GrammarError::invalid_integer(token))
}

fn parse_duration<'a>(token: &Token<'a>) -> Result<Duration, GrammarError<'a>> {
    let text = token.lexeme;
    if let Some(rest) = text.strip_suffix("ms") {
        let millis = rest
            .parse::<u32>()
            .map_err(|_| GrammarError::invalid_duration(token))?;
        Ok(Duration::from_millis(millis.into()))
    } else if let Some(rest) = text.strip_suffix('s') {
        let seconds = rest
            .parse::<u32>()
            .map_err(|_| GrammarError::invalid_duration(token))?;
        Ok(Duration::from_secs(seconds.into()))
    } else {
        Err(GrammarError::invalid_duration(token))
    }
}
