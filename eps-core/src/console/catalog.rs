//! Console grammar expressed as a static tree.
//!
//! The parser and completion engine interpret the same structure, so command
//! keywords, value slots and switch actions stay in sync.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandTag {
    Cmd,
    Write,
    Read,
    Tick,
    Time,
    Tlm,
    Switch,
    Status,
    Help,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChoiceTag {
    SwitchOn,
    SwitchOff,
    SwitchInitialOn,
    SwitchInitialOff,
}

/// Value slot accepted at a grammar position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueSpec {
    /// Opcode name (`get-version`) or raw opcode number.
    Opcode,
    /// Command parameter (decimal or `0x` hex).
    Param,
    /// Single frame byte.
    Byte,
    /// Duration literal (`500ms`, `2s`) or a tick count.
    Interval,
    /// Channel name (`VBCR1`) or numeric channel code.
    Channel,
    /// Analog value (integer or decimal, optionally negative).
    Reading,
    /// One-based switch number.
    Switch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HelpTopics {
    None,
    Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub tag: CommandTag,
    pub grammar: &'static Node,
    pub help: HelpTopics,
    pub usage: &'static str,
    pub summary: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Node {
    End,
    /// Required keyword selecting one branch.
    Choice(&'static [ChoiceBranch]),
    Value {
        spec: ValueSpec,
        optional: bool,
        next: &'static Node,
    },
    /// One or more values of the same kind, up to `max`.
    Repeat { spec: ValueSpec, max: usize },
    Topic {
        topics: HelpTopics,
        next: &'static Node,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChoiceBranch {
    pub keyword: &'static str,
    pub tag: ChoiceTag,
    pub next: &'static Node,
}

/// Largest raw frame accepted by `write`.
pub const MAX_WRITE_BYTES: usize = 8;

const END: Node = Node::End;

const CMD_PARAM: Node = Node::Value {
    spec: ValueSpec::Param,
    optional: true,
    next: &END,
};

const CMD_GRAMMAR: Node = Node::Value {
    spec: ValueSpec::Opcode,
    optional: false,
    next: &CMD_PARAM,
};

const WRITE_GRAMMAR: Node = Node::Repeat {
    spec: ValueSpec::Byte,
    max: MAX_WRITE_BYTES,
};

const TICK_GRAMMAR: Node = Node::Value {
    spec: ValueSpec::Interval,
    optional: true,
    next: &END,
};

const TLM_VALUE: Node = Node::Value {
    spec: ValueSpec::Reading,
    optional: true,
    next: &END,
};

const TLM_GRAMMAR: Node = Node::Value {
    spec: ValueSpec::Channel,
    optional: true,
    next: &TLM_VALUE,
};

const SWITCH_CHOICES: [ChoiceBranch; 4] = [
    ChoiceBranch {
        keyword: "on",
        tag: ChoiceTag::SwitchOn,
        next: &END,
    },
    ChoiceBranch {
        keyword: "off",
        tag: ChoiceTag::SwitchOff,
        next: &END,
    },
    ChoiceBranch {
        keyword: "initial-on",
        tag: ChoiceTag::SwitchInitialOn,
        next: &END,
    },
    ChoiceBranch {
        keyword: "initial-off",
        tag: ChoiceTag::SwitchInitialOff,
        next: &END,
    },
];

const SWITCH_ACTION: Node = Node::Choice(&SWITCH_CHOICES);

const SWITCH_GRAMMAR: Node = Node::Value {
    spec: ValueSpec::Switch,
    optional: false,
    next: &SWITCH_ACTION,
};

const HELP_GRAMMAR: Node = Node::Topic {
    topics: HelpTopics::Commands,
    next: &END,
};

const COMMANDS: [CommandSpec; 9] = [
    CommandSpec {
        name: "cmd",
        tag: CommandTag::Cmd,
        grammar: &CMD_GRAMMAR,
        help: HelpTopics::None,
        usage: "cmd <name|opcode> [value]",
        summary: "send a protocol command and read its response",
    },
    CommandSpec {
        name: "write",
        tag: CommandTag::Write,
        grammar: &WRITE_GRAMMAR,
        help: HelpTopics::None,
        usage: "write <byte>...",
        summary: "send a raw frame of up to 8 bytes",
    },
    CommandSpec {
        name: "read",
        tag: CommandTag::Read,
        grammar: &END,
        help: HelpTopics::None,
        usage: "read",
        summary: "re-read the buffered response",
    },
    CommandSpec {
        name: "tick",
        tag: CommandTag::Tick,
        grammar: &TICK_GRAMMAR,
        help: HelpTopics::None,
        usage: "tick [<duration>|<ticks>]",
        summary: "advance simulated time",
    },
    CommandSpec {
        name: "time",
        tag: CommandTag::Time,
        grammar: &END,
        help: HelpTopics::None,
        usage: "time",
        summary: "show simulated time",
    },
    CommandSpec {
        name: "tlm",
        tag: CommandTag::Tlm,
        grammar: &TLM_GRAMMAR,
        help: HelpTopics::None,
        usage: "tlm [<channel>] [<value>]",
        summary: "list, show or set telemetry channels",
    },
    CommandSpec {
        name: "switch",
        tag: CommandTag::Switch,
        grammar: &SWITCH_GRAMMAR,
        help: HelpTopics::None,
        usage: "switch <1-10> on|off|initial-on|initial-off",
        summary: "change a PDM switch as an operator would",
    },
    CommandSpec {
        name: "status",
        tag: CommandTag::Status,
        grammar: &END,
        help: HelpTopics::None,
        usage: "status",
        summary: "display board state",
    },
    CommandSpec {
        name: "help",
        tag: CommandTag::Help,
        grammar: &HELP_GRAMMAR,
        help: HelpTopics::Commands,
        usage: "help [topic]",
        summary: "show help for a command",
    },
];

/// Returns the full command catalog.
#[must_use]
pub const fn commands() -> &'static [CommandSpec] {
    &COMMANDS
}

/// Looks up a command by its tag.
#[must_use]
pub fn command(tag: CommandTag) -> &'static CommandSpec {
    match tag {
        CommandTag::Cmd => &COMMANDS[0],
        CommandTag::Write => &COMMANDS[1],
        CommandTag::Read => &COMMANDS[2],
        CommandTag::Tick => &COMMANDS[3],
        CommandTag::Time => &COMMANDS[4],
        CommandTag::Tlm => &COMMANDS[5],
        CommandTag::Switch => &COMMANDS[6],
        CommandTag::Status => &COMMANDS[7],
        CommandTag::Help => &COMMANDS[8],
    }
}

/// Finds a command by name (case insensitive).
#[must_use]
pub fn find(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}
