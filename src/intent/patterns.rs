//! Ordered pattern tables
//!
//! Declaration order is priority order: the first rule that matches wins.
//! Capture groups map positionally onto the rule's slots.

use regex::{Captures, Regex};

use crate::core::error::Result;
use crate::intent::{Entities, IntentKind, Slot};

/// A single regex rule
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub kind: IntentKind,
    pub regex: Regex,
    pub slots: &'static [Slot],
}

impl PatternRule {
    pub fn new(kind: IntentKind, pattern: &str, slots: &'static [Slot]) -> Result<Self> {
        Ok(Self {
            kind,
            regex: Regex::new(pattern)?,
            slots,
        })
    }

    /// Map captures onto slots, skipping empty groups
    pub fn entities(&self, caps: &Captures<'_>) -> Entities {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| {
                let value = caps.get(i + 1)?.as_str().trim();
                let value = value.trim_matches(|c| c == '"' || c == '“' || c == '”');
                (!value.is_empty()).then(|| (*slot, value.to_string()))
            })
            .collect()
    }
}

type RuleSpec = (IntentKind, &'static str, &'static [Slot]);

fn build(specs: &[RuleSpec]) -> Result<Vec<PatternRule>> {
    specs
        .iter()
        .map(|(kind, pattern, slots)| PatternRule::new(*kind, pattern, slots))
        .collect()
}

use IntentKind::*;
use Slot::{App, Contact, Content, Query, Target, Task, Time, Tone, Value};

/// Disable commands that must win over everything else
const OVERRIDES: &[RuleSpec] = &[
    (
        MonitorDisable,
        r"(?i)\b(?:stop|quit|cancel|end)\s+(?:the\s+)?monitoring\b(?:\s+(?:of|on)\b)?\s*(.*)$",
        &[Contact],
    ),
    (
        MonitorDisable,
        r"(?i)\b(?:don'?t|do\s+not)\s+monitor\s+(.+?)\s+(?:anymore|any\s+longer)\b",
        &[Contact],
    ),
    (MonitorDisable, r"(?i)\bunmonitor\s+(.+)$", &[Contact]),
    (
        AutopilotDisable,
        r"(?i)\b(?:stop|quit)\s+(?:replying|responding|answering|chatting|talking)\s+(?:to|with)\s+(.+)$",
        &[Contact],
    ),
    (
        AutopilotDisable,
        r"(?i)\b(?:don'?t|do\s+not)\s+(?:reply|respond|answer)\s+(?:to\s+)?(.+?)\s+(?:anymore|any\s+longer)\b",
        &[Contact],
    ),
    (
        AutopilotDisable,
        r"(?i)\b(?:disable|turn\s+off|deactivate|stop)\s+(?:the\s+)?(?:autopilot|auto[-\s]?repl(?:y|ies)|automatic\s+replies)(?:\s+(?:for|with|to)\s+(.+))?$",
        &[Contact],
    ),
];

/// Send patterns, also used to pull entities for the send fast path
const SEND: &[RuleSpec] = &[
    (
        SendMessage,
        r"(?i)\b(?:tell|let)\s+(.+?)\s+(?:know\s+)?that\s+(.+)$",
        &[Contact, Content],
    ),
    (
        SendMessage,
        r"(?i)\b(?:send|write)\s+(?:a\s+|an\s+)?(?:message|msg|text|note)\s+to\s+(.+?)\s+(?:saying|that\s+says|telling\s+(?:him|her|them)|that)\s+(.+)$",
        &[Contact, Content],
    ),
    (
        SendMessage,
        r"(?i)\b(?:send|write|text|message)\s+(?:(?:a\s+|an\s+)?(?:message|msg|text|note)\s+)?to\s+(.+?)\s*:\s*(.+)$",
        &[Contact, Content],
    ),
    (
        SendMessage,
        r"(?i)^(?:please\s+)?(?:message|text)\s+(.+?)\s+(?:that|saying)\s+(.+)$",
        &[Contact, Content],
    ),
    (
        SendMessage,
        r"(?i)^(?:please\s+)?(?:(?:can|could|would)\s+you\s+)?(?:send|text|message|write)\s+(.+?)\s+(?:a|an)\s+(?:message|msg|text|note)\b\s*(.*)$",
        &[Contact, Content],
    ),
    (
        SendMessage,
        r"(?i)\b(?:send|write)\s+(?:a\s+|an\s+)?(?:\w+\s+)?(?:message|msg|text|note)\s+(?:.*?\s)?(?:to|for)\s+(.+)$",
        &[Contact],
    ),
    (
        SendMessage,
        r"(?i)^(?:please\s+)?(?:message|text|ping)\s+(\S+)\s+(.+)$",
        &[Contact, Content],
    ),
    (
        SendMessage,
        r"(?i)^(?:please\s+)?(?:message|text|ping|write\s+to|send\s+to)\s+(.+)$",
        &[Contact],
    ),
];

/// Main table, after the send block
const TABLE_HEAD: &[RuleSpec] = &[
    (
        AutopilotEnable,
        r"(?i)\b(?:enable|turn\s+on|activate|start)\s+(?:the\s+)?(?:autopilot|auto[-\s]?repl(?:y|ies)|automatic\s+replies)\s+(?:for|with|to)\s+(.+?)(?:\s+(?:in\s+a|with\s+a)\s+(\w+)\s+tone)?$",
        &[Contact, Tone],
    ),
    (
        AutopilotEnable,
        r"(?i)\b(?:reply|respond|answer)\s+(?:to\s+)?(.+?)\s+(?:for\s+me|on\s+my\s+behalf|automatically)\b",
        &[Contact],
    ),
    (
        AutopilotEnable,
        r"(?i)\b(?:chat|talk)\s+with\s+(.+?)\s+(?:for\s+me|on\s+my\s+behalf|while\s+i'?m\s+(?:away|busy|out))",
        &[Contact],
    ),
    (
        AutopilotEnable,
        r"(?i)\bkeep\s+(.+?)\s+(?:entertained|company)\b",
        &[Contact],
    ),
    (
        AutopilotStatus,
        r"(?i)\b(?:is|are)\s+(?:the\s+)?(?:autopilot|auto[-\s]?repl(?:y|ies))\s+(?:on|active|enabled|running)\b(?:\s+(?:for|with)\s+(.+))?",
        &[Contact],
    ),
    (
        AutopilotStatus,
        r"(?i)\b(?:autopilot|auto[-\s]?reply)\s+status\b",
        &[],
    ),
    (
        AutopilotStatus,
        r"(?i)\bwho\s+are\s+you\s+(?:auto[-\s]?)?(?:replying|answering|responding)\s+to\b",
        &[],
    ),
    (
        AutopilotSetTone,
        r"(?i)\b(?:change|set|switch)\s+(?:the\s+)?(?:autopilot\s+|auto[-\s]?reply\s+)?tone\s+(?:for|with)\s+(.+?)\s+to\s+(\w+)",
        &[Contact, Tone],
    ),
    (
        MonitorStatus,
        r"(?i)\b(?:which|what|whose)\s+(?:chats?|conversations?|contacts?)\s+(?:are\s+you|you're|you\s+are)\s+monitoring\b",
        &[],
    ),
    (
        MonitorStatus,
        r"(?i)\bwho\s+(?:are\s+you|you're)\s+monitoring\b",
        &[],
    ),
    (
        MonitorStatus,
        r"(?i)\bare\s+you\s+monitoring\s+(.+?)\??$",
        &[Contact],
    ),
];

const TABLE_TAIL: &[RuleSpec] = &[
    (
        CheckMessages,
        r"(?i)\b(?:check|any|do\s+i\s+have|got\s+any)\s+(?:my\s+)?(?:new\s+)?(?:messages|texts|msgs)\b",
        &[],
    ),
    (
        CheckMessages,
        r"(?i)\b(?:did|has)\s+(.+?)\s+(?:reply|replied|answer|answered|respond|responded|text|texted|write|written|message|messaged)\b",
        &[Contact],
    ),
    (
        ReadHistory,
        r"(?i)\b(?:read|show|open|see)\s+(?:me\s+)?(?:the\s+|my\s+)?(?:last\s+|latest\s+|recent\s+)?(?:messages|chat|conversation|texts|history)\s+(?:from|with|of)\s+(.+)$",
        &[Contact],
    ),
    (
        ReadHistory,
        r"(?i)\b(?:read|show|see)\s+(?:me\s+)?(his|her|their)\s+(?:messages|chat|conversation|texts)\b",
        &[Contact],
    ),
    (
        ReadHistory,
        r"(?i)\b(?:read|show|see)\s+(?:me\s+)?(.+?)'s\s+(?:messages|chat|conversation|texts)\b",
        &[Contact],
    ),
    (
        ReadHistory,
        r"(?i)\bwhat\s+did\s+(.+?)\s+(?:say|send|write)\b",
        &[Contact],
    ),
    (
        Monitor,
        r"(?i)\b(?:monitor|watch|keep\s+an\s+eye\s+on)\s+(?:the\s+)?(?:chat|conversation|messages)\s+(?:of|with|from)\s+(.+)$",
        &[Contact],
    ),
    (
        Monitor,
        r"(?i)\b(?:monitor|watch|keep\s+an\s+eye\s+on)\s+(his|her|their)\s+(?:chat|conversation|messages)\b",
        &[Contact],
    ),
    (
        Monitor,
        r"(?i)\b(?:monitor|watch|keep\s+an\s+eye\s+on)\s+(.+?)(?:'s)?\s+(?:chat|conversation|messages)\b",
        &[Contact],
    ),
    (
        Monitor,
        r"(?i)\bstart\s+monitoring\s+(.+)$",
        &[Contact],
    ),
    (
        Monitor,
        r"(?i)\b(?:let|notify|tell)\s+me\s+(?:know\s+)?(?:when|if)\s+(.+?)\s+(?:messages|texts|writes|replies)\b",
        &[Contact],
    ),
    (
        Monitor,
        r"(?i)\b(?:monitor|keep\s+an\s+eye\s+on)\s+(.+)$",
        &[Contact],
    ),
    (
        Reply,
        r"(?i)\b(?:reply|respond|answer)\s+(?:to\s+)?(.+?)\s+(?:saying|with)\s+(.+)$",
        &[Contact, Content],
    ),
    (
        Reply,
        r"(?i)\b(?:reply|respond|answer)\s+(?:to\s+)?(.+?)\s*:\s*(.+)$",
        &[Contact, Content],
    ),
    (
        Reply,
        r"(?i)^(?:please\s+)?(?:reply|respond|answer)\s+(?:to\s+)?(.+)$",
        &[Contact],
    ),
    (
        Capabilities,
        r"(?i)\bwhat\s+(?:can|could)\s+you\s+do\b",
        &[],
    ),
    (
        Capabilities,
        r"(?i)\b(?:your|list\s+(?:your|the))\s+(?:capabilities|features|functions|skills)\b",
        &[],
    ),
    (
        Capabilities,
        r"(?i)\bhow\s+can\s+you\s+help\b|^help[!.?]*$",
        &[],
    ),
    (
        Reminder,
        r"(?i)\bremind\s+me\s+(?:to\s+|about\s+)?(.+?)\s+((?:at|in|on)\s+.+|tomorrow.*|tonight.*)$",
        &[Task, Time],
    ),
    (
        Reminder,
        r"(?i)\bremind\s+me\s+(?:to\s+|about\s+)?(.+)$",
        &[Task],
    ),
    (
        Reminder,
        r"(?i)\b(?:set|create|add)\s+(?:a\s+)?reminder\s+(?:to\s+|for\s+|about\s+)?(.+)$",
        &[Task],
    ),
    (
        Alarm,
        r"(?i)\b(?:set|create)\s+(?:an\s+)?alarm\s+(?:for\s+|at\s+)?(.+)$",
        &[Time],
    ),
    (
        Alarm,
        r"(?i)\bwake\s+me\s+(?:up\s+)?(?:at\s+)?(.+)$",
        &[Time],
    ),
    (
        Schedule,
        r"(?i)\bwhat(?:'s|\s+is)\s+(?:on\s+)?my\s+(?:schedule|calendar|agenda)\b",
        &[],
    ),
    (
        Schedule,
        r"(?i)\b(?:add|put)\s+(.+?)\s+(?:to|on|in)\s+my\s+calendar\b",
        &[Task],
    ),
    (
        Schedule,
        r"(?i)\b(?:schedule|book)\s+(?:a\s+|an\s+)?(.+)$",
        &[Task],
    ),
    (
        Translation,
        r"(?i)\btranslate\s+(.+?)\s+(?:to|into)\s+(\w+)[.!?]*$",
        &[Content, Target],
    ),
    (
        Translation,
        r"(?i)\bhow\s+do\s+(?:you|i)\s+say\s+(.+?)\s+in\s+(\w+)",
        &[Content, Target],
    ),
    (
        ConversationQuestion,
        r"(?i)\bwhat\s+(?:did|do)\s+(?:i|we)\s+(?:say|talk\s+about|discuss)\b",
        &[],
    ),
    (
        ConversationQuestion,
        r"(?i)\bwhat\s+were\s+we\s+talking\s+about\b|\bdo\s+you\s+remember\b",
        &[],
    ),
    (
        Search,
        r"(?i)\b(?:search|google|look\s+up)\s+(?:for\s+)?(.+)$",
        &[Query],
    ),
    (
        Search,
        r"(?i)\bfind\s+(?:information|info|out)\s+(?:about|on)\s+(.+)$",
        &[Query],
    ),
    (
        Search,
        r"(?i)^who\s+(?:is|was)\s+(.+?)\??$",
        &[Query],
    ),
    (
        Weather,
        r"(?i)\b(?:weather|forecast)\b(?:.*?\b(?:in|for|at)\s+([a-z][a-z\s]*?))?[?.!]*$",
        &[Target],
    ),
    (
        Weather,
        r"(?i)\bis\s+it\s+(?:going\s+to\s+)?(?:rain|snow|be\s+sunny|be\s+cold|be\s+hot)",
        &[],
    ),
    (
        News,
        r"(?i)\b(?:news|headlines)\b(?:\s+(?:about|on)\s+(.+?))?[?.!]*$",
        &[Query],
    ),
    (
        FileOperation,
        r"(?i)\b(?:open|create|delete|move|copy|rename|find)\s+(?:the\s+|a\s+)?(?:file|folder|directory|document)\s+(.+)$",
        &[Target],
    ),
    (
        FileOperation,
        r"(?i)\b(?:list|show)\s+(?:me\s+)?(?:the\s+)?files\b(?:\s+in\s+(.+))?",
        &[Target],
    ),
    (
        SystemInfo,
        r"(?i)\b(?:cpu|memory|ram|disk|battery)\s+(?:usage|status|level|space)\b|\bsystem\s+(?:info|information|status)\b",
        &[],
    ),
    (
        SystemInfo,
        r"(?i)\bhow\s+much\s+(?:memory|ram|disk\s+space|battery)\b",
        &[],
    ),
    (
        SystemCommand,
        r"(?i)\b(?:shut\s*down|restart|reboot|lock|sleep|hibernate)\s+(?:the\s+)?(?:computer|pc|system|machine|screen)\b",
        &[],
    ),
    (
        SystemCommand,
        r"(?i)\b(?:run|execute)\s+(?:the\s+)?(?:command|script)\s+(.+)$",
        &[Value],
    ),
    (
        SystemCommand,
        r"(?i)\b(?:turn|set)\s+(?:the\s+)?volume\s+(?:up|down|to\s+(\d+))",
        &[Value],
    ),
    (
        AppControl,
        r"(?i)\b(?:open|launch|start|close|quit|kill)\s+(?:the\s+)?(?:app\s+|application\s+|program\s+)?([\w\s]+?)(?:\s+app)?[?.!]*$",
        &[App],
    ),
    (
        Greeting,
        r"(?i)^(?:hi|hello|hey|howdy|good\s+(?:morning|afternoon|evening))(?:\s+there)?(?:[\s,]+\w+)?[\s!.]*$",
        &[],
    ),
    (
        Thanks,
        r"(?i)\b(?:thanks|thank\s+you|thx|cheers|much\s+appreciated)\b",
        &[],
    ),
    (
        Farewell,
        r"(?i)^(?:bye|goodbye|see\s+you|good\s*night|farewell)\b",
        &[],
    ),
];

/// Categories checked after the main table, in no particular order
const SECONDARY: &[RuleSpec] = &[
    (
        Sentiment,
        r"(?i)\bi(?:'m|\s+am)\s+(?:feeling\s+|so\s+|really\s+)?(sad|happy|tired|stressed|anxious|angry|lonely|bored|excited)\b",
        &[Value],
    ),
    (Sentiment, r"(?i)\bi\s+feel\s+(\w+)", &[Value]),
    (
        Productivity,
        r"(?i)\badd\s+(.+?)\s+to\s+my\s+(?:to-?do|task)\s+list\b",
        &[Task],
    ),
    (
        Productivity,
        r"(?i)\b(?:to-?do\s+list|task\s+list|pomodoro|focus\s+(?:mode|session))\b",
        &[],
    ),
    (
        Backup,
        r"(?i)\bback\s*up\s+(?:my\s+)?(.+?)[.!]*$",
        &[Target],
    ),
    (
        Automation,
        r"(?i)\b(?:every\s+(?:day|morning|night|hour|week)|automate|routine)\b",
        &[],
    ),
];

/// Keyword containment fallback
pub const KEYWORDS: &[(IntentKind, &[&str])] = &[
    (Reminder, &["reminder", "remind"]),
    (Alarm, &["alarm"]),
    (Schedule, &["calendar", "meeting", "appointment", "schedule"]),
    (Weather, &["weather", "rain", "forecast", "temperature"]),
    (News, &["news", "headline", "headlines"]),
    (Search, &["search", "google", "look up"]),
    (FileOperation, &["file", "files", "folder", "directory"]),
    (Translation, &["translate", "translation"]),
    (ReadHistory, &["history", "conversation with"]),
    (CheckMessages, &["messages", "inbox", "whatsapp"]),
    (Monitor, &["monitor", "monitoring"]),
];

pub fn overrides() -> Result<Vec<PatternRule>> {
    build(OVERRIDES)
}

pub fn send_rules() -> Result<Vec<PatternRule>> {
    build(SEND)
}

/// The main ordered table: autopilot and monitor status first, then sends,
/// then everything else
pub fn table() -> Result<Vec<PatternRule>> {
    let mut rules = build(TABLE_HEAD)?;
    rules.extend(build(SEND)?);
    rules.extend(build(TABLE_TAIL)?);
    Ok(rules)
}

pub fn secondary() -> Result<Vec<PatternRule>> {
    build(SECONDARY)
}
