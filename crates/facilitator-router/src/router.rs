use facilitator_core::{DocumentRequest, DocumentType, MeetingStyle};
use regex::Regex;
use tracing::debug;

use crate::error::{Result, RouterError};
use crate::intent::Intent;

const SILENCE_PHRASES: &[&str] =
    &["please be quiet", "stop interrupting", "we've got this", "we got this", "hold on beat"];

const TIME_QUERY_PHRASES: &[&str] =
    &["how much time", "time left", "what time is it", "how long do we have", "time remaining"];

const SKIP_PHRASES: &[&str] = &["skip this", "move on", "next topic", "next item", "let's skip"];

const END_PHRASES: &[&str] = &["end the meeting", "wrap up now", "adjourn", "let's end this", "end this meeting"];

const OVERRIDE_PHRASES: &[&str] =
    &["keep going", "give us more time", "a few more minutes", "need more time", "more time please"];

const DOCUMENT_CATCH_ALL_PHRASES: &[&str] =
    &["keep a record of", "note down", "make a note", "write this down", "write that down"];

/// Deterministic classifier for participant utterances. Compiled regexes
/// are built once at construction and reused for every call, the way
/// `sven_tools::policy::ToolPolicy` precompiles its glob patterns instead of
/// rebuilding them per decision.
pub struct CommandRouter {
    named_address: Regex,
    attendance: Regex,
    action_items: Regex,
    summary: Regex,
}

impl CommandRouter {
    pub fn new(bot_name: &str) -> Result<Self> {
        let named_address_pattern = format!(r"(?i)(?:^|[^\w@])@?{}\b", regex::escape(bot_name));
        let named_address = compile(&named_address_pattern)?;
        let attendance = compile(r"(?i)\b(attendance|who (?:was|is) (?:here|present)|attendee list)\b")?;
        let action_items = compile(r"(?i)\b(action items?|to-?dos?|task list)\b")?;
        let summary = compile(r"(?i)\b(summary|summarize|summarise|recap)\b")?;

        Ok(Self { named_address, attendance, action_items, summary })
    }

    /// Classifies `text` (a single transcript utterance) into an [`Intent`].
    ///
    /// `style` changes what non-silence intents mean: in `chatting` style
    /// every non-silence utterance is `General` (goes to the LM) regardless
    /// of phrase content; in `gentle`/`moderate` style, structured commands
    /// and freeform questions only classify when the utterance addresses
    /// the bot by name — otherwise it is `General` (not directed at the
    /// bot, no action taken).
    pub fn classify(&self, text: &str, style: MeetingStyle) -> Intent {
        let lower = text.to_lowercase();

        if contains_any(&lower, SILENCE_PHRASES) {
            debug!(text, "router: silence request");
            return Intent::Silence;
        }

        if style == MeetingStyle::Chatting {
            return Intent::General;
        }

        let addressed = self.named_address.is_match(text);
        if !addressed {
            return Intent::General;
        }

        if contains_any(&lower, TIME_QUERY_PHRASES) {
            debug!(text, "router: time query");
            return Intent::TimeQuery;
        }
        if contains_any(&lower, SKIP_PHRASES) {
            debug!(text, "router: skip");
            return Intent::Skip;
        }
        if contains_any(&lower, END_PHRASES) {
            debug!(text, "router: end meeting");
            return Intent::End;
        }
        if contains_any(&lower, OVERRIDE_PHRASES) {
            debug!(text, "router: override");
            return Intent::Override;
        }
        if let Some(request) = self.classify_document_request(text, &lower) {
            debug!(text, slug = %request.slug, "router: document request");
            return Intent::DocumentRequest(request);
        }

        debug!(text, "router: named address, no structured command");
        Intent::NamedAddress
    }

    fn classify_document_request(&self, text: &str, lower: &str) -> Option<DocumentRequest> {
        if self.attendance.is_match(text) {
            return Some(DocumentRequest {
                doc_type: DocumentType::Attendance,
                description: text.to_string(),
                slug: "attendance".to_string(),
            });
        }
        if self.action_items.is_match(text) {
            return Some(DocumentRequest {
                doc_type: DocumentType::ActionItems,
                description: text.to_string(),
                slug: "action-items".to_string(),
            });
        }
        if self.summary.is_match(text) {
            return Some(DocumentRequest {
                doc_type: DocumentType::Summary,
                description: text.to_string(),
                slug: "summary".to_string(),
            });
        }
        if contains_any(lower, DOCUMENT_CATCH_ALL_PHRASES) {
            return Some(DocumentRequest {
                doc_type: DocumentType::Custom,
                description: text.to_string(),
                slug: slugify(text),
            });
        }
        None
    }
}

fn contains_any(lower_text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| lower_text.contains(p))
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| RouterError::InvalidPattern { pattern: pattern.to_string(), source })
}

fn slugify(text: &str) -> String {
    let mut slug = String::new();
    let mut last_was_dash = false;
    for ch in text.to_lowercase().chars() {
        if ch.is_alphanumeric() {
            slug.push(ch);
            last_was_dash = false;
        } else if !last_was_dash && !slug.is_empty() {
            slug.push('-');
            last_was_dash = true;
        }
    }
    let slug = slug.trim_end_matches('-');
    let truncated: String = slug.chars().take(40).collect();
    let truncated = truncated.trim_end_matches('-');
    if truncated.is_empty() {
        "custom-document".to_string()
    } else {
        truncated.to_string()
    }
}
