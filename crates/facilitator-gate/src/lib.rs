//! The Speech Gate: the single chokepoint deciding whether a candidate
//! utterance is actually spoken.
//!
//! Grounded on `skynet-hooks::engine::HookEngine` — an ordered chain of
//! checks, first match wins — but collapsed to a pure function: no
//! registry, no dynamic dispatch, no interior mutability. Every caller goes
//! through `evaluate`, the way every `HookEngine` caller goes through
//! `emit`.

use std::collections::HashSet;

use facilitator_core::{GateResult, MeetingContext, MeetingStyle, Trigger};
use tracing::debug;

/// Fraction of the candidate's word set that must already appear in the
/// recent transcript for the candidate to be judged redundant.
const REDUNDANCY_RATIO: f64 = 0.85;

/// Minimum overtime, in minutes, at which a `Transition` candidate is forced
/// through regardless of an active silence window or override — the agenda
/// must never freeze indefinitely.
const FORCE_TRANSITION_OVERTIME_MINUTES: f64 = 5.0;

/// Evaluates whether `candidate_text` should be spoken, given why it was
/// proposed (`trigger`) and a snapshot of the meeting (`context`).
///
/// Pure: no I/O, no shared state, no side effects. Rules are evaluated in
/// order and the first matching one decides the outcome.
pub fn evaluate(candidate_text: &str, trigger: Trigger, context: &MeetingContext) -> GateResult {
    let result = evaluate_inner(candidate_text, trigger, context);
    debug!(
        trigger = ?result.trigger,
        action = ?result.action,
        reason = result.reason,
        confidence = result.confidence,
        "speech gate decision"
    );
    result
}

fn evaluate_inner(candidate_text: &str, trigger: Trigger, context: &MeetingContext) -> GateResult {
    // Rule 1: empty candidate.
    if candidate_text.trim().is_empty() {
        return GateResult::silent("empty", 1.0, trigger);
    }

    // Rule 2: chatting mode decides everything by itself, before any other
    // rule runs — a silence window or redundant phrase does not matter here.
    if context.style == MeetingStyle::Chatting {
        return match trigger {
            Trigger::Intro | Trigger::DirectQuestion | Trigger::NamedAddress => {
                GateResult::speak(candidate_text, "chatting mode", 1.0, trigger)
            }
            _ => GateResult::silent("chatting mode", 1.0, trigger),
        };
    }

    // Rule 3: silence window.
    if context.silence_active {
        let force_transition =
            trigger == Trigger::Transition && context.meeting_overtime_minutes >= FORCE_TRANSITION_OVERTIME_MINUTES;
        let exempt =
            matches!(trigger, Trigger::Transition | Trigger::WrapUp | Trigger::NamedAddress) || force_transition;
        if !exempt {
            return GateResult::silent("silence window", 1.0, trigger);
        }
    }

    // Rule 4: redundancy.
    if is_redundant(candidate_text, context) {
        return GateResult::silent("redundancy", 1.0, trigger);
    }

    // Rule 5: trigger-specific decision.
    match trigger {
        Trigger::Intro | Trigger::WrapUp | Trigger::NamedAddress | Trigger::DirectQuestion => {
            GateResult::speak(candidate_text, "direct trigger", 1.0, trigger)
        }
        Trigger::TimeWarning => {
            if context.override_active {
                GateResult::silent("override active", 0.0, trigger)
            } else {
                let confidence = elapsed_ratio(context);
                GateResult::speak(candidate_text, "time warning", confidence, trigger)
            }
        }
        Trigger::Transition => {
            if context.meeting_overtime_minutes >= FORCE_TRANSITION_OVERTIME_MINUTES {
                GateResult::speak(candidate_text, "forced transition", 1.0, trigger)
            } else if context.override_active {
                GateResult::silent("override active", 0.0, trigger)
            } else {
                GateResult::speak(candidate_text, "transition", 1.0, trigger)
            }
        }
        Trigger::Tangent => {
            if !context.override_active && context.tangent_confidence >= context.tangent_threshold {
                GateResult::speak(candidate_text, "tangent", context.tangent_confidence, trigger)
            } else {
                GateResult::silent("below tangent threshold", context.tangent_confidence, trigger)
            }
        }
    }

    // Rule 6 (default Silent) is unreachable: every `Trigger` variant is
    // handled above.
}

fn elapsed_ratio(context: &MeetingContext) -> f64 {
    if context.allocated_minutes <= 0.0 {
        return 0.0;
    }
    (context.elapsed_minutes / context.allocated_minutes).clamp(0.0, 1.0)
}

fn is_redundant(candidate_text: &str, context: &MeetingContext) -> bool {
    let candidate_words = word_set(candidate_text);
    if candidate_words.is_empty() {
        return false;
    }

    let transcript_text: String = context
        .recent_transcript
        .iter()
        .map(|entry| entry.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let transcript_words = word_set(&transcript_text);

    let overlap = candidate_words.iter().filter(|w| transcript_words.contains(*w)).count();
    (overlap as f64 / candidate_words.len() as f64) >= REDUNDANCY_RATIO
}

fn word_set(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}
