use facilitator_core::{config::TangentThresholds, MeetingStyle};

/// Per-style numbers that are not operator-configurable: how long a tangent
/// has to run before the assessor is even consulted, and whether tangent
/// checks apply at all.
///
/// The confidence threshold itself *is* configurable (`TangentThresholds`),
/// so it is passed in rather than baked into this table.
#[derive(Debug, Clone, Copy)]
pub struct StyleProfile {
    /// Seconds of continuous off-topic talk before a tangent check fires.
    /// `None` for `chatting`, which never runs tangent checks.
    pub tangent_tolerance_secs: Option<u64>,
    /// Confidence the Tangent Assessor must clear for the gate to speak.
    /// `None` for `chatting`.
    pub tangent_threshold: Option<f64>,
}

impl StyleProfile {
    pub fn for_style(style: MeetingStyle, thresholds: &TangentThresholds) -> Self {
        match style {
            MeetingStyle::Gentle => Self {
                tangent_tolerance_secs: Some(120),
                tangent_threshold: Some(thresholds.gentle),
            },
            MeetingStyle::Moderate => Self {
                tangent_tolerance_secs: Some(60),
                tangent_threshold: Some(thresholds.moderate),
            },
            MeetingStyle::Chatting => {
                Self { tangent_tolerance_secs: None, tangent_threshold: None }
            }
        }
    }

    pub fn tangent_checks_enabled(&self) -> bool {
        self.tangent_tolerance_secs.is_some()
    }
}
