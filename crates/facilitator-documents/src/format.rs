/// Renders a clock-time value as meeting-relative `MM:SS`, matching the
/// timestamps already used in transcript entries and participant
/// bookkeeping.
pub fn elapsed_mmss(clock_secs: u64, meeting_start: Option<u64>) -> String {
    let elapsed = meeting_start.map(|start| clock_secs.saturating_sub(start)).unwrap_or(clock_secs);
    format!("{:02}:{:02}", elapsed / 60, elapsed % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_relative_to_meeting_start() {
        assert_eq!(elapsed_mmss(1_130, Some(1_000)), "02:10");
    }

    #[test]
    fn falls_back_to_raw_seconds_without_a_start() {
        assert_eq!(elapsed_mmss(75, None), "01:15");
    }
}
