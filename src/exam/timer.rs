//! Countdown math for the active section. The controller owns the one-second
//! tick loop; everything here is a pure function of the attempt.

use crate::db::types::SectionId;
use crate::exam::attempt::ExamAttempt;
use crate::exam::catalog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tick {
    /// Paused, terminal or no active section; nothing moved.
    Skipped,
    Advanced { section: SectionId, remaining: u32 },
    /// The budget ran out; the section must be auto-submitted.
    Expired { section: SectionId },
}

/// Budget minus active seconds spent in the section, floored at zero.
pub(crate) fn remaining_seconds(attempt: &ExamAttempt, section: SectionId) -> u32 {
    catalog::spec(section).duration_seconds.saturating_sub(attempt.elapsed_in(section))
}

/// One wall-clock second. Advances both the attempt-wide counter and the
/// active section's elapsed time, never for paused or finished attempts.
pub(crate) fn apply_tick(attempt: &mut ExamAttempt) -> Tick {
    if !attempt.is_in_progress() || attempt.is_paused {
        return Tick::Skipped;
    }
    let Some(section) = attempt.current_section else {
        return Tick::Skipped;
    };

    attempt.time_spent_seconds += 1;
    *attempt.section_time_seconds.entry(section).or_insert(0) += 1;

    let remaining = remaining_seconds(attempt, section);
    if remaining == 0 {
        Tick::Expired { section }
    } else {
        Tick::Advanced { section, remaining }
    }
}
