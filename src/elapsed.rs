use crate::timer_state::{ActiveTimerState, TimerPhase};

/// Elapsed duration of the active timer at `now_ms`.
///
/// Pure and cheap; the display loop calls it once per frame. A segment start
/// later than `now_ms` (clock moved backwards) contributes nothing, so the
/// result never drops below the accumulated time.
pub fn elapsed(state: Option<&ActiveTimerState>, now_ms: i64) -> u64 {
    match state.map(|s| s.phase) {
        None | Some(TimerPhase::Idle) => 0,
        Some(TimerPhase::Paused { accumulated_ms }) => accumulated_ms,
        Some(TimerPhase::Running {
            accumulated_ms,
            segment_start_ms,
        }) => {
            let segment = now_ms.saturating_sub(segment_start_ms).max(0) as u64;
            accumulated_ms.saturating_add(segment)
        }
    }
}
