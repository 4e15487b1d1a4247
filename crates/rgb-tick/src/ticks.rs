//! Tick arithmetic.

use std::time::Duration;

/// Duration of one server tick (20 ticks per second).
pub const TICK_DURATION: Duration = Duration::from_millis(50);

/// Clamp a caller-supplied tick count to the minimum schedulable unit.
///
/// Region lanes cannot run anything "now": zero and negative counts become 1.
#[inline]
#[must_use]
pub const fn at_least_one_tick(ticks: i64) -> u64 {
    if ticks <= 0 { 1 } else { ticks as u64 }
}

/// Wall-clock length of `ticks` ticks.
#[inline]
#[must_use]
pub fn ticks_to_duration(ticks: u64, tick: Duration) -> Duration {
    tick.saturating_mul(u32::try_from(ticks).unwrap_or(u32::MAX))
}

/// Number of ticks needed to cover `duration`, rounded up, at least 1.
#[must_use]
pub fn duration_to_ticks(duration: Duration, tick: Duration) -> u64 {
    let tick_nanos = tick.as_nanos().max(1);
    let ticks = duration.as_nanos().div_ceil(tick_nanos);
    u64::try_from(ticks).unwrap_or(u64::MAX).max(1)
}
