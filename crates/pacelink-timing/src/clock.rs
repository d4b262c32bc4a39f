use once_cell::sync::OnceCell;

pub type Clock = quanta::Clock;

static MONOTONIC: OnceCell<Clock> = OnceCell::new();

/// Process-wide monotonic clock. The first call pins the quanta calibration;
/// every timestamp in this process comes off the same source.
#[inline]
pub fn monotonic_clock() -> &'static Clock {
    MONOTONIC.get_or_init(Clock::new)
}

/// Nanoseconds on the monotonic clock. The origin is arbitrary but fixed for
/// the process lifetime, so values are comparable within a process only.
#[inline]
pub(crate) fn monotonic_now_ns() -> u64 {
    let clock = monotonic_clock();
    clock.delta_as_nanos(0, clock.raw())
}
