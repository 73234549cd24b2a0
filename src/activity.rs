//! OS power-management activity hints (spec §4.9, Design Notes §9).
//!
//! The source application keeps the process awake by taking a scoped
//! "begin/end activity" token around the whole job and around each file.
//! No platform integration ships in this crate — there is no teacher or
//! pack precedent for a power-management API — so [`NoOpActivity`] is the
//! only implementation; callers that run on a platform with a real API can
//! implement [`ActivityHint`] themselves.

/// A capability for signalling "don't let the system sleep" to the host OS.
/// `acquire` returns a guard; dropping the guard releases the hint.
pub trait ActivityHint: Send + Sync {
    fn acquire(&self, reason: &str) -> Box<dyn ActivityGuard>;
}

/// RAII guard for one in-flight activity hint.
pub trait ActivityGuard: Send {}

/// The default, always-available no-op implementation.
pub struct NoOpActivity;

struct NoOpGuard;
impl ActivityGuard for NoOpGuard {}

impl ActivityHint for NoOpActivity {
    fn acquire(&self, _reason: &str) -> Box<dyn ActivityGuard> {
        Box::new(NoOpGuard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_op_activity_can_be_acquired_and_dropped_without_effect() {
        let activity = NoOpActivity;
        let guard = activity.acquire("job");
        drop(guard);
    }
}
