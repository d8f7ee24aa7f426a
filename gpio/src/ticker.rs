//! Periodic tick facility.
//!
//! Runs a callback at a fixed period on a dedicated thread for the life of
//! the process. Pacing is by absolute deadline, so a slow callback does not
//! make drift accumulate; it only delays the ticks it overlaps.

use std::thread::{self, JoinHandle, Scope, ScopedJoinHandle};
use std::time::{Duration, Instant};

pub struct Ticker;

impl Ticker {
    /// Spawns the tick thread. The callback runs until process teardown.
    pub fn spawn<F>(period: Duration, tick: F) -> JoinHandle<()>
    where
        F: FnMut() + Send + 'static,
    {
        thread::spawn(move || Self::run(period, tick))
    }

    /// Scoped variant of [Ticker::spawn], for callbacks that own GPIO lines
    /// borrowed from a driver living on the caller's stack.
    pub fn spawn_in<'scope, F>(
        scope: &'scope Scope<'scope, '_>,
        period: Duration,
        tick: F,
    ) -> ScopedJoinHandle<'scope, ()>
    where
        F: FnMut() + Send + 'scope,
    {
        scope.spawn(move || Self::run(period, tick))
    }

    fn run<F: FnMut()>(period: Duration, mut tick: F) -> ! {
        let mut next = Instant::now() + period;
        loop {
            let now = Instant::now();
            if next > now {
                thread::sleep(next - now);
            }
            next += period;
            tick();
        }
    }
}
