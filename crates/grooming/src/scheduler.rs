//! Update scheduler: bounds per-frame physics and render work.
//!
//! Physics advances one rotating window of `batch_size` strands per tick,
//! so the cost of a tick does not grow with the population. The window is
//! driven by an explicit cursor that advances once per invocation, which
//! keeps the visiting order deterministic.
//!
//! Render rebuilds are throttled by elapsed time since the last rebuild
//! unless the caller forces one.

use std::ops::Range;

use rand::Rng;
use tracing::trace;

use crate::solver::{ConstraintSolver, Environment};
use crate::types::Strand;

/// Outcome of one physics tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicsTick {
    /// Strand indices visited this tick
    pub window: Range<usize>,
    /// Number of strands the solver advanced
    pub simulated: usize,
    /// Whether any visited strand moved
    pub changed: bool,
}

/// Rotating batch cursor and render throttle.
#[derive(Debug, Default, Clone)]
pub struct UpdateScheduler {
    cursor: u64,
    /// Host time of the last render rebuild
    last_render: Option<f32>,
}

impl UpdateScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of physics ticks run so far.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Window of strand indices the current cursor selects.
    ///
    /// The population is split into `ceil(len / batch_size)` buckets and
    /// the cursor picks one of them. The last bucket may be short.
    pub fn batch_window(&self, len: usize, batch_size: usize) -> Range<usize> {
        if len == 0 {
            return 0..0;
        }
        let batch_size = batch_size.max(1);
        let buckets = len.div_ceil(batch_size);
        let bucket = (self.cursor % buckets as u64) as usize;
        let start = bucket * batch_size;
        start..(start + batch_size).min(len)
    }

    /// Advance the strands in the current window and move the cursor on.
    pub fn physics_tick<R: Rng + ?Sized>(
        &mut self,
        strands: &mut [Strand],
        dt: f32,
        env: &Environment,
        solver: &ConstraintSolver,
        batch_size: usize,
        rng: &mut R,
    ) -> PhysicsTick {
        let window = self.batch_window(strands.len(), batch_size);
        self.cursor = self.cursor.wrapping_add(1);

        let mut changed = false;
        for strand in &mut strands[window.clone()] {
            changed |= solver.simulate(strand, dt, env, rng);
        }

        trace!(
            "physics_tick: cursor={} window={:?} changed={}",
            self.cursor,
            window,
            changed
        );

        PhysicsTick {
            simulated: window.len(),
            window,
            changed,
        }
    }

    /// Whether a render rebuild is due at host time `now`.
    pub fn should_render(&self, now: f32, interval: f32, forced: bool) -> bool {
        if forced {
            return true;
        }
        match self.last_render {
            None => true,
            // A clock that jumps backwards counts as due
            Some(last) => now < last || now - last >= interval,
        }
    }

    /// Record a render rebuild at host time `now`.
    pub fn mark_rendered(&mut self, now: f32) {
        self.last_render = Some(now);
    }

    /// Forget render timing so the next check is due.
    pub fn reset_render_timer(&mut self) {
        self.last_render = None;
    }
}
