use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::clock::LoopClock;
use crate::error::{BuildError, BuildResult};
use crate::plant::Plant;
use crate::task::{Outcome, Task};

/// A plant shared between the task engine and whatever else drives it each
/// cycle. Plants are long-lived and owned by the host's runtime; tasks only
/// ever borrow one for the duration of a single `start`/`update` call.
pub type SharedPlant = Rc<RefCell<dyn Plant>>;

// ---------------------------------------------------------------------
// instant
// ---------------------------------------------------------------------

struct Instant<F> {
    action: Option<F>,
}

impl<F: FnMut()> Task for Instant<F> {
    fn start(&mut self, _clock: &LoopClock) {
        if let Some(mut action) = self.action.take() {
            action();
        }
    }
    fn update(&mut self, _clock: &LoopClock) {}
    fn is_complete(&self) -> bool {
        true
    }
    fn outcome(&self) -> Outcome {
        Outcome::Success
    }
}

/// Runs `action` once in `start`, completing with `SUCCESS` immediately.
pub fn instant<F: FnMut() + 'static>(action: F) -> Box<dyn Task> {
    Box::new(Instant { action: Some(action) })
}

/// Sets `plant`'s target once, as an `instant`.
pub fn set_instant(plant: SharedPlant, value: f64) -> Box<dyn Task> {
    instant(move || plant.borrow_mut().set_target(value))
}

// ---------------------------------------------------------------------
// wait_for_seconds
// ---------------------------------------------------------------------

struct WaitForSeconds {
    duration: f64,
    elapsed: f64,
    complete: bool,
}

impl Task for WaitForSeconds {
    fn start(&mut self, _clock: &LoopClock) {
        self.elapsed = 0.0;
        self.complete = self.elapsed >= self.duration;
    }
    fn update(&mut self, clock: &LoopClock) {
        if self.complete {
            return;
        }
        self.elapsed += clock.dt();
        if self.elapsed >= self.duration {
            self.complete = true;
        }
    }
    fn is_complete(&self) -> bool {
        self.complete
    }
    fn outcome(&self) -> Outcome {
        if self.complete {
            Outcome::Success
        } else {
            Outcome::Unknown
        }
    }
}

/// Completes with `SUCCESS` once accumulated `dt` reaches `duration`.
/// `duration == 0` completes in the same cycle as `start`.
pub fn wait_for_seconds(duration: f64) -> Box<dyn Task> {
    debug_assert!(duration >= 0.0, "wait_for_seconds duration must be non-negative");
    Box::new(WaitForSeconds { duration, elapsed: 0.0, complete: false })
}

// ---------------------------------------------------------------------
// wait_until
// ---------------------------------------------------------------------

struct WaitUntil<F> {
    cond: F,
    timeout: Option<f64>,
    elapsed: f64,
    complete: bool,
    outcome: Outcome,
}

impl<F: FnMut() -> bool> Task for WaitUntil<F> {
    fn start(&mut self, _clock: &LoopClock) {
        self.elapsed = 0.0;
        if (self.cond)() {
            self.complete = true;
            self.outcome = Outcome::Success;
        }
    }
    fn update(&mut self, clock: &LoopClock) {
        if self.complete {
            return;
        }
        self.elapsed += clock.dt();
        if (self.cond)() {
            self.complete = true;
            self.outcome = Outcome::Success;
            return;
        }
        if let Some(timeout) = self.timeout {
            if self.elapsed >= timeout {
                self.complete = true;
                self.outcome = Outcome::Timeout;
            }
        }
    }
    fn is_complete(&self) -> bool {
        self.complete
    }
    fn outcome(&self) -> Outcome {
        self.outcome
    }
}

/// Polls `cond` each cycle; `SUCCESS` on true, `TIMEOUT` on exhaustion.
pub fn wait_until<F: FnMut() -> bool + 'static>(cond: F, timeout: Option<f64>) -> Box<dyn Task> {
    Box::new(WaitUntil {
        cond,
        timeout,
        elapsed: 0.0,
        complete: false,
        outcome: Outcome::Unknown,
    })
}

// ---------------------------------------------------------------------
// move_to_setpoint
// ---------------------------------------------------------------------

struct MoveToSetpoint {
    plant: SharedPlant,
    target: f64,
    final_value: Option<f64>,
    timeout: Option<f64>,
    elapsed: f64,
    complete: bool,
    outcome: Outcome,
}

impl MoveToSetpoint {
    fn finish(&mut self, outcome: Outcome) {
        self.complete = true;
        self.outcome = outcome;
        if let Some(final_value) = self.final_value {
            self.plant.borrow_mut().set_target(final_value);
        }
    }
}

impl Task for MoveToSetpoint {
    fn start(&mut self, _clock: &LoopClock) {
        self.elapsed = 0.0;
        self.plant.borrow_mut().set_target(self.target);
        if self.plant.borrow().at_setpoint() {
            self.finish(Outcome::Success);
        }
    }
    fn update(&mut self, clock: &LoopClock) {
        if self.complete {
            return;
        }
        self.elapsed += clock.dt();
        if self.plant.borrow().at_setpoint() {
            self.finish(Outcome::Success);
            return;
        }
        if let Some(timeout) = self.timeout {
            if self.elapsed >= timeout {
                self.finish(Outcome::Timeout);
            }
        }
    }
    fn is_complete(&self) -> bool {
        self.complete
    }
    fn outcome(&self) -> Outcome {
        self.outcome
    }
}

fn move_to_impl(
    plant: SharedPlant,
    target: f64,
    final_value: Option<f64>,
    timeout: Option<f64>,
) -> BuildResult<Box<dyn Task>> {
    if !plant.borrow().has_feedback() {
        return Err(BuildError::FeedbackRequired { context: "move_to requires a feedback-capable plant" });
    }
    Ok(Box::new(MoveToSetpoint {
        plant,
        target,
        final_value,
        timeout,
        elapsed: 0.0,
        complete: false,
        outcome: Outcome::Unknown,
    }))
}

/// Requires `plant.has_feedback()`; completes `SUCCESS` the first cycle
/// `at_setpoint()` holds, `TIMEOUT` on exhaustion.
pub fn move_to(plant: SharedPlant, target: f64, timeout: Option<f64>) -> BuildResult<Box<dyn Task>> {
    move_to_impl(plant, target, None, timeout)
}

/// Like [`move_to`], then sets `final_value` once the move completes
/// (success or timeout).
pub fn move_to_then(
    plant: SharedPlant,
    target: f64,
    final_value: f64,
    timeout: Option<f64>,
) -> BuildResult<Box<dyn Task>> {
    move_to_impl(plant, target, Some(final_value), timeout)
}

// ---------------------------------------------------------------------
// hold_for
// ---------------------------------------------------------------------

struct HoldFor {
    plant: SharedPlant,
    value: f64,
    duration: f64,
    final_value: Option<f64>,
    elapsed: f64,
    complete: bool,
}

impl HoldFor {
    fn finish(&mut self) {
        self.complete = true;
        if let Some(final_value) = self.final_value {
            self.plant.borrow_mut().set_target(final_value);
        }
    }
}

impl Task for HoldFor {
    fn start(&mut self, _clock: &LoopClock) {
        self.elapsed = 0.0;
        self.plant.borrow_mut().set_target(self.value);
        if self.elapsed >= self.duration {
            self.finish();
        }
    }
    fn update(&mut self, clock: &LoopClock) {
        if self.complete {
            return;
        }
        self.elapsed += clock.dt();
        if self.elapsed >= self.duration {
            self.finish();
        }
    }
    fn is_complete(&self) -> bool {
        self.complete
    }
    fn outcome(&self) -> Outcome {
        if self.complete {
            Outcome::Success
        } else {
            Outcome::Unknown
        }
    }
}

fn hold_for_impl(plant: SharedPlant, value: f64, duration: f64, final_value: Option<f64>) -> Box<dyn Task> {
    debug_assert!(duration >= 0.0, "hold_for duration must be non-negative");
    Box::new(HoldFor { plant, value, duration, final_value, elapsed: 0.0, complete: false })
}

/// Sets `value` on `plant` and holds it for `duration` of elapsed cycles.
pub fn hold_for(plant: SharedPlant, value: f64, duration: f64) -> Box<dyn Task> {
    hold_for_impl(plant, value, duration, None)
}

/// Like [`hold_for`], then sets `final_value` once the hold completes.
pub fn hold_for_then(plant: SharedPlant, value: f64, duration: f64, final_value: f64) -> Box<dyn Task> {
    hold_for_impl(plant, value, duration, Some(final_value))
}

// ---------------------------------------------------------------------
// sequence
// ---------------------------------------------------------------------

struct Sequence {
    children: VecDeque<Box<dyn Task>>,
    active: Option<Box<dyn Task>>,
    active_started_cycle: Option<u64>,
    complete: bool,
    outcome: Outcome,
    first_failure: Option<Outcome>,
}

impl Sequence {
    fn advance(&mut self, clock: &LoopClock) {
        loop {
            if let Some(active) = &self.active {
                if !active.is_complete() {
                    return;
                }
                let oc = active.outcome();
                if oc != Outcome::Success && self.first_failure.is_none() {
                    self.first_failure = Some(oc);
                }
            }
            match self.children.pop_front() {
                None => {
                    self.complete = true;
                    self.outcome = self.first_failure.unwrap_or(Outcome::Success);
                    self.active = None;
                    return;
                }
                Some(mut next) => {
                    next.start(clock);
                    self.active = Some(next);
                    self.active_started_cycle = Some(clock.cycle());
                }
            }
        }
    }
}

impl Task for Sequence {
    fn start(&mut self, clock: &LoopClock) {
        self.advance(clock);
    }

    fn update(&mut self, clock: &LoopClock) {
        if self.complete {
            return;
        }
        let should_update_active = match (&self.active, self.active_started_cycle) {
            (Some(active), Some(start_cycle)) => !active.is_complete() && clock.cycle() != start_cycle,
            _ => false,
        };
        if should_update_active {
            if let Some(active) = &mut self.active {
                active.update(clock);
            }
        }
        self.advance(clock);
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn outcome(&self) -> Outcome {
        self.outcome
    }
}

/// Starts child 0; on completion advances to the next child (same-cycle if
/// the prior one completed during its own `start`/`update`). Completes when
/// the last child completes. Outcome is `SUCCESS` iff every child was, else
/// the first non-success outcome. `sequence([])` completes immediately.
pub fn sequence(children: Vec<Box<dyn Task>>) -> Box<dyn Task> {
    Box::new(Sequence {
        children: children.into(),
        active: None,
        active_started_cycle: None,
        complete: false,
        outcome: Outcome::Unknown,
        first_failure: None,
    })
}

// ---------------------------------------------------------------------
// parallel_all
// ---------------------------------------------------------------------

struct ParallelAll {
    children: Vec<Box<dyn Task>>,
    complete: bool,
    outcome: Outcome,
}

impl ParallelAll {
    fn recompute(&mut self) {
        if self.children.iter().all(|c| c.is_complete()) {
            self.complete = true;
            self.outcome = self
                .children
                .iter()
                .map(|c| c.outcome())
                .find(|o| *o != Outcome::Success)
                .unwrap_or(Outcome::Success);
        }
    }
}

impl Task for ParallelAll {
    fn start(&mut self, clock: &LoopClock) {
        for child in &mut self.children {
            child.start(clock);
        }
        self.recompute();
    }

    fn update(&mut self, clock: &LoopClock) {
        if self.complete {
            return;
        }
        for child in &mut self.children {
            if !child.is_complete() {
                child.update(clock);
            }
        }
        self.recompute();
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn outcome(&self) -> Outcome {
        self.outcome
    }
}

/// Starts all children; each non-complete child receives exactly one
/// `update` per outer `update`. Completes when every child is complete.
/// `parallel_all([])` completes immediately.
pub fn parallel_all(children: Vec<Box<dyn Task>>) -> Box<dyn Task> {
    Box::new(ParallelAll { children, complete: false, outcome: Outcome::Unknown })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::PowerOutput;
    use crate::plant::Power;
    use std::cell::Cell;

    fn clock_seq(updates: &[f64]) -> Vec<LoopClock> {
        let mut c = LoopClock::new();
        updates
            .iter()
            .map(|now| {
                c.update(*now);
                c
            })
            .collect()
    }

    #[test]
    fn wait_for_seconds_zero_completes_in_start_cycle() {
        let mut task = wait_for_seconds(0.0);
        let clocks = clock_seq(&[1.0]);
        task.start(&clocks[0]);
        assert!(task.is_complete());
        assert_eq!(task.outcome(), Outcome::Success);
    }

    #[test]
    fn sequence_empty_completes_immediately() {
        let mut task = sequence(vec![]);
        let clocks = clock_seq(&[1.0]);
        task.start(&clocks[0]);
        assert!(task.is_complete());
        assert_eq!(task.outcome(), Outcome::Success);
    }

    #[test]
    fn parallel_all_empty_completes_immediately() {
        let mut task = parallel_all(vec![]);
        let clocks = clock_seq(&[1.0]);
        task.start(&clocks[0]);
        assert!(task.is_complete());
        assert_eq!(task.outcome(), Outcome::Success);
    }

    #[test]
    fn sequence_same_cycle_start_scenario() {
        // §8 scenario 6: instant then wait_for_seconds(0.1); on the cycle
        // the sequence starts, the instant must run and the wait must have
        // received its own start call, without being updated yet.
        let ran = Rc::new(Cell::new(false));
        let ran2 = ran.clone();
        let mut task = sequence(vec![instant(move || ran2.set(true)), wait_for_seconds(0.1)]);
        let clocks = clock_seq(&[1.0]);
        task.start(&clocks[0]);
        assert!(ran.get());
        assert!(!task.is_complete());
    }

    #[test]
    fn sequence_child_not_updated_same_cycle_it_started() {
        let mut task = sequence(vec![wait_for_seconds(0.05)]);
        let clocks = clock_seq(&[1.0, 1.1]);
        task.start(&clocks[0]);
        // same-cycle update (as the TaskRunner does right after popping a
        // freshly started current) must not add dt to the child a second
        // time.
        task.update(&clocks[0]);
        assert!(!task.is_complete());
        task.update(&clocks[1]);
        assert!(task.is_complete());
    }

    #[test]
    fn move_to_rejects_no_feedback_plant() {
        struct NoOp;
        impl PowerOutput for NoOp {
            fn set_power(&mut self, _x: f64) {}
            fn stop(&mut self) {}
        }
        let plant: SharedPlant = Rc::new(RefCell::new(Power::new(NoOp)));
        let err = move_to(plant, 1.0, None);
        assert!(matches!(err, Err(BuildError::FeedbackRequired { .. })));
    }
}
