// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Keyed, re-armable timers with two catch-up policies.
//!
//! Timers are keyed by string; starting a key that is already armed
//! replaces the old timer. The interval countdown begins on the first
//! frame after arming, so the first fire comes one full interval later.
//!
//! # Catch-up
//!
//! When the frame loop falls behind, a timer with `drop_ticks` set fires
//! once and jumps its next-fire time to `now + interval`, discarding the
//! backlog. Without `drop_ticks`, the callback runs once per whole
//! interval elapsed, replaying the backlog in full.
//!
//! # Mutation during the drain
//!
//! The drain snapshots `(key, arming sequence)` pairs before invoking
//! anything, and re-checks the live table around every invocation, so
//! callbacks may stop any timer (including their own), re-arm keys, or
//! start new timers without the drain skipping, duplicating, or
//! revisiting entries. Timers started during the drain never fire in the
//! same frame.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use core::any::Any;
use core::cell::RefCell;

use crate::surface::Surface;
use crate::time::{Duration, Instant};

use super::Stage;

/// A timer callback. Access the timer's data through
/// [`Stage::timer_data_mut`] under the supplied key.
pub type TimerCallback<S> = Rc<RefCell<dyn FnMut(&mut Stage<S>, &str)>>;

/// One armed timer.
pub(crate) struct Timer<S: Surface> {
    pub(crate) interval: Duration,
    /// Armed on the first drain after [`Stage::start_timer`].
    pub(crate) next_fire: Option<Instant>,
    pub(crate) callback: TimerCallback<S>,
    pub(crate) data: Option<Box<dyn Any>>,
    pub(crate) drop_ticks: bool,
    pub(crate) render_first: bool,
    /// Arming sequence number; a re-armed key gets a fresh one.
    pub(crate) armed: u64,
}

impl<S: Surface> core::fmt::Debug for Timer<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Timer")
            .field("interval", &self.interval)
            .field("next_fire", &self.next_fire)
            .field("drop_ticks", &self.drop_ticks)
            .field("render_first", &self.render_first)
            .finish_non_exhaustive()
    }
}

impl<S: Surface> Stage<S> {
    /// Arms a timer under `key`, replacing any timer already armed for
    /// it. The callback runs every `interval` (clamped to at least one
    /// millisecond); the first run happens one interval after the next
    /// frame.
    ///
    /// `data` is an opaque payload readable through
    /// [`timer_data`](Self::timer_data) and returned by
    /// [`stop_timer`](Self::stop_timer). With `render_first` set, one
    /// full frame renders before the timer becomes eligible to fire.
    pub fn start_timer(
        &mut self,
        key: &str,
        interval: Duration,
        callback: TimerCallback<S>,
        data: Option<Box<dyn Any>>,
        drop_ticks: bool,
        render_first: bool,
    ) {
        self.arm_seq += 1;
        self.timers.insert(
            String::from(key),
            Timer {
                interval: interval.max(Duration::from_millis(1)),
                next_fire: None,
                callback,
                data,
                drop_ticks,
                render_first,
                armed: self.arm_seq,
            },
        );
    }

    /// Stops a timer, returning its data. Unknown keys are a silent
    /// no-op returning `None`.
    pub fn stop_timer(&mut self, key: &str) -> Option<Box<dyn Any>> {
        self.timers.remove(key).and_then(|t| t.data)
    }

    /// Stops every timer.
    pub fn stop_timers(&mut self) {
        self.timers.clear();
    }

    /// Whether a timer is armed under `key`.
    #[must_use]
    pub fn is_timer_started(&self, key: &str) -> bool {
        self.timers.contains_key(key)
    }

    /// Borrows the data of an armed timer.
    #[must_use]
    pub fn timer_data(&self, key: &str) -> Option<&dyn Any> {
        self.timers
            .get(key)
            .and_then(|t| t.data.as_deref())
    }

    /// Mutably borrows the data of an armed timer.
    pub fn timer_data_mut(&mut self, key: &str) -> Option<&mut dyn Any> {
        self.timers
            .get_mut(key)
            .and_then(|t| t.data.as_deref_mut())
    }

    /// Replaces the data of an armed timer, returning the old payload.
    pub fn set_timer_data(
        &mut self,
        key: &str,
        data: Option<Box<dyn Any>>,
    ) -> Option<Box<dyn Any>> {
        let timer = self.timers.get_mut(key)?;
        core::mem::replace(&mut timer.data, data)
    }

    /// Invokes every due timer once per policy. Called from
    /// [`render`](Self::render).
    pub(crate) fn run_timers(&mut self, now: Instant) {
        // Snapshot before invoking anything: a callback that stops,
        // starts, or re-arms timers must not desynchronize the drain.
        let snapshot: alloc::vec::Vec<(String, u64)> = self
            .timers
            .iter()
            .map(|(key, timer)| (key.clone(), timer.armed))
            .collect();

        for (key, armed) in snapshot {
            loop {
                let Some(timer) = self.timers.get_mut(&key) else {
                    break; // stopped by an earlier callback
                };
                if timer.armed != armed {
                    break; // re-armed; the fresh timer waits its interval
                }
                if timer.render_first {
                    timer.render_first = false;
                    break;
                }
                let due = match timer.next_fire {
                    Some(at) => at,
                    None => {
                        timer.next_fire = Some(now + timer.interval);
                        break;
                    }
                };
                if now < due {
                    break;
                }

                let callback = Rc::clone(&timer.callback);
                let interval = timer.interval;
                let drop_ticks = timer.drop_ticks;
                self.tracer.timer_fire(&crate::trace::TimerFireEvent {
                    key: &key,
                    at: now,
                });
                (callback.borrow_mut())(self, &key);

                // The callback may have stopped or replaced this timer.
                let Some(timer) = self.timers.get_mut(&key) else {
                    break;
                };
                if timer.armed != armed {
                    break;
                }
                if drop_ticks {
                    // Discard the backlog in a single jump.
                    timer.next_fire = Some(now + interval);
                    break;
                }
                timer.next_fire = Some(due + interval);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    use super::*;
    use crate::stage::Background;
    use crate::surface::Rgba;
    use crate::testutil::TestSurface;

    fn stage() -> Stage<TestSurface> {
        Stage::new(600, 450, Background::Color(Rgba::BLACK))
    }

    fn noop() -> TimerCallback<TestSurface> {
        Rc::new(RefCell::new(|_: &mut Stage<TestSurface>, _: &str| {}))
    }

    fn counting(counter: Rc<RefCell<u32>>) -> TimerCallback<TestSurface> {
        Rc::new(RefCell::new(move |_: &mut Stage<TestSurface>, _: &str| {
            *counter.borrow_mut() += 1;
        }))
    }

    fn render(stage: &mut Stage<TestSurface>, at: u64) {
        let mut target = TestSurface::create(600, 450);
        let _ = stage.render(&mut target, Instant(at));
    }

    #[test]
    fn starting_twice_keeps_one_timer_with_latest_data() {
        let mut s = stage();
        s.start_timer("k", Duration(100), noop(), Some(Box::new(1_u32)), false, false);
        s.start_timer("k", Duration(100), noop(), Some(Box::new(2_u32)), false, false);
        assert!(s.is_timer_started("k"));
        let data = s.stop_timer("k").expect("data returned");
        assert_eq!(*data.downcast_ref::<u32>().unwrap(), 2);
        assert!(!s.is_timer_started("k"));
        assert!(s.stop_timer("k").is_none(), "second stop is a no-op");
    }

    #[test]
    fn first_fire_waits_one_interval() {
        let fired = Rc::new(RefCell::new(0));
        let mut s = stage();
        s.start_timer("k", Duration(100), counting(fired.clone()), None, false, false);
        render(&mut s, 0); // arms
        render(&mut s, 50);
        assert_eq!(*fired.borrow(), 0);
        render(&mut s, 100);
        assert_eq!(*fired.borrow(), 1);
    }

    #[test]
    fn drop_ticks_fires_once_and_jumps_past_now() {
        let fired = Rc::new(RefCell::new(0));
        let mut s = stage();
        s.start_timer("k", Duration(100), counting(fired.clone()), None, true, false);
        render(&mut s, 0); // arms: due at 100
        render(&mut s, 350);
        assert_eq!(*fired.borrow(), 1, "backlog is discarded");
        assert_eq!(
            s.timers.get("k").unwrap().next_fire,
            Some(Instant(450)),
            "next fire jumps to now + interval"
        );
    }

    #[test]
    fn backlog_replays_without_drop_ticks() {
        let fired = Rc::new(RefCell::new(0));
        let mut s = stage();
        s.start_timer("k", Duration(100), counting(fired.clone()), None, false, false);
        render(&mut s, 0); // arms: due at 100
        render(&mut s, 350);
        assert_eq!(*fired.borrow(), 3, "fires at 100, 200, 300");
        assert_eq!(
            s.timers.get("k").unwrap().next_fire,
            Some(Instant(400)),
            "reschedules by one interval each fire"
        );
    }

    #[test]
    fn callback_can_stop_its_own_timer() {
        let fired = Rc::new(RefCell::new(0));
        let fired2 = fired.clone();
        let cb: TimerCallback<TestSurface> =
            Rc::new(RefCell::new(move |stage: &mut Stage<TestSurface>, key: &str| {
                *fired2.borrow_mut() += 1;
                stage.stop_timer(key);
            }));
        let mut s = stage();
        s.start_timer("once", Duration(100), cb, None, false, false);
        render(&mut s, 0);
        render(&mut s, 1000); // ten intervals of backlog
        assert_eq!(*fired.borrow(), 1, "self-stop ends the replay loop");
        assert!(!s.is_timer_started("once"));
    }

    #[test]
    fn callback_stopping_another_timer_prevents_its_fire() {
        let order: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
        let order_a = order.clone();
        let a: TimerCallback<TestSurface> =
            Rc::new(RefCell::new(move |stage: &mut Stage<TestSurface>, _: &str| {
                order_a.borrow_mut().push("a");
                stage.stop_timer("b");
            }));
        let order_b = order.clone();
        let b: TimerCallback<TestSurface> =
            Rc::new(RefCell::new(move |_: &mut Stage<TestSurface>, _: &str| {
                order_b.borrow_mut().push("b");
            }));
        let mut s = stage();
        // BTreeMap order: "a" drains before "b".
        s.start_timer("a", Duration(100), a, None, false, false);
        s.start_timer("b", Duration(100), b, None, false, false);
        render(&mut s, 0);
        render(&mut s, 100);
        assert_eq!(*order.borrow(), ["a"], "a removed b before it fired");
    }

    #[test]
    fn rearming_from_callback_replaces_without_refiring() {
        let fired = Rc::new(RefCell::new(0));
        let fired2 = fired.clone();
        let cb: TimerCallback<TestSurface> =
            Rc::new(RefCell::new(move |stage: &mut Stage<TestSurface>, key: &str| {
                *fired2.borrow_mut() += 1;
                let key = alloc::string::String::from(key);
                stage.start_timer(
                    &key,
                    Duration(100),
                    Rc::new(RefCell::new(|_: &mut Stage<TestSurface>, _: &str| {})),
                    None,
                    false,
                    false,
                );
            }));
        let mut s = stage();
        s.start_timer("k", Duration(100), cb, None, false, false);
        render(&mut s, 0);
        render(&mut s, 500); // would replay 5 times without the re-arm
        assert_eq!(*fired.borrow(), 1, "re-armed key must not keep replaying");
        assert!(s.is_timer_started("k"));
    }

    #[test]
    fn timer_started_during_drain_fires_next_frame() {
        let fired = Rc::new(RefCell::new(0));
        let fired2 = fired.clone();
        let starter: TimerCallback<TestSurface> =
            Rc::new(RefCell::new(move |stage: &mut Stage<TestSurface>, key: &str| {
                let fired3 = fired2.clone();
                stage.start_timer(
                    "late",
                    Duration(1),
                    Rc::new(RefCell::new(move |_: &mut Stage<TestSurface>, _: &str| {
                        *fired3.borrow_mut() += 1;
                    })),
                    None,
                    false,
                    false,
                );
                let key = alloc::string::String::from(key);
                stage.stop_timer(&key);
            }));
        let mut s = stage();
        s.start_timer("starter", Duration(10), starter, None, true, false);
        render(&mut s, 0);
        render(&mut s, 10); // starter fires, arms "late"
        assert_eq!(*fired.borrow(), 0, "late timer must not fire this frame");
        render(&mut s, 20); // late arms at 20, due 21
        render(&mut s, 30);
        assert_eq!(*fired.borrow(), 1);
    }

    #[test]
    fn render_first_skips_one_frame() {
        let fired = Rc::new(RefCell::new(0));
        let mut s = stage();
        s.start_timer("k", Duration(100), counting(fired.clone()), None, false, true);
        render(&mut s, 0); // consumes render_first
        render(&mut s, 100); // arms: due at 200
        render(&mut s, 200);
        assert_eq!(*fired.borrow(), 1);
    }

    #[test]
    fn timer_data_accessors() {
        let mut s = stage();
        s.start_timer("k", Duration(50), noop(), Some(Box::new(7_i32)), false, false);
        assert_eq!(
            s.timer_data("k").and_then(|d| d.downcast_ref::<i32>()),
            Some(&7)
        );
        if let Some(data) = s.timer_data_mut("k").and_then(|d| d.downcast_mut::<i32>()) {
            *data = 9;
        }
        assert_eq!(
            s.timer_data("k").and_then(|d| d.downcast_ref::<i32>()),
            Some(&9)
        );
        assert!(s.timer_data("missing").is_none());
        s.stop_timers();
        assert!(!s.is_timer_started("k"));
    }
}
