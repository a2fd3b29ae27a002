//! Tick context and prediction scope.
//!
//! The same weapon code runs twice: once speculatively on the client
//! (predicted) and once on the server (authoritative). `TickContext`
//! carries which of the two is running along with the tick and the event
//! queue.

use std::ops::{Deref, DerefMut};

use crate::TICK_RATE;
use crate::core::fixed::Fixed;
use crate::game::events::{CombatEvent, CombatEventData, EventQueue};
use crate::game::timer::TimeSince;

/// Which copy of the simulation is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SimRole {
    /// Server: commits damage, corrects positions
    Authoritative,
    /// Client: speculative, only touches rollbackable state
    Predicted,
}

/// Per-tick state shared by everything simulated in that tick.
#[derive(Debug)]
pub struct TickContext {
    tick: u32,
    tick_rate: u32,
    role: SimRole,
    prediction_enabled: bool,
    events: EventQueue,
}

impl TickContext {
    /// Context for a tick at the default tick rate.
    pub fn new(tick: u32, role: SimRole) -> Self {
        Self::with_tick_rate(tick, role, TICK_RATE)
    }

    /// Context for a tick at a custom tick rate.
    pub fn with_tick_rate(tick: u32, role: SimRole, tick_rate: u32) -> Self {
        Self {
            tick,
            tick_rate,
            role,
            prediction_enabled: true,
            events: EventQueue::new(),
        }
    }

    /// Current tick.
    #[inline]
    pub fn tick(&self) -> u32 {
        self.tick
    }

    /// Ticks per second.
    #[inline]
    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    /// Running role.
    #[inline]
    pub fn role(&self) -> SimRole {
        self.role
    }

    /// Running on the server.
    #[inline]
    pub fn is_authoritative(&self) -> bool {
        self.role == SimRole::Authoritative
    }

    /// Events emitted now will be predicted by clients.
    #[inline]
    pub fn prediction_enabled(&self) -> bool {
        self.prediction_enabled
    }

    /// Seconds since `timer` at the current tick.
    #[inline]
    pub fn elapsed(&self, timer: &TimeSince) -> Fixed {
        timer.elapsed(self.tick, self.tick_rate)
    }

    /// More than `seconds` have passed since `timer`.
    #[inline]
    pub fn has_elapsed(&self, timer: &TimeSince, seconds: Fixed) -> bool {
        timer.exceeds(self.tick, self.tick_rate, seconds)
    }

    /// Emit an event at the current tick.
    pub fn emit(&mut self, data: CombatEventData) {
        let event = CombatEvent::new(self.tick, data, self.prediction_enabled);
        self.events.push(event);
    }

    /// Events emitted so far this tick.
    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    /// Take the events emitted this tick in processing order.
    pub fn take_events(&mut self) -> Vec<CombatEvent> {
        self.events.take()
    }

    /// Turn prediction off until the returned guard is dropped.
    ///
    /// Non-rollbackable side effects (damage) go inside this scope.
    pub fn prediction_off(&mut self) -> PredictionOff<'_> {
        let previous = self.prediction_enabled;
        self.prediction_enabled = false;
        PredictionOff { ctx: self, previous }
    }
}

/// Guard returned by [`TickContext::prediction_off`].
///
/// Restores the previous prediction flag when dropped.
pub struct PredictionOff<'a> {
    ctx: &'a mut TickContext,
    previous: bool,
}

impl Deref for PredictionOff<'_> {
    type Target = TickContext;

    fn deref(&self) -> &TickContext {
        self.ctx
    }
}

impl DerefMut for PredictionOff<'_> {
    fn deref_mut(&mut self) -> &mut TickContext {
        self.ctx
    }
}

impl Drop for PredictionOff<'_> {
    fn drop(&mut self) {
        self.ctx.prediction_enabled = self.previous;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::FIXED_ONE;
    use crate::game::entity::EntityId;

    fn tracer() -> CombatEventData {
        CombatEventData::Tracer {
            start: Default::default(),
            end: Default::default(),
        }
    }

    #[test]
    fn test_prediction_off_restores() {
        let mut ctx = TickContext::new(5, SimRole::Authoritative);
        assert!(ctx.prediction_enabled());
        {
            let mut off = ctx.prediction_off();
            assert!(!off.prediction_enabled());
            off.emit(tracer());

            // Nested scopes restore the outer state, not `true`
            {
                let inner = off.prediction_off();
                assert!(!inner.prediction_enabled());
            }
            assert!(!off.prediction_enabled());
        }
        assert!(ctx.prediction_enabled());
        ctx.emit(tracer());

        let events = ctx.take_events();
        assert!(!events[0].predictable);
        assert!(events[1].predictable);
    }

    #[test]
    fn test_elapsed_uses_tick_rate() {
        let ctx = TickContext::with_tick_rate(120, SimRole::Predicted, 30);
        assert!(!ctx.is_authoritative());
        assert_eq!(ctx.elapsed(&TimeSince::at(90)), FIXED_ONE);
        assert!(ctx.has_elapsed(&TimeSince::at(0), FIXED_ONE));
    }

    #[test]
    fn test_emit_stamps_tick() {
        let mut ctx = TickContext::new(77, SimRole::Predicted);
        ctx.emit(CombatEventData::ReloadStarted {
            shooter: EntityId::new([1; 16]),
            weapon: EntityId::new([2; 16]),
        });
        assert_eq!(ctx.events().len(), 1);
        let events = ctx.take_events();
        assert_eq!(events[0].tick, 77);
        assert_eq!(events[0].entity, Some(EntityId::new([1; 16])));
    }
}
