//! Value subscriptions
//!
//! Standing requests owned by one session, evaluated after every step that
//! session asks for. Evaluation order is registration order.

use crate::bridge::Simulation;
use crate::handler::HandlerRegistry;
use crate::protocol::{SubscribeCommand, SubscriptionResult, TraciCmd, UNBOUNDED_TIME};

/// One registered value subscription
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    /// Subscribe opcode; selects the API surface
    pub cmd: TraciCmd,
    pub element_id: String,
    pub variables: Vec<u8>,
    pub begin: f64,
    pub end: f64,
}

impl Subscription {
    /// Whether `time` lies inside the subscription window
    pub fn is_active(&self, time: f64) -> bool {
        let after_begin = self.begin == UNBOUNDED_TIME || time >= self.begin;
        let before_end = self.end == UNBOUNDED_TIME || time <= self.end;
        after_begin && before_end
    }

    /// Whether the window has closed for good
    pub fn is_expired(&self, time: f64) -> bool {
        self.end != UNBOUNDED_TIME && time > self.end
    }
}

impl From<&SubscribeCommand> for Subscription {
    fn from(command: &SubscribeCommand) -> Self {
        Self {
            cmd: command.cmd,
            element_id: command.element_id.clone(),
            variables: command.variables.clone(),
            begin: command.begin,
            end: command.end,
        }
    }
}

/// Subscriptions of one session
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: Vec<Subscription>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subscription> {
        self.entries.iter()
    }

    /// Add a subscription
    ///
    /// An existing subscription for the same `(cmd, element_id)` is replaced
    /// in place and keeps its position. Returns true if one was replaced.
    pub fn register(&mut self, subscription: Subscription) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|s| s.cmd == subscription.cmd && s.element_id == subscription.element_id)
        {
            Some(existing) => {
                *existing = subscription;
                true
            }
            None => {
                self.entries.push(subscription);
                false
            }
        }
    }

    /// Remove the subscription for `(cmd, element_id)`; true if one existed
    pub fn remove(&mut self, cmd: TraciCmd, element_id: &str) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|s| !(s.cmd == cmd && s.element_id == element_id));
        self.entries.len() != before
    }

    /// Evaluate all subscriptions active at the current simulation time
    ///
    /// Expired subscriptions are dropped. Subscriptions whose API surface is
    /// missing from `registry` are skipped.
    pub fn evaluate<S: Simulation>(
        &mut self,
        registry: &HandlerRegistry<S>,
        state: &mut S,
    ) -> Vec<SubscriptionResult> {
        let now = state.sim_time();
        self.entries.retain(|s| !s.is_expired(now));

        let mut results = Vec::with_capacity(self.entries.len());
        for subscription in self.entries.iter().filter(|s| s.is_active(now)) {
            match registry.surface(subscription.cmd) {
                Some(surface) => results.push(surface.subscription_result(
                    &subscription.element_id,
                    &subscription.variables,
                    state,
                )),
                None => tracing::warn!(
                    cmd = subscription.cmd.id(),
                    "no API surface for subscription"
                ),
            }
        }
        results
    }
}
