// Trigger gate: heartbeats pass once per hour, manual triggers always pass.

use chrono::Timelike;

use crate::models::Trigger;

/// True when a recording cycle should run for this trigger.
pub fn should_run(trigger: &Trigger) -> bool {
    match trigger {
        Trigger::Heartbeat(time) => time.minute() == 0,
        Trigger::Manual => true,
    }
}
