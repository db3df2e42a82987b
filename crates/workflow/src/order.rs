//! Relative sequencing of actions inside a pipeline.

use serde::{Deserialize, Serialize};

/// Priority tier of an action. Lower tiers run first.
///
/// ```text
/// First ──► Second ──► Third ──► Fourth ──► Fifth ──► Last
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActionOrder {
    First,
    Second,
    Third,
    Fourth,
    Fifth,
    Last,
}

impl ActionOrder {
    /// Returns the numeric position of this tier.
    pub fn value(&self) -> u32 {
        match self {
            ActionOrder::First => 1,
            ActionOrder::Second => 2,
            ActionOrder::Third => 3,
            ActionOrder::Fourth => 4,
            ActionOrder::Fifth => 5,
            ActionOrder::Last => u32::MAX,
        }
    }
}
