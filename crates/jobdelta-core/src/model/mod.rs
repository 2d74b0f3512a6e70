pub mod catalog;
pub mod change_order;
pub mod job;

pub use catalog::{Attribute, Choice, DecisionPointType, JobOption, Location};
pub use change_order::{ChangeOrder, ChangeOrderKind, ChangeOrderStatus};
pub use job::{Buyer, CommittedState, DesiredState, EffectiveState, JobState, NonStandardOption};
