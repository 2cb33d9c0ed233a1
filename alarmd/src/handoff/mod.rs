//! Bounded hand-off between the dispatch thread and the consumer

mod ring;

pub use ring::{DEFAULT_CAPACITY, HandoffQueue};
