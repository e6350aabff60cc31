//! Iteration history persistence.

pub mod store;

pub use store::{HistoryContext, HistoryStore, NewIteration};
