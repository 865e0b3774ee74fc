//! Internal implementation details.

pub(crate) mod circular;

pub(crate) use circular::{resolving_keys, StackGuard};
