//! Resilience helpers.
//!
//! Only confirmation polling is retried inside the service. Submissions and
//! blob store calls surface their first failure to the caller.

pub mod backoff;
