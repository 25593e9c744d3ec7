// Ambient observability stack: structured logging (`tracing`) and an
// in-process metrics collector, kept from the teacher largely as-is since
// neither carries any domain-specific ("embed-search") identity.

pub mod logging;
pub mod metrics;
