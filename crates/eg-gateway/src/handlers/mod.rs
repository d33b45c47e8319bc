//! HTTP handlers, one module per resource.

pub mod artifacts;
pub mod audit;
pub mod envelopes;
pub mod federation;
pub mod meta;
pub mod notary;
pub mod quorum;
pub mod rooms;
