//! Ports layer for the Unordered Transaction subsystem.
//!
//! Defines the hexagonal architecture port traits:
//! - Inbound (Driving) ports: API exposed to the admission and commit paths
//! - Outbound (Driven) ports: Dependencies on external systems

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
