//! # Application Service Layer
//!
//! - `manager`: UnorderedTxManager implementing `ReplayProtectionApi`
//! - `sweeper`: ExpirySweeper background task

pub mod manager;
pub mod sweeper;

pub use manager::UnorderedTxManager;
pub use sweeper::ExpirySweeper;
