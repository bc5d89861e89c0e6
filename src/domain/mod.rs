//! Core domain types and logic.

pub mod config_validation;
pub mod error;
pub mod index;
pub mod plan;
pub mod registry;
pub mod replay;
pub mod series;
pub mod strategies;
pub mod strategy;
pub mod ticker;
