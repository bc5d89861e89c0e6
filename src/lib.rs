//! tickdesk: streaming technical indicators over per-ticker tick series.
//!
//! Hexagonal architecture: the series graph, indexes and strategies live in
//! [`domain`], port traits in [`ports`], concrete implementations in
//! [`adapters`]. [`cli`] and [`logging`] back the binary.

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod logging;
pub mod ports;
