//! Reusable observers for the MADS blackbox optimizer.
//!
//! This crate provides [`Observer`] implementations and capability traits that
//! work with [`mads`] solver events.
//!
//! # Modules
//!
//! - [`traits`]: Capability traits for generic observers
//!   ([`HasObjective`], [`HasViolation`], [`CanStopEarly`])
//! - [`display`]: [`DisplayObserver`], which renders progress lines through
//!   `tracing` according to the display options of a run
//!
//! [`Observer`]: mads_core::Observer
//! [`mads`]: mads_solvers::mads
//! [`HasObjective`]: traits::HasObjective
//! [`HasViolation`]: traits::HasViolation
//! [`CanStopEarly`]: traits::CanStopEarly

pub mod display;
pub mod traits;

pub use display::DisplayObserver;
