//! Core traits and types for mesh adaptive direct search.
//!
//! This crate defines the shared abstractions that the solver and observers
//! build on:
//!
//! - [`Blackbox`]: an opaque function mapping a point to a [`Response`]
//! - [`Observer`]: receives solver events and optionally returns control actions
//! - [`OutputType`], [`InputType`]: the vocabulary used to declare what each
//!   blackbox output means and what kind of value each variable takes

mod blackbox;
mod kinds;
mod observer;

pub use blackbox::{Blackbox, Response};
pub use kinds::{InputType, OutputType, ParseKindError};
pub use observer::Observer;
