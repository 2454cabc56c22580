//! Solvers for constrained blackbox optimization.
//!
//! # Solvers
//!
//! - [`mads`]: mesh adaptive direct search over bounded, mixed-integer
//!   domains with extreme, progressive, filter, or hybrid constraint handling

pub mod mads;
