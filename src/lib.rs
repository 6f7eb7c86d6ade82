//! radiolens: building blocks for radio-interferometer weak-lensing
//! simulations.
//!
//! The crate generates synthetic galaxy population parameters
//! (scalelengths and ellipticities) by inverse-CDF sampling from
//! caller-supplied probability distributions, and reads and filters
//! interferometer baseline coordinate files into the layout the
//! visibility generator consumes.
//!
//! Distributions enter the crate as plain closures, either written in
//! Rust or parsed from the configuration file via `Config::func`.
//! Randomness comes from any `rand::Rng`; callers own seeding and
//! generator lifecycle.
//!
//! Compiling with the `parallel-tables` feature parallelizes CDF
//! table construction over rayon's global thread pool.

pub mod coords;
pub mod input;
pub mod quadrature;
pub mod sampler;

pub use coords::{OskarCoords, SkaCoords, SkaLoader, CoordError};
pub use input::{Config, InputError};
pub use sampler::{CdfTable, SamplingError, E_MAX};
