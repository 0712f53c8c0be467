//! Benchmark harness for FITS read performance.
//!
//! Benchmarks are plain descriptors collected into a [`Registry`] at startup
//! and handed to the runner together with a timing [`Strategy`]. The
//! [`sweep`] module drives the tile-size experiments and their cached
//! result tables.

pub mod benchmarks;
pub mod config;
pub mod dataset;
pub mod fixture;
pub mod logging;
pub mod profile;
pub mod registry;
pub mod runner;
pub mod strategy;
pub mod sweep;
pub mod synth;

#[cfg(test)]
mod config_test;
#[cfg(test)]
mod profile_test;
#[cfg(test)]
mod strategy_test;

pub use benchmarks::builtin_registry;
pub use config::BenchEnv;
pub use fixture::{Fixture, Output};
pub use registry::{BenchmarkEntry, ProfilerOptions, Registry};
pub use strategy::{RepeatedTimer, RunReport, SamplingProfiler, SingleShot, Strategy};
