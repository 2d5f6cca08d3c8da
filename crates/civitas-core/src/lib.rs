//! Configuration, simulated population, and tick runner for Civitas.
//!
//! This crate turns the civilization layer into a runnable simulation:
//! it loads `civitas-config.yaml`, supplies a stand-in entity population,
//! and drives the bounded tick loop.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `civitas-config.yaml` into
//!   strongly-typed structs.
//! - [`population`] -- [`Population`], an entity registry with random traits
//!   and per-tick mortality.
//! - [`runner`] -- [`run_simulation`], the seeded, bounded tick loop.
//!
//! [`Population`]: population::Population
//! [`run_simulation`]: runner::run_simulation

pub mod config;
pub mod population;
pub mod runner;
