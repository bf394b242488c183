//! Core library for the reachbook command line application.
//!
//! The library exposes the pipeline that powers the command-line interface as
//! well as the unit tests. The modules are structured to keep
//! responsibilities narrow and composable: Excel adapters live under [`io`],
//! data representations inside [`model`], geocoding behind [`geocode`],
//! distance math in [`distance`] and [`matrix`], formula synthesis in
//! [`columns`] and [`formula`], and the run orchestration under [`pipeline`].

pub mod columns;
pub mod config;
pub mod distance;
pub mod error;
pub mod formula;
pub mod geocode;
pub mod io;
pub mod matrix;
pub mod model;
pub mod pipeline;

pub use error::{ReachError, Result};
