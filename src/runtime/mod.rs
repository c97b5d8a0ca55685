//! Driving computations.
//!
//! This module contains the runtime machinery:
//!
//! - [`config`]: Runtime configuration types
//! - [`env_config`]: `EFFECTUM_*` environment variable overrides
//! - [`builder`]: Runtime builder and the [`Runtime`] itself
//! - [`run`](mod@run): Top-level runs and the [`RunFuture`] they return
//! - [`fiber`]: Forked fibers and their [`Handle`]s
//!
//! # Runtime Builder
//!
//! Effectum configures the runtime with a fluent, move-based builder API.
//! Each builder method consumes `self` and returns an updated builder.
//!
//! ```
//! use effectum::combinator::service;
//! use effectum::runtime::RuntimeBuilder;
//! use effectum::{Computation, Never};
//!
//! let runtime = RuntimeBuilder::new()
//!     .name("inventory")
//!     .provide_service(String::from("warehouse-7"))
//!     .build()
//!     .expect("valid configuration");
//!
//! let program: Computation<usize, Never> = service::<String, Never, ()>().map(|s| s.len());
//! assert_eq!(runtime.run_blocking(program), Ok(11));
//! ```

pub mod builder;
pub mod config;
pub mod env_config;
pub mod fiber;
pub mod run;

pub use builder::{Runtime, RuntimeBuilder};
pub use config::RuntimeConfig;
pub use fiber::Handle;
pub use run::{run, run_blocking, RunFuture};
