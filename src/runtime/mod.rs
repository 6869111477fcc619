//! Runtime adapters that drive processing passes.

pub mod tokio_driver;

pub use tokio_driver::{spawn_periodic, PassDriver};
