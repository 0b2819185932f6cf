#![warn(missing_docs, missing_debug_implementations)]

//! Bulk-check California DMV personalized plate availability.
//!
//! The core is a pool of session-bound workers: each establishes its own
//! stateful session with the DMV's plate service (terms acknowledgment plus
//! a captured `JSESSIONID` cookie), then pulls candidates from a shared
//! sentinel-terminated queue, issues one check request per candidate, and
//! records the service's verdict. The coordinator merges the workers'
//! private result maps into one table.
//!
//! # Example
//!
//! ```no_run
//! use plate_avail::config::ServiceConfig;
//! use plate_avail::pool::{ErrorPolicy, Silent, run_pool};
//! use plate_avail::session::Session;
//!
//! let config = ServiceConfig::from_env();
//! let plates = vec!["catdog".to_string(), "sunray".to_string()];
//! let outcome = run_pool(
//!     4,
//!     plates,
//!     |_| Session::establish(&config),
//!     ErrorPolicy::Abort,
//!     &Silent,
//! )?;
//! for (plate, status) in &outcome.results {
//!     println!("{plate}: {status}");
//! }
//! # Ok::<(), plate_avail::pool::PoolError>(())
//! ```

pub mod check;
pub mod config;
pub mod generate;
pub mod pool;
pub mod queue;
pub mod session;
pub mod sink;
pub mod source;
