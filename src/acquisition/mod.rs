//! Acquisition: the strategy chain consulted when every cache tier misses.
//!
//! Strategies are tried in ascending priority. Each gets its own retry budget
//! with exponential backoff; how a failure is classified decides whether the
//! chain retries, moves on, or stops:
//!
//! | `SourceError`                    | effect                                   |
//! |----------------------------------|------------------------------------------|
//! | `Retriable`                      | retry after backoff, then next strategy  |
//! | `Unrecoverable { Strategy }`     | next strategy                            |
//! | `Unrecoverable { Content }`      | abort the chain                          |
//! | `RateLimited { retry_after }`    | cool the strategy down, next strategy    |

pub mod command;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod policy;
pub mod strategy;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(test)]
mod tests;

pub use command::CommandStrategy;
pub use error::{AcquisitionError, AcquisitionResult, ErrorScope, SourceError, SourceResult};
pub use http::HttpStrategy;
#[cfg(any(test, feature = "mock"))]
pub use mock::ScriptedStrategy;
pub use orchestrator::{Acquired, AcquisitionOrchestrator, OrchestratorBuilder};
pub use policy::RetryPolicy;
pub use strategy::Strategy;
