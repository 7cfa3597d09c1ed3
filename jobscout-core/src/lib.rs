//! # jobscout-core
//!
//! Client-side reconciliation of a job-scraping run's event stream.
//!
//! A [`RunSession`] starts and stops runs through a [`RunControl`]
//! collaborator, keeps one [`StreamSubscriber`] open for the active run and
//! feeds every decoded message through the [`Reconciler`] into a
//! [`RunProjection`]:
//!
//! - [`projection::Metrics`]: scanned / passed / failed counters
//! - [`projection::RegionMap`]: admitted postings per region, newest first
//! - [`projection::LogBuffer`]: bounded activity log with a text export
//!
//! ```no_run
//! use std::{sync::Arc, time::Duration};
//! use jobscout_core::{ApiClient, RunSession};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let api = ApiClient::new("http://localhost:8000", Duration::from_secs(15))?;
//! let transport = Arc::new(api.event_transport()?);
//! let mut session = RunSession::new(Arc::new(api), transport);
//!
//! session.start("https://example.com/careers").await?;
//! while let Some(update) = session.next_update().await {
//!     println!("{update:?}: {}", session.summary());
//! }
//! # Ok(())
//! # }
//! ```
#![allow(missing_docs)]

pub mod api;
pub mod error;
pub mod projection;
pub mod reconciler;
pub mod session;
pub mod sources;
pub mod stream;
pub mod strings;
pub mod testing;
pub mod time;

pub use api::{ApiClient, RunControl};
pub use error::{Result, SessionError, TransportError, ValidationError};
pub use projection::{ProjectionLayout, RunProjection, RunSummary};
pub use reconciler::{Outcome, Reconciler};
pub use session::{RunHandle, RunSession, SessionUpdate};
pub use sources::{merge_suggestions, parse_source_urls};
pub use stream::{SseTransport, StreamMessage, StreamSubscriber, StreamTransport, SubscriptionState};
pub use time::{FixedTimeProvider, SystemTimeProvider, TimeProvider};
