//! Core library for bmcprobe
//!
//! This crate implements the **Functional Core** of the bmcprobe application,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! The bmcprobe project uses a two-crate architecture to enforce separation of concerns:
//!
//! - **`bmcprobe_core`** (this crate): the inventory model and the Redfish traversal, with zero I/O
//! - **`bmcprobe`**: HTTP transport, persistence and the CLI (the Imperative Shell)
//!
//! The traversal needs documents from a management controller, but it never
//! fetches them itself. It is written against the [`explore::Fetch`] trait and
//! the shell plugs in an HTTP implementation. Tests plug in fixture documents.
//!
//! # Module Organization
//!
//! - [`attributes`]: Reduce arbitrary JSON objects to scalar attributes
//! - [`links`]: Read `@odata.id` links and collection members
//! - [`model`]: Systems, subsystem records, the inventory and controller details
//! - [`explore`]: Walk the resource graph and build the inventory
//! - [`obscure`]: Mask credentials for display
//! - [`error`]: Failure taxonomy shared by the traversal and the transport
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use bmcprobe_core::explore::{Explorer, ExploreState};
//!
//! let mut explorer = Explorer::new(fixture_service());
//! assert_eq!(explorer.explore().await, ExploreState::Done);
//!
//! for (id, system) in &explorer.inventory().systems {
//!     println!("{id}: {} processors", system.processors.len());
//! }
//! ```

pub mod attributes;
pub mod error;
pub mod explore;
pub mod links;
pub mod model;
pub mod obscure;

pub use error::{ProbeError, Result};
