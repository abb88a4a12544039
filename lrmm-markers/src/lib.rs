//! # LRMM Marker Engine (lrmm-markers)
//!
//! Keeps the markers of one recording synchronized between the in-memory
//! working list, the rendered marker images and the sidecar document.
//!
//! **Components (leaf-first):**
//! - [`model`]: marker records and edits
//! - [`document`]: sidecar XML codec
//! - [`metrics`]: altitude/depth/range/height derivation
//! - [`artifacts`]: rendered image storage
//! - [`reconcile`]: source set vs. document comparison and record creation
//! - [`store`]: synchronous engine with the mutation API
//! - [`session`]: async session wrapper with a ready signal and events
//!
//! The recording reader and image renderer are supplied by the caller through
//! the traits in [`collaborators`].

pub mod artifacts;
pub mod collaborators;
pub mod document;
pub mod error;
pub mod inspect;
pub mod layout;
pub mod metrics;
pub mod model;
pub mod reconcile;
pub mod session;
pub mod store;

pub use collaborators::Collaborators;
pub use error::{DecodeError, Error, RenderFailure, Result};
pub use layout::RecordingLayout;
pub use model::{Classification, DrawPath, MarkerKind, MarkerRecord, MarkerUpdate, SourceMarker};
pub use reconcile::SessionState;
pub use session::{MarkerSession, SessionStatus};
pub use store::{MarkerStore, Mutation};
