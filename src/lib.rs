//! Multi-fragment JSON persistence for node-forge material graphs.
//!
//! A graph document is a sequence of JSON object fragments separated by
//! blank lines, one fragment per object, referencing each other by stable
//! string ids. This crate splits such documents, reconstructs the live
//! object graph (tolerating unknown or removed node types by preserving
//! their payloads verbatim), and serializes a live graph back out in a
//! deterministic, diff-friendly order.
//!
//! The secondary [`copy_pass`] module carries the copy-color render pass,
//! expressed against an abstract command buffer.

pub mod codec;
pub mod copy_pass;
pub mod document;
pub mod error;
pub mod id;
pub mod object;
pub mod reference;
pub mod registry;
pub mod store;
pub mod unknown;

pub use codec::{DecodeContext, EncodeContext, GraphCodec};
pub use document::{DocumentRecord, split_document};
pub use error::{Error, Result};
pub use id::ObjectId;
pub use object::{
    GraphObject, Handle, NodeBehavior, ObjectKind, SubTargetBehavior, TargetBehavior,
    ValidationWarning, handle,
};
pub use reference::ObjectRef;
pub use registry::TypeRegistry;
pub use store::{GraphStore, OrphanBlobs};
pub use unknown::{UnknownNode, UnknownObject, UnknownSubTarget, UnknownTarget};
