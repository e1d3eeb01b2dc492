//! The polymorphic object surface every serializable graph entity implements.
//!
//! Objects are held behind `Rc<RefCell<dyn GraphObject>>` handles so that one
//! live instance can be reached both from the graph store and from any number
//! of [`ObjectRef`](crate::reference::ObjectRef) slots. All work is
//! single-threaded; the codec never holds a borrow across a hook call into
//! object code.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;

use crate::codec::{DecodeContext, EncodeContext};
use crate::id::ObjectId;

/// Shared handle to a live graph object.
pub type Handle = Rc<RefCell<dyn GraphObject>>;

/// Wrap a concrete object into a [`Handle`].
pub fn handle<T: GraphObject>(object: T) -> Handle {
    Rc::new(RefCell::new(object))
}

/// The capability surface a reference expects of its referent. Drives
/// reclassification of unknown placeholders into typed shims on resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Any,
    Node,
    Target,
    SubTarget,
}

/// A message attached to an object during validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    pub object_id: ObjectId,
    pub message: String,
}

/// One entity participating in multi-fragment serialization.
///
/// The lifecycle during a load is: `decode` (per-object payload), then
/// `after_decode` (reference resolution, may enqueue nested records), then
/// `after_all_decoded` once every record in the batch has completed the
/// previous phase. During a save, `encode` produces this object's own JSON
/// fragment and enqueues referenced objects through the context.
pub trait GraphObject: Any {
    /// Stable serialized type identifier for this object.
    fn type_name(&self) -> &str;

    fn object_id(&self) -> &ObjectId;

    /// Forces an id onto the object. Called by the codec when binding a
    /// fragment's id (or a rewritten one) to its instance; not part of the
    /// surface embedders should call.
    #[doc(hidden)]
    fn assign_object_id(&mut self, id: ObjectId);

    /// Populate internal state from a raw fragment payload.
    ///
    /// An error here must not fail the whole load: the codec logs it and
    /// continues with the remaining records.
    fn decode(&mut self, type_name: &str, json: &str) -> Result<()>;

    /// Second-phase hook: resolve references, optionally enqueue additional
    /// records via [`DecodeContext::enqueue`].
    fn after_decode(&mut self, _json: &str, _ctx: &mut DecodeContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Third-phase hook, invoked once every record in the batch has finished
    /// `after_decode`. This is where payloads nothing referenced get
    /// preserved for the next save.
    fn after_all_decoded(&mut self, _json: &str, _ctx: &mut DecodeContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Produce this object's own JSON fragment, not including referenced
    /// objects. Referenced objects are enqueued through the context.
    fn encode(&self, ctx: &mut EncodeContext) -> Result<String>;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Behavioral view as a graph node, if this object is one.
    fn as_node(&self) -> Option<&dyn NodeBehavior> {
        None
    }

    /// Behavioral view as a build target, if this object is one.
    fn as_target(&self) -> Option<&dyn TargetBehavior> {
        None
    }

    /// Behavioral view as a sub-target, if this object is one.
    fn as_sub_target(&self) -> Option<&dyn SubTargetBehavior> {
        None
    }
}

/// What the rest of the system may ask of a graph node.
pub trait NodeBehavior {
    fn is_active(&self) -> bool;
    fn is_valid(&self) -> bool;
    fn validate(&self, warnings: &mut Vec<ValidationWarning>);
}

/// What the rest of the system may ask of a target.
pub trait TargetBehavior {
    fn display_name(&self) -> &str;
    fn is_hidden(&self) -> bool;
    fn is_active(&self) -> bool;
}

/// What the rest of the system may ask of a sub-target.
pub trait SubTargetBehavior {
    fn display_name(&self) -> &str;
    fn is_hidden(&self) -> bool;
    fn is_active(&self) -> bool;
    /// Type name of the target kind this sub-target belongs under.
    fn target_type_name(&self) -> &str;
}
