//! Reference slots connecting graph objects across fragments.

use crate::codec::DecodeContext;
use crate::id::ObjectId;
use crate::object::{GraphObject, Handle, ObjectKind};

/// A typed slot inside a graph object holding either a resolved live object
/// or an unresolved id string.
///
/// On decode the owning object stores the id it read from its payload and
/// calls [`resolve`](Self::resolve) from `after_decode`; if the store has no
/// entry yet (the referent may itself still be materializing) the id is kept
/// and the next `resolve` call tries again, typically from
/// `after_all_decoded`.
#[derive(Clone, Default)]
pub struct ObjectRef {
    id: Option<ObjectId>,
    target: Option<Handle>,
}

impl ObjectRef {
    /// A slot holding an id that has not been looked up yet.
    pub fn unresolved(id: ObjectId) -> Self {
        Self {
            id: Some(id),
            target: None,
        }
    }

    /// A slot already pointing at a live object.
    pub fn to_object(target: Handle) -> Self {
        Self {
            id: None,
            target: Some(target),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.target.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_none() && self.id.is_none()
    }

    /// The referent's id: the live object's if resolved, otherwise the
    /// pending one.
    pub fn id(&self) -> Option<ObjectId> {
        match &self.target {
            Some(target) => Some(target.borrow().object_id().clone()),
            None => self.id.clone(),
        }
    }

    /// The live referent, if resolution has happened.
    pub fn get(&self) -> Option<Handle> {
        self.target.clone()
    }

    /// Look the pending id up in the store, reclassifying an unknown
    /// placeholder into the shim matching `kind`. Returns whether the slot is
    /// resolved afterwards; on a store miss the id is kept for a later
    /// attempt.
    pub fn resolve(&mut self, kind: ObjectKind, ctx: &mut DecodeContext<'_>) -> bool {
        if self.target.is_some() {
            return true;
        }
        let Some(id) = self.id.clone() else {
            return false;
        };
        match ctx.resolve_as(&id, kind) {
            Some(target) => {
                self.target = Some(target);
                true
            }
            None => false,
        }
    }
}
