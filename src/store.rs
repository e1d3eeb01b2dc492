//! Scratch and side-table state shared by one codec.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::id::ObjectId;
use crate::object::Handle;

/// Clone-friendly table mapping object id to live instance.
///
/// This is scratch state for one load or lookup pass: the codec clears it
/// after every complete deserialization, and `populate_lookup` deliberately
/// leaves it filled for read-only inspection. Ids are unique within one
/// snapshot; `put` on an existing id replaces the entry (that is how an
/// unknown placeholder is swapped for its typed shim).
#[derive(Clone, Default)]
pub struct GraphStore {
    inner: Rc<RefCell<HashMap<ObjectId, Handle>>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &ObjectId) -> Option<Handle> {
        self.inner.borrow().get(id).cloned()
    }

    pub fn put(&self, id: ObjectId, object: Handle) {
        self.inner.borrow_mut().insert(id, object);
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.inner.borrow().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.inner.borrow_mut().clear();
    }
}

/// Raw payloads that nothing referenced during a load, keyed by the root
/// they were loaded under, kept so the next save of that root can merge them
/// back in. Unlike [`GraphStore`] this table persists across operations.
#[derive(Clone, Default)]
pub struct OrphanBlobs {
    inner: Rc<RefCell<HashMap<ObjectId, BTreeMap<ObjectId, String>>>>,
}

impl OrphanBlobs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or refresh) the payload preserved for `object_id` under
    /// `root_id`.
    pub fn record(&self, root_id: &ObjectId, object_id: &ObjectId, json: &str) {
        self.inner
            .borrow_mut()
            .entry(root_id.clone())
            .or_default()
            .insert(object_id.clone(), json.to_string());
    }

    /// All payloads preserved under `root_id`, in ascending id order.
    pub fn for_root(&self, root_id: &ObjectId) -> Vec<(ObjectId, String)> {
        self.inner
            .borrow()
            .get(root_id)
            .map(|blobs| {
                blobs
                    .iter()
                    .map(|(id, json)| (id.clone(), json.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}
