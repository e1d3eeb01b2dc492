//! Multi-fragment document codec: drives construction, id assignment and
//! hydration on load, and the reference walk on save.
//!
//! All scratch state lives on the codec value instead of module globals: the
//! object-id lookup table, the orphan-payload side table and the in-flight
//! flags. The codec is cheap to clone (clones share state, like
//! [`GraphStore`] itself), so object hooks that captured a clone and try to
//! re-enter get a typed [`Error::ReentrantOperation`] instead of corrupting
//! the tables.

use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::rc::Rc;

use anyhow::{Context as _, bail};

use crate::document::{DocumentRecord, split_document};
use crate::error::{Error, Result};
use crate::id::ObjectId;
use crate::object::{GraphObject, Handle, ObjectKind, handle};
use crate::reference::ObjectRef;
use crate::registry::TypeRegistry;
use crate::store::{GraphStore, OrphanBlobs};
use crate::unknown::UnknownObject;

/// Hook-facing state for one deserialization pass.
///
/// Handed to `after_decode` / `after_all_decoded`; lets objects resolve
/// references against the in-flight store, append nested records to the
/// batch, and preserve payloads nothing referenced.
pub struct DecodeContext<'a> {
    store: GraphStore,
    orphans: OrphanBlobs,
    root_id: ObjectId,
    // Present only while the decode phase runs; enqueueing later is an error.
    batch: Option<&'a mut Vec<DocumentRecord>>,
}

impl<'a> DecodeContext<'a> {
    /// Id of the root object of the batch being deserialized.
    pub fn root_id(&self) -> &ObjectId {
        &self.root_id
    }

    /// Plain store lookup with no reclassification.
    pub fn lookup(&self, id: &ObjectId) -> Option<Handle> {
        self.store.get(id)
    }

    /// Look `id` up for a reference expecting `kind`.
    ///
    /// An [`UnknownObject`] found under the id is reclassified into the shim
    /// matching `kind` and re-registered in the store so every later lookup
    /// sees the shim. A store miss returns `None` and the caller retries on
    /// its next resolution attempt.
    pub fn resolve_as(&mut self, id: &ObjectId, kind: ObjectKind) -> Option<Handle> {
        let current = self.store.get(id)?;
        if kind == ObjectKind::Any {
            return Some(current);
        }
        // An object we cannot borrow is the one currently being decoded: a
        // self reference, necessarily a live concrete object.
        if current.try_borrow_mut().is_err() {
            return Some(current);
        }
        let mut object = current.borrow_mut();
        let Some(unknown) = object.as_any_mut().downcast_mut::<UnknownObject>() else {
            drop(object);
            return Some(current);
        };
        let shim = unknown.cast_to(kind);
        let type_name = unknown.type_name().to_string();
        drop(object);
        match shim {
            Some(shim) => {
                self.store.put(id.clone(), shim.clone());
                Some(shim)
            }
            None => {
                tracing::error!(%id, type_name = %type_name, "unable to evaluate unknown object as {kind:?}");
                None
            }
        }
    }

    /// Register `object` in the store and append a record for it to the
    /// in-flight batch, so it gets its own decode and hydration passes.
    ///
    /// Only legal while the decode phase runs, i.e. from `after_decode`.
    pub fn enqueue(&mut self, object: Handle, json: impl Into<String>) -> anyhow::Result<()> {
        let Some(batch) = self.batch.as_deref_mut() else {
            bail!("records can only be enqueued during after_decode");
        };
        let (type_name, id) = {
            let object = object.borrow();
            (object.type_name().to_string(), object.object_id().clone())
        };
        self.store.put(id.clone(), object);
        batch.push(DocumentRecord::new(type_name, Some(id), json));
        Ok(())
    }

    /// Keep `json` in the orphan side table for the batch's root, so the
    /// next save of that root re-emits it.
    pub fn preserve_orphan(&mut self, object_id: &ObjectId, json: &str) {
        self.orphans.record(&self.root_id, object_id, json);
    }
}

/// Hook-facing state for one serialization pass: the discovery queue and the
/// already-queued set.
pub struct EncodeContext {
    queue: Vec<Handle>,
    seen: HashSet<ObjectId>,
}

impl EncodeContext {
    fn seeded(root: Handle, root_id: ObjectId) -> Self {
        let mut seen = HashSet::new();
        seen.insert(root_id);
        Self {
            queue: vec![root],
            seen,
        }
    }

    /// Contribute a reference to the fragment being encoded: returns the
    /// referent's id and queues the referent for serialization if it has not
    /// been queued yet. Returns `None` for an unresolved slot.
    pub fn reference(&mut self, reference: &ObjectRef) -> Option<ObjectId> {
        let target = reference.get()?;
        Some(self.enqueue_object(&target))
    }

    /// Queue a directly-held child object, returning its id.
    pub fn enqueue_object(&mut self, object: &Handle) -> ObjectId {
        let id = object.borrow().object_id().clone();
        if self.seen.insert(id.clone()) {
            self.queue.push(object.clone());
        }
        id
    }

    fn len(&self) -> usize {
        self.queue.len()
    }

    fn get(&self, index: usize) -> Handle {
        self.queue[index].clone()
    }
}

/// Releases the in-flight flag (and clears the scratch store when asked) on
/// every exit path, including unwinding out of object hooks.
struct OpGuard<'a> {
    flag: &'a Cell<bool>,
    store: Option<&'a GraphStore>,
}

impl Drop for OpGuard<'_> {
    fn drop(&mut self) {
        if let Some(store) = self.store {
            store.clear();
        }
        self.flag.set(false);
    }
}

/// The document codec. Owns the scratch store, the orphan side table and the
/// reentrancy flags; one codec corresponds to what used to be process-wide
/// serialization state.
#[derive(Clone)]
pub struct GraphCodec {
    registry: TypeRegistry,
    store: GraphStore,
    orphans: OrphanBlobs,
    deserializing: Rc<Cell<bool>>,
    serializing: Rc<Cell<bool>>,
}

impl GraphCodec {
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            registry,
            store: GraphStore::new(),
            orphans: OrphanBlobs::new(),
            deserializing: Rc::new(Cell::new(false)),
            serializing: Rc::new(Cell::new(false)),
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// Store lookup, meaningful after [`populate_lookup`](Self::populate_lookup).
    pub fn lookup(&self, id: &ObjectId) -> Option<Handle> {
        self.store.get(id)
    }

    /// Split `text` and deserialize the resulting records onto `root`.
    pub fn deserialize_document(&self, root: &Handle, text: &str, rewrite_ids: bool) -> Result<()> {
        let records = split_document(text)?;
        self.deserialize(root, records, rewrite_ids)
    }

    /// Hydrate `records` into live objects, binding the first record to
    /// `root`.
    ///
    /// Runs in three ordered phases: construction and id registration,
    /// per-record decode plus `after_decode` over a batch that hooks may
    /// grow, and a final `after_all_decoded` sweep. A failure in any one
    /// record is logged and does not abort the rest; the scratch store is
    /// cleared again on every exit path.
    pub fn deserialize(
        &self,
        root: &Handle,
        records: Vec<DocumentRecord>,
        rewrite_ids: bool,
    ) -> Result<()> {
        if self.deserializing.get() {
            return Err(Error::ReentrantOperation {
                operation: "deserialization",
            });
        }
        self.deserializing.set(true);
        let _guard = OpGuard {
            flag: &self.deserializing,
            store: Some(&self.store),
        };
        // A preceding populate_lookup intentionally leaves mappings behind.
        self.store.clear();
        self.run_deserialize(root, records, rewrite_ids);
        Ok(())
    }

    fn run_deserialize(&self, root: &Handle, mut batch: Vec<DocumentRecord>, rewrite_ids: bool) {
        // Phase 0: construct every object and register its id (original and
        // rewritten) so later records can reference earlier ones before any
        // payload has been decoded.
        for index in 0..batch.len() {
            if let Err(error) = self.register_record(root, &mut batch, index, rewrite_ids) {
                tracing::error!(
                    type_name = %batch[index].type_name,
                    "failed to construct object for fragment: {error:#}"
                );
            }
        }

        let root_id = root.borrow().object_id().clone();

        // Phase 1: decode and hydrate. Not a for-loop over a snapshot:
        // after_decode may append records, so the bound is re-read every
        // iteration.
        let mut index = 0;
        while index < batch.len() {
            let record = batch[index].clone();
            index += 1;
            let Some((id, value)) = self.registered_object(&record) else {
                continue;
            };
            if let Err(error) = value.borrow_mut().decode(&record.type_name, &record.json) {
                tracing::error!(
                    type_name = %record.type_name,
                    %id,
                    "exception thrown while decoding object: {error:#}"
                );
                continue;
            }
            // The payload may have carried a stale id; re-assert the one the
            // batch registered.
            value.borrow_mut().assign_object_id(id.clone());
            let mut ctx = DecodeContext {
                store: self.store.clone(),
                orphans: self.orphans.clone(),
                root_id: root_id.clone(),
                batch: Some(&mut batch),
            };
            if let Err(error) = value.borrow_mut().after_decode(&record.json, &mut ctx) {
                tracing::error!(
                    type_name = %record.type_name,
                    %id,
                    "exception thrown while hydrating object: {error:#}"
                );
            }
        }

        // Phase 2: every record, including ones appended during phase 1, gets
        // its post-hydration hook. Enqueueing is no longer allowed.
        let mut ctx = DecodeContext {
            store: self.store.clone(),
            orphans: self.orphans.clone(),
            root_id: root_id.clone(),
            batch: None,
        };
        for record in &batch {
            let Some((id, value)) = self.registered_object(record) else {
                continue;
            };
            if let Err(error) = value.borrow_mut().after_all_decoded(&record.json, &mut ctx) {
                tracing::error!(
                    type_name = %record.type_name,
                    %id,
                    "exception thrown in post-hydration hook: {error:#}"
                );
            }
        }
    }

    fn register_record(
        &self,
        root: &Handle,
        batch: &mut Vec<DocumentRecord>,
        index: usize,
        rewrite_ids: bool,
    ) -> anyhow::Result<()> {
        let type_name = batch[index].type_name.clone();
        let value: Handle = if index == 0 {
            root.clone()
        } else {
            match self.registry.create(&type_name) {
                Some(created) => {
                    created.with_context(|| format!("constructing an instance of '{type_name}'"))?
                }
                None => {
                    tracing::debug!(type_name = %type_name, "unresolvable type, preserving fragment as unknown object");
                    batch[index].should_decode = false;
                    handle(UnknownObject::new(type_name))
                }
            }
        };

        let mut id = batch[index].id.clone();
        if let Some(original) = &id {
            // References looking for the original id must find the object in
            // spite of id rewriting.
            self.store.put(original.clone(), value.clone());
        }
        if rewrite_ids || id.is_none() {
            let minted = value.borrow().object_id().clone();
            self.store.put(minted.clone(), value.clone());
            batch[index].id = Some(minted.clone());
            id = Some(minted);
        }
        if let Some(id) = id {
            value.borrow_mut().assign_object_id(id);
        }
        Ok(())
    }

    fn registered_object(&self, record: &DocumentRecord) -> Option<(ObjectId, Handle)> {
        let Some(id) = record.id.clone() else {
            tracing::warn!(type_name = %record.type_name, "skipping fragment that never registered an object");
            return None;
        };
        let Some(value) = self.store.get(&id) else {
            tracing::warn!(type_name = %record.type_name, %id, "skipping fragment that never registered an object");
            return None;
        };
        Some((id, value))
    }

    /// Serialize the graph reachable from `root` into document text.
    ///
    /// Walks the reference graph starting at `root`, encoding each object
    /// exactly once, then merges in orphan payloads recorded against this
    /// root that the walk did not re-emit. The root's fragment always comes
    /// first; all others are ordered by ascending id, which makes re-saving
    /// an unchanged graph byte-stable.
    pub fn serialize(&self, root: &Handle) -> Result<String> {
        if self.serializing.get() {
            return Err(Error::ReentrantOperation {
                operation: "serialization",
            });
        }
        self.serializing.set(true);
        let _guard = OpGuard {
            flag: &self.serializing,
            store: None,
        };
        self.run_serialize(root)
    }

    fn run_serialize(&self, root: &Handle) -> Result<String> {
        let root_id = root.borrow().object_id().clone();
        let mut ctx = EncodeContext::seeded(root.clone(), root_id.clone());
        let mut fragments: Vec<(ObjectId, String)> = Vec::new();

        // Not a fixed-size pass: encode grows the queue through the refs it
        // touches.
        let mut index = 0;
        while index < ctx.len() {
            let value = ctx.get(index);
            index += 1;
            let (type_name, id) = {
                let value = value.borrow();
                (value.type_name().to_string(), value.object_id().clone())
            };
            let json = value
                .borrow()
                .encode(&mut ctx)
                .map_err(|source| Error::ObjectEncode {
                    type_name,
                    id: id.clone(),
                    source,
                })?;
            fragments.push((id, json));
        }

        for (id, json) in self.orphans.for_root(&root_id) {
            let already_emitted = fragments
                .iter()
                .any(|(fragment_id, fragment_json)| *fragment_id == id && *fragment_json == json);
            if !already_emitted {
                fragments.push((id, json));
            }
        }

        fragments.sort_by(|a, b| {
            // The root's fragment is always placed first.
            if a.0 == root_id {
                Ordering::Less
            } else if b.0 == root_id {
                Ordering::Greater
            } else {
                a.0.cmp(&b.0)
            }
        });

        let mut text = String::new();
        for (_, json) in &fragments {
            text.push_str(json);
            text.push_str("\n\n");
        }
        Ok(text)
    }

    /// Perform the same graph walk as [`serialize`](Self::serialize) but
    /// discard the emitted text, only populating the store. Used for
    /// read-only inspection of what a save would reach; the store is left
    /// filled for [`lookup`](Self::lookup).
    pub fn populate_lookup(&self, root: &Handle) -> Result<()> {
        if self.serializing.get() {
            return Err(Error::ReentrantOperation {
                operation: "serialization",
            });
        }
        self.serializing.set(true);
        let _guard = OpGuard {
            flag: &self.serializing,
            store: None,
        };
        self.run_populate(root)
    }

    fn run_populate(&self, root: &Handle) -> Result<()> {
        let root_id = root.borrow().object_id().clone();
        let mut ctx = EncodeContext::seeded(root.clone(), root_id);
        let mut index = 0;
        while index < ctx.len() {
            let value = ctx.get(index);
            index += 1;
            let (type_name, id) = {
                let value = value.borrow();
                (value.type_name().to_string(), value.object_id().clone())
            };
            value
                .borrow()
                .encode(&mut ctx)
                .map_err(|source| Error::ObjectEncode {
                    type_name,
                    id: id.clone(),
                    source,
                })?;
            self.store.put(id, value.clone());
        }
        Ok(())
    }
}
