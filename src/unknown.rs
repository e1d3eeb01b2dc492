//! Placeholders for fragments whose type is no longer (or not yet) known.
//!
//! An unrecognized fragment is never discarded. It first lands in an
//! [`UnknownObject`], which keeps the raw payload and type string verbatim.
//! If something later treats the placeholder as a concrete kind, it is
//! reclassified in place into the matching shim — [`UnknownNode`],
//! [`UnknownTarget`] or [`UnknownSubTarget`] — which mimics the expected
//! capability surface (answering inactive/invalid to behavioral queries)
//! while still round-tripping the original bytes on encode.

use std::any::Any;

use anyhow::Result;

use crate::codec::{DecodeContext, EncodeContext};
use crate::id::ObjectId;
use crate::object::{
    GraphObject, Handle, NodeBehavior, ObjectKind, SubTargetBehavior, TargetBehavior,
    ValidationWarning, handle,
};

/// Generic placeholder for a fragment with an unresolvable type.
pub struct UnknownObject {
    id: ObjectId,
    type_name: String,
    json: String,
    casted: Option<Handle>,
}

impl UnknownObject {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            id: ObjectId::generate(),
            type_name: type_name.into(),
            json: String::new(),
            casted: None,
        }
    }

    /// The preserved raw payload.
    pub fn json(&self) -> &str {
        &self.json
    }

    /// The shim this placeholder was reclassified into, if any.
    pub fn casted(&self) -> Option<Handle> {
        self.casted.clone()
    }

    /// Reclassify into the shim matching `kind`, building it on first use.
    /// The shim carries the original payload forward and keeps this object's
    /// id; the caller is responsible for re-registering the id in the store.
    pub(crate) fn cast_to(&mut self, kind: ObjectKind) -> Option<Handle> {
        if let Some(casted) = &self.casted {
            return Some(casted.clone());
        }
        let shim: Handle = match kind {
            ObjectKind::Node => handle(UnknownNode::from_raw(
                self.type_name.clone(),
                self.id.clone(),
                self.json.clone(),
            )),
            ObjectKind::Target => handle(UnknownTarget::from_raw(
                self.type_name.clone(),
                self.id.clone(),
                self.json.clone(),
            )),
            ObjectKind::SubTarget => handle(UnknownSubTarget::from_raw(
                self.type_name.clone(),
                self.id.clone(),
                self.json.clone(),
            )),
            ObjectKind::Any => return None,
        };
        self.casted = Some(shim.clone());
        Some(shim)
    }
}

impl GraphObject for UnknownObject {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn object_id(&self) -> &ObjectId {
        &self.id
    }

    fn assign_object_id(&mut self, id: ObjectId) {
        self.id = id;
    }

    fn decode(&mut self, _type_name: &str, json: &str) -> Result<()> {
        self.json = json.to_string();
        Ok(())
    }

    fn after_decode(&mut self, json: &str, ctx: &mut DecodeContext<'_>) -> Result<()> {
        // If something already reclassified this placeholder, the shim needs
        // its own decode pass over the same payload.
        if let Some(casted) = &self.casted {
            ctx.enqueue(casted.clone(), json.trim())?;
        }
        Ok(())
    }

    fn after_all_decoded(&mut self, _json: &str, ctx: &mut DecodeContext<'_>) -> Result<()> {
        if self.casted.is_none() {
            // Never got reclassified, so nothing live referenced this
            // fragment. Keep the bytes so the next save can emit them.
            ctx.preserve_orphan(&self.id, self.json.trim());
        }
        Ok(())
    }

    fn encode(&self, _ctx: &mut EncodeContext) -> Result<String> {
        Ok(self.json.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Shim standing in for a graph node whose type could not be found.
pub struct UnknownNode {
    id: ObjectId,
    type_name: String,
    json: String,
}

impl UnknownNode {
    pub(crate) fn from_raw(type_name: String, id: ObjectId, json: String) -> Self {
        Self {
            id,
            type_name,
            json,
        }
    }

    pub fn json(&self) -> &str {
        &self.json
    }
}

impl GraphObject for UnknownNode {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn object_id(&self) -> &ObjectId {
        &self.id
    }

    fn assign_object_id(&mut self, id: ObjectId) {
        self.id = id;
    }

    fn decode(&mut self, _type_name: &str, json: &str) -> Result<()> {
        self.json = json.to_string();
        Ok(())
    }

    fn encode(&self, _ctx: &mut EncodeContext) -> Result<String> {
        Ok(self.json.trim().to_string())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_node(&self) -> Option<&dyn NodeBehavior> {
        Some(self)
    }
}

impl NodeBehavior for UnknownNode {
    fn is_active(&self) -> bool {
        false
    }

    fn is_valid(&self) -> bool {
        false
    }

    fn validate(&self, warnings: &mut Vec<ValidationWarning>) {
        warnings.push(ValidationWarning {
            object_id: self.id.clone(),
            message: format!(
                "node type '{}' could not be found; no function will be generated for it",
                self.type_name
            ),
        });
    }
}

/// Shim standing in for a target whose type could not be found.
pub struct UnknownTarget {
    id: ObjectId,
    display_name: String,
    hidden: bool,
    json: String,
}

impl UnknownTarget {
    pub(crate) fn from_raw(display_name: String, id: ObjectId, json: String) -> Self {
        Self {
            id,
            display_name,
            hidden: false,
            json,
        }
    }

    pub fn json(&self) -> &str {
        &self.json
    }
}

impl GraphObject for UnknownTarget {
    fn type_name(&self) -> &str {
        &self.display_name
    }

    fn object_id(&self) -> &ObjectId {
        &self.id
    }

    fn assign_object_id(&mut self, id: ObjectId) {
        self.id = id;
    }

    fn decode(&mut self, _type_name: &str, json: &str) -> Result<()> {
        self.json = json.to_string();
        Ok(())
    }

    fn encode(&self, _ctx: &mut EncodeContext) -> Result<String> {
        Ok(self.json.trim().to_string())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_target(&self) -> Option<&dyn TargetBehavior> {
        Some(self)
    }
}

impl TargetBehavior for UnknownTarget {
    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn is_hidden(&self) -> bool {
        self.hidden
    }

    fn is_active(&self) -> bool {
        false
    }
}

/// Shim standing in for a sub-target whose type could not be found.
pub struct UnknownSubTarget {
    id: ObjectId,
    display_name: String,
    hidden: bool,
    json: String,
}

impl UnknownSubTarget {
    pub(crate) fn from_raw(display_name: String, id: ObjectId, json: String) -> Self {
        Self {
            id,
            display_name,
            hidden: false,
            json,
        }
    }

    pub fn json(&self) -> &str {
        &self.json
    }
}

impl GraphObject for UnknownSubTarget {
    fn type_name(&self) -> &str {
        &self.display_name
    }

    fn object_id(&self) -> &ObjectId {
        &self.id
    }

    fn assign_object_id(&mut self, id: ObjectId) {
        self.id = id;
    }

    fn decode(&mut self, _type_name: &str, json: &str) -> Result<()> {
        self.json = json.to_string();
        Ok(())
    }

    fn encode(&self, _ctx: &mut EncodeContext) -> Result<String> {
        Ok(self.json.trim().to_string())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_sub_target(&self) -> Option<&dyn SubTargetBehavior> {
        Some(self)
    }
}

impl SubTargetBehavior for UnknownSubTarget {
    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn is_hidden(&self) -> bool {
        self.hidden
    }

    fn is_active(&self) -> bool {
        false
    }

    fn target_type_name(&self) -> &str {
        "UnknownTarget"
    }
}
