#![allow(dead_code)]

//! A minimal concrete object model for exercising the codec: a material
//! graph root holding references to color nodes, plus a node kind whose
//! decode always fails.

use std::any::Any;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::json;

use node_forge_graph_io::{
    DecodeContext, EncodeContext, GraphObject, Handle, NodeBehavior, ObjectId, ObjectKind,
    ObjectRef, TypeRegistry, ValidationWarning, handle,
};

pub const GRAPH_TYPE: &str = "forge.MaterialGraph";
pub const COLOR_NODE_TYPE: &str = "forge.ColorNode";
pub const FAILING_NODE_TYPE: &str = "forge.FailingNode";

pub struct MaterialGraph {
    id: ObjectId,
    pub name: String,
    pub nodes: Vec<ObjectRef>,
    pub target: ObjectRef,
}

#[derive(Debug, Default, Deserialize)]
struct GraphPayload {
    #[serde(default)]
    name: String,
    #[serde(default)]
    nodes: Vec<String>,
    #[serde(default)]
    target: Option<String>,
}

impl MaterialGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ObjectId::generate(),
            name: name.into(),
            nodes: Vec::new(),
            target: ObjectRef::default(),
        }
    }

    fn resolve_references(&mut self, ctx: &mut DecodeContext<'_>) {
        for node in &mut self.nodes {
            node.resolve(ObjectKind::Node, ctx);
        }
        self.target.resolve(ObjectKind::Target, ctx);
    }
}

impl GraphObject for MaterialGraph {
    fn type_name(&self) -> &str {
        GRAPH_TYPE
    }

    fn object_id(&self) -> &ObjectId {
        &self.id
    }

    fn assign_object_id(&mut self, id: ObjectId) {
        self.id = id;
    }

    fn decode(&mut self, _type_name: &str, json: &str) -> Result<()> {
        let payload: GraphPayload =
            serde_json::from_str(json).context("parsing material graph payload")?;
        self.name = payload.name;
        self.nodes = payload
            .nodes
            .into_iter()
            .map(|id| ObjectRef::unresolved(ObjectId::from(id)))
            .collect();
        self.target = match payload.target {
            Some(id) => ObjectRef::unresolved(ObjectId::from(id)),
            None => ObjectRef::default(),
        };
        Ok(())
    }

    fn after_decode(&mut self, _json: &str, ctx: &mut DecodeContext<'_>) -> Result<()> {
        self.resolve_references(ctx);
        Ok(())
    }

    fn after_all_decoded(&mut self, _json: &str, ctx: &mut DecodeContext<'_>) -> Result<()> {
        // Second resolution attempt for anything that materialized late.
        self.resolve_references(ctx);
        Ok(())
    }

    fn encode(&self, ctx: &mut EncodeContext) -> Result<String> {
        let nodes: Vec<ObjectId> = self
            .nodes
            .iter()
            .filter_map(|node| ctx.reference(node))
            .collect();
        let mut value = json!({
            "type": GRAPH_TYPE,
            "id": self.id,
            "name": self.name,
            "nodes": nodes,
        });
        if let Some(target) = ctx.reference(&self.target) {
            value["target"] = json!(target);
        }
        Ok(serde_json::to_string_pretty(&value)?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub struct ColorNode {
    id: ObjectId,
    pub label: String,
    pub rgba: [f32; 4],
    pub next: ObjectRef,
}

#[derive(Debug, Default, Deserialize)]
struct ColorNodePayload {
    #[serde(default)]
    label: String,
    #[serde(default)]
    rgba: [f32; 4],
    #[serde(default)]
    next: Option<String>,
}

impl ColorNode {
    pub fn new(label: impl Into<String>, rgba: [f32; 4]) -> Self {
        Self {
            id: ObjectId::generate(),
            label: label.into(),
            rgba,
            next: ObjectRef::default(),
        }
    }
}

impl GraphObject for ColorNode {
    fn type_name(&self) -> &str {
        COLOR_NODE_TYPE
    }

    fn object_id(&self) -> &ObjectId {
        &self.id
    }

    fn assign_object_id(&mut self, id: ObjectId) {
        self.id = id;
    }

    fn decode(&mut self, _type_name: &str, json: &str) -> Result<()> {
        let payload: ColorNodePayload =
            serde_json::from_str(json).context("parsing color node payload")?;
        self.label = payload.label;
        self.rgba = payload.rgba;
        self.next = match payload.next {
            Some(id) => ObjectRef::unresolved(ObjectId::from(id)),
            None => ObjectRef::default(),
        };
        Ok(())
    }

    fn after_decode(&mut self, _json: &str, ctx: &mut DecodeContext<'_>) -> Result<()> {
        self.next.resolve(ObjectKind::Node, ctx);
        Ok(())
    }

    fn after_all_decoded(&mut self, _json: &str, ctx: &mut DecodeContext<'_>) -> Result<()> {
        self.next.resolve(ObjectKind::Node, ctx);
        Ok(())
    }

    fn encode(&self, ctx: &mut EncodeContext) -> Result<String> {
        let mut value = json!({
            "type": COLOR_NODE_TYPE,
            "id": self.id,
            "label": self.label,
            "rgba": self.rgba,
        });
        if let Some(next) = ctx.reference(&self.next) {
            value["next"] = json!(next);
        }
        Ok(serde_json::to_string_pretty(&value)?)
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

impl NodeBehavior for ColorNode {
    fn is_active(&self) -> bool {
        true
    }

    fn is_valid(&self) -> bool {
        true
    }

    fn validate(&self, _warnings: &mut Vec<ValidationWarning>) {}
}

/// A node kind whose payload decode always fails, for fault-isolation tests.
pub struct FailingNode {
    id: ObjectId,
}

impl FailingNode {
    pub fn new() -> Self {
        Self {
            id: ObjectId::generate(),
        }
    }
}

impl GraphObject for FailingNode {
    fn type_name(&self) -> &str {
        FAILING_NODE_TYPE
    }

    fn object_id(&self) -> &ObjectId {
        &self.id
    }

    fn assign_object_id(&mut self, id: ObjectId) {
        self.id = id;
    }

    fn decode(&mut self, _type_name: &str, _json: &str) -> Result<()> {
        bail!("corrupted payload");
    }

    fn encode(&self, _ctx: &mut EncodeContext) -> Result<String> {
        Ok(serde_json::to_string_pretty(&json!({
            "type": FAILING_NODE_TYPE,
            "id": self.id,
        }))?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register(GRAPH_TYPE, || Ok(handle(MaterialGraph::new(""))));
    registry.register(COLOR_NODE_TYPE, || Ok(handle(ColorNode::new("", [0.0; 4]))));
    registry.register(FAILING_NODE_TYPE, || Ok(handle(FailingNode::new())));
    registry
}

pub fn graph_of(root: &Handle) -> std::cell::Ref<'_, MaterialGraph> {
    std::cell::Ref::map(root.borrow(), |object| {
        object
            .as_any()
            .downcast_ref::<MaterialGraph>()
            .expect("root is a material graph")
    })
}

/// Build a live three-node graph: root -> [a, b, c], a.next = b, c.next = a
/// (a reference cycle through the chain is fine).
pub fn sample_graph() -> (Handle, Vec<Handle>) {
    let a = handle(ColorNode::new("base", [0.25, 0.5, 0.75, 1.0]));
    let b = handle(ColorNode::new("accent", [1.0, 0.0, 0.0, 1.0]));
    let c = handle(ColorNode::new("rim", [0.0, 0.0, 0.0, 0.5]));

    {
        let mut a_node = a.borrow_mut();
        let a_node = a_node.as_any_mut().downcast_mut::<ColorNode>().unwrap();
        a_node.next = ObjectRef::to_object(b.clone());
    }
    {
        let mut c_node = c.borrow_mut();
        let c_node = c_node.as_any_mut().downcast_mut::<ColorNode>().unwrap();
        c_node.next = ObjectRef::to_object(a.clone());
    }

    let mut graph = MaterialGraph::new("sample");
    graph.nodes = vec![
        ObjectRef::to_object(a.clone()),
        ObjectRef::to_object(b.clone()),
        ObjectRef::to_object(c.clone()),
    ];
    (handle(graph), vec![a, b, c])
}
