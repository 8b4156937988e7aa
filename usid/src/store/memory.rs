//! An `ArrayStore` that keeps everything in memory. Useful for tests and for
//! assembling data before handing it to a persistent store.

use std::collections::BTreeMap;

use log::debug;

use crate::error::{UsidError, UsidResult};
use crate::store::*;

/// What a node holds.
#[derive(Clone, Debug)]
enum Payload {
  /// A group and its children, in creation order.
  Group(Vec<NodeId>),
  /// An array and the storage hints it was created with.
  Array(ArrayData, Storage)
}

/// One object in the store.
#[derive(Clone, Debug)]
struct Node {
  /// Its name within the parent.
  name: String,
  /// Its parent, `None` for the root.
  parent: Option<NodeId>,
  /// The contents.
  payload: Payload,
  /// The attributes.
  attrs: Attributes,
  /// Outgoing typed links.
  links: BTreeMap<AncillaryRole, NodeId>,
  /// Region labels, arrays only.
  regions: BTreeMap<String, RegionSlice>
}

/// An in-memory store. Removed nodes leave a hole so that ids stay stable and
/// links to them dangle instead of pointing elsewhere.
#[derive(Clone, Debug)]
pub struct MemoryStore {
  /// All nodes ever created; index 0 is the root.
  nodes: Vec<Option<Node>>
}

impl Default for MemoryStore {
  fn default() -> Self {
    return Self::new();
  }
}

impl MemoryStore {
  /// Creates an empty store with just a root group.
  pub fn new() -> Self {
    let root = Node {
      name: String::new(),
      parent: None,
      payload: Payload::Group(Vec::new()),
      attrs: Attributes::default(),
      links: BTreeMap::new(),
      regions: BTreeMap::new()
    };
    return Self { nodes: vec![Some(root)] };
  }

  /// The storage hints an array was created with.
  pub fn storage(&self, node: NodeId) -> UsidResult<&Storage> {
    return match &self.node(node)?.payload {
      Payload::Array(_, storage) => Ok(storage),
      Payload::Group(_) => Err(self.not_an_array(node)),
    };
  }

  /// Gets a live node.
  fn node(&self, id: NodeId) -> UsidResult<&Node> {
    return self.nodes.get(id.0)
      .and_then(|n| n.as_ref())
      .ok_or_else(|| UsidError::MissingNode(format!("object {}", id)));
  }

  /// Gets a live node, mutably.
  fn node_mut(&mut self, id: NodeId) -> UsidResult<&mut Node> {
    return self.nodes.get_mut(id.0)
      .and_then(|n| n.as_mut())
      .ok_or_else(|| UsidError::MissingNode(format!("object {}", id)));
  }

  /// The error for array operations applied to groups.
  fn not_an_array(&self, id: NodeId) -> UsidError {
    return UsidError::type_mismatch(self.path(id), "an array, found a group");
  }

  /// Adds a node under a group, checking the name is free.
  fn insert(
    &mut self,
    parent: NodeId,
    name: &str,
    payload: Payload
  ) -> UsidResult<NodeId> {
    if name.is_empty() || name.contains('/') {
      return Err(UsidError::type_mismatch(
        "name",
        format!("a non-empty name without slashes, got \"{}\"", name)
      ));
    }
    if !matches!(self.node(parent)?.payload, Payload::Group(_)) {
      return Err(UsidError::type_mismatch(
        self.path(parent),
        "a group, found an array"
      ));
    }
    if self.child(parent, name).is_some() {
      return Err(UsidError::NameConflict(format!(
        "{}/{} already exists",
        self.path(parent).trim_end_matches('/'),
        name
      )));
    }
    let id = NodeId(self.nodes.len());
    self.nodes.push(Some(Node {
      name: name.to_string(),
      parent: Some(parent),
      payload,
      attrs: Attributes::default(),
      links: BTreeMap::new(),
      regions: BTreeMap::new()
    }));
    if let Payload::Group(children) = &mut self.node_mut(parent)?.payload {
      children.push(id);
    }
    debug!("created {}", self.path(id));
    return Ok(id);
  }
}

impl ArrayStore for MemoryStore {
  fn root(&self) -> NodeId {
    return NodeId(0);
  }

  fn kind(&self, node: NodeId) -> UsidResult<NodeKind> {
    return Ok(match self.node(node)?.payload {
      Payload::Group(_) => NodeKind::Group,
      Payload::Array(..) => NodeKind::Array,
    });
  }

  fn name(&self, node: NodeId) -> UsidResult<String> {
    return Ok(self.node(node)?.name.clone());
  }

  fn parent(&self, node: NodeId) -> UsidResult<Option<NodeId>> {
    return Ok(self.node(node)?.parent);
  }

  fn children(&self, node: NodeId) -> UsidResult<Vec<NodeId>> {
    return match &self.node(node)?.payload {
      Payload::Group(children) => Ok(children.clone()),
      Payload::Array(..) => Ok(Vec::new()),
    };
  }

  fn child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
    let children = match &self.node(parent).ok()?.payload {
      Payload::Group(children) => children,
      Payload::Array(..) => return None,
    };
    return children.iter()
      .copied()
      .find(|c| self.node(*c).map(|n| n.name == name).unwrap_or(false));
  }

  fn create_group(&mut self, parent: NodeId, name: &str)
    -> UsidResult<NodeId> {
    return self.insert(parent, name, Payload::Group(Vec::new()));
  }

  fn create_array(
    &mut self,
    parent: NodeId,
    name: &str,
    data: ArrayData,
    storage: &Storage
  ) -> UsidResult<NodeId> {
    storage.validate(data.shape())?;
    return self.insert(parent, name, Payload::Array(data, storage.clone()));
  }

  fn remove(&mut self, node: NodeId) -> UsidResult<()> {
    let parent = match self.node(node)?.parent {
      Some(p) => p,
      None => return Err(UsidError::type_mismatch(
        "node",
        "anything but the root group"
      )),
    };
    debug!("removing {}", self.path(node));
    if let Payload::Group(children) = &mut self.node_mut(parent)?.payload {
      children.retain(|c| *c != node);
    }
    let mut pending = vec![node];
    while let Some(n) = pending.pop() {
      if let Some(Some(removed)) = self.nodes.get_mut(n.0).map(|n| n.take()) {
        if let Payload::Group(children) = removed.payload {
          pending.extend(children);
        }
      }
    }
    return Ok(());
  }

  fn shape(&self, node: NodeId) -> UsidResult<Vec<usize>> {
    return match &self.node(node)?.payload {
      Payload::Array(data, _) => Ok(data.shape().to_vec()),
      Payload::Group(_) => Err(self.not_an_array(node)),
    };
  }

  fn read(&self, node: NodeId) -> UsidResult<ArrayData> {
    return match &self.node(node)?.payload {
      Payload::Array(data, _) => Ok(data.clone()),
      Payload::Group(_) => Err(self.not_an_array(node)),
    };
  }

  fn read_region(&self, node: NodeId, region: &RegionSlice)
    -> UsidResult<ArrayData> {
    return match &self.node(node)?.payload {
      Payload::Array(data, _) => data.region(region),
      Payload::Group(_) => Err(self.not_an_array(node)),
    };
  }

  fn attributes(&self, node: NodeId) -> UsidResult<Attributes> {
    return Ok(self.node(node)?.attrs.clone());
  }

  fn write_attributes(&mut self, node: NodeId, attrs: Attributes)
    -> UsidResult<()> {
    self.node_mut(node)?.attrs = attrs;
    return Ok(());
  }

  fn link(&mut self, source: NodeId, role: AncillaryRole, target: NodeId)
    -> UsidResult<()> {
    self.node(target)?;
    self.node_mut(source)?.links.insert(role, target);
    return Ok(());
  }

  fn unlink(&mut self, source: NodeId, role: AncillaryRole) -> UsidResult<()> {
    let removed = self.node_mut(source)?.links.remove(&role);
    return match removed {
      Some(_) => Ok(()),
      None => Err(UsidError::MissingNode(format!(
        "{} link on {}",
        role,
        self.path(source)
      ))),
    };
  }

  fn resolve(&self, source: NodeId, role: AncillaryRole) -> Option<NodeId> {
    let target = *self.node(source).ok()?.links.get(&role)?;
    return self.node(target).ok().map(|_| target);
  }

  fn write_region(&mut self, node: NodeId, name: &str, region: RegionSlice)
    -> UsidResult<()> {
    let shape = self.shape(node)?;
    if shape.len() != 2 {
      return Err(UsidError::type_mismatch(
        self.path(node),
        format!("a 2-D array for region labels, got shape {:?}", shape)
      ));
    }
    region.resolve((shape[0], shape[1]))?;
    self.node_mut(node)?.regions.insert(name.to_string(), region);
    return Ok(());
  }

  fn regions(&self, node: NodeId)
    -> UsidResult<BTreeMap<String, RegionSlice>> {
    return Ok(self.node(node)?.regions.clone());
  }
}
