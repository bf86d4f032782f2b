//! Quarantine tree for data the schema could not place.
//!
//! [`ExtraFields`] mirrors the instance paths it was collected from but is a
//! separate type, so quarantined data can never be mistaken for canonical
//! data. Objects are stored as branches; everything else is a leaf.

use scenetrack_core::{Instance, ROOT_EXTRA_KEY};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf(Value),
    Branch(ExtraFields),
}

impl Node {
    fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Node::Branch(ExtraFields::from_map(map)),
            other => Node::Leaf(other),
        }
    }

    fn into_value(self) -> Value {
        match self {
            Node::Leaf(value) => value,
            Node::Branch(branch) => branch.into_value(),
        }
    }
}

/// Data received but not placed under the schema, keyed by instance path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtraFields {
    entries: Vec<(String, Node)>,
}

impl ExtraFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: Instance) -> Self {
        Self {
            entries: map
                .into_iter()
                .map(|(k, v)| (k, Node::from_value(v)))
                .collect(),
        }
    }

    /// Read an embedded `_extraFields` side-channel. A non-object side-channel
    /// is kept under the root key rather than dropped.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => Self::from_map(map.clone()),
            Value::Null => Self::new(),
            other => {
                let mut extra = Self::new();
                extra.insert(ROOT_EXTRA_KEY, other.clone());
                extra
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    /// Quarantine a value. On collision the new value takes precedence.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        let node = Node::from_value(value);
        match self.position(&key) {
            Some(i) => {
                let existing = std::mem::replace(&mut self.entries[i].1, Node::Leaf(Value::Null));
                self.entries[i].1 = combine(node, existing);
            }
            None => self.entries.push((key, node)),
        }
    }

    /// Quarantine a value only where the key is still free. An existing leaf
    /// wins over a leaf; branches still merge, the existing side taking
    /// precedence.
    pub fn insert_fallback(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        let node = Node::from_value(value);
        match self.position(&key) {
            Some(i) => {
                let existing = std::mem::replace(&mut self.entries[i].1, Node::Leaf(Value::Null));
                self.entries[i].1 = match (existing, node) {
                    (Node::Leaf(kept), Node::Leaf(_)) if !kept.is_null() => Node::Leaf(kept),
                    (existing, fallback) => combine(existing, fallback),
                };
            }
            None => self.entries.push((key, node)),
        }
    }

    fn rooted(value: Value) -> Self {
        Self {
            entries: vec![(ROOT_EXTRA_KEY.to_string(), Node::Leaf(value))],
        }
    }

    /// The nested sink at `key`, created on demand. A leaf already sitting at
    /// `key` moves under the root key of the new branch.
    pub fn child(&mut self, key: &str) -> &mut ExtraFields {
        let i = match self.position(key) {
            Some(i) => i,
            None => {
                self.entries
                    .push((key.to_string(), Node::Branch(ExtraFields::new())));
                self.entries.len() - 1
            }
        };
        let slot = &mut self.entries[i].1;
        if let Node::Leaf(value) = slot {
            let leaf = std::mem::take(value);
            *slot = Node::Branch(if leaf.is_null() {
                ExtraFields::new()
            } else {
                ExtraFields::rooted(leaf)
            });
        }
        match slot {
            Node::Branch(branch) => branch,
            Node::Leaf(_) => unreachable!("leaf slot converted to a branch above"),
        }
    }

    /// Deep-merge `previous` into `self`, `self` taking precedence.
    ///
    /// Collisions: equal values are kept once, branches merge recursively,
    /// a leaf meeting a branch joins it under the root key, two different
    /// strings become the list `[self, previous]`, a string joins an existing
    /// list if missing, anything else keeps `self`.
    pub fn absorb(&mut self, previous: ExtraFields) {
        for (key, node) in previous.entries {
            match self.position(&key) {
                Some(i) => {
                    let incoming =
                        std::mem::replace(&mut self.entries[i].1, Node::Leaf(Value::Null));
                    self.entries[i].1 = combine(incoming, node);
                }
                None => self.entries.push((key, node)),
            }
        }
    }

    /// Remove null leaves and empty branches, recursively.
    pub fn prune(&mut self) {
        self.entries.retain_mut(|(_, node)| match node {
            Node::Leaf(value) => !value.is_null(),
            Node::Branch(branch) => {
                branch.prune();
                !branch.is_empty()
            }
        });
    }

    pub fn into_map(self) -> Instance {
        self.entries
            .into_iter()
            .map(|(k, node)| (k, node.into_value()))
            .collect()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.into_map())
    }

    pub fn to_value(&self) -> Value {
        self.clone().into_value()
    }
}

fn combine(incoming: Node, previous: Node) -> Node {
    match (incoming, previous) {
        (Node::Branch(mut a), Node::Branch(b)) => {
            a.absorb(b);
            Node::Branch(a)
        }
        (Node::Leaf(a), Node::Leaf(b)) => Node::Leaf(combine_leaves(a, b)),
        (Node::Leaf(Value::Null), previous) => previous,
        (incoming, Node::Leaf(Value::Null)) => incoming,
        // A leaf meeting a branch moves under the root key, as in `child`.
        (Node::Leaf(a), Node::Branch(b)) => {
            let mut branch = ExtraFields::rooted(a);
            branch.absorb(b);
            Node::Branch(branch)
        }
        (Node::Branch(mut a), Node::Leaf(b)) => {
            a.absorb(ExtraFields::rooted(b));
            Node::Branch(a)
        }
    }
}

fn combine_leaves(incoming: Value, previous: Value) -> Value {
    match (incoming, previous) {
        (a, b) if a == b => a,
        (Value::Null, b) => b,
        (Value::String(a), Value::String(b)) => Value::Array(vec![a.into(), b.into()]),
        (Value::Array(mut items), Value::String(b)) => {
            let b = Value::String(b);
            if !items.contains(&b) {
                items.push(b);
            }
            Value::Array(items)
        }
        (a, _) => a,
    }
}
