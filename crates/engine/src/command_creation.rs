//! Per-transaction command creation context (C6)
//!
//! [`CommandCreationContext`] is the engine's [`TxStateVisitor`]
//! implementation: the kernel walks its own logical transaction state
//! and calls one visit method per change; each call stages zero or more
//! record deltas into the wrapped [`RecordState`]. Relationship-chain
//! maintenance (spec §4.3: "inserting or removing a relationship
//! mutates up to four neighbouring relationship records plus the
//! owning node record") and the dense-node transition bundle both live
//! here, since both are driven purely by visiting created/deleted
//! relationships.

use crate::config::EngineConfig;
use crate::record_state::RecordState;
use crate::tx_state::{PropertyOwner, TxStateVisitor};
use graphkernel_core::command::{
    ChainDirection, ConstraintKind, CountsKey, NodeRecord, PropertyRecord, RelationshipGroupRecord,
    RelationshipRecord, SchemaRecord, TokenRecord,
};
use graphkernel_core::error::{Error, Result};
use graphkernel_core::ids::{
    NodeId, PropertyId, RelationshipGroupId, RelationshipId, SchemaId, TokenId,
};
use graphkernel_core::mode::RecordLoadMode;
use graphkernel_core::token::TokenKind;
use graphkernel_core::value::PropertyValue;
use graphkernel_storage::StoreRegistry;
use std::collections::HashMap;

/// Which side of a relationship's chain pointers a node occupies in
/// the simplified single-chain (non-dense) representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Start,
    End,
}

/// Accumulates one transaction's record-level changes by visiting its
/// logical tx-state (spec §3 "Record State", §4.3).
pub struct CommandCreationContext<'a> {
    registry: &'a StoreRegistry,
    config: &'a EngineConfig,
    state: RecordState,
}

impl<'a> CommandCreationContext<'a> {
    /// Begin a fresh transaction's record state against `registry`.
    pub fn new(registry: &'a StoreRegistry, config: &'a EngineConfig) -> Self {
        Self {
            registry,
            config,
            state: RecordState::new(),
        }
    }

    /// The staged record state so far.
    pub fn state(&self) -> &RecordState {
        &self.state
    }

    /// Consume the context, returning the accumulated record state for
    /// [`crate::command_extractor::CommandExtractor`].
    pub fn finish(self) -> RecordState {
        self.state
    }

    // -- record accessors -------------------------------------------------

    fn node_after(&mut self, id: NodeId) -> Result<NodeRecord> {
        let registry = self.registry;
        let change = self
            .state
            .nodes
            .load_or_create(id, || registry.nodes.read(id.id(), RecordLoadMode::Normal))?;
        change
            .after
            .clone()
            .ok_or_else(|| Error::Validation(format!("node {} not in use", id.id())))
    }

    fn set_node(&mut self, id: NodeId, record: NodeRecord) -> Result<()> {
        let registry = self.registry;
        self.state
            .nodes
            .set_after(id, Some(record), || registry.nodes.read(id.id(), RecordLoadMode::Normal))
    }

    fn relationship_after(&mut self, id: RelationshipId) -> Result<RelationshipRecord> {
        let registry = self.registry;
        let change = self.state.relationships.load_or_create(id, || {
            registry.relationships.read(id.id(), RecordLoadMode::Normal)
        })?;
        change
            .after
            .clone()
            .ok_or_else(|| Error::Validation(format!("relationship {} not in use", id.id())))
    }

    fn patch_relationship(&mut self, id: RelationshipId, f: impl FnOnce(&mut RelationshipRecord)) -> Result<()> {
        let registry = self.registry;
        let change = self.state.relationships.load_or_create(id, || {
            registry.relationships.read(id.id(), RecordLoadMode::Normal)
        })?;
        let mut rec = change.after.clone().unwrap_or(RelationshipRecord {
            first_node: NodeId::new(0),
            second_node: NodeId::new(0),
            rel_type: TokenId::new(0),
            first_prev_rel: None,
            first_next_rel: None,
            second_prev_rel: None,
            second_next_rel: None,
            next_prop: None,
        });
        f(&mut rec);
        change.after = Some(rec);
        Ok(())
    }

    fn relationship_group_after(&mut self, id: RelationshipGroupId) -> Result<RelationshipGroupRecord> {
        let registry = self.registry;
        let change = self.state.relationship_groups.load_or_create(id, || {
            registry.relationship_groups.read(id.id(), RecordLoadMode::Normal)
        })?;
        change
            .after
            .clone()
            .ok_or_else(|| Error::Validation(format!("relationship group {} not in use", id.id())))
    }

    fn set_relationship_group(&mut self, id: RelationshipGroupId, record: RelationshipGroupRecord) -> Result<()> {
        let registry = self.registry;
        self.state.relationship_groups.set_after(id, Some(record), || {
            registry.relationship_groups.read(id.id(), RecordLoadMode::Normal)
        })
    }

    fn property_after(&mut self, id: PropertyId) -> Result<PropertyRecord> {
        let registry = self.registry;
        let change = self.state.properties.load_or_create(id, || {
            Ok(registry
                .properties
                .read(id)?
                .map(|(key, value, next)| PropertyRecord { key, value, next }))
        })?;
        change
            .after
            .clone()
            .ok_or_else(|| Error::Validation(format!("property {} not in use", id.id())))
    }

    fn set_property(&mut self, id: PropertyId, record: Option<PropertyRecord>) -> Result<()> {
        let registry = self.registry;
        self.state.properties.set_after(id, record, || {
            Ok(registry
                .properties
                .read(id)?
                .map(|(key, value, next)| PropertyRecord { key, value, next }))
        })
    }

    fn head_for_owner(&mut self, owner: PropertyOwner) -> Result<Option<PropertyId>> {
        match owner {
            PropertyOwner::Node(id) => Ok(self.node_after(id)?.next_prop),
            PropertyOwner::Relationship(id) => Ok(self.relationship_after(id)?.next_prop),
        }
    }

    fn set_owner_head(&mut self, owner: PropertyOwner, head: Option<PropertyId>) -> Result<()> {
        match owner {
            PropertyOwner::Node(id) => {
                let mut rec = self.node_after(id)?;
                rec.next_prop = head;
                self.set_node(id, rec)
            }
            PropertyOwner::Relationship(id) => self.patch_relationship(id, |r| r.next_prop = head),
        }
    }

    fn find_group(&mut self, node: NodeId, rel_type: TokenId) -> Result<Option<RelationshipGroupId>> {
        let node_rec = self.node_after(node)?;
        let mut current = node_rec.relationship_group;
        while let Some(gid) = current {
            let group = self.relationship_group_after(gid)?;
            if group.rel_type == rel_type {
                return Ok(Some(gid));
            }
            current = group.next;
        }
        Ok(None)
    }

    fn find_or_create_group(&mut self, node: NodeId, rel_type: TokenId) -> Result<RelationshipGroupId> {
        if let Some(gid) = self.find_group(node, rel_type)? {
            return Ok(gid);
        }
        let new_gid = RelationshipGroupId::new(self.registry.relationship_group_ids.allocate()?);
        let mut node_rec = self.node_after(node)?;
        let record = RelationshipGroupRecord {
            owning_node: node,
            rel_type,
            first_out: None,
            first_in: None,
            first_loop: None,
            next: node_rec.relationship_group,
        };
        self.set_relationship_group(new_gid, record)?;
        node_rec.relationship_group = Some(new_gid);
        self.set_node(node, node_rec)?;
        Ok(new_gid)
    }

    // -- relationship chain maintenance -----------------------------------

    fn link_new_relationship_into_chain(&mut self, new_id: RelationshipId, node: NodeId, endpoint: Endpoint) -> Result<()> {
        let mut node_rec = self.node_after(node)?;
        let old_head = node_rec.next_rel;
        node_rec.next_rel = Some(new_id);
        self.set_node(node, node_rec)?;

        self.patch_relationship(new_id, |r| match endpoint {
            Endpoint::Start => {
                r.first_prev_rel = None;
                r.first_next_rel = old_head;
            }
            Endpoint::End => {
                r.second_prev_rel = None;
                r.second_next_rel = old_head;
            }
        })?;

        if let Some(old_head_id) = old_head {
            let old_head_rec = self.relationship_after(old_head_id)?;
            let old_is_first_side = old_head_rec.first_node == node;
            self.patch_relationship(old_head_id, |r| {
                if old_is_first_side {
                    r.first_prev_rel = Some(new_id);
                } else {
                    r.second_prev_rel = Some(new_id);
                }
            })?;
        }
        Ok(())
    }

    /// Self-loops occupy one chain position shared by both `first_*`
    /// and `second_*` pointer pairs rather than two, avoiding a cycle
    /// that a single insertion call would otherwise create by reading
    /// its own just-updated head back as its neighbour.
    fn link_new_self_loop(&mut self, new_id: RelationshipId, node: NodeId) -> Result<()> {
        let mut node_rec = self.node_after(node)?;
        let old_head = node_rec.next_rel;
        node_rec.next_rel = Some(new_id);
        self.set_node(node, node_rec)?;

        self.patch_relationship(new_id, |r| {
            r.first_prev_rel = None;
            r.first_next_rel = old_head;
            r.second_prev_rel = None;
            r.second_next_rel = old_head;
        })?;

        if let Some(old_head_id) = old_head {
            let old_head_rec = self.relationship_after(old_head_id)?;
            let on_first_side = old_head_rec.first_node == node;
            let on_second_side = old_head_rec.second_node == node;
            self.patch_relationship(old_head_id, |r| {
                if on_first_side {
                    r.first_prev_rel = Some(new_id);
                }
                if on_second_side {
                    r.second_prev_rel = Some(new_id);
                }
            })?;
        }
        Ok(())
    }

    fn link_new_relationship_into_group(
        &mut self,
        new_id: RelationshipId,
        rel_type: TokenId,
        node: NodeId,
        direction: ChainDirection,
    ) -> Result<()> {
        let gid = self.find_or_create_group(node, rel_type)?;
        let mut group = self.relationship_group_after(gid)?;
        let old_head = match direction {
            ChainDirection::Outgoing => group.first_out,
            ChainDirection::Incoming => group.first_in,
            ChainDirection::Loop => group.first_loop,
        };
        match direction {
            ChainDirection::Outgoing => group.first_out = Some(new_id),
            ChainDirection::Incoming => group.first_in = Some(new_id),
            ChainDirection::Loop => group.first_loop = Some(new_id),
        }
        self.set_relationship_group(gid, group)?;

        let use_first_side = matches!(direction, ChainDirection::Outgoing | ChainDirection::Loop);
        let use_second_side = matches!(direction, ChainDirection::Incoming | ChainDirection::Loop);
        self.patch_relationship(new_id, |r| {
            if use_first_side {
                r.first_prev_rel = None;
                r.first_next_rel = old_head;
            }
            if use_second_side {
                r.second_prev_rel = None;
                r.second_next_rel = old_head;
            }
        })?;

        if let Some(old_head_id) = old_head {
            self.patch_relationship(old_head_id, |r| {
                if use_first_side {
                    r.first_prev_rel = Some(new_id);
                }
                if use_second_side {
                    r.second_prev_rel = Some(new_id);
                }
            })?;
        }

        self.state.degrees.apply_delta(gid, direction, 1);
        Ok(())
    }

    fn insert_relationship_endpoint(
        &mut self,
        new_id: RelationshipId,
        rel_type: TokenId,
        node: NodeId,
        direction: ChainDirection,
        endpoint: Endpoint,
    ) -> Result<()> {
        let node_rec = self.node_after(node)?;
        if node_rec.is_dense {
            self.link_new_relationship_into_group(new_id, rel_type, node, direction)
        } else {
            self.link_new_relationship_into_chain(new_id, node, endpoint)
        }
    }

    fn unlink_endpoint(&mut self, id: RelationshipId, node: NodeId, endpoint: Endpoint) -> Result<()> {
        let rec = self.relationship_after(id)?;
        let (prev, next) = match endpoint {
            Endpoint::Start => (rec.first_prev_rel, rec.first_next_rel),
            Endpoint::End => (rec.second_prev_rel, rec.second_next_rel),
        };

        if let Some(prev_id) = prev {
            let prev_rec = self.relationship_after(prev_id)?;
            let prev_is_first_side = prev_rec.first_node == node;
            self.patch_relationship(prev_id, |r| {
                if prev_is_first_side {
                    r.first_next_rel = next;
                } else {
                    r.second_next_rel = next;
                }
            })?;
        }
        if let Some(next_id) = next {
            let next_rec = self.relationship_after(next_id)?;
            let next_is_first_side = next_rec.first_node == node;
            self.patch_relationship(next_id, |r| {
                if next_is_first_side {
                    r.first_prev_rel = prev;
                } else {
                    r.second_prev_rel = prev;
                }
            })?;
        }

        let direction = match endpoint {
            Endpoint::Start => ChainDirection::Outgoing,
            Endpoint::End => ChainDirection::Incoming,
        };
        let node_rec = self.node_after(node)?;
        if node_rec.is_dense {
            if let Some(gid) = self.find_group(node, rec.rel_type)? {
                if prev.is_none() {
                    let mut group = self.relationship_group_after(gid)?;
                    match direction {
                        ChainDirection::Outgoing => group.first_out = next,
                        ChainDirection::Incoming => group.first_in = next,
                        ChainDirection::Loop => group.first_loop = next,
                    }
                    self.set_relationship_group(gid, group)?;
                }
                self.state.degrees.apply_delta(gid, direction, -1);
            }
        } else if prev.is_none() {
            let mut node_rec = node_rec;
            node_rec.next_rel = next;
            self.set_node(node, node_rec)?;
        }
        Ok(())
    }

    fn unlink_self_loop(&mut self, id: RelationshipId, node: NodeId) -> Result<()> {
        let rec = self.relationship_after(id)?;
        let prev = rec.first_prev_rel;
        let next = rec.first_next_rel;

        if let Some(prev_id) = prev {
            let prev_rec = self.relationship_after(prev_id)?;
            let on_first = prev_rec.first_node == node;
            let on_second = prev_rec.second_node == node;
            self.patch_relationship(prev_id, |r| {
                if on_first {
                    r.first_next_rel = next;
                }
                if on_second {
                    r.second_next_rel = next;
                }
            })?;
        }
        if let Some(next_id) = next {
            let next_rec = self.relationship_after(next_id)?;
            let on_first = next_rec.first_node == node;
            let on_second = next_rec.second_node == node;
            self.patch_relationship(next_id, |r| {
                if on_first {
                    r.first_prev_rel = prev;
                }
                if on_second {
                    r.second_prev_rel = prev;
                }
            })?;
        }

        let node_rec = self.node_after(node)?;
        if node_rec.is_dense {
            if let Some(gid) = self.find_group(node, rec.rel_type)? {
                if prev.is_none() {
                    let mut group = self.relationship_group_after(gid)?;
                    group.first_loop = next;
                    self.set_relationship_group(gid, group)?;
                }
                self.state.degrees.apply_delta(gid, ChainDirection::Loop, -1);
            }
        } else if prev.is_none() {
            let mut node_rec = node_rec;
            node_rec.next_rel = next;
            self.set_node(node, node_rec)?;
        }
        Ok(())
    }

    fn bump_relationship_counts(&mut self, rel_type: TokenId, delta: i64) {
        self.state.counts.apply_delta(
            CountsKey {
                label: None,
                rel_type: Some(rel_type),
                other_label: None,
            },
            delta,
        );
    }

    /// Walk `node`'s chain (sparse representation only) and, once its
    /// length reaches the configured threshold, rehome every
    /// relationship into per-type relationship-group records (spec
    /// §4.3 "Dense node threshold").
    fn maybe_convert_to_dense(&mut self, node: NodeId) -> Result<()> {
        let node_rec = self.node_after(node)?;
        if node_rec.is_dense {
            return Ok(());
        }
        let threshold = self.config.dense_node_threshold as usize;
        if threshold == 0 {
            return Ok(());
        }

        let mut entries = Vec::new();
        let mut current = node_rec.next_rel;
        let bound = threshold.saturating_mul(4) + 64;
        while let Some(rid) = current {
            if entries.len() > bound {
                break;
            }
            let rec = self.relationship_after(rid)?;
            let direction = if rec.first_node == node && rec.second_node == node {
                ChainDirection::Loop
            } else if rec.first_node == node {
                ChainDirection::Outgoing
            } else {
                ChainDirection::Incoming
            };
            let next = if direction == ChainDirection::Incoming {
                rec.second_next_rel
            } else {
                rec.first_next_rel
            };
            entries.push((rid, rec.rel_type, direction));
            current = next;
        }

        if entries.len() < threshold {
            return Ok(());
        }
        self.convert_to_dense(node, entries)
    }

    fn convert_to_dense(
        &mut self,
        node: NodeId,
        entries: Vec<(RelationshipId, TokenId, ChainDirection)>,
    ) -> Result<()> {
        let mut order: Vec<TokenId> = Vec::new();
        let mut buckets: HashMap<TokenId, Vec<(RelationshipId, ChainDirection)>> = HashMap::new();
        for (rid, rel_type, dir) in entries {
            buckets.entry(rel_type).or_insert_with(|| {
                order.push(rel_type);
                Vec::new()
            });
            buckets.get_mut(&rel_type).unwrap().push((rid, dir));
        }

        let mut head_group: Option<RelationshipGroupId> = None;
        for rel_type in order {
            let bucket = buckets.remove(&rel_type).unwrap_or_default();
            let gid = RelationshipGroupId::new(self.registry.relationship_group_ids.allocate()?);

            let mut first_out = None;
            let mut first_in = None;
            let mut first_loop = None;
            for direction in [ChainDirection::Outgoing, ChainDirection::Incoming, ChainDirection::Loop] {
                let ids: Vec<RelationshipId> = bucket
                    .iter()
                    .filter(|(_, d)| *d == direction)
                    .map(|(id, _)| *id)
                    .collect();
                if ids.is_empty() {
                    continue;
                }
                for (i, rid) in ids.iter().enumerate() {
                    let prev = if i == 0 { None } else { Some(ids[i - 1]) };
                    let next = ids.get(i + 1).copied();
                    self.patch_relationship(*rid, |r| match direction {
                        ChainDirection::Outgoing => {
                            r.first_prev_rel = prev;
                            r.first_next_rel = next;
                        }
                        ChainDirection::Incoming => {
                            r.second_prev_rel = prev;
                            r.second_next_rel = next;
                        }
                        ChainDirection::Loop => {
                            r.first_prev_rel = prev;
                            r.first_next_rel = next;
                            r.second_prev_rel = prev;
                            r.second_next_rel = next;
                        }
                    })?;
                }
                let head = Some(ids[0]);
                match direction {
                    ChainDirection::Outgoing => first_out = head,
                    ChainDirection::Incoming => first_in = head,
                    ChainDirection::Loop => first_loop = head,
                }
                self.state.degrees.apply_delta(gid, direction, ids.len() as i64);
            }

            let record = RelationshipGroupRecord {
                owning_node: node,
                rel_type,
                first_out,
                first_in,
                first_loop,
                next: head_group,
            };
            self.set_relationship_group(gid, record)?;
            head_group = Some(gid);
        }

        let mut node_rec = self.node_after(node)?;
        node_rec.is_dense = true;
        node_rec.relationship_group = head_group;
        node_rec.next_rel = None;
        self.set_node(node, node_rec)?;
        Ok(())
    }
}

impl<'a> TxStateVisitor for CommandCreationContext<'a> {
    fn visit_created_node(&mut self, id: NodeId, labels: &[TokenId]) -> Result<()> {
        let record = NodeRecord {
            next_rel: None,
            next_prop: None,
            labels: labels.iter().copied().collect(),
            is_dense: false,
            relationship_group: None,
        };
        self.set_node(id, record)?;
        for label in labels {
            self.state.counts.apply_delta(
                CountsKey {
                    label: Some(*label),
                    rel_type: None,
                    other_label: None,
                },
                1,
            );
        }
        Ok(())
    }

    fn visit_deleted_node(&mut self, id: NodeId) -> Result<()> {
        let node_rec = self.node_after(id)?;
        for label in node_rec.labels.iter() {
            self.state.counts.apply_delta(
                CountsKey {
                    label: Some(*label),
                    rel_type: None,
                    other_label: None,
                },
                -1,
            );
        }
        // Captured before `after` is nulled below: this is the node's
        // live record, reflecting every unlink this same transaction
        // already staged, not the pre-transaction snapshot in `before`.
        self.state.deleted_nodes_last_seen.insert(id, node_rec);
        let registry = self.registry;
        self.state
            .nodes
            .set_after(id, None, || registry.nodes.read(id.id(), RecordLoadMode::Normal))
    }

    fn visit_node_label_change(&mut self, id: NodeId, added: &[TokenId], removed: &[TokenId]) -> Result<()> {
        let mut node_rec = self.node_after(id)?;
        for label in removed {
            node_rec.labels.retain(|l| l != label);
            self.state.counts.apply_delta(
                CountsKey {
                    label: Some(*label),
                    rel_type: None,
                    other_label: None,
                },
                -1,
            );
        }
        for label in added {
            if !node_rec.labels.contains(label) {
                node_rec.labels.push(*label);
            }
            self.state.counts.apply_delta(
                CountsKey {
                    label: Some(*label),
                    rel_type: None,
                    other_label: None,
                },
                1,
            );
        }
        self.set_node(id, node_rec)
    }

    fn visit_created_relationship(
        &mut self,
        id: RelationshipId,
        rel_type: TokenId,
        start: NodeId,
        end: NodeId,
    ) -> Result<()> {
        if start == end {
            let node_rec = self.node_after(start)?;
            if node_rec.is_dense {
                self.link_new_relationship_into_group(id, rel_type, start, ChainDirection::Loop)?;
            } else {
                self.link_new_self_loop(id, start)?;
            }
        } else {
            self.insert_relationship_endpoint(id, rel_type, start, ChainDirection::Outgoing, Endpoint::Start)?;
            self.insert_relationship_endpoint(id, rel_type, end, ChainDirection::Incoming, Endpoint::End)?;
        }

        self.patch_relationship(id, |r| {
            r.first_node = start;
            r.second_node = end;
            r.rel_type = rel_type;
        })?;
        self.bump_relationship_counts(rel_type, 1);

        if start == end {
            self.maybe_convert_to_dense(start)?;
        } else {
            self.maybe_convert_to_dense(start)?;
            self.maybe_convert_to_dense(end)?;
        }
        Ok(())
    }

    fn visit_deleted_relationship(&mut self, id: RelationshipId) -> Result<()> {
        let rec = self.relationship_after(id)?;
        let start = rec.first_node;
        let end = rec.second_node;
        let rel_type = rec.rel_type;

        if start == end {
            self.unlink_self_loop(id, start)?;
        } else {
            self.unlink_endpoint(id, start, Endpoint::Start)?;
            self.unlink_endpoint(id, end, Endpoint::End)?;
        }
        self.bump_relationship_counts(rel_type, -1);

        let registry = self.registry;
        self.state.relationships.set_after(id, None, || {
            registry.relationships.read(id.id(), RecordLoadMode::Normal)
        })
    }

    fn visit_property_change(
        &mut self,
        owner: PropertyOwner,
        key: TokenId,
        value: Option<PropertyValue>,
    ) -> Result<()> {
        let head = self.head_for_owner(owner)?;
        let mut prev: Option<PropertyId> = None;
        let mut current = head;
        let mut found: Option<PropertyId> = None;
        while let Some(pid) = current {
            let rec = self.property_after(pid)?;
            if rec.key == key {
                found = Some(pid);
                break;
            }
            prev = Some(pid);
            current = rec.next;
        }

        match (found, value) {
            (Some(pid), Some(new_value)) => {
                let rec = self.property_after(pid)?;
                self.set_property(
                    pid,
                    Some(PropertyRecord {
                        key,
                        value: new_value,
                        next: rec.next,
                    }),
                )
            }
            (Some(pid), None) => {
                let rec = self.property_after(pid)?;
                let next = rec.next;
                match prev {
                    Some(prev_id) => {
                        let mut prev_rec = self.property_after(prev_id)?;
                        prev_rec.next = next;
                        self.set_property(prev_id, Some(prev_rec))?;
                    }
                    None => self.set_owner_head(owner, next)?,
                }
                self.set_property(pid, None)
            }
            (None, Some(new_value)) => {
                let new_id = PropertyId::new(self.registry.properties.new_id()?);
                self.set_property(
                    new_id,
                    Some(PropertyRecord {
                        key,
                        value: new_value,
                        next: head,
                    }),
                )?;
                self.set_owner_head(owner, Some(new_id))
            }
            (None, None) => Ok(()),
        }
    }

    fn visit_created_schema_rule(
        &mut self,
        id: SchemaId,
        kind: ConstraintKind,
        label_or_rel_type: TokenId,
        property_keys: &[TokenId],
    ) -> Result<()> {
        let record = SchemaRecord {
            kind,
            label_or_rel_type,
            property_keys: property_keys.iter().copied().collect(),
        };
        let registry = self.registry;
        self.state
            .schema
            .set_after(id, Some(record), || registry.schema.read(id.id(), RecordLoadMode::Normal))
    }

    fn visit_dropped_schema_rule(&mut self, id: SchemaId) -> Result<()> {
        let registry = self.registry;
        self.state
            .schema
            .set_after(id, None, || registry.schema.read(id.id(), RecordLoadMode::Normal))
    }

    fn visit_created_token(&mut self, id: TokenId, kind: TokenKind, name: &str) -> Result<()> {
        let record = TokenRecord {
            kind,
            name: name.to_string(),
        };
        let registry = self.registry;
        self.state
            .tokens
            .set_after(id, Some(record), || registry.tokens.read(id.id(), RecordLoadMode::Normal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphkernel_core::ids::TokenId as Tid;
    use graphkernel_storage::StoreRegistry;

    fn open() -> (tempfile::TempDir, StoreRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let registry = StoreRegistry::open(dir.path()).unwrap();
        (dir, registry)
    }

    #[test]
    fn creating_a_node_stages_labels_and_bumps_counts() {
        let (_dir, registry) = open();
        let config = EngineConfig::builder().build();
        let mut ctx = CommandCreationContext::new(&registry, &config);
        ctx.visit_created_node(NodeId::new(1), &[Tid::new(10)]).unwrap();
        let state = ctx.finish();
        let node = state.nodes.get(NodeId::new(1)).unwrap();
        assert_eq!(node.before, None);
        assert_eq!(node.after.as_ref().unwrap().labels.as_slice(), &[Tid::new(10)]);
        assert_eq!(
            state.counts.ascending(),
            vec![(
                CountsKey {
                    label: Some(Tid::new(10)),
                    rel_type: None,
                    other_label: None
                },
                1
            )]
        );
    }

    #[test]
    fn creating_a_relationship_links_both_node_chains() {
        let (_dir, registry) = open();
        let config = EngineConfig::builder().build();
        let mut ctx = CommandCreationContext::new(&registry, &config);
        ctx.visit_created_node(NodeId::new(1), &[]).unwrap();
        ctx.visit_created_node(NodeId::new(2), &[]).unwrap();
        ctx.visit_created_relationship(RelationshipId::new(1), Tid::new(5), NodeId::new(1), NodeId::new(2))
            .unwrap();
        let state = ctx.finish();
        assert_eq!(
            state.nodes.get(NodeId::new(1)).unwrap().after.as_ref().unwrap().next_rel,
            Some(RelationshipId::new(1))
        );
        assert_eq!(
            state.nodes.get(NodeId::new(2)).unwrap().after.as_ref().unwrap().next_rel,
            Some(RelationshipId::new(1))
        );
        let rel = state
            .relationships
            .get(RelationshipId::new(1))
            .unwrap()
            .after
            .as_ref()
            .unwrap();
        assert_eq!(rel.first_node, NodeId::new(1));
        assert_eq!(rel.second_node, NodeId::new(2));
        assert_eq!(rel.first_prev_rel, None);
        assert_eq!(rel.second_prev_rel, None);
    }

    #[test]
    fn crossing_the_dense_threshold_moves_node_to_relationship_groups() {
        let (_dir, registry) = open();
        let config = EngineConfig::builder().dense_node_threshold(3).build();
        let mut ctx = CommandCreationContext::new(&registry, &config);
        ctx.visit_created_node(NodeId::new(1), &[]).unwrap();
        for i in 0..4 {
            ctx.visit_created_node(NodeId::new(10 + i), &[]).unwrap();
            ctx.visit_created_relationship(
                RelationshipId::new(1 + i),
                Tid::new(5),
                NodeId::new(1),
                NodeId::new(10 + i),
            )
            .unwrap();
        }
        let state = ctx.finish();
        let node = state.nodes.get(NodeId::new(1)).unwrap().after.as_ref().unwrap();
        assert!(node.is_dense);
        assert_eq!(node.next_rel, None);
        assert!(node.relationship_group.is_some());
        assert_eq!(state.relationship_groups.len(), 1);
    }

    #[test]
    fn property_change_adds_then_overwrites_then_removes() {
        let (_dir, registry) = open();
        let config = EngineConfig::builder().build();
        let mut ctx = CommandCreationContext::new(&registry, &config);
        ctx.visit_created_node(NodeId::new(1), &[]).unwrap();
        ctx.visit_property_change(PropertyOwner::Node(NodeId::new(1)), Tid::new(7), Some(PropertyValue::Int(1)))
            .unwrap();
        ctx.visit_property_change(PropertyOwner::Node(NodeId::new(1)), Tid::new(7), Some(PropertyValue::Int(2)))
            .unwrap();
        let head = ctx.node_after(NodeId::new(1)).unwrap().next_prop.unwrap();
        assert_eq!(ctx.property_after(head).unwrap().value, PropertyValue::Int(2));

        ctx.visit_property_change(PropertyOwner::Node(NodeId::new(1)), Tid::new(7), None)
            .unwrap();
        assert_eq!(ctx.node_after(NodeId::new(1)).unwrap().next_prop, None);
    }

    #[test]
    fn deleting_a_relationship_restores_the_single_remaining_neighbour_as_head() {
        let (_dir, registry) = open();
        let config = EngineConfig::builder().build();
        let mut ctx = CommandCreationContext::new(&registry, &config);
        ctx.visit_created_node(NodeId::new(1), &[]).unwrap();
        ctx.visit_created_node(NodeId::new(2), &[]).unwrap();
        ctx.visit_created_node(NodeId::new(3), &[]).unwrap();
        ctx.visit_created_relationship(RelationshipId::new(1), Tid::new(5), NodeId::new(1), NodeId::new(2))
            .unwrap();
        ctx.visit_created_relationship(RelationshipId::new(2), Tid::new(5), NodeId::new(1), NodeId::new(3))
            .unwrap();
        ctx.visit_deleted_relationship(RelationshipId::new(2)).unwrap();
        let node = ctx.node_after(NodeId::new(1)).unwrap();
        assert_eq!(node.next_rel, Some(RelationshipId::new(1)));
        let rel1 = ctx.relationship_after(RelationshipId::new(1)).unwrap();
        assert_eq!(rel1.first_prev_rel, None);
        assert_eq!(rel1.first_next_rel, None);
    }
}
