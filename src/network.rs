//! Presentation and calculation networks.
//!
//! A `Network` holds one `Node` per concept appearing in a role. Arcs are
//! merged into the nodes' link lists under one of two policies:
//!
//! * `OverrideDiscard` keeps only the effective relationship set. A
//!   prohibiting arc removes links at the same position (target node and
//!   order) whose priority is strictly lower than its own.
//! * `PreserveAudit` never removes a stored link. Prohibitions are recorded
//!   on the node as the latest override note, and a later arc that restates
//!   the prohibited position under a new order moves the link in place.
//!
//! Both policies share the same link lists, kept sorted by `(order, seq)`
//! where `seq` is the processing sequence of the arc.

use crate::cache::LinkbaseCache;
use crate::linkbase::{LinkArc, LinkKind, LinkbaseDocument};
use crate::loader::DocumentLoader;
use crate::model::SchemaId;
use crate::schema::SchemaRegistry;
use crate::schema_tree::{LinkbaseKind, SchemaTree};
use crate::Result;
use ahash::AHashMap;
use log::{debug, warn};
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum ArcKind {
    Presentation,
    Calculation,
}

impl ArcKind {
    fn link_kind(self) -> LinkKind {
        match self {
            ArcKind::Presentation => LinkKind::Presentation,
            ArcKind::Calculation => LinkKind::Calculation,
        }
    }

    fn linkbase_kind(self) -> LinkbaseKind {
        match self {
            ArcKind::Presentation => LinkbaseKind::Presentation,
            ArcKind::Calculation => LinkbaseKind::Calculation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    OverrideDiscard,
    PreserveAudit,
}

/// Which link list of the child an arc lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Parent,
    Derive,
}

/// The attributes of an arc that take part in merging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcAttrs {
    pub order: f64,
    pub priority: i32,
    pub prohibited: bool,
    pub weight: Option<f64>,
}

impl ArcAttrs {
    pub fn new(order: f64, priority: i32) -> Self {
        Self {
            order,
            priority,
            prohibited: false,
            weight: None,
        }
    }

    pub fn prohibited(mut self) -> Self {
        self.prohibited = true;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }
}

impl From<&LinkArc> for ArcAttrs {
    fn from(arc: &LinkArc) -> Self {
        Self {
            order: arc.order,
            priority: arc.priority,
            prohibited: arc.is_prohibited(),
            weight: arc.weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// Parent for parent links, total for derive links.
    pub node: NodeId,
    pub priority: i32,
    pub order: f64,
    pub weight: Option<f64>,
    pub seq: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prohibition {
    pub node: NodeId,
    pub priority: i32,
    pub order: f64,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub element: SchemaId,
    pub parents: Vec<Link>,
    pub derives: Vec<Link>,
    /// Number of derive links elsewhere that target this node.
    pub derived_count: usize,
    pub prohibited: Option<Prohibition>,
}

impl Node {
    fn new(element: SchemaId) -> Self {
        Self {
            element,
            parents: Vec::new(),
            derives: Vec::new(),
            derived_count: 0,
            prohibited: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn is_total(&self) -> bool {
        self.derived_count > 0
    }

    /// Weight of the lowest-order derive link.
    pub fn weight(&self) -> Option<f64> {
        self.derives.first().and_then(|link| link.weight)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub node: NodeId,
    pub element: SchemaId,
    pub order: f64,
}

/// One placement of a node in the flattened tree.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRow {
    pub node: NodeId,
    pub element: SchemaId,
    /// Root first.
    pub ancestors: Vec<Placement>,
    pub order: f64,
}

impl FlatRow {
    pub fn depth(&self) -> usize {
        self.ancestors.len()
    }
}

type SortKey = Vec<(f64, u64)>;

#[derive(Debug, Clone)]
pub struct Network {
    pub role: String,
    pub kind: ArcKind,
    nodes: Vec<Node>,
    index: AHashMap<SchemaId, NodeId>,
    seq: u64,
}

impl Network {
    pub fn new(role: &str, kind: ArcKind) -> Self {
        Self {
            role: role.to_string(),
            kind,
            nodes: Vec::new(),
            index: AHashMap::new(),
            seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn find(&self, element: SchemaId) -> Option<NodeId> {
        self.index.get(&element).copied()
    }

    /// Node for a concept, created on first sight.
    pub fn node_for(&mut self, element: SchemaId) -> NodeId {
        if let Some(&id) = self.index.get(&element) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(Node::new(element));
        self.index.insert(element, id);
        id
    }

    pub fn add_parent(&mut self, child: NodeId, parent: NodeId, arc: ArcAttrs) -> bool {
        self.merge(child, parent, Relation::Parent, MergePolicy::OverrideDiscard, arc)
    }

    pub fn preserve_parent(&mut self, child: NodeId, parent: NodeId, arc: ArcAttrs) -> bool {
        self.merge(child, parent, Relation::Parent, MergePolicy::PreserveAudit, arc)
    }

    pub fn add_derive(&mut self, item: NodeId, total: NodeId, arc: ArcAttrs) -> bool {
        self.merge(item, total, Relation::Derive, MergePolicy::OverrideDiscard, arc)
    }

    pub fn preserve_derive(&mut self, item: NodeId, total: NodeId, arc: ArcAttrs) -> bool {
        self.merge(item, total, Relation::Derive, MergePolicy::PreserveAudit, arc)
    }

    fn links_mut(&mut self, node: NodeId, relation: Relation) -> &mut Vec<Link> {
        let node = &mut self.nodes[node];
        match relation {
            Relation::Parent => &mut node.parents,
            Relation::Derive => &mut node.derives,
        }
    }

    /// Merges one arc from `target` to `child`. Returns whether the child's
    /// link list changed.
    pub fn merge(
        &mut self,
        child: NodeId,
        target: NodeId,
        relation: Relation,
        policy: MergePolicy,
        arc: ArcAttrs,
    ) -> bool {
        if arc.prohibited {
            let removed = match policy {
                MergePolicy::OverrideDiscard => {
                    let links = self.links_mut(child, relation);
                    let before = links.len();
                    links.retain(|link| {
                        !(link.node == target && link.order == arc.order && link.priority < arc.priority)
                    });
                    before - links.len()
                }
                MergePolicy::PreserveAudit => 0,
            };
            if relation == Relation::Derive {
                let total = &mut self.nodes[target];
                total.derived_count = total.derived_count.saturating_sub(removed);
            }
            self.nodes[child].prohibited = Some(Prohibition {
                node: target,
                priority: arc.priority,
                order: arc.order,
            });
            return removed > 0;
        }

        if policy == MergePolicy::PreserveAudit && self.restate_prohibited(child, target, relation, arc) {
            return true;
        }

        let links = self.links_mut(child, relation);
        if let Some(existing) = links
            .iter_mut()
            .find(|link| link.node == target && link.order == arc.order)
        {
            if existing.priority > arc.priority {
                return false;
            }
            existing.priority = arc.priority;
            existing.weight = arc.weight;
            return true;
        }

        if policy == MergePolicy::OverrideDiscard {
            if let Some(note) = &self.nodes[child].prohibited {
                if note.node == target && note.order == arc.order && note.priority > arc.priority {
                    debug!("arc {} -> {} blocked by prohibition", target, child);
                    return false;
                }
            }
        }

        if relation == Relation::Parent && self.would_cycle(child, target) {
            warn!(
                "rejecting parent link {} -> {} in {}: cycle",
                target, child, self.role
            );
            return false;
        }

        self.seq += 1;
        let link = Link {
            node: target,
            priority: arc.priority,
            order: arc.order,
            weight: arc.weight,
            seq: self.seq,
        };
        let links = self.links_mut(child, relation);
        let at = links.partition_point(|l| compare_link(l, &link) != Ordering::Greater);
        links.insert(at, link);
        if relation == Relation::Derive {
            self.nodes[target].derived_count += 1;
        }
        true
    }

    /// Preserve-audit case where an arc restates the position of the node's
    /// last prohibition under a different order. Only the same-priority case
    /// moves the stored link; anything else is flagged and left to the
    /// regular merge.
    fn restate_prohibited(&mut self, child: NodeId, target: NodeId, relation: Relation, arc: ArcAttrs) -> bool {
        let Some(note) = self.nodes[child].prohibited.clone() else {
            return false;
        };
        if note.node != target || note.order == arc.order {
            return false;
        }
        let role = self.role.clone();
        let links = self.links_mut(child, relation);
        let Some(position) = links
            .iter()
            .position(|link| link.node == target && link.order == note.order)
        else {
            return false;
        };
        // The new position is already held; the regular merge replaces it.
        if links.iter().any(|link| link.node == target && link.order == arc.order) {
            return false;
        }
        if note.priority != arc.priority {
            warn!(
                "review: {} arc {} -> {} at order {} (priority {}) follows a prohibition at order {} (priority {})",
                role, target, child, arc.order, arc.priority, note.order, note.priority
            );
            return false;
        }

        let link = &mut links[position];
        link.order = arc.order;
        link.priority = arc.priority;
        link.weight = arc.weight;
        links.sort_by(compare_link);
        true
    }

    fn would_cycle(&self, child: NodeId, parent: NodeId) -> bool {
        if child == parent {
            return true;
        }
        let mut stack = vec![parent];
        let mut seen = vec![false; self.nodes.len()];
        while let Some(current) = stack.pop() {
            if current == child {
                return true;
            }
            if std::mem::replace(&mut seen[current], true) {
                continue;
            }
            stack.extend(self.nodes[current].parents.iter().map(|link| link.node));
        }
        false
    }

    /// Longest chain of active parent links from `node` to a root.
    pub fn depth(&self, node: NodeId) -> usize {
        self.nodes[node]
            .parents
            .iter()
            .map(|link| 1 + self.depth(link.node))
            .max()
            .unwrap_or(0)
    }

    pub fn max_depth(rows: &[FlatRow]) -> usize {
        rows.iter().map(FlatRow::depth).max().unwrap_or(0)
    }

    /// Rows in display order: one per active parent link of every node, one
    /// per root that has children. Ancestors follow each node's
    /// lowest-order parent.
    pub fn flatten(&self) -> Vec<FlatRow> {
        let mut has_children = vec![false; self.nodes.len()];
        for node in &self.nodes {
            for link in &node.parents {
                has_children[link.node] = true;
            }
        }

        let mut keyed: Vec<(SortKey, FlatRow)> = Vec::new();
        for (id, node) in self.nodes.iter().enumerate() {
            if node.is_root() {
                if has_children[id] {
                    let row = FlatRow {
                        node: id,
                        element: node.element,
                        ancestors: Vec::new(),
                        order: 0.0,
                    };
                    keyed.push((vec![(0.0, id as u64)], row));
                }
                continue;
            }
            for link in &node.parents {
                let (mut key, ancestors) = self.ancestry(link.node);
                key.push((link.order, link.seq));
                let row = FlatRow {
                    node: id,
                    element: node.element,
                    ancestors,
                    order: link.order,
                };
                keyed.push((key, row));
            }
        }

        keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b));
        keyed.into_iter().map(|(_, row)| row).collect()
    }

    /// Path from the root down to `node` inclusive, with its sort key.
    fn ancestry(&self, node: NodeId) -> (SortKey, Vec<Placement>) {
        let mut path = Vec::new();
        let mut current = node;
        loop {
            let element = self.nodes[current].element;
            match self.nodes[current].parents.first() {
                Some(link) if path.len() < self.nodes.len() => {
                    path.push(((link.order, link.seq), Placement {
                        node: current,
                        element,
                        order: link.order,
                    }));
                    current = link.node;
                }
                _ => {
                    path.push(((0.0, current as u64), Placement {
                        node: current,
                        element,
                        order: 0.0,
                    }));
                    break;
                }
            }
        }
        path.reverse();
        path.into_iter().unzip()
    }
}

fn compare_link(a: &Link, b: &Link) -> Ordering {
    a.order.total_cmp(&b.order).then(a.seq.cmp(&b.seq))
}

fn compare_keys(a: &SortKey, b: &SortKey) -> Ordering {
    for ((order_a, seq_a), (order_b, seq_b)) in a.iter().zip(b) {
        let ordering = order_a.total_cmp(order_b).then(seq_a.cmp(seq_b));
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    a.len().cmp(&b.len())
}

/// Builds networks for one reading session from the linkbases catalogued in
/// its schema tree, taxonomy documents first so filer extensions win ties.
pub struct NetworkBuilder<'a> {
    registry: &'a mut SchemaRegistry,
    loader: &'a DocumentLoader,
    tree: &'a SchemaTree,
    cache: &'a LinkbaseCache,
}

impl<'a> NetworkBuilder<'a> {
    pub fn new(
        registry: &'a mut SchemaRegistry,
        loader: &'a DocumentLoader,
        tree: &'a SchemaTree,
        cache: &'a LinkbaseCache,
    ) -> Self {
        Self {
            registry,
            loader,
            tree,
            cache,
        }
    }

    fn linkbases(&self, kind: LinkbaseKind) -> Result<Vec<Arc<LinkbaseDocument>>> {
        self.tree
            .linkbases(kind)
            .into_iter()
            .map(|entry| {
                self.cache.get_or_try_insert_with(entry.uri.as_str(), || {
                    let data = self.loader.read(&entry.uri)?;
                    LinkbaseDocument::parse(&entry.uri, &data)
                })
            })
            .collect()
    }

    fn node(&mut self, network: &mut Network, href: &str) -> Result<NodeId> {
        let element = self.registry.resolve(href, self.loader, self.tree)?;
        Ok(network.node_for(element))
    }

    /// Merges every arc of `kind` declared for `role`. Calculation networks
    /// carry derive links and mirror each summation as a parent link so the
    /// totals head their items. A role with no links yields an empty network.
    pub fn build(&mut self, role: &str, kind: ArcKind) -> Result<Network> {
        let mut network = Network::new(role, kind);
        for linkbase in self.linkbases(kind.linkbase_kind())? {
            for link in linkbase.links_for(kind.link_kind(), role) {
                for arc in &link.arcs {
                    let from = self.node(&mut network, &arc.from)?;
                    let to = self.node(&mut network, &arc.to)?;
                    let attrs = ArcAttrs::from(arc);
                    if kind == ArcKind::Calculation {
                        network.add_derive(to, from, attrs);
                    }
                    network.add_parent(to, from, attrs);
                }
            }
        }
        debug!("built {:?} network for {} with {} nodes", kind, role, network.len());
        Ok(network)
    }

    /// Layers the role's calculation arcs onto a presentation network,
    /// keeping every weight. Items the presentation does not place are
    /// attached under their total.
    pub fn layer_calculation(&mut self, network: &mut Network) -> Result<()> {
        let presented = network.len();
        let role = network.role.clone();
        for linkbase in self.linkbases(LinkbaseKind::Calculation)? {
            for link in linkbase.links_for(LinkKind::Calculation, &role) {
                for arc in &link.arcs {
                    let total = self.node(network, &arc.from)?;
                    let item = self.node(network, &arc.to)?;
                    let attrs = ArcAttrs::from(arc);
                    network.preserve_derive(item, total, attrs);
                    if item >= presented && !attrs.prohibited {
                        network.preserve_parent(item, total, attrs);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn network(size: usize) -> Network {
        let mut network = Network::new("http://example.com/role/test", ArcKind::Presentation);
        for element in 0..size {
            network.node_for(element);
        }
        network
    }

    fn orders(links: &[Link]) -> Vec<f64> {
        links.iter().map(|link| link.order).collect()
    }

    fn recount(network: &Network) -> Vec<usize> {
        let mut counts = vec![0; network.len()];
        for node in network.nodes() {
            for link in &node.derives {
                counts[link.node] += 1;
            }
        }
        counts
    }

    #[test]
    fn test_override_prohibition_removes_lower_priority() {
        let (p1, c) = (0, 1);
        let mut net = network(2);
        net.add_parent(c, p1, ArcAttrs::new(1.0, 0));
        net.add_parent(c, p1, ArcAttrs::new(2.0, 1));
        assert_eq!(net.node(c).parents.len(), 2);

        assert!(net.add_parent(c, p1, ArcAttrs::new(1.0, 1).prohibited()));
        assert_eq!(orders(&net.node(c).parents), vec![2.0]);
        assert_eq!(
            net.node(c).prohibited,
            Some(Prohibition { node: p1, priority: 1, order: 1.0 })
        );
    }

    #[test]
    fn test_override_prohibition_keeps_equal_or_higher_priority() {
        let (p1, c) = (0, 1);
        let mut net = network(2);
        net.add_parent(c, p1, ArcAttrs::new(1.0, 1));
        assert!(!net.add_parent(c, p1, ArcAttrs::new(1.0, 1).prohibited()));
        assert!(!net.add_parent(c, p1, ArcAttrs::new(1.0, 0).prohibited()));
        assert_eq!(net.node(c).parents.len(), 1);
        // Different order, nothing at that position.
        assert!(!net.add_parent(c, p1, ArcAttrs::new(3.0, 5).prohibited()));
        assert_eq!(net.node(c).parents.len(), 1);
    }

    #[test]
    fn test_override_same_position_by_priority() {
        let (p1, c) = (0, 1);
        let mut net = network(2);
        net.add_parent(c, p1, ArcAttrs::new(1.0, 1));
        assert!(!net.add_parent(c, p1, ArcAttrs::new(1.0, 0)));
        assert_eq!(net.node(c).parents[0].priority, 1);
        assert!(net.add_parent(c, p1, ArcAttrs::new(1.0, 2)));
        assert_eq!(net.node(c).parents.len(), 1);
        assert_eq!(net.node(c).parents[0].priority, 2);
    }

    #[test]
    fn test_override_blocked_by_prohibition_note() {
        let (p1, c) = (0, 1);
        let mut net = network(2);
        net.add_parent(c, p1, ArcAttrs::new(1.0, 2).prohibited());
        assert!(!net.add_parent(c, p1, ArcAttrs::new(1.0, 0)));
        assert!(net.node(c).parents.is_empty());
        assert!(net.add_parent(c, p1, ArcAttrs::new(1.0, 3)));
        assert_eq!(net.node(c).parents.len(), 1);
    }

    #[test]
    fn test_preserve_never_drops_links() {
        let (p1, c) = (0, 1);
        let mut net = network(2);
        net.preserve_parent(c, p1, ArcAttrs::new(1.0, 0));
        net.preserve_parent(c, p1, ArcAttrs::new(2.0, 1));
        for priority in 0..4 {
            net.preserve_parent(c, p1, ArcAttrs::new(1.0, priority).prohibited());
            assert_eq!(net.node(c).parents.len(), 2);
        }
        assert_eq!(net.node(c).prohibited.as_ref().map(|p| p.priority), Some(3));
    }

    #[test]
    fn test_preserve_restates_prohibited_position() {
        let (p1, c) = (0, 1);
        let mut net = network(2);
        net.preserve_parent(c, p1, ArcAttrs::new(1.0, 0));
        net.preserve_parent(c, p1, ArcAttrs::new(1.0, 1).prohibited());

        // Same priority as the note: the stored link moves.
        assert!(net.preserve_parent(c, p1, ArcAttrs::new(4.0, 1)));
        assert_eq!(orders(&net.node(c).parents), vec![4.0]);
        assert_eq!(net.node(c).parents[0].priority, 1);
    }

    #[test]
    fn test_preserve_restate_onto_held_position() {
        let (p1, c) = (0, 1);
        let mut net = network(2);
        net.preserve_parent(c, p1, ArcAttrs::new(1.0, 0));
        net.preserve_parent(c, p1, ArcAttrs::new(2.0, 1));
        net.preserve_parent(c, p1, ArcAttrs::new(1.0, 1).prohibited());

        // Order 2 is already held, so the link there is replaced and the
        // link at the prohibited order stays where it is.
        assert!(net.preserve_parent(c, p1, ArcAttrs::new(2.0, 1)));
        assert_eq!(orders(&net.node(c).parents), vec![1.0, 2.0]);
        assert_eq!(net.node(c).parents[1].priority, 1);

        let placements: Vec<f64> = net
            .flatten()
            .iter()
            .filter(|row| row.node == c)
            .map(|row| row.order)
            .collect();
        assert_eq!(placements, vec![1.0, 2.0]);
    }

    #[test]
    fn test_preserve_other_priority_appends() {
        let (p1, c) = (0, 1);
        let mut net = network(2);
        net.preserve_parent(c, p1, ArcAttrs::new(1.0, 0));
        net.preserve_parent(c, p1, ArcAttrs::new(1.0, 1).prohibited());

        assert!(net.preserve_parent(c, p1, ArcAttrs::new(4.0, 2)));
        assert_eq!(orders(&net.node(c).parents), vec![1.0, 4.0]);
    }

    #[test]
    fn test_derived_count_tracks_active_links() {
        let (total, a, b) = (0, 1, 2);
        let mut net = network(3);
        net.add_derive(a, total, ArcAttrs::new(1.0, 0).with_weight(1.0));
        net.add_derive(b, total, ArcAttrs::new(2.0, 0).with_weight(-1.0));
        assert_eq!(net.node(total).derived_count, 2);

        // Replace in place.
        net.add_derive(b, total, ArcAttrs::new(2.0, 1).with_weight(1.0));
        assert_eq!(net.node(total).derived_count, 2);
        assert_eq!(net.node(b).weight(), Some(1.0));

        net.add_derive(a, total, ArcAttrs::new(1.0, 1).prohibited());
        assert_eq!(net.node(total).derived_count, 1);
        assert_eq!(recount(&net), vec![1, 0, 0]);

        net.preserve_derive(a, total, ArcAttrs::new(1.0, 0).with_weight(1.0));
        net.preserve_derive(a, total, ArcAttrs::new(1.0, 5).prohibited());
        assert_eq!(recount(&net)[total], net.node(total).derived_count);
        assert!(net.node(total).is_total());
        assert!(!net.node(a).is_total());
    }

    #[test]
    fn test_cycle_guard() {
        let (a, b, c) = (0, 1, 2);
        let mut net = network(3);
        assert!(net.add_parent(b, a, ArcAttrs::new(1.0, 0)));
        assert!(net.add_parent(c, b, ArcAttrs::new(1.0, 0)));
        assert!(!net.add_parent(a, c, ArcAttrs::new(1.0, 0)));
        assert!(!net.add_parent(a, a, ArcAttrs::new(1.0, 0)));
        assert!(net.node(a).is_root());
        assert_eq!(net.depth(c), 2);
    }

    fn sample() -> Network {
        // root
        //   heading (order 2)
        //     x (order 10)
        //     y (order 2)
        //   z (order 1), also under heading (order 20)
        // orphan: prohibited away
        let (root, heading, x, y, z, orphan) = (0, 1, 2, 3, 4, 5);
        let mut net = network(6);
        net.add_parent(heading, root, ArcAttrs::new(2.0, 0));
        net.add_parent(x, heading, ArcAttrs::new(10.0, 0));
        net.add_parent(y, heading, ArcAttrs::new(2.0, 0));
        net.add_parent(z, root, ArcAttrs::new(1.0, 0));
        net.add_parent(z, heading, ArcAttrs::new(20.0, 0));
        net.add_parent(orphan, root, ArcAttrs::new(3.0, 0));
        net.add_parent(orphan, root, ArcAttrs::new(3.0, 1).prohibited());
        net
    }

    #[test]
    fn test_flatten_order_and_pruning() {
        let net = sample();
        let rows = net.flatten();
        let sequence: Vec<(NodeId, usize)> = rows.iter().map(|r| (r.node, r.depth())).collect();
        assert_eq!(
            sequence,
            vec![(0, 0), (4, 1), (1, 1), (3, 2), (2, 2), (4, 2)]
        );
        assert_eq!(Network::max_depth(&rows), 2);

        let x = rows.iter().find(|r| r.node == 2).unwrap();
        let path: Vec<(NodeId, f64)> = x.ancestors.iter().map(|p| (p.node, p.order)).collect();
        assert_eq!(path, vec![(0, 0.0), (1, 2.0)]);
        assert_eq!(x.order, 10.0);
    }

    #[test]
    fn test_flatten_is_deterministic() {
        let net = sample();
        assert_eq!(net.flatten(), net.flatten());
        assert_eq!(sample().flatten(), net.flatten());
    }

    #[test]
    fn test_equal_orders_keep_processing_sequence() {
        let (root, a, b) = (0, 1, 2);
        let mut net = network(3);
        net.add_parent(b, root, ArcAttrs::new(1.0, 0));
        net.add_parent(a, root, ArcAttrs::new(1.0, 0));
        let nodes: Vec<NodeId> = net.flatten().iter().map(|r| r.node).collect();
        assert_eq!(nodes, vec![root, b, a]);
    }

    #[test]
    fn test_empty_network_flattens_to_nothing() {
        let net = Network::new("http://example.com/role/none", ArcKind::Presentation);
        assert!(net.flatten().is_empty());
    }
}
