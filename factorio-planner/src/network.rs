//! Flow-network reconstruction of a solved [`Plan`]: one node per executed
//! recipe, on-demand source and sink nodes for external draws and waste, and
//! flux edges labeled with per-item amounts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::RecipeSet;
use crate::model::{ItemId, RecipeId};
use crate::planner::Plan;

/// Tolerance for residual-imbalance checks during flux resolution.
const FLUX_TOL: f64 = 1e-6;

/// Identifier of a node, unique within one network.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A recipe executed some number of times, with its total item flux on both
/// sides. The pools track how much of that flux is still unclaimed while the
/// network is resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeNode {
    pub id: NodeId,
    pub name: RecipeId,
    pub executions: f64,
    /// Inputs scaled by executions.
    pub in_flux: BTreeMap<ItemId, f64>,
    /// Products scaled by executions.
    pub out_flux: BTreeMap<ItemId, f64>,
    #[serde(skip)]
    out_pool: BTreeMap<ItemId, f64>,
    #[serde(skip)]
    deposit_pit: BTreeMap<ItemId, f64>,
}

/// Unbounded producer of a single item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceNode {
    pub id: NodeId,
    pub item: ItemId,
    /// Total amount requested from this source.
    pub providing: f64,
}

/// Unbounded consumer of a single item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkNode {
    pub id: NodeId,
    pub item: ItemId,
    /// Total amount deposited into this sink.
    pub accepting: f64,
}

/// A node of the production network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Recipe(RecipeNode),
    Source(SourceNode),
    Sink(SinkNode),
}

impl Node {
    pub fn id(&self) -> NodeId {
        match self {
            Node::Recipe(node) => node.id,
            Node::Source(node) => node.id,
            Node::Sink(node) => node.id,
        }
    }

    /// Get the RecipeNode if this is a recipe, otherwise None.
    pub fn recipe(&self) -> Option<&RecipeNode> {
        match self {
            Node::Recipe(node) => Some(node),
            _ => None,
        }
    }

    /// Get the SourceNode if this is a source, otherwise None.
    pub fn source(&self) -> Option<&SourceNode> {
        match self {
            Node::Source(node) => Some(node),
            _ => None,
        }
    }

    /// Get the SinkNode if this is a sink, otherwise None.
    pub fn sink(&self) -> Option<&SinkNode> {
        match self {
            Node::Sink(node) => Some(node),
            _ => None,
        }
    }

    /// Ask this node to provide an amount of an item. Returns whether the
    /// node carries the item at all, and how much it provided. Sinks never
    /// provide.
    fn request(&mut self, item: ItemId, amount: f64) -> (bool, f64) {
        match self {
            Node::Recipe(node) => match node.out_pool.get_mut(&item) {
                Some(pool) => {
                    let provided = f64::min(*pool, amount);
                    *pool -= provided;
                    (true, provided)
                }
                None => (false, 0.0),
            },
            Node::Source(node) => {
                if node.item != item {
                    return (false, 0.0);
                }
                node.providing += amount;
                (true, amount)
            }
            Node::Sink(_) => (false, 0.0),
        }
    }

    /// Offer this node an amount of an item. Returns whether the node
    /// accepts the item at all, and how much it took. Sources never accept.
    fn deposit(&mut self, item: ItemId, amount: f64) -> (bool, f64) {
        match self {
            Node::Recipe(node) => match node.deposit_pit.get_mut(&item) {
                Some(pit) => {
                    let deposited = f64::min(*pit, amount);
                    *pit -= deposited;
                    (true, deposited)
                }
                None => (false, 0.0),
            },
            Node::Sink(node) => {
                if node.item != item {
                    return (false, 0.0);
                }
                node.accepting += amount;
                (true, amount)
            }
            Node::Source(_) => (false, 0.0),
        }
    }
}

/// Directed item flow between exactly one providing and one consuming node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FluxEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub flux: BTreeMap<ItemId, f64>,
}

/// The resolved production network for one plan.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Network {
    pub nodes: Vec<Node>,
    pub edges: Vec<FluxEdge>,
}

impl Network {
    /// Build the network for a solved plan against the catalog it was
    /// computed from. Recipes missing from the catalog are skipped with a
    /// warning.
    pub fn build(plan: &Plan, set: &RecipeSet) -> Network {
        let mut network = Network::default();
        for (&name, &executions) in &plan.recipe_executions {
            let Some(recipe) = set.recipe(name) else {
                log::warn!("plan references recipe '{name}' missing from the catalog");
                continue;
            };
            let in_flux: BTreeMap<ItemId, f64> = recipe
                .inputs
                .iter()
                .map(|(&item, &count)| (item, count * executions))
                .collect();
            let out_flux: BTreeMap<ItemId, f64> = recipe
                .products
                .iter()
                .map(|(&item, &count)| (item, count * executions))
                .collect();
            let id = network.next_id();
            network.nodes.push(Node::Recipe(RecipeNode {
                id,
                name,
                executions,
                out_pool: out_flux.clone(),
                deposit_pit: in_flux.clone(),
                in_flux,
                out_flux,
            }));
        }
        network.resolve_flux();
        network
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    fn next_id(&self) -> NodeId {
        NodeId(self.nodes.len())
    }

    /// Connect recipe nodes through flux edges: every input is requested
    /// from the other recipes in node order, falling back to an on-demand
    /// source; every output is offered to the other recipes, falling back to
    /// an on-demand sink.
    fn resolve_flux(&mut self) {
        let recipe_indices: Vec<usize> = (0..self.nodes.len()).collect();
        let mut sources: BTreeMap<ItemId, usize> = BTreeMap::new();
        let mut sinks: BTreeMap<ItemId, usize> = BTreeMap::new();
        for &current in &recipe_indices {
            let demands: Vec<(ItemId, f64)> = match &self.nodes[current] {
                Node::Recipe(node) => node.in_flux.iter().map(|(&i, &q)| (i, q)).collect(),
                _ => continue,
            };
            for (item, amount) in demands {
                let mut remaining = amount;
                let mut found = false;
                for &other in &recipe_indices {
                    if other == current {
                        continue;
                    }
                    let (matched, provided) = self.nodes[other].request(item, remaining);
                    if !matched {
                        continue;
                    }
                    found = true;
                    if provided > 0.0 {
                        self.add_flux(NodeId(other), NodeId(current), item, provided);
                        remaining -= provided;
                    }
                    if remaining.abs() <= FLUX_TOL {
                        break;
                    }
                }
                if !found {
                    let source = *sources
                        .entry(item)
                        .or_insert_with(|| self.nodes.len());
                    if source == self.nodes.len() {
                        let id = self.next_id();
                        self.nodes.push(Node::Source(SourceNode {
                            id,
                            item,
                            providing: 0.0,
                        }));
                    }
                    self.nodes[source].request(item, amount);
                    self.add_flux(NodeId(source), NodeId(current), item, amount);
                } else if remaining.abs() > FLUX_TOL {
                    log::warn!(
                        "residual {remaining} of '{item}' has no provider; \
                         the plan is not exactly balanced"
                    );
                }
            }

            let outputs: Vec<(ItemId, f64)> = match &self.nodes[current] {
                Node::Recipe(node) => node.out_flux.iter().map(|(&i, &q)| (i, q)).collect(),
                _ => continue,
            };
            for (item, amount) in outputs {
                let mut accepted = false;
                for &other in &recipe_indices {
                    if other != current {
                        accepted |= self.nodes[other].deposit(item, amount).0;
                    }
                }
                if !accepted {
                    let sink = *sinks.entry(item).or_insert_with(|| self.nodes.len());
                    if sink == self.nodes.len() {
                        let id = self.next_id();
                        self.nodes.push(Node::Sink(SinkNode {
                            id,
                            item,
                            accepting: 0.0,
                        }));
                    }
                    self.nodes[sink].deposit(item, amount);
                    self.add_flux(NodeId(current), NodeId(sink), item, amount);
                }
            }
        }
    }

    fn add_flux(&mut self, source: NodeId, target: NodeId, item: ItemId, amount: f64) {
        let position = self
            .edges
            .iter()
            .position(|edge| edge.source == source && edge.target == target);
        let edge = match position {
            Some(position) => &mut self.edges[position],
            None => {
                self.edges.push(FluxEdge {
                    source,
                    target,
                    flux: BTreeMap::new(),
                });
                let last = self.edges.len() - 1;
                &mut self.edges[last]
            }
        };
        *edge.flux.entry(item).or_default() += amount;
    }
}

/// Convenience alias for [`Network::build`].
pub fn build_network(plan: &Plan, set: &RecipeSet) -> Network {
    Network::build(plan, set)
}
