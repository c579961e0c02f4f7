mod catalog;
mod encoder;
mod graph;
mod matrix;
mod model;
mod network;
mod planner;

pub use catalog::{Direction, InvalidRecipeSet, ItemSubset, RecipeSet};
pub use encoder::{LabelEncoder, LabelError};
pub use graph::DirectedGraph;
pub use matrix::CoefMatrix;
pub use model::{Id, InvalidRecipe, Item, ItemFlags, ItemId, Recipe, RecipeId};
pub use network::{
    build_network, FluxEdge, Network, Node, NodeId, RecipeNode, SinkNode, SourceNode,
};
pub use planner::{Plan, PlanError, PlanOptions, Planner};
