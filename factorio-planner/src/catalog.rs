// Copyright 2024 Zachary Stewart
//
//   Licensed under the Apache License, Version 2.0 (the "License");
//   you may not use this file except in compliance with the License.
//   You may obtain a copy of the License at
//
//       http://www.apache.org/licenses/LICENSE-2.0
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::Index;
use std::str::FromStr;

use minilp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem};
use once_cell::unsync::OnceCell;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encoder::LabelEncoder;
use crate::graph::DirectedGraph;
use crate::matrix::CoefMatrix;
use crate::model::{Id, Item, ItemId, Recipe, RecipeId};

/// Error found while validating or querying a [`RecipeSet`].
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvalidRecipeSet {
    #[error("broken integrity between recipe '{recipe}' and item '{item}'")]
    Integrity { recipe: RecipeId, item: ItemId },
    #[error("unrecognized dependency direction '{0}'")]
    Direction(String),
    #[error("unrecognized item subset '{0}'")]
    Subset(String),
}

/// Direction of a recipe dependency traversal.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum Direction {
    /// Towards prerequisites: the recipes able to produce an item, and
    /// theirs in turn.
    Up,
    /// Towards consumers.
    Down,
}

impl FromStr for Direction {
    type Err = InvalidRecipeSet;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            _ => Err(InvalidRecipeSet::Direction(s.to_owned())),
        }
    }
}

/// Which side of a recipe to take items from.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum ItemSubset {
    Inputs,
    Products,
    Both,
}

impl FromStr for ItemSubset {
    type Err = InvalidRecipeSet;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inputs" => Ok(Self::Inputs),
            "products" => Ok(Self::Products),
            "both" => Ok(Self::Both),
            _ => Err(InvalidRecipeSet::Subset(s.to_owned())),
        }
    }
}

/// Catalog owning all recipes and the items they touch.
///
/// The catalog derives item membership sets, recipe-to-recipe adjacency, the
/// stoichiometric coefficient matrix and the recipe dependency graph, and
/// tags items produced exclusively inside validated cyclic recipe groups.
/// Derived state is rebuilt by [`refresh`](Self::refresh); the matrix and
/// graph are built lazily on first access and dropped by any mutation.
/// Operator-set item flags survive rebuilds.
#[derive(Debug, Clone, Default)]
pub struct RecipeSet {
    recipes: BTreeMap<RecipeId, Recipe>,
    items: BTreeMap<ItemId, Item>,
    /// recipe -> recipes producing any of its inputs.
    upstream: BTreeMap<RecipeId, BTreeSet<RecipeId>>,
    /// recipe -> recipes consuming any of its products.
    downstream: BTreeMap<RecipeId, BTreeSet<RecipeId>>,
    recipe_encoder: LabelEncoder<RecipeId>,
    item_encoder: LabelEncoder<ItemId>,
    /// Validated cyclic recipe groups, each a sorted id array.
    cyclic_groups: Vec<Vec<RecipeId>>,
    graph: OnceCell<DirectedGraph>,
    coef_matrix: OnceCell<CoefMatrix>,
    net_yield: bool,
}

impl RecipeSet {
    /// Build a catalog from a collection of recipes. With `net_yield` every
    /// installed recipe is reduced to net form.
    pub fn new(recipes: impl IntoIterator<Item = Recipe>, net_yield: bool) -> Self {
        let mut set = RecipeSet {
            net_yield,
            ..Default::default()
        };
        for recipe in recipes {
            set.add(recipe);
        }
        set.refresh();
        set
    }

    /// Install a recipe, overwriting (with a warning) any recipe of the same
    /// name. Derived caches are invalidated; call [`refresh`](Self::refresh)
    /// before querying again.
    pub fn add(&mut self, mut recipe: Recipe) {
        if self.net_yield {
            recipe.update_net_yield();
        }
        if self.recipes.contains_key(&recipe.name) {
            log::warn!("overwriting recipe '{}'", recipe.name);
        }
        self.recipes.insert(recipe.name, recipe);
        self.graph.take();
        self.coef_matrix.take();
    }

    /// Rebuild all derived state from the recipes currently installed:
    /// item membership sets, recipe adjacency, complex-product flags, both
    /// encoders, and cyclic-group analysis. Operator-set `trivial` and
    /// `forced_raw` flags are snapshotted and reapplied. Idempotent.
    pub fn refresh(&mut self) {
        let forced_raw = self.query_items(|item| item.flags.forced_raw);
        let trivial = self.query_items(|item| item.flags.trivial);
        self.rebuild_search_tables();
        for name in forced_raw {
            self.item_entry(name).flags.forced_raw = true;
        }
        for name in trivial {
            self.item_entry(name).flags.trivial = true;
        }
    }

    fn rebuild_search_tables(&mut self) {
        self.items.clear();
        self.upstream.clear();
        self.downstream.clear();
        // Membership sets from each recipe's two sides.
        let names: Vec<RecipeId> = self.recipes.keys().copied().collect();
        for name in names {
            let recipe = &self.recipes[&name];
            let inputs: Vec<ItemId> = recipe.inputs.keys().copied().collect();
            let products: Vec<ItemId> = recipe.products.keys().copied().collect();
            for item in inputs {
                self.item_entry(item).input_of.insert(name);
            }
            for item in products {
                self.item_entry(item).product_of.insert(name);
            }
        }
        // Recipe-to-recipe adjacency and complex-product flags follow from
        // the membership sets.
        let mut complex: Vec<(ItemId, bool)> = Vec::new();
        for item in self.items.values() {
            for &consumer in &item.input_of {
                for &producer in &item.product_of {
                    self.upstream.entry(consumer).or_default().insert(producer);
                    self.downstream.entry(producer).or_default().insert(consumer);
                }
            }
            let is_complex = item
                .product_of
                .iter()
                .any(|name| self.recipes[name].n_products() >= 2);
            complex.push((item.name, is_complex));
        }
        for (name, is_complex) in complex {
            self.item_entry(name).flags.product_of_complex_recipe = is_complex;
        }
        self.recipe_encoder.train(self.recipes.keys().copied());
        self.item_encoder.train(self.items.keys().copied());
        self.graph.take();
        self.coef_matrix.take();
        self.cache_cyclic_groups();
    }

    /// Identify cyclic recipe groups, keep the ones the unboundedness check
    /// accepts, and tag their exclusive products.
    fn cache_cyclic_groups(&mut self) {
        self.cyclic_groups.clear();
        let groups = self.graph().cyclic_vertex_groups();
        for group in groups {
            let recipes: BTreeSet<RecipeId> = group
                .iter()
                .map(|&id| {
                    *self
                        .recipe_encoder
                        .decode(id)
                        .expect("cyclic group id out of encoder range")
                })
                .collect();
            if !self.cyclic_group_is_bounded(&recipes) {
                let listing: Vec<&str> = recipes.iter().map(|name| name.as_str()).collect();
                log::warn!(
                    "cyclic recipe group '{}' appears perpetual; \
                     cyclic optimization on this group is disabled",
                    listing.join(",")
                );
                continue;
            }
            let products = self.extract_items(recipes.iter().copied(), ItemSubset::Products);
            for product in products {
                let exclusive = self.items[&product]
                    .product_of
                    .iter()
                    .all(|producer| recipes.contains(producer));
                if exclusive {
                    self.item_entry(product).flags.cyclic_product = true;
                }
            }
            self.cyclic_groups.push(recipes.into_iter().collect());
        }
    }

    /// A cyclic group is usable only if no nontrivial non-negative execution
    /// vector gives every involved item a non-negative net output; such a
    /// vector would be a perpetual-motion producer. The constraint set is
    /// homogeneous, so maximizing total execution either stays at zero
    /// (bounded, the group is fine) or runs off along a ray (perpetual).
    fn cyclic_group_is_bounded(&self, group: &BTreeSet<RecipeId>) -> bool {
        let items = self.extract_items(group.iter().copied(), ItemSubset::Both);
        let mut problem = Problem::new(OptimizationDirection::Maximize);
        let executions: Vec<_> = group
            .iter()
            .map(|_| problem.add_var(1.0, (0.0, f64::INFINITY)))
            .collect();
        for item in items {
            let mut net = LinearExpr::empty();
            let mut nonzero = false;
            for (var, name) in executions.iter().zip(group.iter()) {
                let recipe = &self.recipes[name];
                let coef = recipe.products.get(&item).copied().unwrap_or(0.0)
                    - recipe.inputs.get(&item).copied().unwrap_or(0.0);
                if coef != 0.0 {
                    net.add(*var, coef);
                    nonzero = true;
                }
            }
            // Non-net recipes can zero an item out of the whole group; such
            // rows constrain nothing.
            if nonzero {
                problem.add_constraint(net, ComparisonOp::Ge, 0.0);
            }
        }
        match problem.solve() {
            Ok(solution) => executions.iter().all(|&var| solution[var].abs() < 1e-9),
            Err(minilp::Error::Unbounded) => false,
            Err(error) => {
                // x = 0 satisfies every constraint, so nothing else should be
                // reachable here.
                log::error!("cyclic group check returned '{error}'");
                false
            }
        }
    }

    /// Deep copy. Each recipe is cloned, optionally forced to net form
    /// (`None` inherits this catalog's setting); operator flags carry over.
    pub fn copy(&self, net_yield: Option<bool>) -> Self {
        let net_yield = net_yield.unwrap_or(self.net_yield);
        let mut copy = RecipeSet::new(self.recipes.values().cloned(), net_yield);
        for name in self.query_items(|item| item.flags.forced_raw) {
            copy.item_entry(name).flags.forced_raw = true;
        }
        for name in self.query_items(|item| item.flags.trivial) {
            copy.item_entry(name).flags.trivial = true;
        }
        copy
    }

    /// Check that recipe sides and item membership sets agree, failing on
    /// the first mismatched pair.
    pub fn verify(&self) -> Result<(), InvalidRecipeSet> {
        for (rname, recipe) in &self.recipes {
            for (iname, item) in &self.items {
                if recipe.products.contains_key(iname) != item.product_of.contains(rname)
                    || recipe.inputs.contains_key(iname) != item.input_of.contains(rname)
                {
                    return Err(InvalidRecipeSet::Integrity {
                        recipe: *rname,
                        item: *iname,
                    });
                }
            }
        }
        Ok(())
    }

    /// Recipe dependency graph: edge i -> j iff some product of recipe i is
    /// an input of recipe j. Vertex ids follow the recipe encoder. Built on
    /// first access.
    pub fn graph(&self) -> &DirectedGraph {
        self.graph.get_or_init(|| {
            let mut graph = DirectedGraph::new(self.recipe_encoder.len());
            for (producer, consumers) in &self.downstream {
                let from = self
                    .recipe_encoder
                    .encode(producer)
                    .expect("recipe encoder out of sync");
                for consumer in consumers {
                    let to = self
                        .recipe_encoder
                        .encode(consumer)
                        .expect("recipe encoder out of sync");
                    graph.add_edge(from, to);
                }
            }
            graph
        })
    }

    /// Stoichiometric coefficient matrix over all recipes and items, indexed
    /// by the encoders. Built on first access.
    pub fn coef_matrix(&self) -> &CoefMatrix {
        self.coef_matrix.get_or_init(|| {
            let mut matrix = CoefMatrix::new(self.recipe_encoder.len(), self.item_encoder.len());
            for (name, recipe) in &self.recipes {
                let row = self
                    .recipe_encoder
                    .encode(name)
                    .expect("recipe encoder out of sync");
                for (item, &count) in &recipe.inputs {
                    let col = self
                        .item_encoder
                        .encode(item)
                        .expect("item encoder out of sync");
                    matrix.set(row, col, -count);
                }
                for (item, &count) in &recipe.products {
                    let col = self
                        .item_encoder
                        .encode(item)
                        .expect("item encoder out of sync");
                    matrix.set(row, col, count);
                }
            }
            matrix
        })
    }

    /// All recipes with a dependency on the given item, direct or indirect:
    /// the transitive producers (`Up`) or consumers (`Down`).
    pub fn dependency_closure(
        &self,
        item: ItemId,
        direction: Direction,
    ) -> BTreeMap<RecipeId, &Recipe> {
        let mut closure = BTreeMap::new();
        let Some(item) = self.item(item) else {
            return closure;
        };
        let (seed, step) = match direction {
            Direction::Up => (&item.product_of, &self.upstream),
            Direction::Down => (&item.input_of, &self.downstream),
        };
        let mut stack: Vec<RecipeId> = seed.iter().copied().collect();
        while let Some(name) = stack.pop() {
            if closure.contains_key(&name) {
                continue;
            }
            if let Some(recipe) = self.recipe(name) {
                closure.insert(name, recipe);
            }
            if let Some(next) = step.get(&name) {
                stack.extend(next.iter().copied());
            }
        }
        closure
    }

    /// Names of all items satisfying a predicate.
    pub fn query_items(&self, predicate: impl Fn(&Item) -> bool) -> Vec<ItemId> {
        self.items
            .values()
            .filter(|item| predicate(item))
            .map(|item| item.name)
            .collect()
    }

    /// Union of the items on the requested side of the given recipes.
    /// Unknown recipe names are skipped.
    pub fn extract_items(
        &self,
        recipes: impl IntoIterator<Item = RecipeId>,
        subset: ItemSubset,
    ) -> BTreeSet<ItemId> {
        let mut extracted = BTreeSet::new();
        for name in recipes {
            let Some(recipe) = self.recipe(name) else {
                continue;
            };
            if matches!(subset, ItemSubset::Inputs | ItemSubset::Both) {
                extracted.extend(recipe.inputs.keys().copied());
            }
            if matches!(subset, ItemSubset::Products | ItemSubset::Both) {
                extracted.extend(recipe.products.keys().copied());
            }
        }
        extracted
    }

    /// Mark items as trivial. Unknown names create default items, which then
    /// take part in planning like any other unreferenced item.
    pub fn mark_trivial(&mut self, names: impl IntoIterator<Item = ItemId>) {
        for name in names {
            self.item_entry(name).flags.trivial = true;
        }
    }

    /// Mark items as forced raw: always drawn, never produced.
    pub fn mark_forced_raw(&mut self, names: impl IntoIterator<Item = ItemId>) {
        for name in names {
            self.item_entry(name).flags.forced_raw = true;
        }
    }

    /// Clear every operator-set flag.
    pub fn clear_flags(&mut self) {
        for item in self.items.values_mut() {
            item.flags.trivial = false;
            item.flags.forced_raw = false;
        }
    }

    fn item_entry(&mut self, name: ItemId) -> &mut Item {
        self.items.entry(name).or_insert_with(|| Item::new(name))
    }

    /// Get a recipe, item, or other symbol-addressed value by typed id.
    pub fn get<T: Id>(&self, id: T) -> Option<&T::Info> {
        id.fetch(self)
    }

    pub fn recipe(&self, name: RecipeId) -> Option<&Recipe> {
        self.recipes.get(&name)
    }

    pub fn item(&self, name: ItemId) -> Option<&Item> {
        self.items.get(&name)
    }

    pub fn has_recipe(&self, name: RecipeId) -> bool {
        self.recipes.contains_key(&name)
    }

    pub fn has_item(&self, name: ItemId) -> bool {
        self.items.contains_key(&name)
    }

    /// Iterate all recipes in name order.
    pub fn recipes(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.values()
    }

    /// Iterate all items in name order.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn recipe_ids(&self) -> impl Iterator<Item = RecipeId> + '_ {
        self.recipes.keys().copied()
    }

    pub fn item_ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.items.keys().copied()
    }

    pub fn n_recipes(&self) -> usize {
        self.recipes.len()
    }

    pub fn n_items(&self) -> usize {
        self.items.len()
    }

    pub fn is_net_yield(&self) -> bool {
        self.net_yield
    }

    /// Validated cyclic recipe groups found by the last refresh.
    pub fn cyclic_groups(&self) -> &[Vec<RecipeId>] {
        &self.cyclic_groups
    }

    pub fn recipe_encoder(&self) -> &LabelEncoder<RecipeId> {
        &self.recipe_encoder
    }

    pub fn item_encoder(&self) -> &LabelEncoder<ItemId> {
        &self.item_encoder
    }
}

impl<T: Id> Index<T> for RecipeSet {
    type Output = <T as Id>::Info;

    fn index(&self, id: T) -> &Self::Output {
        self.get(id).expect("no such id in the catalog")
    }
}

impl fmt::Display for RecipeSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "RecipeSet of {} recipes over {} items",
            self.n_recipes(),
            self.n_items()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(
        name: Option<&str>,
        inputs: &[(&str, f64)],
        products: &[(&str, f64)],
    ) -> Recipe {
        Recipe::new(
            name.map(RecipeId::from),
            "test",
            1.0,
            inputs.iter().map(|&(n, q)| (ItemId::from(n), q)),
            products.iter().map(|&(n, q)| (ItemId::from(n), q)),
        )
        .unwrap()
    }

    fn gear_chain() -> RecipeSet {
        RecipeSet::new(
            [
                recipe(None, &[("iron-ore", 1.0)], &[("iron-plate", 1.0)]),
                recipe(None, &[("iron-plate", 2.0)], &[("gear", 1.0)]),
            ],
            false,
        )
    }

    #[test]
    fn membership_sets_follow_recipes() {
        let set = gear_chain();
        let plate = set.item(ItemId::from("iron-plate")).unwrap();
        assert!(plate.product_of.contains(&RecipeId::from("iron-plate")));
        assert!(plate.input_of.contains(&RecipeId::from("gear")));
        let ore = set.item(ItemId::from("iron-ore")).unwrap();
        assert!(ore.is_actual_raw());
        assert_eq!(set.n_items(), 3);
        set.verify().unwrap();
    }

    #[test]
    fn matrix_is_coherent_with_recipes() {
        let set = gear_chain();
        let matrix = set.coef_matrix();
        for recipe in set.recipes() {
            let row = set.recipe_encoder().encode(&recipe.name).unwrap();
            for item in set.item_ids() {
                let col = set.item_encoder().encode(&item).unwrap();
                let value = matrix.get(row, col);
                match (recipe.products.get(&item), recipe.inputs.get(&item)) {
                    (Some(&q), None) => assert_eq!(value, q),
                    (None, Some(&q)) => assert_eq!(value, -q),
                    (None, None) => assert_eq!(value, 0.0),
                    (Some(_), Some(_)) => panic!("net recipes cannot share items"),
                }
            }
        }
    }

    #[test]
    fn graph_links_producers_to_consumers() {
        let set = gear_chain();
        let graph = set.graph();
        let plate = set
            .recipe_encoder()
            .encode(&RecipeId::from("iron-plate"))
            .unwrap();
        let gear = set.recipe_encoder().encode(&RecipeId::from("gear")).unwrap();
        assert!(graph.has_edge(plate, gear));
        assert!(!graph.has_edge(gear, plate));
    }

    #[test]
    fn closure_walks_the_dependency_graph() {
        let set = gear_chain();
        let up = set.dependency_closure(ItemId::from("gear"), Direction::Up);
        assert_eq!(
            up.keys().copied().collect::<Vec<_>>(),
            vec![RecipeId::from("gear"), RecipeId::from("iron-plate")]
        );
        let down = set.dependency_closure(ItemId::from("iron-ore"), Direction::Down);
        assert_eq!(
            down.keys().copied().collect::<Vec<_>>(),
            vec![RecipeId::from("gear"), RecipeId::from("iron-plate")]
        );
        assert!(set
            .dependency_closure(ItemId::from("gear"), Direction::Down)
            .is_empty());
    }

    #[test]
    fn operator_flags_survive_refresh() {
        let mut set = gear_chain();
        set.mark_trivial([ItemId::from("iron-ore")]);
        set.mark_forced_raw([ItemId::from("iron-plate")]);
        set.refresh();
        assert!(set.item(ItemId::from("iron-ore")).unwrap().flags.trivial);
        assert!(
            set.item(ItemId::from("iron-plate"))
                .unwrap()
                .flags
                .forced_raw
        );
        assert!(!set.item(ItemId::from("gear")).unwrap().flags.trivial);

        set.clear_flags();
        set.refresh();
        assert!(!set.item(ItemId::from("iron-ore")).unwrap().flags.trivial);
    }

    #[test]
    fn flags_survive_copy() {
        let mut set = gear_chain();
        set.mark_trivial([ItemId::from("iron-ore")]);
        let copy = set.copy(None);
        assert!(copy.item(ItemId::from("iron-ore")).unwrap().flags.trivial);
    }

    #[test]
    fn copy_can_force_net_form() {
        let set = RecipeSet::new(
            [recipe(
                Some("enrich"),
                &[("u235", 40.0), ("u238", 5.0)],
                &[("u235", 41.0), ("u238", 2.0)],
            )],
            false,
        );
        let net = set.copy(Some(true));
        let enrich = net.recipe(RecipeId::from("enrich")).unwrap();
        assert_eq!(enrich.products[&ItemId::from("u235")], 1.0);
        assert!(!enrich.inputs.contains_key(&ItemId::from("u235")));
        assert!(net.is_net_yield());
    }

    #[test]
    fn complex_recipe_flag_derived() {
        let set = RecipeSet::new(
            [recipe(
                Some("oil-adv"),
                &[("crude-oil", 100.0)],
                &[("heavy-oil", 25.0), ("light-oil", 45.0)],
            )],
            false,
        );
        assert!(
            set.item(ItemId::from("heavy-oil"))
                .unwrap()
                .flags
                .product_of_complex_recipe
        );
        assert!(
            !set.item(ItemId::from("crude-oil"))
                .unwrap()
                .flags
                .product_of_complex_recipe
        );
    }

    #[test]
    fn bounded_cycle_tags_exclusive_products() {
        // hydrate/recover form a consuming loop over the acid pair.
        let set = RecipeSet::new(
            [
                recipe(
                    Some("hydrate"),
                    &[("sulfuric-acid", 1.0)],
                    &[("acid-solution", 1.0)],
                ),
                recipe(
                    Some("recover"),
                    &[("acid-solution", 1.0), ("sulfur", 1.0)],
                    &[("sulfuric-acid", 1.0), ("slag", 1.0)],
                ),
            ],
            false,
        );
        assert_eq!(
            set.cyclic_groups(),
            &[vec![RecipeId::from("hydrate"), RecipeId::from("recover")]]
        );
        for name in ["sulfuric-acid", "acid-solution", "slag"] {
            assert!(
                set.item(ItemId::from(name)).unwrap().flags.cyclic_product,
                "{name} should be a cyclic product"
            );
        }
        assert!(!set.item(ItemId::from("sulfur")).unwrap().flags.cyclic_product);
    }

    #[test]
    fn perpetual_cycle_is_rejected() {
        // X -> Y -> X with a free X producer on the side: the loop is
        // lossless, so a nontrivial execution never nets negative anywhere.
        let set = RecipeSet::new(
            [
                recipe(Some("free-energy"), &[], &[("x", 1.0)]),
                recipe(Some("sink-x"), &[("x", 1.0)], &[("y", 1.0)]),
                recipe(Some("regen"), &[("y", 1.0)], &[("x", 1.0)]),
            ],
            false,
        );
        assert!(set.cyclic_groups().is_empty());
        assert!(!set.item(ItemId::from("x")).unwrap().flags.cyclic_product);
        assert!(!set.item(ItemId::from("y")).unwrap().flags.cyclic_product);
    }

    #[test]
    fn lossy_cycle_is_accepted() {
        // The same loop shape, but regeneration costs ore: bounded.
        let set = RecipeSet::new(
            [
                recipe(Some("sink-x"), &[("x", 1.0)], &[("y", 1.0)]),
                recipe(Some("regen"), &[("y", 2.0), ("ore", 1.0)], &[("x", 1.0)]),
            ],
            false,
        );
        assert_eq!(set.cyclic_groups().len(), 1);
    }

    #[test]
    fn extract_items_subsets() {
        let set = gear_chain();
        let names = [RecipeId::from("gear"), RecipeId::from("iron-plate")];
        let inputs = set.extract_items(names, ItemSubset::Inputs);
        assert!(inputs.contains(&ItemId::from("iron-ore")));
        assert!(inputs.contains(&ItemId::from("iron-plate")));
        assert!(!inputs.contains(&ItemId::from("gear")));
        let products = set.extract_items(names, ItemSubset::Products);
        assert!(!products.contains(&ItemId::from("iron-ore")));
        let both = set.extract_items(names, ItemSubset::Both);
        assert_eq!(both.len(), 3);
    }

    #[test]
    fn direction_and_subset_parse() {
        assert_eq!("up".parse::<Direction>(), Ok(Direction::Up));
        assert_eq!("down".parse::<Direction>(), Ok(Direction::Down));
        assert_eq!(
            "sideways".parse::<Direction>(),
            Err(InvalidRecipeSet::Direction("sideways".to_owned()))
        );
        assert_eq!("both".parse::<ItemSubset>(), Ok(ItemSubset::Both));
        assert!("neither".parse::<ItemSubset>().is_err());
    }

    #[test]
    fn typed_ids_index_the_catalog() {
        let set = gear_chain();
        assert_eq!(set[RecipeId::from("gear")].n_inputs(), 1);
        assert_eq!(set[ItemId::from("gear")].product_of.len(), 1);
        assert!(set.get(RecipeId::from("missing")).is_none());
    }

    #[test]
    fn overwriting_add_replaces_recipe() {
        let mut set = gear_chain();
        set.add(recipe(
            Some("gear"),
            &[("iron-plate", 4.0)],
            &[("gear", 1.0)],
        ));
        set.refresh();
        assert_eq!(set.n_recipes(), 2);
        assert_eq!(
            set.recipe(RecipeId::from("gear")).unwrap().inputs[&ItemId::from("iron-plate")],
            4.0
        );
        set.verify().unwrap();
    }
}
