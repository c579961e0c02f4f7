// Copyright 2024 Zachary Stewart
//
//   Licensed under the Apache License, Version 2.0 (the "License");
//   you may not use this file except in compliance with the License.
//   You may obtain a copy of the License at
//
//       http://www.apache.org/licenses/LICENSE-2.0
use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{InvalidRecipeSet, RecipeSet};
use crate::encoder::LabelError;
use crate::model::{ItemId, RecipeId};

mod lp;

/// Error found while computing a production plan.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("target item '{0}' is not part of the recipe catalog")]
    TargetItemNotFound(ItemId),
    #[error("no feasible production plan: {0}")]
    Infeasible(String),
    #[error(transparent)]
    Label(#[from] LabelError),
    #[error(transparent)]
    Set(#[from] InvalidRecipeSet),
}

/// Knobs for a single planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanOptions {
    /// Treat `trivial` items like ordinary intermediates instead of raws.
    pub ignore_trivial: bool,
    /// Objective weight per raw item. Missing entries default to 1.0, or to
    /// 0.0 for items flagged trivial.
    pub weights: BTreeMap<ItemId, f64>,
    /// Disable cyclic-product handling: cyclic items neither defer to the
    /// linear program on that ground nor get the cyclic closure rows.
    pub no_cyclic: bool,
    /// Absolute tolerance for all is-zero tests. Entries at or below it are
    /// elided from the plan.
    pub tol: f64,
}

impl Default for PlanOptions {
    fn default() -> Self {
        PlanOptions {
            ignore_trivial: false,
            weights: BTreeMap::new(),
            no_cyclic: false,
            tol: 1e-6,
        }
    }
}

/// A solved production plan. All values are additive real quantities; zero
/// entries are elided.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Plan {
    /// The demand this plan was computed for.
    pub targets: BTreeMap<ItemId, f64>,
    /// How many times each recipe runs.
    pub recipe_executions: BTreeMap<RecipeId, f64>,
    /// External draws of raw items.
    pub raw_inputs: BTreeMap<ItemId, f64>,
    /// By-products nothing in the plan consumes.
    pub waste: BTreeMap<ItemId, f64>,
}

/// Planner over a recipe catalog.
///
/// Demand is expanded from the targets: raw items become draws, items with a
/// single unambiguous source expand into recipe executions recursively, and
/// everything ambiguous (multi-source, complex-source, or cyclic) is handed
/// to the linear program, whose results merge back additively.
///
/// The coefficient matrix must come from net-form recipes, so a planner for
/// a non-net catalog works on a net-form copy.
#[derive(Debug, Clone)]
pub struct Planner<'a> {
    set: Cow<'a, RecipeSet>,
}

impl<'a> Planner<'a> {
    pub fn new(set: &'a RecipeSet) -> Result<Self, InvalidRecipeSet> {
        if set.is_net_yield() {
            set.verify()?;
            Ok(Planner {
                set: Cow::Borrowed(set),
            })
        } else {
            Ok(Planner {
                set: Cow::Owned(set.copy(Some(true))),
            })
        }
    }

    /// The catalog this planner works on.
    pub fn recipe_set(&self) -> &RecipeSet {
        &self.set
    }

    /// Compute the plan for the given demand.
    pub fn plan(
        &self,
        targets: &BTreeMap<ItemId, f64>,
        options: &PlanOptions,
    ) -> Result<Plan, PlanError> {
        let set = self.recipe_set();
        let tol = options.tol;
        for &name in targets.keys() {
            if !set.has_item(name) {
                return Err(PlanError::TargetItemNotFound(name));
            }
        }

        let mut executions: BTreeMap<RecipeId, f64> = BTreeMap::new();
        let mut raw_inputs: BTreeMap<ItemId, f64> = BTreeMap::new();
        let mut waste: BTreeMap<ItemId, f64> = BTreeMap::new();
        let mut ambiguous: BTreeMap<ItemId, f64> = BTreeMap::new();

        let mut stack: Vec<(ItemId, f64)> = targets.iter().map(|(&n, &q)| (n, q)).collect();
        while let Some((name, amount)) = stack.pop() {
            if amount.abs() <= tol {
                continue;
            }
            let item = set
                .item(name)
                .expect("resolver reached an item outside the catalog");
            if item.is_raw(options.ignore_trivial) {
                *raw_inputs.entry(name).or_default() += amount;
            } else if item.is_ambiguous(options.ignore_trivial, options.no_cyclic) {
                *ambiguous.entry(name).or_default() += amount;
            } else {
                // Exactly one producing recipe: expand deterministically.
                let producer = *item
                    .product_of
                    .iter()
                    .next()
                    .expect("non-raw item has a producer");
                let recipe = set
                    .recipe(producer)
                    .expect("membership sets reference installed recipes");
                let execs = amount / recipe.products[&name];
                *executions.entry(producer).or_default() += execs;
                for (&input, &count) in &recipe.inputs {
                    stack.push((input, count * execs));
                }
                // Co-products go back through the same machinery negated, so
                // they cancel matching demand or eventually surface as waste.
                for (&product, &count) in &recipe.products {
                    if product != name {
                        stack.push((product, -count * execs));
                    }
                }
            }
        }

        // Whatever stayed negative was never consumed: it is waste.
        for bucket in [&mut raw_inputs, &mut ambiguous] {
            let negative: Vec<ItemId> = bucket
                .iter()
                .filter(|&(_, &amount)| amount < 0.0)
                .map(|(&name, _)| name)
                .collect();
            for name in negative {
                if let Some(amount) = bucket.remove(&name) {
                    if -amount > tol {
                        *waste.entry(name).or_default() += -amount;
                    }
                }
            }
        }

        ambiguous.retain(|_, amount| amount.abs() > tol);
        if !ambiguous.is_empty() {
            let (lp_executions, lp_raws, lp_waste) = lp::optimize(set, &ambiguous, options)?;
            for (name, execs) in lp_executions {
                *executions.entry(name).or_default() += execs;
            }
            for (name, amount) in lp_raws {
                *raw_inputs.entry(name).or_default() += amount;
            }
            for (name, amount) in lp_waste {
                *waste.entry(name).or_default() += amount;
            }
        }

        executions.retain(|_, execs| execs.abs() > tol);
        raw_inputs.retain(|_, amount| amount.abs() > tol);
        waste.retain(|_, amount| amount.abs() > tol);
        Ok(Plan {
            targets: targets.clone(),
            recipe_executions: executions,
            raw_inputs,
            waste,
        })
    }
}
