// Copyright 2024 Zachary Stewart
//
//   Licensed under the Apache License, Version 2.0 (the "License");
//   you may not use this file except in compliance with the License.
//   You may obtain a copy of the License at
//
//       http://www.apache.org/licenses/LICENSE-2.0

//! Linear-program half of the planner: resolves the ambiguous portion of the
//! demand over the closure of recipes able to produce it.

use std::collections::{BTreeMap, BTreeSet};

use minilp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem, Variable};

use crate::catalog::{Direction, ItemSubset, RecipeSet};
use crate::matrix::CoefMatrix;
use crate::model::{ItemId, RecipeId};

use super::{PlanError, PlanOptions};

type Summary = (
    BTreeMap<RecipeId, f64>,
    BTreeMap<ItemId, f64>,
    BTreeMap<ItemId, f64>,
);

/// Solve the ambiguous goals, returning additional recipe executions, raw
/// draws, and waste amounts to merge into the plan.
///
/// Item columns partition into three bands: goals (demand met exactly), raws
/// (net output at most zero, so the solver may draw but never fabricate
/// them), and intermediates (net output at least zero, so nothing is
/// silently consumed out of thin air). The objective minimizes the weighted
/// raw draw. On infeasibility one refinement pass reclassifies raw items
/// that some closure recipe can produce; if that changes nothing the failure
/// is final.
pub(super) fn optimize(
    set: &RecipeSet,
    goals: &BTreeMap<ItemId, f64>,
    options: &PlanOptions,
) -> Result<Summary, PlanError> {
    let mut related: BTreeSet<RecipeId> = BTreeSet::new();
    for &goal in goals.keys() {
        related.extend(set.dependency_closure(goal, Direction::Up).keys().copied());
    }
    let recipe_names: Vec<RecipeId> = related.into_iter().collect();
    let item_names: Vec<ItemId> = set
        .extract_items(recipe_names.iter().copied(), ItemSubset::Both)
        .into_iter()
        .collect();
    let recipe_rows: Vec<usize> = recipe_names
        .iter()
        .map(|name| set.recipe_encoder().encode(name))
        .collect::<Result<_, _>>()?;
    let item_cols: Vec<usize> = item_names
        .iter()
        .map(|name| set.item_encoder().encode(name))
        .collect::<Result<_, _>>()?;
    let coef = set.coef_matrix().submatrix(&recipe_rows, &item_cols);

    let mut goal_cols: Vec<usize> = Vec::new();
    let mut raw_cols: Vec<usize> = Vec::new();
    let mut mid_cols: Vec<usize> = Vec::new();
    for (col, name) in item_names.iter().enumerate() {
        if goals.contains_key(name) {
            goal_cols.push(col);
        } else if set[*name].is_raw(options.ignore_trivial) {
            raw_cols.push(col);
        } else {
            mid_cols.push(col);
        }
    }

    let mut refined = false;
    loop {
        match solve_once(
            set, goals, options, &item_names, &coef, &goal_cols, &raw_cols, &mid_cols,
        ) {
            Ok(executions) => {
                return Ok(summarize(
                    options,
                    &recipe_names,
                    &item_names,
                    &coef,
                    &executions,
                    &raw_cols,
                    &mid_cols,
                ))
            }
            Err(minilp::Error::Infeasible) if !refined => {
                refined = true;
                // An item can be classified raw yet still be producible by a
                // recipe in the closure (forced raw while a producer is in
                // play); its sign constraint then fights the demand. Such
                // items become intermediates and the program is rebuilt once.
                let (producible, kept): (Vec<usize>, Vec<usize>) = raw_cols
                    .iter()
                    .partition(|&&col| (0..coef.rows()).any(|row| coef.get(row, col) > 0.0));
                if producible.is_empty() {
                    return Err(PlanError::Infeasible(
                        "linear program is infeasible and no raw item is producible".to_owned(),
                    ));
                }
                raw_cols = kept;
                mid_cols.extend(producible);
                mid_cols.sort_unstable();
            }
            Err(minilp::Error::Infeasible) => {
                return Err(PlanError::Infeasible(
                    "linear program is infeasible after refinement".to_owned(),
                ))
            }
            Err(error) => {
                return Err(PlanError::Infeasible(format!(
                    "linear program failed with status '{error}'"
                )))
            }
        }
    }
}

/// Build and solve the program for one partition of the item columns,
/// returning the execution vector in recipe order.
#[allow(clippy::too_many_arguments)]
fn solve_once(
    set: &RecipeSet,
    goals: &BTreeMap<ItemId, f64>,
    options: &PlanOptions,
    item_names: &[ItemId],
    coef: &CoefMatrix,
    goal_cols: &[usize],
    raw_cols: &[usize],
    mid_cols: &[usize],
) -> Result<Vec<f64>, minilp::Error> {
    let mut problem = Problem::new(OptimizationDirection::Minimize);
    // Weighted raw draw, folded into per-recipe objective coefficients:
    // c = -wᵀ·A_C. Raw entries are negative where drawn, so the sign flip
    // makes the simplex minimize the weighted draw.
    let executions: Vec<Variable> = (0..coef.rows())
        .map(|row| {
            let mut cost = 0.0;
            for &col in raw_cols {
                cost -= raw_weight(set, options, item_names[col]) * coef.get(row, col);
            }
            problem.add_var(cost, (0.0, f64::INFINITY))
        })
        .collect();

    for &col in goal_cols {
        let name = item_names[col];
        let demand = goals[&name];
        let column: Vec<f64> = (0..coef.rows()).map(|row| coef.get(row, col)).collect();
        let cyclic = !options.no_cyclic && set[name].flags.cyclic_product;
        if cyclic && column.iter().any(|&value| value < 0.0) {
            // Cyclic product closure: consumption inside the cycle must
            // balance its production, while gross production still covers
            // the demand. A consumption-free column degenerates (gross and
            // net coincide) and keeps the plain equality below.
            problem.add_constraint(expr(&executions, &column), ComparisonOp::Eq, 0.0);
            let gross: Vec<f64> = column.iter().map(|&value| value.max(0.0)).collect();
            problem.add_constraint(expr(&executions, &gross), ComparisonOp::Eq, demand);
        } else {
            problem.add_constraint(expr(&executions, &column), ComparisonOp::Eq, demand);
        }
    }
    for &col in mid_cols {
        let column: Vec<f64> = (0..coef.rows()).map(|row| coef.get(row, col)).collect();
        problem.add_constraint(expr(&executions, &column), ComparisonOp::Ge, 0.0);
    }
    for &col in raw_cols {
        let column: Vec<f64> = (0..coef.rows()).map(|row| coef.get(row, col)).collect();
        problem.add_constraint(expr(&executions, &column), ComparisonOp::Le, 0.0);
    }

    let solution = problem.solve()?;
    Ok(executions.iter().map(|&var| solution[var]).collect())
}

fn expr(variables: &[Variable], coefficients: &[f64]) -> LinearExpr {
    let mut expr = LinearExpr::empty();
    for (&var, &coefficient) in variables.iter().zip(coefficients) {
        if coefficient != 0.0 {
            expr.add(var, coefficient);
        }
    }
    expr
}

/// Objective weight of a raw item: caller-supplied, else zero for trivial
/// items, else one.
fn raw_weight(set: &RecipeSet, options: &PlanOptions, name: ItemId) -> f64 {
    if let Some(&weight) = options.weights.get(&name) {
        return weight;
    }
    if set.item(name).is_some_and(|item| item.flags.trivial) {
        0.0
    } else {
        1.0
    }
}

fn summarize(
    options: &PlanOptions,
    recipe_names: &[RecipeId],
    item_names: &[ItemId],
    coef: &CoefMatrix,
    executions: &[f64],
    raw_cols: &[usize],
    mid_cols: &[usize],
) -> Summary {
    let tol = options.tol;
    let mut recipe_executions = BTreeMap::new();
    for (row, &execs) in executions.iter().enumerate() {
        if execs.abs() > tol {
            recipe_executions.insert(recipe_names[row], execs);
        }
    }
    let net = coef.net_output(executions);
    let mut raw_inputs = BTreeMap::new();
    for &col in raw_cols {
        if net[col] < -tol {
            raw_inputs.insert(item_names[col], -net[col]);
        }
    }
    let mut waste = BTreeMap::new();
    for &col in mid_cols {
        if net[col] > tol {
            waste.insert(item_names[col], net[col]);
        }
    }
    (recipe_executions, raw_inputs, waste)
}
