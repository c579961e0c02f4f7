// Copyright 2024 Zachary Stewart
//
//   Licensed under the Apache License, Version 2.0 (the "License");
//   you may not use this file except in compliance with the License.
//   You may obtain a copy of the License at
//
//       http://www.apache.org/licenses/LICENSE-2.0
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use internment::Intern;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::RecipeSet;

/// Trait for symbol types which can be looked up in a [`RecipeSet`].
pub trait Id:
    fmt::Display + fmt::Debug + Eq + PartialEq + Copy + Clone + std::hash::Hash + private::Sealed
{
    type Info;

    /// Fetch the value of the correct type with this id from the catalog.
    fn fetch(self, set: &RecipeSet) -> Option<&Self::Info>;
}

macro_rules! typed_symbol {
    ($($(#[$m:meta])*
     $Self:ident {
        info = $info:ident,
        fetch = $fetch:ident,
     })+) => {
        $(
            $(#[$m])*
            #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
            pub struct $Self(Intern<str>);

            impl $Self {
                /// Intern a name as a symbol of this kind.
                pub fn new(name: &str) -> Self {
                    Self(Intern::from(name))
                }

                /// View the symbol as the underlying string.
                pub fn as_str(&self) -> &str {
                    &self.0
                }
            }

            impl From<&str> for $Self {
                fn from(name: &str) -> Self {
                    Self::new(name)
                }
            }

            impl From<String> for $Self {
                fn from(name: String) -> Self {
                    Self::new(&name)
                }
            }

            impl From<$Self> for String {
                fn from(id: $Self) -> String {
                    id.as_str().to_owned()
                }
            }

            impl Ord for $Self {
                fn cmp(&self, other: &Self) -> Ordering {
                    // Interning compares by pointer; symbols sort by name.
                    self.as_str().cmp(other.as_str())
                }
            }

            impl PartialOrd for $Self {
                fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                    Some(self.cmp(other))
                }
            }

            impl fmt::Display for $Self {
                fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    fmt::Display::fmt(self.as_str(), f)
                }
            }

            impl Serialize for $Self {
                fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
                where
                    S: serde::Serializer,
                {
                    self.as_str().serialize(serializer)
                }
            }

            impl<'de> Deserialize<'de> for $Self {
                fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
                where
                    D: serde::Deserializer<'de>,
                {
                    let name = Cow::<str>::deserialize(deserializer)?;
                    Ok(Self::new(&name))
                }
            }

            impl Id for $Self {
                type Info = $info;

                fn fetch(self, set: &RecipeSet) -> Option<&Self::Info> {
                    set.$fetch(self)
                }
            }

            impl private::Sealed for $Self {}
        )+
    };
}

typed_symbol! {
    /// Symbol naming a recipe.
    RecipeId {
        info = Recipe,
        fetch = recipe,
    }

    /// Symbol naming an item.
    ItemId {
        info = Item,
        fetch = item,
    }
}

/// Error found when constructing a [`Recipe`].
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InvalidRecipe {
    #[error("a name is required for a recipe with {0} results")]
    MissingName(usize),
    #[error("recipe '{recipe}' uses non-positive quantity {quantity} of item '{item}'")]
    BadQuantity {
        recipe: RecipeId,
        item: ItemId,
        quantity: f64,
    },
    #[error("recipe '{recipe}' has non-positive craft time {craft_time}")]
    BadCraftTime { recipe: RecipeId, craft_time: f64 },
}

/// An atomic production rule converting input items into product items.
///
/// All quantities are strictly positive. Recipes sort and compare only by
/// name within a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RecipeShape", into = "RecipeShape")]
pub struct Recipe {
    /// Name of the recipe, unique within a catalog.
    pub name: RecipeId,
    /// Category tag. Values are not interpreted by the planner.
    pub category: String,
    /// Time for one execution at nominal speed, in seconds.
    pub craft_time: f64,
    /// Consumed items and their per-execution quantities.
    pub inputs: BTreeMap<ItemId, f64>,
    /// Produced items and their per-execution quantities.
    pub products: BTreeMap<ItemId, f64>,
}

impl Recipe {
    /// Create a new recipe. With `name` unset the name is derived from the
    /// product, which is only possible for single-product recipes.
    pub fn new(
        name: Option<RecipeId>,
        category: impl Into<String>,
        craft_time: f64,
        inputs: impl IntoIterator<Item = (ItemId, f64)>,
        products: impl IntoIterator<Item = (ItemId, f64)>,
    ) -> Result<Self, InvalidRecipe> {
        let inputs: BTreeMap<ItemId, f64> = inputs.into_iter().collect();
        let products: BTreeMap<ItemId, f64> = products.into_iter().collect();
        let name = match name {
            Some(name) => name,
            None if products.len() == 1 => {
                let product = products.keys().next().expect("products has one entry");
                RecipeId::from(product.as_str())
            }
            None => return Err(InvalidRecipe::MissingName(products.len())),
        };
        let recipe = Recipe {
            name,
            category: category.into(),
            craft_time,
            inputs,
            products,
        };
        recipe.check()?;
        Ok(recipe)
    }

    fn check(&self) -> Result<(), InvalidRecipe> {
        for (&item, &quantity) in self.inputs.iter().chain(self.products.iter()) {
            if !(quantity > 0.0) || !quantity.is_finite() {
                return Err(InvalidRecipe::BadQuantity {
                    recipe: self.name,
                    item,
                    quantity,
                });
            }
        }
        if !(self.craft_time > 0.0) || !self.craft_time.is_finite() {
            return Err(InvalidRecipe::BadCraftTime {
                recipe: self.name,
                craft_time: self.craft_time,
            });
        }
        Ok(())
    }

    /// Reduce this recipe in place to net form: an item appearing on both
    /// sides is replaced by its signed difference, on the side of the
    /// positive sign, or removed entirely when the difference is zero.
    /// Idempotent.
    pub fn update_net_yield(&mut self) {
        let shared: Vec<ItemId> = self
            .inputs
            .keys()
            .filter(|item| self.products.contains_key(*item))
            .copied()
            .collect();
        for item in shared {
            let consumed = self.inputs.remove(&item).expect("item is shared");
            let produced = self.products.remove(&item).expect("item is shared");
            let net = produced - consumed;
            if net > 0.0 {
                self.products.insert(item, net);
            } else if net < 0.0 {
                self.inputs.insert(item, -net);
            }
        }
    }

    /// Clone of this recipe, optionally reduced to net form.
    pub fn copy(&self, net_yield: bool) -> Self {
        let mut copy = self.clone();
        if net_yield {
            copy.update_net_yield();
        }
        copy
    }

    /// Number of distinct input items.
    pub fn n_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Number of distinct product items.
    pub fn n_products(&self) -> usize {
        self.products.len()
    }
}

fn fmt_side(f: &mut fmt::Formatter, side: &BTreeMap<ItemId, f64>) -> fmt::Result {
    if side.is_empty() {
        return f.write_str("NULL");
    }
    for (n, (item, quantity)) in side.iter().enumerate() {
        if n > 0 {
            f.write_str("+")?;
        }
        write!(f, "{quantity:.2}{item}")?;
    }
    Ok(())
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}] ", self.name)?;
        fmt_side(f, &self.inputs)?;
        f.write_str("=>")?;
        fmt_side(f, &self.products)
    }
}

/// Shape of a recipe as persisted externally. The internal field names differ
/// and the name may be left implicit, so [`Recipe`] round-trips through this.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RecipeShape {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<RecipeId>,
    category: String,
    #[serde(default = "default_craft_time")]
    craft_time: f64,
    ingredients: BTreeMap<ItemId, f64>,
    results: BTreeMap<ItemId, f64>,
}

fn default_craft_time() -> f64 {
    0.5
}

impl TryFrom<RecipeShape> for Recipe {
    type Error = InvalidRecipe;

    fn try_from(shape: RecipeShape) -> Result<Self, Self::Error> {
        Recipe::new(
            shape.name,
            shape.category,
            shape.craft_time,
            shape.ingredients,
            shape.results,
        )
    }
}

impl From<Recipe> for RecipeShape {
    fn from(recipe: Recipe) -> Self {
        RecipeShape {
            name: Some(recipe.name),
            category: recipe.category,
            craft_time: recipe.craft_time,
            ingredients: recipe.inputs,
            results: recipe.products,
        }
    }
}

/// Flag block of an [`Item`]. `trivial` and `forced_raw` are operator-set and
/// survive catalog refreshes; the other two are derived.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ItemFlags {
    /// At least one producing recipe has two or more products.
    pub product_of_complex_recipe: bool,
    /// Every producing recipe lies inside one validated cyclic group.
    pub cyclic_product: bool,
    /// Operator declared this item as good as raw (water, steam, ...).
    pub trivial: bool,
    /// Operator declared this item must always be drawn, never produced.
    pub forced_raw: bool,
}

/// A named material, tracking which recipes consume and produce it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Name of this item, unique within a catalog.
    pub name: ItemId,
    /// Recipes using this item as an input.
    pub input_of: BTreeSet<RecipeId>,
    /// Recipes producing this item.
    pub product_of: BTreeSet<RecipeId>,
    /// Flag block.
    pub flags: ItemFlags,
}

impl Item {
    pub(crate) fn new(name: ItemId) -> Self {
        Item {
            name,
            input_of: BTreeSet::new(),
            product_of: BTreeSet::new(),
            flags: ItemFlags::default(),
        }
    }

    /// True if no recipe produces this item.
    pub fn is_actual_raw(&self) -> bool {
        self.product_of.is_empty()
    }

    /// True if this item counts as raw material: forced raw, produced by
    /// nothing, or flagged trivial unless `ignore_trivial` is set.
    pub fn is_raw(&self, ignore_trivial: bool) -> bool {
        if !ignore_trivial && self.flags.trivial {
            return true;
        }
        self.flags.forced_raw || self.product_of.is_empty()
    }

    /// True if this item has multiple source recipes or any complex source.
    pub fn is_multi_source(&self) -> bool {
        self.flags.product_of_complex_recipe || self.product_of.len() >= 2
    }

    /// True if demand for this item cannot be expanded deterministically and
    /// must go through the linear program. `no_cyclic` drops the cyclic
    /// product criterion.
    pub fn is_ambiguous(&self, ignore_trivial: bool, no_cyclic: bool) -> bool {
        if self.is_raw(ignore_trivial) {
            return false;
        }
        self.is_multi_source() || (!no_cyclic && self.flags.cyclic_product)
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "'{}', trivial: {}", self.name, self.flags.trivial)
    }
}

mod private {
    pub trait Sealed {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gear_recipe() -> Recipe {
        Recipe::new(
            None,
            "crafting",
            0.5,
            [(ItemId::from("iron-plate"), 2.0)],
            [(ItemId::from("gear"), 1.0)],
        )
        .unwrap()
    }

    #[test]
    fn name_derived_from_single_product() {
        assert_eq!(gear_recipe().name, RecipeId::from("gear"));
    }

    #[test]
    fn name_required_for_multi_product() {
        let err = Recipe::new(
            None,
            "oil-processing",
            5.0,
            [(ItemId::from("crude-oil"), 100.0)],
            [
                (ItemId::from("heavy-oil"), 25.0),
                (ItemId::from("light-oil"), 45.0),
            ],
        )
        .unwrap_err();
        assert_eq!(err, InvalidRecipe::MissingName(2));
    }

    #[test]
    fn rejects_non_positive_quantities() {
        let err = Recipe::new(
            None,
            "crafting",
            0.5,
            [(ItemId::from("iron-plate"), -2.0)],
            [(ItemId::from("gear"), 1.0)],
        )
        .unwrap_err();
        assert!(matches!(err, InvalidRecipe::BadQuantity { .. }));

        let err = Recipe::new(
            None,
            "crafting",
            0.0,
            [(ItemId::from("iron-plate"), 2.0)],
            [(ItemId::from("gear"), 1.0)],
        )
        .unwrap_err();
        assert!(matches!(err, InvalidRecipe::BadCraftTime { .. }));
    }

    #[test]
    fn net_yield_is_idempotent() {
        let mut recipe = Recipe::new(
            Some(RecipeId::from("enrich")),
            "enrichment",
            60.0,
            [(ItemId::from("u235"), 40.0), (ItemId::from("u238"), 5.0)],
            [(ItemId::from("u235"), 41.0), (ItemId::from("u238"), 2.0)],
        )
        .unwrap();
        recipe.update_net_yield();
        assert_eq!(recipe.products[&ItemId::from("u235")], 1.0);
        assert_eq!(recipe.inputs[&ItemId::from("u238")], 3.0);
        assert!(!recipe.inputs.contains_key(&ItemId::from("u235")));
        assert!(!recipe.products.contains_key(&ItemId::from("u238")));

        let once = recipe.clone();
        recipe.update_net_yield();
        assert_eq!(recipe, once);
    }

    #[test]
    fn net_yield_drops_balanced_items() {
        let mut recipe = Recipe::new(
            Some(RecipeId::from("catalyzed")),
            "chemistry",
            1.0,
            [(ItemId::from("catalyst"), 1.0), (ItemId::from("ore"), 2.0)],
            [(ItemId::from("catalyst"), 1.0), (ItemId::from("plate"), 1.0)],
        )
        .unwrap();
        recipe.update_net_yield();
        assert!(!recipe.inputs.contains_key(&ItemId::from("catalyst")));
        assert!(!recipe.products.contains_key(&ItemId::from("catalyst")));
        assert_eq!(recipe.inputs[&ItemId::from("ore")], 2.0);
    }

    #[test]
    fn persisted_shape_round_trip() {
        let parsed: Recipe = serde_json::from_str(
            r#"{
                "category": "smelting",
                "craft_time": 3.5,
                "ingredients": {"iron-ore": 1.0},
                "results": {"iron-plate": 1.0}
            }"#,
        )
        .unwrap();
        assert_eq!(parsed.name, RecipeId::from("iron-plate"));
        assert_eq!(parsed.craft_time, 3.5);

        let text = serde_json::to_string(&parsed).unwrap();
        let again: Recipe = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, again);
    }

    #[test]
    fn persisted_shape_default_craft_time() {
        let parsed: Recipe = serde_json::from_str(
            r#"{
                "category": "crafting",
                "ingredients": {},
                "results": {"wood": 1.0}
            }"#,
        )
        .unwrap();
        assert_eq!(parsed.craft_time, 0.5);
    }

    #[test]
    fn raw_classification() {
        let mut item = Item::new(ItemId::from("water"));
        assert!(item.is_actual_raw());
        assert!(item.is_raw(false));

        item.product_of.insert(RecipeId::from("boil"));
        assert!(!item.is_raw(false));

        item.flags.trivial = true;
        assert!(item.is_raw(false));
        assert!(!item.is_raw(true));

        item.flags.forced_raw = true;
        assert!(item.is_raw(true));
    }

    #[test]
    fn ambiguity_classification() {
        let mut item = Item::new(ItemId::from("gear"));
        item.product_of.insert(RecipeId::from("gear"));
        assert!(!item.is_ambiguous(false, false));

        item.product_of.insert(RecipeId::from("gear-alt"));
        assert!(item.is_ambiguous(false, false));

        item.product_of.remove(&RecipeId::from("gear-alt"));
        item.flags.product_of_complex_recipe = true;
        assert!(item.is_ambiguous(false, false));

        item.flags.product_of_complex_recipe = false;
        item.flags.cyclic_product = true;
        assert!(item.is_ambiguous(false, false));
        assert!(!item.is_ambiguous(false, true));

        // Raw always wins over ambiguity.
        item.flags.forced_raw = true;
        assert!(!item.is_ambiguous(false, false));
    }
}
