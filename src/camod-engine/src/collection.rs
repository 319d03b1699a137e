// Copyright 2024 The Camod Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! An ordered collection of models and the comparative analyses that
//! only make sense across one: which dependencies recur in how many
//! models, and which model uses which.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::common::{Ident, Result, STATE_VECTOR_DERIVATIVE};
use crate::datamodel;
use crate::model::Model;

/// dependency identifier -> number of models whose target-key
/// dependency set contains it.  Identifiers no model depends on are
/// absent, never zero.
pub type Histogram = BTreeMap<Ident, usize>;

/// The (model, dependency) membership relation for one target key,
/// flattened for two-axis presentation.  `points` holds one
/// (model-index, dependency-index) pair per membership, indices into
/// `model_names` and `dep_keys` respectively.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyIncidence {
    pub target_key: Ident,
    pub dep_keys: Vec<Ident>,
    pub model_names: Vec<String>,
    pub points: Vec<(usize, usize)>,
}

/// An ordered sequence of models.  Order matters only for output
/// labeling (rows of an incidence figure, records of a metrics table),
/// never for the aggregates themselves.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ModelCollection {
    models: Vec<Model>,
}

impl ModelCollection {
    pub fn new(models: Vec<Model>) -> Self {
        ModelCollection { models }
    }

    /// Build a collection from loader output, in input order.  The
    /// first model that fails to construct aborts the whole load.
    pub fn from_project(project: &datamodel::Project) -> Result<Self> {
        let models = project
            .models
            .iter()
            .map(Model::new)
            .collect::<Result<Vec<_>>>()?;
        Ok(ModelCollection { models })
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Model> {
        self.models.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Model> {
        self.models.get(index)
    }

    /// The sub-collection of models that define `target_key`, order
    /// preserved.  The result is independent of `self`.
    pub fn with_key(&self, target_key: &str) -> ModelCollection {
        ModelCollection {
            models: self
                .models
                .iter()
                .filter(|m| m.has_key(target_key))
                .cloned()
                .collect(),
        }
    }

    /// For each identifier any model's `target_key` depends on, the
    /// number of models in the collection whose dependency set
    /// contains it.
    pub fn dependency_histogram(&self, target_key: &str) -> Histogram {
        let mut hist = Histogram::new();
        for model in self.models.iter() {
            for dep in model.dependencies(target_key) {
                *hist.entry(dep).or_insert(0) += 1;
            }
        }
        hist
    }

    /// The full (model, dependency) membership relation for
    /// `target_key`: one point per membership, none spurious.
    /// Dependency keys are ordered by name so repeated runs agree;
    /// models keep collection order.
    pub fn dependency_incidence(&self, target_key: &str) -> DependencyIncidence {
        let mut all_keys: BTreeSet<Ident> = BTreeSet::new();
        for model in self.models.iter() {
            all_keys.extend(model.dependencies(target_key));
        }
        let dep_keys: Vec<Ident> = all_keys.into_iter().collect();

        let mut points: Vec<(usize, usize)> = Vec::new();
        for (y, model) in self.models.iter().enumerate() {
            for dep in model.dependencies(target_key) {
                // binary search is fine: dep_keys is sorted and deps
                // resolve out of the same universe
                let x = dep_keys.binary_search(&dep).unwrap();
                points.push((y, x));
            }
        }

        DependencyIncidence {
            target_key: target_key.to_string(),
            dep_keys,
            model_names: self.models.iter().map(|m| m.name.clone()).collect(),
            points,
        }
    }

    /// Every component key any model in the collection names, sorted,
    /// minus the aggregate state-vector-derivative key.  One
    /// histogram/incidence pass is run per entry when assembling a
    /// dependency report.
    pub fn component_targets(&self) -> Vec<Ident> {
        let mut targets: BTreeSet<Ident> = BTreeSet::new();
        for model in self.models.iter() {
            for key in model.component_keys() {
                if key != STATE_VECTOR_DERIVATIVE {
                    targets.insert(key.clone());
                }
            }
        }
        targets.into_iter().collect()
    }
}

impl std::ops::Index<usize> for ModelCollection {
    type Output = Model;

    fn index(&self, index: usize) -> &Model {
        &self.models[index]
    }
}

impl<'a> IntoIterator for &'a ModelCollection {
    type Item = &'a Model;
    type IntoIter = std::slice::Iter<'a, Model>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
