// Copyright 2025 The Camod Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Property-based tests for the dependency resolver and the
//! complexity analyzer:
//!
//! 1. Resolved sets only ever contain declared keys or classified
//!    symbols (well-formedness), and resolving twice gives equal sets
//!    (idempotence).
//! 2. Histogram counts are bounded by the collection size and agree
//!    with per-model membership (consistency).
//! 3. Complexity metrics are monotone over sub-terms.

use proptest::prelude::*;

use crate::ast::Expr;
use crate::collection::ModelCollection;
use crate::common::STATE_VECTOR_DERIVATIVE;
use crate::complexity::cell_metrics;
use crate::datamodel::{
    DefinitionDef, EquationDef, MatrixDef, ModelDef, SymbolDef, SymbolKind,
};
use crate::model::Model;
use crate::parser::parse;

// Strategy helpers for generating symbols and equation text

const SYMBOL_POOL: &[&str] = &["u", "B", "C_f", "C_r", "k", "t", "w"];
const KEY_POOL: &[&str] = &["f_v", "f_s", "f_r"];

fn symbol_kind_strategy() -> impl Strategy<Value = SymbolKind> {
    prop_oneof![
        Just(SymbolKind::Variable),
        Just(SymbolKind::Parameter),
        Just(SymbolKind::Constant),
    ]
}

fn operand_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("0".to_string()),
        (1i32..100).prop_map(|n| n.to_string()),
        prop::sample::select(SYMBOL_POOL).prop_map(|s| s.to_string()),
        prop::sample::select(KEY_POOL).prop_map(|s| s.to_string()),
        // an identifier nothing declares; must never leak through
        Just("mystery".to_string()),
    ]
}

fn equation_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        operand_strategy(),
        (operand_strategy(), operand_strategy()).prop_map(|(a, b)| format!("{} + {}", a, b)),
        (operand_strategy(), operand_strategy()).prop_map(|(a, b)| format!("{} * {}", a, b)),
        (operand_strategy(), operand_strategy()).prop_map(|(a, b)| format!("{} / ({} + 1)", a, b)),
        operand_strategy().prop_map(|a| format!("exp(-k * {})", a)),
    ]
}

fn symbols_strategy() -> impl Strategy<Value = Vec<SymbolDef>> {
    prop::collection::vec(
        (prop::sample::select(SYMBOL_POOL), symbol_kind_strategy()),
        0..SYMBOL_POOL.len(),
    )
    .prop_map(|pairs| {
        let mut seen = std::collections::HashSet::new();
        pairs
            .into_iter()
            .filter(|(ident, _)| seen.insert(*ident))
            .map(|(ident, kind)| SymbolDef {
                ident: ident.to_string(),
                kind,
            })
            .collect()
    })
}

fn model_def_strategy() -> impl Strategy<Value = ModelDef> {
    (
        "[a-z][a-z0-9_]{0,11}",
        symbols_strategy(),
        prop::collection::vec(
            (prop::sample::select(KEY_POOL), equation_strategy()),
            0..KEY_POOL.len(),
        ),
        prop::collection::vec(equation_strategy(), 1..4),
    )
        .prop_map(|(name, symbols, defs, rhs_elements)| {
            let mut seen = std::collections::HashSet::new();
            let definitions: Vec<DefinitionDef> = defs
                .into_iter()
                .filter(|(key, _)| seen.insert(*key))
                .map(|(key, eqn)| DefinitionDef {
                    key: key.to_string(),
                    equation: EquationDef::Scalar(eqn),
                })
                .collect();
            let component_keys = definitions.iter().map(|d| d.key.clone()).collect();
            ModelDef {
                name,
                doc: "".to_string(),
                reference: None,
                symbols,
                definitions,
                component_keys,
                rhs: MatrixDef {
                    rows: rhs_elements.len(),
                    cols: 1,
                    elements: rhs_elements,
                },
            }
        })
}

fn model_strategy() -> impl Strategy<Value = Model> {
    model_def_strategy().prop_map(|def| Model::new(&def).unwrap())
}

fn target_key_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(KEY_POOL).prop_map(|s| s.to_string()),
        Just(STATE_VECTOR_DERIVATIVE.to_string()),
        Just("no_such_key".to_string()),
    ]
}

fn expr_strategy() -> impl Strategy<Value = Expr> {
    equation_strategy().prop_map(|eqn| parse(&eqn).unwrap().unwrap())
}

proptest! {
    #[test]
    fn resolved_sets_are_well_formed(model in model_strategy(), key in target_key_strategy()) {
        for dep in model.dependencies(&key) {
            prop_assert!(
                model.definitions().contains_key(&dep)
                    || model.symbol_table().contains_key(&dep),
                "unclassified identifier {} in dependency set",
                dep
            );
            prop_assert!(dep != "mystery");
        }
    }

    #[test]
    fn resolution_is_idempotent(model in model_strategy(), key in target_key_strategy()) {
        prop_assert_eq!(model.dependencies(&key), model.dependencies(&key));
        prop_assert_eq!(
            model.transitive_dependencies(&key),
            model.transitive_dependencies(&key)
        );
    }

    #[test]
    fn one_level_is_subset_of_transitive(model in model_strategy(), key in target_key_strategy()) {
        let one = model.dependencies(&key);
        let all = model.transitive_dependencies(&key);
        prop_assert!(one.is_subset(&all));
    }

    #[test]
    fn histogram_is_bounded_and_consistent(
        models in prop::collection::vec(model_strategy(), 0..5),
        key in target_key_strategy(),
    ) {
        let collection = ModelCollection::new(models);
        let hist = collection.dependency_histogram(&key);

        for (dep, count) in hist.iter() {
            prop_assert!(*count > 0);
            prop_assert!(*count <= collection.len());
            let recount = collection
                .iter()
                .filter(|m| m.dependencies(&key).contains(dep))
                .count();
            prop_assert_eq!(recount, *count);
        }
    }

    #[test]
    fn incidence_matches_membership(
        models in prop::collection::vec(model_strategy(), 0..5),
        key in target_key_strategy(),
    ) {
        let collection = ModelCollection::new(models);
        let incidence = collection.dependency_incidence(&key);

        let mut expected = 0;
        for model in collection.iter() {
            expected += model.dependencies(&key).len();
        }
        prop_assert_eq!(expected, incidence.points.len());

        let deduped: std::collections::BTreeSet<_> = incidence.points.iter().collect();
        prop_assert_eq!(deduped.len(), incidence.points.len());
    }

    #[test]
    fn complexity_is_monotone(expr in expr_strategy()) {
        let m = cell_metrics(&expr);

        if expr.is_atomic() {
            prop_assert_eq!(0, m.operations);
            prop_assert_eq!(1, m.depth);
        } else {
            let children = expr.sub_terms();
            let child_ops: usize = children.iter().map(|c| cell_metrics(c).operations).sum();
            let child_depth = children.iter().map(|c| cell_metrics(c).depth).max().unwrap_or(0);
            prop_assert!(m.operations >= child_ops);
            prop_assert_eq!(child_depth + 1, m.depth);
        }
    }

    #[test]
    fn with_key_preserves_order_and_membership(
        models in prop::collection::vec(model_strategy(), 0..5),
        key in target_key_strategy(),
    ) {
        let collection = ModelCollection::new(models);
        let sub = collection.with_key(&key);

        prop_assert!(sub.iter().all(|m| m.has_key(&key)));

        let expected: Vec<&str> = collection
            .iter()
            .filter(|m| m.has_key(&key))
            .map(|m| m.name.as_str())
            .collect();
        let actual: Vec<&str> = sub.iter().map(|m| m.name.as_str()).collect();
        prop_assert_eq!(expected, actual);
    }
}
