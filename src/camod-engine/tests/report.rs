// Copyright 2024 The Camod Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! End-to-end: build a small collection of vegetation models from
//! loader-shaped data, run every collection-level analysis, and check
//! the assembled report against hand-computed expectations.

use camod_engine::datamodel::{
    DefinitionDef, EquationDef, MatrixDef, ModelDef, Project, SymbolDef, SymbolKind,
};
use camod_engine::{full_report, ModelCollection, Node, STATE_VECTOR_DERIVATIVE};

fn sym(ident: &str, kind: SymbolKind) -> SymbolDef {
    SymbolDef {
        ident: ident.to_string(),
        kind,
    }
}

fn def(key: &str, eqn: &str) -> DefinitionDef {
    DefinitionDef {
        key: key.to_string(),
        equation: EquationDef::Scalar(eqn.to_string()),
    }
}

/// Three-pool vegetation model: photosynthate split between foliage,
/// wood and roots by fixed allocation fractions, first-order turnover.
fn three_pool() -> ModelDef {
    ModelDef {
        name: "three_pool".to_string(),
        doc: "foliage/wood/root partitioning with constant allocation".to_string(),
        reference: Some("Luo et al. (2003)".to_string()),
        symbols: vec![
            sym("C_f", SymbolKind::Variable),
            sym("C_w", SymbolKind::Variable),
            sym("C_r", SymbolKind::Variable),
            sym("u", SymbolKind::Parameter),
            sym("eta_f", SymbolKind::Parameter),
            sym("eta_w", SymbolKind::Parameter),
            sym("eta_r", SymbolKind::Parameter),
            sym("gamma_f", SymbolKind::Parameter),
            sym("gamma_w", SymbolKind::Parameter),
            sym("gamma_r", SymbolKind::Parameter),
        ],
        definitions: vec![
            def("f_v", "u * eta_f - gamma_f * C_f"),
            def("f_w", "u * eta_w - gamma_w * C_w"),
            def("f_r", "u * eta_r - gamma_r * C_r"),
        ],
        component_keys: vec!["f_v".to_string(), "f_w".to_string(), "f_r".to_string()],
        rhs: MatrixDef {
            rows: 3,
            cols: 1,
            elements: vec!["f_v".to_string(), "f_w".to_string(), "f_r".to_string()],
        },
    }
}

/// Two-pool model sharing the foliage flux key with three_pool but
/// formulating it differently.
fn two_pool() -> ModelDef {
    ModelDef {
        name: "two_pool".to_string(),
        doc: "".to_string(),
        reference: None,
        symbols: vec![
            sym("C_f", SymbolKind::Variable),
            sym("C_r", SymbolKind::Variable),
            sym("u", SymbolKind::Parameter),
            sym("a", SymbolKind::Parameter),
            sym("k_f", SymbolKind::Parameter),
            sym("k_r", SymbolKind::Parameter),
        ],
        definitions: vec![
            def("f_v", "a * u - k_f * C_f"),
            def("f_s", "k_f * C_f - k_r * C_r"),
        ],
        component_keys: vec!["f_v".to_string(), "f_s".to_string()],
        rhs: MatrixDef {
            rows: 2,
            cols: 1,
            elements: vec!["f_v".to_string(), "f_s".to_string()],
        },
    }
}

/// Single-pool decay model; defines none of the shared flux keys.
fn one_pool() -> ModelDef {
    ModelDef {
        name: "one_pool".to_string(),
        doc: "".to_string(),
        reference: Some("Henin and Dupuis (1945)".to_string()),
        symbols: vec![
            sym("C", SymbolKind::Variable),
            sym("k", SymbolKind::Parameter),
            sym("i", SymbolKind::Parameter),
        ],
        definitions: vec![],
        component_keys: vec![],
        rhs: MatrixDef {
            rows: 1,
            cols: 1,
            elements: vec!["i - k * C".to_string()],
        },
    }
}

fn collection() -> ModelCollection {
    let project = Project {
        name: "vegetation models".to_string(),
        models: vec![three_pool(), two_pool(), one_pool()],
    };
    ModelCollection::from_project(&project).unwrap()
}

#[test]
fn test_aggregate_dependency_histogram() {
    let collection = collection();
    let hist = collection.dependency_histogram(STATE_VECTOR_DERIVATIVE);

    // f_v appears in both multi-pool models' rhs; the single-pool
    // model contributes only raw symbols
    assert_eq!(2, hist["f_v"]);
    assert_eq!(1, hist["f_w"]);
    assert_eq!(1, hist["f_s"]);
    assert_eq!(1, hist["C"]);
    assert_eq!(1, hist["k"]);
    assert!(!hist.contains_key("gamma_f"));
}

#[test]
fn test_component_fanout_matches_definitions() {
    let collection = collection();

    assert_eq!(vec!["f_r", "f_s", "f_v", "f_w"], collection.component_targets());

    // f_v is shared: the filtered sub-collection has both definers,
    // and the histogram over it merges their one-level dependencies
    let sub = collection.with_key("f_v");
    assert_eq!(2, sub.len());

    let hist = sub.dependency_histogram("f_v");
    assert_eq!(2, hist["u"]);
    assert_eq!(1, hist["eta_f"]);
    assert_eq!(1, hist["gamma_f"]);
    assert_eq!(2, hist["C_f"]); // both turnover terms
    assert_eq!(1, hist["a"]);
    // k_f is declared by two_pool, so it counts there and only there
    assert_eq!(1, hist["k_f"]);

    // f_s exists only in two_pool
    let sub = collection.with_key("f_s");
    assert_eq!(1, sub.len());
    assert_eq!("two_pool", sub[0].name);
}

#[test]
fn test_incidence_against_hand_count() {
    let collection = collection().with_key("f_v");
    let incidence = collection.dependency_incidence("f_v");

    // memberships: three_pool {u, eta_f, gamma_f, C_f}, two_pool {a, u, k_f, C_f}
    assert_eq!(8, incidence.points.len());
    assert_eq!(vec!["three_pool", "two_pool"], incidence.model_names);

    // every dep key is hit by at least one point
    for (i, _key) in incidence.dep_keys.iter().enumerate() {
        assert!(incidence.points.iter().any(|(_, x)| *x == i));
    }
}

#[test]
fn test_complexity_records() {
    let collection = collection();
    let records = camod_engine::collection_metrics(&collection);

    assert_eq!(3, records.len());

    // three_pool's rhs cells are bare component keys: zero operations
    assert_eq!("three_pool", records[0].name);
    assert_eq!(0, records[0].total_operations);
    assert_eq!(1, records[0].max_depth);
    assert_eq!(3, records[0].variable_count);

    // one_pool's rhs is i - k*C: two operations, depth 3
    assert_eq!("one_pool", records[2].name);
    assert_eq!(2, records[2].total_operations);
    assert_eq!(3, records[2].max_depth);
    assert_eq!(1, records[2].variable_count);
    assert_eq!(2, records[2].parameter_count);
}

#[test]
fn test_full_report_assembly() {
    let collection = collection();
    let doc = full_report("vegetation models", &collection);

    // per-model sections carry the citations through
    let citations = doc
        .nodes
        .iter()
        .filter(|n| matches!(n, Node::Citation { .. }))
        .count();
    assert_eq!(2, citations);

    // one math block per rhs cell across all models: 3 + 2 + 1
    let math_blocks = doc
        .nodes
        .iter()
        .filter(|n| matches!(n, Node::Math { .. }))
        .count();
    assert_eq!(6, math_blocks);

    // one histogram + one incidence figure per component target,
    // plus the two complexity scatters
    let figures = doc
        .nodes
        .iter()
        .filter(|n| matches!(n, Node::Figure { .. }))
        .count();
    assert_eq!(collection.component_targets().len() * 2 + 2, figures);

    // document survives the renderer boundary
    let serialized = serde_json::to_string_pretty(&doc).unwrap();
    let parsed: camod_engine::Document = serde_json::from_str(&serialized).unwrap();
    assert_eq!(doc, parsed);
}

#[test]
fn test_transitive_closure_reaches_symbols() {
    let collection = collection();
    let model = &collection[0];

    // one level from the aggregate stops at component keys
    let one = model.dependencies(STATE_VECTOR_DERIVATIVE);
    assert!(one.contains("f_v"));
    assert!(!one.contains("u"));

    // the closure reaches through them to the underlying symbols
    let all = model.transitive_dependencies(STATE_VECTOR_DERIVATIVE);
    assert!(all.contains("u"));
    assert!(all.contains("gamma_r"));
    assert!(one.is_subset(&all));
}
