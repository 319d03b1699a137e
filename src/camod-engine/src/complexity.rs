// Copyright 2024 The Camod Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Structural complexity of symbolic expressions: how many operations
//! it takes to evaluate a model's right-hand side, and how deeply its
//! expressions nest.

use serde::Serialize;
use tracing::warn;

use crate::ast::Expr;
use crate::collection::ModelCollection;
use crate::model::Model;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ComplexityMetrics {
    /// total operator/application count over the whole tree; 0 for an
    /// atomic value
    pub operations: usize,
    /// nesting depth; 1 for an atomic value
    pub depth: usize,
}

/// Metrics for a single expression tree.
///
/// A non-atomic node with no sub-terms (a zero-argument application)
/// is counted with depth 1 and flagged rather than treated as an
/// error: it is a defect in the expression's atom classification, not
/// in the analysis.
pub fn cell_metrics(expr: &Expr) -> ComplexityMetrics {
    if expr.is_atomic() {
        return ComplexityMetrics {
            operations: 0,
            depth: 1,
        };
    }

    let children = expr.sub_terms();
    if children.is_empty() {
        warn!(
            expr = crate::ast::print_eqn(expr).as_str(),
            "metrics anomaly: non-atomic expression without sub-terms"
        );
        return ComplexityMetrics {
            operations: expr.own_op_count(),
            depth: 1,
        };
    }

    let mut operations = expr.own_op_count();
    let mut max_child_depth = 0;
    for child in children {
        let m = cell_metrics(child);
        operations += m.operations;
        max_child_depth = max_child_depth.max(m.depth);
    }

    ComplexityMetrics {
        operations,
        depth: 1 + max_child_depth,
    }
}

/// Aggregate metrics over every cell of a model's right-hand side:
/// summed operation count, maximum nesting depth.  An empty rhs yields
/// (0, 0).
pub fn model_metrics(model: &Model) -> (usize, usize) {
    let mut total_operations = 0;
    let mut max_depth = 0;
    for expr in model.rhs().iter() {
        let m = cell_metrics(expr);
        total_operations += m.operations;
        max_depth = max_depth.max(m.depth);
    }
    (total_operations, max_depth)
}

/// One record per model, in collection order, pairing the complexity
/// aggregates with the model's symbol counts.  Presentation code picks
/// which pairing to plot (operations against variables, depth against
/// variables, ...); two models may legitimately share a name and are
/// not deduplicated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ComplexityRecord {
    pub name: String,
    pub total_operations: usize,
    pub max_depth: usize,
    pub variable_count: usize,
    pub parameter_count: usize,
}

pub fn collection_metrics(collection: &ModelCollection) -> Vec<ComplexityRecord> {
    collection
        .iter()
        .map(|model| {
            let (total_operations, max_depth) = model_metrics(model);
            ComplexityRecord {
                name: model.name.clone(),
                total_operations,
                max_depth,
                variable_count: model.variable_count(),
                parameter_count: model.parameter_count(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamodel::SymbolKind::*;
    use crate::model::{model, x_model, x_sym};
    use crate::parser::parse;

    fn metrics(eqn: &str) -> ComplexityMetrics {
        cell_metrics(&parse(eqn).unwrap().unwrap())
    }

    #[test]
    fn test_atomic_base_case() {
        for eqn in ["C_f", "3.14", "0"] {
            let m = metrics(eqn);
            assert_eq!(0, m.operations);
            assert_eq!(1, m.depth);
        }
    }

    #[test]
    fn test_composite_metrics() {
        // one multiply
        let m = metrics("u * B");
        assert_eq!(1, m.operations);
        assert_eq!(2, m.depth);

        // exp(-k*t): app + negate + multiply
        let m = metrics("exp(-k*t)");
        assert_eq!(3, m.operations);
        assert_eq!(4, m.depth);
    }

    #[test]
    fn test_monotonicity() {
        let expr = parse("u * A - k_f * C_f ^ 2").unwrap().unwrap();
        let m = cell_metrics(&expr);

        let children = expr.sub_terms();
        assert!(!children.is_empty());
        let child_ops: usize = children.iter().map(|c| cell_metrics(c).operations).sum();
        let child_depth = children
            .iter()
            .map(|c| cell_metrics(c).depth)
            .max()
            .unwrap();

        assert!(m.operations >= child_ops);
        assert_eq!(child_depth + 1, m.depth);
    }

    #[test]
    fn test_empty_subterm_anomaly() {
        // zero-argument application: flagged, depth 1, no panic
        let m = metrics("f()");
        assert_eq!(1, m.depth);
        assert_eq!(1, m.operations);
    }

    #[test]
    fn test_model_metrics_atomic_rhs() {
        // a 2x1 matrix of atomic expressions
        let m = model(&x_model(
            "atoms",
            vec![x_sym("C_f", Variable), x_sym("C_r", Variable)],
            vec![],
            &[],
            (2, 1, &["C_f", "C_r"]),
        ));
        assert_eq!((0, 1), model_metrics(&m));
    }

    #[test]
    fn test_model_metrics_sums_and_maxes() {
        let m = model(&x_model(
            "mixed",
            vec![x_sym("C_f", Variable), x_sym("u", Parameter)],
            vec![],
            &[],
            (2, 1, &["u * C_f", "C_f"]),
        ));
        // one op total; deepest cell has depth 2
        assert_eq!((1, 2), model_metrics(&m));
    }

    #[test]
    fn test_collection_metrics_order_and_counts() {
        let a = model(&x_model(
            "a",
            vec![x_sym("x", Variable)],
            vec![],
            &[],
            (1, 1, &["x + x"]),
        ));
        let b = model(&x_model(
            "b",
            vec![x_sym("x", Variable), x_sym("y", Variable), x_sym("p", Parameter)],
            vec![],
            &[],
            (1, 1, &["p * x * y"]),
        ));
        let collection = ModelCollection::new(vec![a, b]);

        let records = collection_metrics(&collection);
        assert_eq!(2, records.len());
        assert_eq!("a", records[0].name);
        assert_eq!(1, records[0].total_operations);
        assert_eq!(1, records[0].variable_count);
        assert_eq!("b", records[1].name);
        assert_eq!(2, records[1].total_operations);
        assert_eq!(2, records[1].variable_count);
        assert_eq!(1, records[1].parameter_count);
    }
}
