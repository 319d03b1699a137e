// Copyright 2025 The Camod Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Renderer-agnostic report documents.
//!
//! The assembler turns aggregator and analyzer output into a flat
//! sequence of typed nodes.  A renderer downstream maps node tags to
//! whatever output format it targets; nothing here touches the
//! filesystem or an axes object, and symbolic expressions cross this
//! boundary only as already-rendered LaTeX payloads.

use serde::{Deserialize, Serialize};

use crate::ast::latex_eqn;
use crate::collection::{DependencyIncidence, ModelCollection};
use crate::complexity::{collection_metrics, ComplexityRecord};
use crate::model::Model;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FigureData {
    /// bar chart: one bar per dependency, bar height = number of
    /// models depending on it
    Histogram {
        target_key: String,
        labels: Vec<String>,
        counts: Vec<usize>,
        x_label: String,
        y_label: String,
    },
    /// two-axis membership scatter: models against dependency keys
    Incidence {
        incidence: DependencyIncidence,
        x_label: String,
        y_label: String,
    },
    /// labeled point cloud, one point per model
    Scatter {
        points: Vec<ScatterPoint>,
        x_label: String,
        y_label: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub label: String,
    pub x: usize,
    pub y: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Heading { level: u8, text: String },
    Text { text: String },
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Math { latex: String },
    Figure { label: String, data: FigureData },
    Citation { text: String },
    LineBreak,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub nodes: Vec<Node>,
}

/// Per-model section: heading, citation, prose, and the right-hand
/// side rendered one math block per cell.
pub fn model_section(model: &Model) -> Vec<Node> {
    let mut nodes = vec![Node::Heading {
        level: 2,
        text: model.name.clone(),
    }];
    if let Some(ref reference) = model.reference {
        nodes.push(Node::Citation {
            text: reference.clone(),
        });
    }
    if !model.doc.is_empty() {
        nodes.push(Node::Text {
            text: model.doc.clone(),
        });
    }
    for expr in model.rhs().iter() {
        nodes.push(Node::Math {
            latex: latex_eqn(expr),
        });
    }
    nodes.push(Node::LineBreak);
    nodes
}

/// Comparative dependency section for one target key: histogram of
/// dependency recurrence plus the model/dependency incidence scatter.
pub fn dependency_section(collection: &ModelCollection, target_key: &str) -> Vec<Node> {
    let hist = collection.dependency_histogram(target_key);
    let (labels, counts): (Vec<String>, Vec<usize>) = hist.into_iter().unzip();

    let incidence = collection.dependency_incidence(target_key);

    vec![
        Node::Heading {
            level: 2,
            text: format!("Dependencies of {}", target_key),
        },
        Node::Figure {
            label: format!("{}_histogram", target_key),
            data: FigureData::Histogram {
                target_key: target_key.to_string(),
                labels,
                counts,
                x_label: format!("dependencies of {}", target_key),
                y_label: "# models".to_string(),
            },
        },
        Node::Figure {
            label: format!("{}_incidence", target_key),
            data: FigureData::Incidence {
                incidence,
                x_label: format!("dependencies of {}", target_key),
                y_label: "models".to_string(),
            },
        },
        Node::LineBreak,
    ]
}

fn metrics_row(record: &ComplexityRecord) -> Vec<String> {
    vec![
        record.name.clone(),
        record.total_operations.to_string(),
        record.max_depth.to_string(),
        record.variable_count.to_string(),
        record.parameter_count.to_string(),
    ]
}

/// Comparative complexity section: the per-model metrics table plus
/// the operations-vs-variables and depth-vs-variables scatters.
pub fn complexity_section(collection: &ModelCollection) -> Vec<Node> {
    let records = collection_metrics(collection);

    let ops_points: Vec<ScatterPoint> = records
        .iter()
        .map(|r| ScatterPoint {
            label: r.name.clone(),
            x: r.variable_count,
            y: r.total_operations,
        })
        .collect();
    let depth_points: Vec<ScatterPoint> = records
        .iter()
        .map(|r| ScatterPoint {
            label: r.name.clone(),
            x: r.variable_count,
            y: r.max_depth,
        })
        .collect();

    vec![
        Node::Heading {
            level: 2,
            text: "Structural complexity".to_string(),
        },
        Node::Table {
            header: ["model", "# operations", "max depth", "# variables", "# parameters"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rows: records.iter().map(metrics_row).collect(),
        },
        Node::Figure {
            label: "nr_vars_vs_nr_ops".to_string(),
            data: FigureData::Scatter {
                points: ops_points,
                x_label: "# variables".to_string(),
                y_label: "# operations".to_string(),
            },
        },
        Node::Figure {
            label: "nr_vars_vs_depth".to_string(),
            data: FigureData::Scatter {
                points: depth_points,
                x_label: "# variables".to_string(),
                y_label: "max nesting depth".to_string(),
            },
        },
        Node::LineBreak,
    ]
}

/// The whole report: one section per model, the complexity
/// comparison, then one dependency section per component key found
/// anywhere in the collection, each computed over the sub-collection
/// of models that actually define it.
pub fn full_report(title: &str, collection: &ModelCollection) -> Document {
    let mut nodes = vec![Node::Heading {
        level: 1,
        text: title.to_string(),
    }];

    for model in collection.iter() {
        nodes.extend(model_section(model));
    }

    nodes.extend(complexity_section(collection));

    for target_key in collection.component_targets() {
        let sublist = collection.with_key(&target_key);
        nodes.extend(dependency_section(&sublist, &target_key));
    }

    Document {
        title: title.to_string(),
        nodes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::STATE_VECTOR_DERIVATIVE;
    use crate::datamodel::SymbolKind::*;
    use crate::model::{model, x_def, x_model, x_sym};

    fn sample_collection() -> ModelCollection {
        let a = model(&x_model(
            "model_a",
            vec![x_sym("u", Parameter), x_sym("B", Variable)],
            vec![x_def("f_v", "u * B")],
            &["f_v"],
            (1, 1, &["f_v"]),
        ));
        let b = model(&x_model(
            "model_b",
            vec![x_sym("u", Parameter), x_sym("B", Variable)],
            vec![x_def("f_v", "u * B / 2"), x_def("f_s", "B")],
            &["f_v", "f_s"],
            (1, 1, &["f_v - f_s"]),
        ));
        ModelCollection::new(vec![a, b])
    }

    #[test]
    fn test_histogram_figure_matches_aggregate() {
        let collection = sample_collection();
        let nodes = dependency_section(&collection, "f_v");

        let hist = collection.dependency_histogram("f_v");
        match &nodes[1] {
            Node::Figure {
                data: FigureData::Histogram { labels, counts, .. },
                ..
            } => {
                assert_eq!(hist.len(), labels.len());
                assert_eq!(labels.len(), counts.len());
                for (label, count) in labels.iter().zip(counts.iter()) {
                    assert_eq!(hist[label], *count);
                }
            }
            other => panic!("expected histogram figure, got {:?}", other),
        }
    }

    #[test]
    fn test_incidence_figure_complete() {
        let collection = sample_collection();
        let nodes = dependency_section(&collection, STATE_VECTOR_DERIVATIVE);

        match &nodes[2] {
            Node::Figure {
                data: FigureData::Incidence { incidence, .. },
                ..
            } => {
                let expected = collection.dependency_incidence(STATE_VECTOR_DERIVATIVE);
                assert_eq!(&expected, incidence);
            }
            other => panic!("expected incidence figure, got {:?}", other),
        }
    }

    #[test]
    fn test_model_section_one_math_block_per_rhs_cell() {
        let m = model(&x_model(
            "pools",
            vec![x_sym("C_f", Variable), x_sym("C_r", Variable)],
            vec![],
            &[],
            (2, 1, &["-C_f", "C_f - C_r"]),
        ));
        let nodes = model_section(&m);
        let math_count = nodes
            .iter()
            .filter(|n| matches!(n, Node::Math { .. }))
            .count();
        assert_eq!(2, math_count);
    }

    #[test]
    fn test_full_report_structure() {
        let collection = sample_collection();
        let doc = full_report("vegetation models", &collection);

        // one top-level heading
        assert!(matches!(
            &doc.nodes[0],
            Node::Heading { level: 1, text } if text == "vegetation models"
        ));

        // one model section heading per model
        let model_headings = doc
            .nodes
            .iter()
            .filter(|n| matches!(n, Node::Heading { level: 2, text } if text.starts_with("model_")))
            .count();
        assert_eq!(collection.len(), model_headings);

        // one dependency section per component target
        let targets = collection.component_targets();
        let dep_headings = doc
            .nodes
            .iter()
            .filter(
                |n| matches!(n, Node::Heading { level: 2, text } if text.starts_with("Dependencies of ")),
            )
            .count();
        assert_eq!(targets.len(), dep_headings);

        // the complexity table has exactly one row per model
        let table_rows = doc
            .nodes
            .iter()
            .find_map(|n| match n {
                Node::Table { rows, .. } => Some(rows.len()),
                _ => None,
            })
            .unwrap();
        assert_eq!(collection.len(), table_rows);
    }

    #[test]
    fn test_empty_collection_report() {
        let collection = ModelCollection::default();
        let doc = full_report("empty", &collection);
        // heading + complexity section only; nothing to fan out over
        assert!(doc
            .nodes
            .iter()
            .all(|n| !matches!(n, Node::Figure { data: FigureData::Histogram { .. }, .. })));
    }

    #[test]
    fn test_document_json_roundtrip() {
        let collection = sample_collection();
        let doc = full_report("roundtrip", &collection);
        let serialized = serde_json::to_string(&doc).unwrap();
        let actual: Document = serde_json::from_str(&serialized).unwrap();
        assert_eq!(doc, actual);
    }
}
