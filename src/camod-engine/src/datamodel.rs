// Copyright 2023 The Camod Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Plain-data types a loader hands to the core.
//!
//! Whatever format model definitions live in on disk (the reference
//! database uses YAML records curated by hand), the loader's job ends
//! when it has produced a [`Project`].  Construction of analyzable
//! [`crate::model::Model`]s from these types is the core's job, and the
//! core never hands mutation back to the loader.

use serde::{Deserialize, Serialize};

/// Semantic category of a declared symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Variable,
    Parameter,
    Constant,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SymbolDef {
    pub ident: String,
    pub kind: SymbolKind,
}

/// A key's defining equation(s).  A key may be given by a single
/// expression or by several alternative formulations from the source
/// publication.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquationDef {
    Scalar(String),
    Multiple(Vec<String>),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DefinitionDef {
    pub key: String,
    pub equation: EquationDef,
}

/// Row-major grid of equation strings: the right-hand side of the
/// model's ODE system, one cell per state variable per column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatrixDef {
    pub rows: usize,
    pub cols: usize,
    pub elements: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelDef {
    pub name: String,
    #[serde(default)]
    pub doc: String,
    /// citation for the publication this model was transcribed from
    #[serde(default)]
    pub reference: Option<String>,
    pub symbols: Vec<SymbolDef>,
    pub definitions: Vec<DefinitionDef>,
    #[serde(default)]
    pub component_keys: Vec<String>,
    pub rhs: MatrixDef,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub models: Vec<ModelDef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_json_roundtrip() {
        let project = Project {
            name: "soil models".to_string(),
            models: vec![ModelDef {
                name: "two pool".to_string(),
                doc: "".to_string(),
                reference: Some("Henin and Dupuis (1945)".to_string()),
                symbols: vec![
                    SymbolDef {
                        ident: "C_f".to_string(),
                        kind: SymbolKind::Variable,
                    },
                    SymbolDef {
                        ident: "k".to_string(),
                        kind: SymbolKind::Parameter,
                    },
                ],
                definitions: vec![DefinitionDef {
                    key: "f_v".to_string(),
                    equation: EquationDef::Scalar("k * C_f".to_string()),
                }],
                component_keys: vec!["f_v".to_string()],
                rhs: MatrixDef {
                    rows: 1,
                    cols: 1,
                    elements: vec!["-f_v".to_string()],
                },
            }],
        };

        let serialized = serde_json::to_string(&project).unwrap();
        let actual: Project = serde_json::from_str(&serialized).unwrap();
        assert_eq!(project, actual);
    }
}
