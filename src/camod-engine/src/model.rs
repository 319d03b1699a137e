// Copyright 2024 The Camod Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::ast::{identifier_set, Expr};
use crate::common::{
    canonicalize, EquationError, Error, ErrorCode, ErrorKind, Ident, Result,
    STATE_VECTOR_DERIVATIVE,
};
use crate::datamodel::{self, SymbolKind};
use crate::parser::parse;
use crate::{model_err, var_eqn_err};

pub type DependencySet = BTreeSet<Ident>;

/// A key's parsed definition.  Keys bound to several alternative
/// formulations keep all of them; dependency queries union over all.
#[derive(Clone, PartialEq, Debug)]
pub enum Definition {
    Single(Expr),
    Multiple(Vec<Expr>),
}

impl Definition {
    pub fn exprs(&self) -> &[Expr] {
        match self {
            Definition::Single(expr) => std::slice::from_ref(expr),
            Definition::Multiple(exprs) => exprs,
        }
    }
}

/// Row-major grid of parsed expressions: the right-hand side of the
/// model's governing ODE system.
#[derive(Clone, PartialEq, Debug)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    elements: Vec<Expr>,
}

impl Matrix {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Expr> {
        if row < self.rows && col < self.cols {
            self.elements.get(row * self.cols + col)
        } else {
            None
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Expr> {
        self.elements.iter()
    }
}

/// A single carbon-allocation model: a named, read-only store of
/// symbolic definitions plus the metadata needed to classify the
/// identifiers that appear inside them.
///
/// Dependency sets for every key (and for the aggregate right-hand
/// side) are resolved once at construction; all later queries are
/// lookups.
#[derive(Clone, PartialEq, Debug)]
pub struct Model {
    pub name: String,
    pub doc: String,
    pub reference: Option<String>,
    definitions: HashMap<Ident, Definition>,
    symbol_table: HashMap<Ident, SymbolKind>,
    component_keys: Vec<Ident>,
    rhs: Matrix,
    dep_map: HashMap<Ident, DependencySet>,
}

fn parse_one(key: &str, eqn: &str) -> std::result::Result<Expr, (Ident, EquationError)> {
    match parse(eqn) {
        Ok(Some(expr)) => Ok(expr),
        Ok(None) => var_eqn_err!(key.to_string(), EmptyEquation, 0, 0),
        Err(err) => Err((key.to_string(), err)),
    }
}

impl Model {
    pub fn new(x_model: &datamodel::ModelDef) -> Result<Model> {
        let name = x_model.name.trim().to_string();
        if name.is_empty() {
            return model_err!(BadModelName, x_model.name.clone());
        }

        let mut errors: Vec<(Ident, EquationError)> = Vec::new();

        let symbol_table: HashMap<Ident, SymbolKind> = x_model
            .symbols
            .iter()
            .map(|s| (canonicalize(&s.ident), s.kind))
            .collect();

        let mut definitions: HashMap<Ident, Definition> = HashMap::new();
        for def in x_model.definitions.iter() {
            let key = canonicalize(&def.key);
            if definitions.contains_key(&key) {
                return model_err!(DuplicateKey, key);
            }
            let parsed = match &def.equation {
                datamodel::EquationDef::Scalar(eqn) => {
                    parse_one(&key, eqn).map(Definition::Single)
                }
                datamodel::EquationDef::Multiple(eqns) => eqns
                    .iter()
                    .map(|eqn| parse_one(&key, eqn))
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map(Definition::Multiple),
            };
            match parsed {
                Ok(definition) => {
                    definitions.insert(key, definition);
                }
                Err(err) => errors.push(err),
            }
        }

        let rhs = {
            let n = x_model.rhs.rows * x_model.rhs.cols;
            if n != x_model.rhs.elements.len() {
                return model_err!(
                    BadMatrixShape,
                    format!(
                        "{}: {}x{} rhs with {} elements",
                        name,
                        x_model.rhs.rows,
                        x_model.rhs.cols,
                        x_model.rhs.elements.len()
                    )
                );
            }
            let mut elements = Vec::with_capacity(n);
            for eqn in x_model.rhs.elements.iter() {
                match parse_one(STATE_VECTOR_DERIVATIVE, eqn) {
                    Ok(expr) => elements.push(expr),
                    Err(err) => errors.push(err),
                }
            }
            Matrix {
                rows: x_model.rhs.rows,
                cols: x_model.rhs.cols,
                elements,
            }
        };

        if !errors.is_empty() {
            let details = errors
                .iter()
                .map(|(key, err)| format!("{}: {}", key, err))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(Error::new(
                ErrorKind::Model,
                ErrorCode::DefinitionsHaveErrors,
                Some(details),
            ));
        }

        let component_keys: Vec<Ident> = x_model
            .component_keys
            .iter()
            .map(|k| canonicalize(k))
            .collect();

        let mut model = Model {
            name,
            doc: x_model.doc.clone(),
            reference: x_model.reference.clone(),
            definitions,
            symbol_table,
            component_keys,
            rhs,
            dep_map: HashMap::new(),
        };
        model.set_dependencies();

        Ok(model)
    }

    /// Resolve every key's dependency set once.  The same (model, key)
    /// pair is queried once per histogram entry and once per incidence
    /// pass, so recomputing on demand would be quadratic in practice.
    fn set_dependencies(&mut self) {
        let mut dep_map: HashMap<Ident, DependencySet> = self
            .definitions
            .iter()
            .map(|(key, definition)| (key.clone(), self.resolve_exprs(definition.exprs())))
            .collect();

        dep_map.insert(
            STATE_VECTOR_DERIVATIVE.to_string(),
            self.resolve_exprs(&self.rhs.elements),
        );

        self.dep_map = dep_map;
    }

    /// Collect the classified identifiers appearing free in a
    /// definition's expression(s): declared keys and symbols survive,
    /// anything else (builtins like `exp`, stray identifiers) is
    /// dropped.
    fn resolve_exprs(&self, exprs: &[Expr]) -> DependencySet {
        let mut deps = DependencySet::new();
        for expr in exprs {
            for id in identifier_set(expr) {
                if self.definitions.contains_key(&id) || self.symbol_table.contains_key(&id) {
                    deps.insert(id);
                } else {
                    debug!(
                        model = self.name.as_str(),
                        ident = id.as_str(),
                        "excluding unclassified identifier from dependency set"
                    );
                }
            }
        }
        deps
    }

    /// Does this model define `key`, either as a definition or as a
    /// named component?  The aggregate right-hand-side key always
    /// exists.
    pub fn has_key(&self, key: &str) -> bool {
        key == STATE_VECTOR_DERIVATIVE
            || self.definitions.contains_key(key)
            || self.component_keys.iter().any(|k| k == key)
    }

    /// One-level dependency resolution: the set of declared keys and
    /// classified symbols appearing free in `target_key`'s definition.
    /// A key this model doesn't define resolves to the empty set.
    pub fn dependencies(&self, target_key: &str) -> DependencySet {
        self.dep_map.get(target_key).cloned().unwrap_or_default()
    }

    /// Transitive closure of [`Model::dependencies`]: each dependency
    /// that is itself a defined key is expanded in turn.  The key
    /// reference graph may be cyclic, so the walk carries the set of
    /// keys currently being expanded and a revisited key contributes
    /// nothing further.
    pub fn transitive_dependencies(&self, target_key: &str) -> DependencySet {
        let mut processing: BTreeSet<Ident> = BTreeSet::new();
        self.transitive_inner(target_key, &mut processing)
    }

    fn transitive_inner(&self, key: &str, processing: &mut BTreeSet<Ident>) -> DependencySet {
        if processing.contains(key) {
            return DependencySet::new();
        }
        processing.insert(key.to_string());

        let mut all_deps = self.dependencies(key);
        for dep in self.dependencies(key) {
            if self.definitions.contains_key(&dep) {
                all_deps.extend(self.transitive_inner(&dep, processing));
            }
        }

        processing.remove(key);
        all_deps
    }

    pub fn definitions(&self) -> &HashMap<Ident, Definition> {
        &self.definitions
    }

    pub fn symbol_table(&self) -> &HashMap<Ident, SymbolKind> {
        &self.symbol_table
    }

    pub fn component_keys(&self) -> &[Ident] {
        &self.component_keys
    }

    pub fn rhs(&self) -> &Matrix {
        &self.rhs
    }

    fn count_symbols(&self, kind: SymbolKind) -> usize {
        self.symbol_table.values().filter(|k| **k == kind).count()
    }

    pub fn variable_count(&self) -> usize {
        self.count_symbols(SymbolKind::Variable)
    }

    pub fn parameter_count(&self) -> usize {
        self.count_symbols(SymbolKind::Parameter)
    }
}

#[cfg(test)]
pub(crate) fn x_sym(ident: &str, kind: SymbolKind) -> datamodel::SymbolDef {
    datamodel::SymbolDef {
        ident: ident.to_string(),
        kind,
    }
}

#[cfg(test)]
pub(crate) fn x_def(key: &str, eqn: &str) -> datamodel::DefinitionDef {
    datamodel::DefinitionDef {
        key: key.to_string(),
        equation: datamodel::EquationDef::Scalar(eqn.to_string()),
    }
}

#[cfg(test)]
pub(crate) fn x_multi_def(key: &str, eqns: &[&str]) -> datamodel::DefinitionDef {
    datamodel::DefinitionDef {
        key: key.to_string(),
        equation: datamodel::EquationDef::Multiple(
            eqns.iter().map(|s| s.to_string()).collect(),
        ),
    }
}

#[cfg(test)]
pub(crate) fn x_model(
    name: &str,
    symbols: Vec<datamodel::SymbolDef>,
    definitions: Vec<datamodel::DefinitionDef>,
    component_keys: &[&str],
    rhs: (usize, usize, &[&str]),
) -> datamodel::ModelDef {
    let (rows, cols, elements) = rhs;
    datamodel::ModelDef {
        name: name.to_string(),
        doc: "".to_string(),
        reference: None,
        symbols,
        definitions,
        component_keys: component_keys.iter().map(|s| s.to_string()).collect(),
        rhs: datamodel::MatrixDef {
            rows,
            cols,
            elements: elements.iter().map(|s| s.to_string()).collect(),
        },
    }
}

#[cfg(test)]
pub(crate) fn model(x_model: &datamodel::ModelDef) -> Model {
    Model::new(x_model).unwrap()
}
