// Copyright 2023 The Camod Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt;
use std::{error, result};

use lazy_static::lazy_static;
use regex::Regex;

pub type Ident = String;

/// The key naming the full state-vector derivative of a model's ODE
/// system.  Every model has it implicitly; it never appears among the
/// component keys a dependency report fans out over.
pub const STATE_VECTOR_DERIVATIVE: &str = "state_vector_derivative";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoError,      // will never be produced
    DoesNotExist, // the named entity doesn't exist
    InvalidToken,
    UnrecognizedEof,
    UnrecognizedToken,
    ExtraToken,
    UnclosedComment,
    ExpectedNumber,
    EmptyEquation,
    BadModelName,
    BadMatrixShape,
    DuplicateKey,
    DefinitionsHaveErrors,
    Generic,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ErrorCode::*;
        let name = match self {
            NoError => "no_error",
            DoesNotExist => "does_not_exist",
            InvalidToken => "invalid_token",
            UnrecognizedEof => "unrecognized_eof",
            UnrecognizedToken => "unrecognized_token",
            ExtraToken => "extra_token",
            UnclosedComment => "unclosed_comment",
            ExpectedNumber => "expected_number",
            EmptyEquation => "empty_equation",
            BadModelName => "bad_model_name",
            BadMatrixShape => "bad_matrix_shape",
            DuplicateKey => "duplicate_key",
            DefinitionsHaveErrors => "definitions_have_errors",
            Generic => "generic",
        };

        write!(f, "{}", name)
    }
}

/// An error located within a single equation's source text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EquationError {
    pub start: u16,
    pub end: u16,
    pub code: ErrorCode,
}

impl fmt::Display for EquationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}:{}", self.start, self.end, self.code)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Model,
    Analysis,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub code: ErrorCode,
    pub details: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, code: ErrorCode, details: Option<String>) -> Self {
        Error {
            kind,
            code,
            details,
        }
    }

    pub fn get_details(&self) -> Option<String> {
        self.details.clone()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self.kind {
            ErrorKind::Model => "ModelError",
            ErrorKind::Analysis => "AnalysisError",
        };
        match self.details {
            Some(ref details) => write!(f, "{}{{{}: {}}}", kind, self.code, details),
            None => write!(f, "{}{{{}}}", kind, self.code),
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;
pub type EquationResult<T> = result::Result<T, EquationError>;

#[macro_export]
macro_rules! eqn_err(
    ($code:tt, $start:expr, $end:expr) => {{
        use $crate::common::{EquationError, ErrorCode};
        Err(EquationError{ start: $start, end: $end, code: ErrorCode::$code})
    }}
);

#[macro_export]
macro_rules! var_eqn_err(
    ($ident:expr, $code:tt, $start:expr, $end:expr) => {{
        use $crate::common::{EquationError, ErrorCode};
        Err(($ident, EquationError{ start: $start, end: $end, code: ErrorCode::$code}))
    }}
);

#[macro_export]
macro_rules! model_err(
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(
            ErrorKind::Model,
            ErrorCode::$code,
            Some($str),
        ))
    }}
);

/// Normalize an identifier as typed by a model author: strip enclosing
/// whitespace and collapse interior whitespace runs to underscores.
///
/// Case is preserved -- carbon-allocation models routinely distinguish
/// `A` (the transfer operator) from `a` (an allocation fraction).
pub fn canonicalize(name: &str) -> Ident {
    let name = name.trim();

    lazy_static! {
        static ref UNDERSCORE_RE: Regex = Regex::new(r"\\n|\\r|\n|\r|\s+|\x{00A0}").unwrap();
    }
    UNDERSCORE_RE.replace_all(name, "_").into_owned()
}

#[test]
fn test_canonicalize() {
    assert_eq!(canonicalize("   f_v"), "f_v");
    assert_eq!(canonicalize("net  primary\nproduction"), "net_primary_production");
    assert_eq!(canonicalize("C_f"), "C_f");
    // case is significant in this domain
    assert_ne!(canonicalize("A"), canonicalize("a"));
}
