// Copyright 2023 The Camod Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::HashSet;

use crate::common::Ident;

// equations are strings typed by humans for a single
// definition -- u16 is long enough
#[derive(PartialEq, Clone, Copy, Debug, Default)]
pub struct Loc {
    pub start: u16,
    pub end: u16,
}

impl Loc {
    pub fn new(start: usize, end: usize) -> Self {
        Loc {
            start: start as u16,
            end: end as u16,
        }
    }

    pub fn union(&self, rhs: &Self) -> Self {
        Loc {
            start: self.start.min(rhs.start),
            end: self.end.max(rhs.end),
        }
    }
}

#[test]
fn test_loc_basics() {
    let a = Loc { start: 3, end: 7 };
    assert_eq!(a, Loc::new(3, 7));

    let b = Loc { start: 4, end: 11 };
    assert_eq!(Loc::new(3, 11), a.union(&b));
}

/// A symbolic expression from a model definition.
///
/// We use Boxes because expressions are walked many times by the
/// dependency and complexity analyses, and subexpression sharing keeps
/// those walks allocation-free.
#[derive(PartialEq, Clone, Debug)]
pub enum Expr {
    Const(String, f64, Loc),
    Var(Ident, Loc),
    App(Ident, Vec<Expr>, Loc),
    Op1(UnaryOp, Box<Expr>, Loc),
    Op2(BinaryOp, Box<Expr>, Box<Expr>, Loc),
}

impl Expr {
    #[cfg(test)]
    pub(crate) fn strip_loc(self) -> Self {
        let loc = Loc::default();
        match self {
            Expr::Const(s, n, _loc) => Expr::Const(s, n, loc),
            Expr::Var(v, _loc) => Expr::Var(v, loc),
            Expr::App(func, args, _loc) => Expr::App(
                func,
                args.into_iter().map(|arg| arg.strip_loc()).collect(),
                loc,
            ),
            Expr::Op1(op, r, _loc) => Expr::Op1(op, Box::new(r.strip_loc()), loc),
            Expr::Op2(op, l, r, _loc) => {
                Expr::Op2(op, Box::new(l.strip_loc()), Box::new(r.strip_loc()), loc)
            }
        }
    }

    pub fn get_loc(&self) -> Loc {
        match self {
            Expr::Const(_, _, loc) => *loc,
            Expr::Var(_, loc) => *loc,
            Expr::App(_, _, loc) => *loc,
            Expr::Op1(_, _, loc) => *loc,
            Expr::Op2(_, _, _, loc) => *loc,
        }
    }

    /// True for leaf nodes: numeric constants and bare identifiers.
    pub fn is_atomic(&self) -> bool {
        matches!(self, Expr::Const(_, _, _) | Expr::Var(_, _))
    }

    /// The ordered immediate sub-terms of this node.
    pub fn sub_terms(&self) -> Vec<&Expr> {
        match self {
            Expr::Const(_, _, _) | Expr::Var(_, _) => vec![],
            Expr::App(_, args, _) => args.iter().collect(),
            Expr::Op1(_, l, _) => vec![l],
            Expr::Op2(_, l, r, _) => vec![l, r],
        }
    }

    /// The number of operations this node itself contributes, not
    /// counting sub-terms: one per operator or function application.
    pub fn own_op_count(&self) -> usize {
        match self {
            Expr::Const(_, _, _) | Expr::Var(_, _) => 0,
            Expr::App(_, _, _) | Expr::Op1(_, _, _) | Expr::Op2(_, _, _, _) => 1,
        }
    }
}

pub trait Visitor<T> {
    fn walk(&mut self, e: &Expr) -> T;
}

#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum BinaryOp {
    Add,
    Sub,
    Exp,
    Mul,
    Div,
}

impl BinaryOp {
    // higher the precedence, the tighter the binding.
    // e.g. Mul.precedence() > Add.precedence()
    pub(crate) fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Add => 4,
            BinaryOp::Sub => 4,
            BinaryOp::Mul => 5,
            BinaryOp::Div => 5,
            BinaryOp::Exp => 6,
        }
    }
}

#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum UnaryOp {
    Positive,
    Negative,
}

fn child_needs_parens(parent: &Expr, child: &Expr) -> bool {
    match parent {
        // no children so doesn't matter
        Expr::Const(_, _, _) | Expr::Var(_, _) => false,
        // children are comma separated, so no ambiguity possible
        Expr::App(_, _, _) => false,
        Expr::Op1(_, _, _) => matches!(child, Expr::Op2(_, _, _, _)),
        Expr::Op2(parent_op, _, _, _) => match child {
            Expr::Const(_, _, _) | Expr::Var(_, _) | Expr::App(_, _, _) | Expr::Op1(_, _, _) => {
                false
            }
            // if we have `3 * (2 + 3)`, the parent's precedence
            // is higher than the child and we need enclosing parens
            Expr::Op2(child_op, _, _, _) => parent_op.precedence() > child_op.precedence(),
        },
    }
}

fn paren_if_necessary(parent: &Expr, child: &Expr, eqn: String) -> String {
    if child_needs_parens(parent, child) {
        format!("({})", eqn)
    } else {
        eqn
    }
}

struct IdentifierSetVisitor {
    identifiers: HashSet<Ident>,
}

impl IdentifierSetVisitor {
    fn walk(&mut self, expr: &Expr) {
        match expr {
            Expr::Const(_, _, _) => (),
            Expr::Var(id, _) => {
                self.identifiers.insert(id.clone());
            }
            Expr::App(func, args, _) => {
                // `u(t)` references `u`: the applied name is itself an
                // identifier.  Builtins like exp or log end up here too
                // and are excluded later by symbol-table classification.
                self.identifiers.insert(func.clone());
                args.iter().for_each(|arg| self.walk(arg));
            }
            Expr::Op1(_, l, _) => {
                self.walk(l);
            }
            Expr::Op2(_, l, r, _) => {
                self.walk(l);
                self.walk(r);
            }
        }
    }
}

/// Every identifier appearing free in the expression, including the
/// names of applied functions.
pub fn identifier_set(expr: &Expr) -> HashSet<Ident> {
    let mut id_visitor = IdentifierSetVisitor {
        identifiers: HashSet::new(),
    };
    id_visitor.walk(expr);
    id_visitor.identifiers
}

struct PrintVisitor {}

impl Visitor<String> for PrintVisitor {
    fn walk(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Const(s, _, _) => s.clone(),
            Expr::Var(id, _) => id.clone(),
            Expr::App(func, args, _) => {
                let args: Vec<String> = args.iter().map(|e| self.walk(e)).collect();
                format!("{}({})", func, args.join(", "))
            }
            Expr::Op1(op, l, _) => {
                let l = paren_if_necessary(expr, l, self.walk(l));
                let op: &str = match op {
                    UnaryOp::Positive => "+",
                    UnaryOp::Negative => "-",
                };
                format!("{}{}", op, l)
            }
            Expr::Op2(op, l, r, _) => {
                let l = paren_if_necessary(expr, l, self.walk(l));
                let r = paren_if_necessary(expr, r, self.walk(r));
                let op: &str = match op {
                    BinaryOp::Add => "+",
                    BinaryOp::Sub => "-",
                    BinaryOp::Exp => "^",
                    BinaryOp::Mul => "*",
                    BinaryOp::Div => "/",
                };
                format!("({} {} {})", l, op, r)
            }
        }
    }
}

pub fn print_eqn(expr: &Expr) -> String {
    let mut visitor = PrintVisitor {};
    visitor.walk(expr)
}

struct LatexVisitor {}

impl Visitor<String> for LatexVisitor {
    fn walk(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Const(s, n, _) => {
                if n.is_nan() {
                    "\\mathrm{{NaN}}".to_owned()
                } else {
                    s.clone()
                }
            }
            Expr::Var(id, _) => {
                let id = str::replace(id, "_", "\\_");
                format!("\\mathrm{{{}}}", id)
            }
            Expr::App(func, args, _) => {
                let args: Vec<String> = args.iter().map(|e| self.walk(e)).collect();
                format!("\\operatorname{{{}}}({})", func, args.join(", "))
            }
            Expr::Op1(op, l, _) => {
                let l = paren_if_necessary(expr, l, self.walk(l));
                let op: &str = match op {
                    UnaryOp::Positive => "+",
                    UnaryOp::Negative => "-",
                };
                format!("{}{}", op, l)
            }
            Expr::Op2(op, l, r, _) => {
                let l = paren_if_necessary(expr, l, self.walk(l));
                let r = paren_if_necessary(expr, r, self.walk(r));
                let op: &str = match op {
                    BinaryOp::Add => "+",
                    BinaryOp::Sub => "-",
                    BinaryOp::Exp => {
                        return format!("{}^{{{}}}", l, r);
                    }
                    BinaryOp::Mul => "\\cdot",
                    BinaryOp::Div => {
                        return format!("\\frac{{{}}}{{{}}}", l, r);
                    }
                };
                format!("{} {} {}", l, op, r)
            }
        }
    }
}

pub fn latex_eqn(expr: &Expr) -> String {
    let mut visitor = LatexVisitor {};
    visitor.walk(expr)
}

#[test]
fn test_print_eqn() {
    assert_eq!(
        "(a + b)",
        print_eqn(&Expr::Op2(
            BinaryOp::Add,
            Box::new(Expr::Var("a".to_string(), Loc::new(1, 2))),
            Box::new(Expr::Var("b".to_string(), Loc::new(5, 6))),
            Loc::new(0, 7),
        ))
    );
    assert_eq!(
        "-a",
        print_eqn(&Expr::Op1(
            UnaryOp::Negative,
            Box::new(Expr::Var("a".to_string(), Loc::new(1, 2))),
            Loc::new(0, 2),
        ))
    );
    assert_eq!(
        "4.7",
        print_eqn(&Expr::Const("4.7".to_string(), 4.7, Loc::new(0, 3)))
    );
    assert_eq!(
        "u(a, 1.0)",
        print_eqn(&Expr::App(
            "u".to_string(),
            vec![
                Expr::Var("a".to_string(), Loc::new(2, 3)),
                Expr::Const("1.0".to_string(), 1.0, Loc::new(5, 8))
            ],
            Loc::new(0, 9),
        ))
    );
}

#[test]
fn test_latex_eqn() {
    assert_eq!(
        "\\mathrm{C\\_f} + \\mathrm{b}",
        latex_eqn(&Expr::Op2(
            BinaryOp::Add,
            Box::new(Expr::Var("C_f".to_string(), Loc::new(1, 2))),
            Box::new(Expr::Var("b".to_string(), Loc::new(5, 6))),
            Loc::new(0, 7),
        ))
    );
    assert_eq!(
        "(\\mathrm{C\\_f} - 1) \\cdot \\mathrm{b}",
        latex_eqn(&Expr::Op2(
            BinaryOp::Mul,
            Box::new(Expr::Op2(
                BinaryOp::Sub,
                Box::new(Expr::Var("C_f".to_string(), Loc::new(0, 0))),
                Box::new(Expr::Const("1".to_string(), 1.0, Loc::new(0, 0))),
                Loc::new(0, 0),
            )),
            Box::new(Expr::Var("b".to_string(), Loc::new(5, 6))),
            Loc::new(0, 7),
        ))
    );
    assert_eq!(
        "\\frac{\\mathrm{u}}{\\mathrm{B}}",
        latex_eqn(&Expr::Op2(
            BinaryOp::Div,
            Box::new(Expr::Var("u".to_string(), Loc::new(0, 1))),
            Box::new(Expr::Var("B".to_string(), Loc::new(2, 3))),
            Loc::new(0, 3),
        ))
    );
    assert_eq!(
        "\\mathrm{B}^{2}",
        latex_eqn(&Expr::Op2(
            BinaryOp::Exp,
            Box::new(Expr::Var("B".to_string(), Loc::new(0, 1))),
            Box::new(Expr::Const("2".to_string(), 2.0, Loc::new(2, 3))),
            Loc::new(0, 3),
        ))
    );
}

#[test]
fn test_identifier_sets() {
    use crate::parser::parse;

    let cases: &[(&str, &[&str])] = &[
        ("u * B + c", &["u", "B", "c"]),
        ("exp(-k*t)", &["exp", "k", "t"]),
        ("f_v / (C_f + C_r)", &["f_v", "C_f", "C_r"]),
        ("3.14", &[]),
    ];

    for (eqn, id_list) in cases.iter() {
        let ast = parse(eqn).unwrap().unwrap();
        let id_set_expected: HashSet<Ident> = id_list.iter().map(|s| s.to_string()).collect();
        let id_set_test = identifier_set(&ast);
        assert_eq!(id_set_expected, id_set_test);
    }
}

#[test]
fn test_facade_queries() {
    use crate::parser::parse;

    let atom = parse("C_f").unwrap().unwrap();
    assert!(atom.is_atomic());
    assert!(atom.sub_terms().is_empty());
    assert_eq!(0, atom.own_op_count());

    let composite = parse("u * B").unwrap().unwrap();
    assert!(!composite.is_atomic());
    assert_eq!(2, composite.sub_terms().len());
    assert_eq!(1, composite.own_op_count());

    // zero-argument application: non-atomic, but no sub-terms
    let empty_app = parse("f()").unwrap().unwrap();
    assert!(!empty_app.is_atomic());
    assert!(empty_app.sub_terms().is_empty());
    assert_eq!(1, empty_app.own_op_count());
}
