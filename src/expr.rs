//! Symbolic expressions and constraints.
//!
//! This is the narrow expression model the search tree consumes: numeric
//! expressions over bounded integer variables, comparisons, and boolean
//! connectives. Expressions are immutable and cheaply clonable; a
//! [`Constraint`] is a shared handle, so two clones of the same constraint
//! are *identical* (see [`Constraint::ptr_eq`]) while two separately built
//! constraints are merely *equal*.
//!
//! Operations on fully concrete operands fold immediately, so concrete
//! sub-computations never reach the solver.
//!
//! # Example
//!
//! ```
//! use symtree::expr::{Cmp, Constraint, Labels, NumExpr, SymVar};
//!
//! let x = NumExpr::var(SymVar::new("x", -5, 5));
//! let c = Constraint::cmp(Cmp::Gt, x.clone() + NumExpr::from(1), NumExpr::from(3));
//!
//! let labels = Labels::new().with("x", 4);
//! assert_eq!(c.eval(&labels), Some(true));
//! assert_eq!(c.not().eval(&labels), Some(false));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};
use std::sync::Arc;

/// A named symbolic integer with an inclusive domain `[lo, hi]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymVar {
    name: Arc<str>,
    lo: i64,
    hi: i64,
}

impl SymVar {
    /// # Panics
    ///
    /// Panics if the domain is empty (`lo > hi`).
    pub fn new(name: impl Into<Arc<str>>, lo: i64, hi: i64) -> Self {
        assert!(lo <= hi, "Domain of a symbolic variable must be non-empty");
        Self { name: name.into(), lo, hi }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn lo(&self) -> i64 {
        self.lo
    }
    pub fn hi(&self) -> i64 {
        self.hi
    }

    /// Value used when a concrete run has no seed for this variable:
    /// zero, clamped into the domain.
    pub fn default_value(&self) -> i64 {
        0.clamp(self.lo, self.hi)
    }

    pub fn contains(&self, value: i64) -> bool {
        self.lo <= value && value <= self.hi
    }
}

impl fmt::Display for SymVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A numeric expression.
#[derive(Debug, Clone, PartialEq)]
pub enum NumExpr {
    Const(i64),
    Var(SymVar),
    Add(Arc<NumExpr>, Arc<NumExpr>),
    Sub(Arc<NumExpr>, Arc<NumExpr>),
    Mul(Arc<NumExpr>, Arc<NumExpr>),
    Neg(Arc<NumExpr>),
}

impl NumExpr {
    pub fn var(var: SymVar) -> Self {
        NumExpr::Var(var)
    }

    /// Returns the value if the expression has no symbolic component.
    pub fn as_const(&self) -> Option<i64> {
        match self {
            NumExpr::Const(c) => Some(*c),
            _ => None,
        }
    }

    pub fn is_concrete(&self) -> bool {
        self.as_const().is_some()
    }

    /// Evaluate under the given labels.
    ///
    /// Returns `None` if some variable is unlabelled. Arithmetic wraps.
    pub fn eval(&self, labels: &Labels) -> Option<i64> {
        match self {
            NumExpr::Const(c) => Some(*c),
            NumExpr::Var(v) => labels.get(v.name()),
            NumExpr::Add(a, b) => Some(a.eval(labels)?.wrapping_add(b.eval(labels)?)),
            NumExpr::Sub(a, b) => Some(a.eval(labels)?.wrapping_sub(b.eval(labels)?)),
            NumExpr::Mul(a, b) => Some(a.eval(labels)?.wrapping_mul(b.eval(labels)?)),
            NumExpr::Neg(a) => Some(a.eval(labels)?.wrapping_neg()),
        }
    }

    /// Collect the variables occurring in the expression.
    pub fn collect_vars(&self, out: &mut Vec<SymVar>) {
        match self {
            NumExpr::Const(_) => {}
            NumExpr::Var(v) => {
                if !out.contains(v) {
                    out.push(v.clone());
                }
            }
            NumExpr::Add(a, b) | NumExpr::Sub(a, b) | NumExpr::Mul(a, b) => {
                a.collect_vars(out);
                b.collect_vars(out);
            }
            NumExpr::Neg(a) => a.collect_vars(out),
        }
    }
}

impl From<i64> for NumExpr {
    fn from(value: i64) -> Self {
        NumExpr::Const(value)
    }
}

impl From<SymVar> for NumExpr {
    fn from(var: SymVar) -> Self {
        NumExpr::Var(var)
    }
}

macro_rules! binop {
    ($trait:ident, $method:ident, $variant:ident, $fold:ident) => {
        impl $trait for NumExpr {
            type Output = NumExpr;

            fn $method(self, rhs: NumExpr) -> NumExpr {
                match (self.as_const(), rhs.as_const()) {
                    (Some(a), Some(b)) => NumExpr::Const(a.$fold(b)),
                    _ => NumExpr::$variant(Arc::new(self), Arc::new(rhs)),
                }
            }
        }
    };
}

binop!(Add, add, Add, wrapping_add);
binop!(Sub, sub, Sub, wrapping_sub);
binop!(Mul, mul, Mul, wrapping_mul);

impl Neg for NumExpr {
    type Output = NumExpr;

    fn neg(self) -> NumExpr {
        match self {
            NumExpr::Const(c) => NumExpr::Const(c.wrapping_neg()),
            NumExpr::Neg(inner) => (*inner).clone(),
            other => NumExpr::Neg(Arc::new(other)),
        }
    }
}

impl fmt::Display for NumExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumExpr::Const(c) => write!(f, "{}", c),
            NumExpr::Var(v) => write!(f, "{}", v),
            NumExpr::Add(a, b) => write!(f, "({} + {})", a, b),
            NumExpr::Sub(a, b) => write!(f, "({} - {})", a, b),
            NumExpr::Mul(a, b) => write!(f, "({} * {})", a, b),
            NumExpr::Neg(a) => write!(f, "-{}", a),
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cmp {
    Lt, // <
    Le, // <=
    Gt, // >
    Ge, // >=
    Eq, // ==
    Ne, // !=
}

impl Cmp {
    /// Returns the negation of this operator.
    pub fn negate(self) -> Self {
        match self {
            Cmp::Lt => Cmp::Ge,
            Cmp::Le => Cmp::Gt,
            Cmp::Gt => Cmp::Le,
            Cmp::Ge => Cmp::Lt,
            Cmp::Eq => Cmp::Ne,
            Cmp::Ne => Cmp::Eq,
        }
    }

    /// Apply the comparison to concrete values.
    pub fn apply(self, a: i64, b: i64) -> bool {
        match self {
            Cmp::Lt => a < b,
            Cmp::Le => a <= b,
            Cmp::Gt => a > b,
            Cmp::Ge => a >= b,
            Cmp::Eq => a == b,
            Cmp::Ne => a != b,
        }
    }
}

impl fmt::Display for Cmp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Cmp::Lt => "<",
            Cmp::Le => "<=",
            Cmp::Gt => ">",
            Cmp::Ge => ">=",
            Cmp::Eq => "==",
            Cmp::Ne => "!=",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, PartialEq)]
pub enum ConstraintKind {
    Const(bool),
    Cmp(Cmp, NumExpr, NumExpr),
    Not(Constraint),
    And(Constraint, Constraint),
    Or(Constraint, Constraint),
}

/// A boolean constraint over symbolic variables.
///
/// Cloning shares the underlying node, see [`Constraint::ptr_eq`].
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint(Arc<ConstraintKind>);

impl Constraint {
    pub fn new(kind: ConstraintKind) -> Self {
        Self(Arc::new(kind))
    }

    pub fn constant(value: bool) -> Self {
        Self::new(ConstraintKind::Const(value))
    }

    /// The trivially true constraint.
    pub fn truth() -> Self {
        Self::constant(true)
    }

    /// Build a comparison, folding it when both sides are concrete.
    pub fn cmp(op: Cmp, lhs: NumExpr, rhs: NumExpr) -> Self {
        match (lhs.as_const(), rhs.as_const()) {
            (Some(a), Some(b)) => Self::constant(op.apply(a, b)),
            _ => Self::new(ConstraintKind::Cmp(op, lhs, rhs)),
        }
    }

    pub fn kind(&self) -> &ConstraintKind {
        &self.0
    }

    /// Reference identity, as opposed to structural equality.
    pub fn ptr_eq(a: &Constraint, b: &Constraint) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Returns the truth value if the constraint has no symbolic component.
    pub fn as_const(&self) -> Option<bool> {
        match self.kind() {
            ConstraintKind::Const(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_concrete(&self) -> bool {
        self.as_const().is_some()
    }

    /// Logical negation. Comparisons flip their operator and double
    /// negations cancel, anything else is wrapped.
    pub fn not(&self) -> Constraint {
        match self.kind() {
            ConstraintKind::Const(b) => Self::constant(!b),
            ConstraintKind::Cmp(op, l, r) => Self::new(ConstraintKind::Cmp(op.negate(), l.clone(), r.clone())),
            ConstraintKind::Not(inner) => inner.clone(),
            _ => Self::new(ConstraintKind::Not(self.clone())),
        }
    }

    pub fn and(&self, other: &Constraint) -> Constraint {
        match (self.as_const(), other.as_const()) {
            (Some(false), _) | (_, Some(false)) => Self::constant(false),
            (Some(true), _) => other.clone(),
            (_, Some(true)) => self.clone(),
            _ => Self::new(ConstraintKind::And(self.clone(), other.clone())),
        }
    }

    pub fn or(&self, other: &Constraint) -> Constraint {
        match (self.as_const(), other.as_const()) {
            (Some(true), _) | (_, Some(true)) => Self::constant(true),
            (Some(false), _) => other.clone(),
            (_, Some(false)) => self.clone(),
            _ => Self::new(ConstraintKind::Or(self.clone(), other.clone())),
        }
    }

    /// Evaluate under the given labels; `None` if some variable is unlabelled.
    pub fn eval(&self, labels: &Labels) -> Option<bool> {
        match self.kind() {
            ConstraintKind::Const(b) => Some(*b),
            ConstraintKind::Cmp(op, l, r) => Some(op.apply(l.eval(labels)?, r.eval(labels)?)),
            ConstraintKind::Not(c) => c.eval(labels).map(|b| !b),
            ConstraintKind::And(a, b) => Some(a.eval(labels)? && b.eval(labels)?),
            ConstraintKind::Or(a, b) => Some(a.eval(labels)? || b.eval(labels)?),
        }
    }

    /// Collect the variables occurring in the constraint.
    pub fn collect_vars(&self, out: &mut Vec<SymVar>) {
        match self.kind() {
            ConstraintKind::Const(_) => {}
            ConstraintKind::Cmp(_, l, r) => {
                l.collect_vars(out);
                r.collect_vars(out);
            }
            ConstraintKind::Not(c) => c.collect_vars(out),
            ConstraintKind::And(a, b) | ConstraintKind::Or(a, b) => {
                a.collect_vars(out);
                b.collect_vars(out);
            }
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ConstraintKind::Const(b) => write!(f, "{}", b),
            ConstraintKind::Cmp(op, l, r) => write!(f, "{} {} {}", l, op, r),
            ConstraintKind::Not(c) => write!(f, "!({})", c),
            ConstraintKind::And(a, b) => write!(f, "({}) && ({})", a, b),
            ConstraintKind::Or(a, b) => write!(f, "({}) || ({})", a, b),
        }
    }
}

/// A concrete assignment of values to symbolic variables, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labels {
    values: BTreeMap<String, i64>,
}

impl Labels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, var: impl Into<String>, value: i64) -> Self {
        self.values.insert(var.into(), value);
        self
    }

    pub fn insert(&mut self, var: impl Into<String>, value: i64) {
        self.values.insert(var.into(), value);
    }

    pub fn get(&self, var: &str) -> Option<i64> {
        self.values.get(var).copied()
    }

    pub fn contains(&self, var: &str) -> bool {
        self.values.contains_key(var)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.values.iter().map(|(k, &v)| (k.as_str(), v))
    }
}

impl fmt::Display for Labels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} = {}", name, value)?;
        }
        write!(f, "}}")
    }
}

/// A concrete value produced by a labelled path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Text(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Text(s) => write!(f, "{:?}", s),
        }
    }
}

/// What a search region returns: possibly symbolic, labelled into a
/// [`Value`] once the path is complete.
#[derive(Debug, Clone, PartialEq)]
pub enum Returned {
    Unit,
    Num(NumExpr),
    Bool(Constraint),
}

impl Returned {
    /// Concretize under the given labels.
    pub fn label(&self, labels: &Labels) -> Option<Value> {
        match self {
            Returned::Unit => Some(Value::Unit),
            Returned::Num(e) => e.eval(labels).map(Value::Int),
            Returned::Bool(c) => c.eval(labels).map(Value::Bool),
        }
    }

    pub fn collect_vars(&self, out: &mut Vec<SymVar>) {
        match self {
            Returned::Unit => {}
            Returned::Num(e) => e.collect_vars(out),
            Returned::Bool(c) => c.collect_vars(out),
        }
    }
}

impl From<NumExpr> for Returned {
    fn from(e: NumExpr) -> Self {
        Returned::Num(e)
    }
}

impl From<Constraint> for Returned {
    fn from(c: Constraint) -> Self {
        Returned::Bool(c)
    }
}

impl From<i64> for Returned {
    fn from(value: i64) -> Self {
        Returned::Num(NumExpr::Const(value))
    }
}
