//! Workflow units.
//!
//! A [`Function`] is a plain callable. [`Orchestrated`] units are flows and tasks
//! registered with a workflow: they run inside a named tracing span that carries
//! the run's logging context. Error interpretation has to run inside a unit's own
//! failure boundary, so only plain functions can be decorated.

use std::future::Future;
use tracing::{info_span, Instrument};

/// What kind of unit a callable is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// A plain function.
    Function,
    /// A top-level workflow.
    Flow,
    /// A step inside a workflow.
    Task,
}

impl std::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitKind::Function => write!(f, "function"),
            UnitKind::Flow => write!(f, "flow"),
            UnitKind::Task => write!(f, "task"),
        }
    }
}

/// A named callable unit.
pub trait Unit {
    fn name(&self) -> &str;
    fn kind(&self) -> UnitKind;
}

/// A plain function.
pub struct Function<F> {
    name: String,
    pub(crate) func: F,
}

impl<F> Function<F> {
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Unit for Function<F> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> UnitKind {
        UnitKind::Function
    }
}

/// A flow or task registered with a workflow.
pub struct Orchestrated<F> {
    name: String,
    kind: UnitKind,
    func: F,
}

impl<F> Orchestrated<F> {
    /// Register `func` as a flow.
    pub fn flow(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            kind: UnitKind::Flow,
            func,
        }
    }

    /// Register `func` as a task.
    pub fn task(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            kind: UnitKind::Task,
            func,
        }
    }

    /// Run the unit inside its span.
    pub fn run<A, T>(&self, args: A) -> T
    where
        F: Fn(A) -> T,
    {
        let span = info_span!("unit", kind = %self.kind, name = %self.name);
        span.in_scope(|| (self.func)(args))
    }

    /// Run an async unit inside its span.
    pub async fn run_async<A, Fut>(&self, args: A) -> Fut::Output
    where
        F: Fn(A) -> Fut,
        Fut: Future,
    {
        let span = info_span!("unit", kind = %self.kind, name = %self.name);
        (self.func)(args).instrument(span).await
    }
}

impl<F> Unit for Orchestrated<F> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> UnitKind {
        self.kind
    }
}
