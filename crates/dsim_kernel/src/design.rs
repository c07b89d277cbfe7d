//! Declarative description of a model: its signals and processes.
//!
//! A [`Design`] is built by the host and consumed by
//! [`SimKernel::new`](crate::SimKernel::new), which elaborates it into the
//! signal store and the process registry.

use dsim_common::{Interner, LogicVec, SimTime};
use dsim_diagnostics::{Diagnostic, DiagnosticCode, SimLocation};
use log::debug;

use crate::context::ProcessContext;
use crate::error::SimError;
use crate::process::{ProcessBody, ProcessId, ProcessRegistry};
use crate::resolve::Resolution;
use crate::signal::{SignalKind, SignalStore, SimSignalState};

/// Declaration of one signal.
#[derive(Clone, Debug)]
pub struct SignalDecl {
    name: String,
    width: u32,
    init: Option<LogicVec>,
    kind: SignalKind,
}

impl SignalDecl {
    /// A one-bit unresolved signal.
    pub fn bit(name: impl Into<String>) -> Self {
        Self::vector(name, 1)
    }

    /// An unresolved signal of `width` bits, initially all `X`.
    pub fn vector(name: impl Into<String>, width: u32) -> Self {
        Self {
            name: name.into(),
            width,
            init: None,
            kind: SignalKind::Unresolved,
        }
    }

    /// Sets the initial value.
    pub fn init(mut self, value: LogicVec) -> Self {
        self.init = Some(value);
        self
    }

    /// Sets the initial value from an unsigned integer.
    pub fn init_u64(self, value: u64) -> Self {
        let width = self.width;
        self.init(LogicVec::from_u64(value, width))
    }

    /// Makes the signal accept any number of drivers, merged by `policy`.
    pub fn resolved(mut self, policy: Resolution) -> Self {
        self.kind = SignalKind::Resolved(policy);
        self
    }

    /// The declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared width.
    pub fn width(&self) -> u32 {
        self.width
    }
}

/// Declaration of one process.
pub struct ProcessDecl {
    name: String,
    sensitivity: Vec<String>,
    on_time_advance: bool,
    runs_at_init: bool,
    body: Box<dyn ProcessBody>,
}

impl ProcessDecl {
    /// A process running `body`.
    ///
    /// By default the process runs once at time zero and then only when a
    /// signal in its sensitivity list changes.
    pub fn new(name: impl Into<String>, body: impl ProcessBody + 'static) -> Self {
        Self {
            name: name.into(),
            sensitivity: Vec::new(),
            on_time_advance: false,
            runs_at_init: true,
            body: Box::new(body),
        }
    }

    /// A process whose body is a closure.
    pub fn from_fn<F>(name: impl Into<String>, body: F) -> Self
    where
        F: FnMut(&mut ProcessContext<'_>) -> Result<(), SimError> + 'static,
    {
        Self::new(name, body)
    }

    /// Adds signals, by name, to the sensitivity list.
    pub fn sensitive_to<I, S>(mut self, signals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sensitivity.extend(signals.into_iter().map(Into::into));
        self
    }

    /// Also wakes the process every time logical time advances.
    pub fn on_time_advance(mut self) -> Self {
        self.on_time_advance = true;
        self
    }

    /// Skips the initialization run at time zero.
    pub fn no_init(mut self) -> Self {
        self.runs_at_init = false;
        self
    }

    /// The declared name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A complete model ready for elaboration.
#[derive(Default)]
pub struct Design {
    signals: Vec<SignalDecl>,
    processes: Vec<ProcessDecl>,
}

impl Design {
    /// Creates an empty design.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a signal (builder form).
    pub fn signal(mut self, decl: SignalDecl) -> Self {
        self.signals.push(decl);
        self
    }

    /// Adds a process (builder form).
    pub fn process(mut self, decl: ProcessDecl) -> Self {
        self.processes.push(decl);
        self
    }

    /// Adds a signal.
    pub fn add_signal(&mut self, decl: SignalDecl) {
        self.signals.push(decl);
    }

    /// Adds a process.
    pub fn add_process(&mut self, decl: ProcessDecl) {
        self.processes.push(decl);
    }

    /// Number of declared signals.
    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    /// Number of declared processes.
    pub fn process_count(&self) -> usize {
        self.processes.len()
    }
}

/// The runtime structures built from a [`Design`].
pub(crate) struct Elaborated {
    pub names: Interner,
    pub store: SignalStore,
    pub registry: ProcessRegistry,
    /// Processes to wake at time zero, in registration order.
    pub init_order: Vec<ProcessId>,
    pub warnings: Vec<Diagnostic>,
}

pub(crate) fn elaborate(design: Design) -> Result<Elaborated, SimError> {
    let names = Interner::new();
    let mut store = SignalStore::new();

    for decl in design.signals {
        if decl.width == 0 {
            return Err(SimError::InvalidDeclaration {
                name: decl.name,
                reason: "signal width must be at least 1".to_string(),
            });
        }
        let init = decl.init.unwrap_or_else(|| LogicVec::all_x(decl.width));
        if init.width() != decl.width {
            return Err(SimError::InvalidDeclaration {
                reason: format!(
                    "initial value has {} bits but the signal has {}",
                    init.width(),
                    decl.width
                ),
                name: decl.name,
            });
        }
        let ident = names.get_or_intern(&decl.name);
        if store
            .insert(SimSignalState::new(ident, decl.kind, init))
            .is_none()
        {
            return Err(SimError::DuplicateName { name: decl.name });
        }
    }

    let mut registry = ProcessRegistry::new();
    let mut init_order = Vec::new();
    let mut warnings = Vec::new();

    for decl in design.processes {
        let mut sensitivity = Vec::with_capacity(decl.sensitivity.len());
        for signal in &decl.sensitivity {
            let id = names
                .get(signal)
                .and_then(|ident| store.lookup(ident))
                .ok_or_else(|| SimError::UnknownSignalReference {
                    name: signal.clone(),
                    referrer: decl.name.clone(),
                    time: SimTime::zero(),
                })?;
            if !sensitivity.contains(&id) {
                sensitivity.push(id);
            }
        }

        let ident = names.get_or_intern(&decl.name);
        let Some(id) = registry.register(
            ident,
            sensitivity.clone(),
            decl.on_time_advance,
            decl.body,
        ) else {
            return Err(SimError::DuplicateName { name: decl.name });
        };
        for signal in &sensitivity {
            if let Some(state) = store.get_mut(*signal) {
                state.sensitive.push(id);
            }
        }

        if decl.runs_at_init {
            init_order.push(id);
        } else if sensitivity.is_empty() && !decl.on_time_advance {
            warnings.push(
                Diagnostic::warning(
                    DiagnosticCode::warning(501),
                    format!("process '{}' can never run", decl.name),
                )
                .at(SimLocation::at(SimTime::zero()).with_process(decl.name.clone()))
                .with_note("it has no sensitivity list and skips the initialization run"),
            );
        }
        debug!(
            "elaborated process {} ({} signals in sensitivity list)",
            decl.name,
            sensitivity.len()
        );
    }

    Ok(Elaborated {
        names,
        store,
        registry,
        init_order,
        warnings,
    })
}
