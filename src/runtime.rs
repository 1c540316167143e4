use std::{cell::Cell, rc::Rc};

use rquickjs::{Context, Runtime};

use crate::{
    bindings::{self, Streams},
    config::HostConfig,
    diagnostics::{EvalResult, Result},
    evaluator,
    quickjs::{self, QuickJs},
    resolver::ModuleResolver,
    unit::SourceUnit,
    wrapper::{self, LoadedModule},
};

/// The shared global environment for one process run or REPL session.
///
/// Everything evaluated through it shares one QuickJS context. Results leave
/// it only as rendered strings or [`LoadedModule`] snapshots, so no engine
/// value outlives the context.
pub struct ExecutionContext {
    // Declared before the runtime so the context is torn down first.
    context: Context,
    _runtime: Runtime,
    resolver: Rc<ModuleResolver>,
    streams: Streams,
    bindings_installed: Cell<bool>,
}

impl ExecutionContext {
    pub fn new(resolver: Rc<ModuleResolver>, streams: Streams) -> Result<Self> {
        let runtime = Runtime::new()?;
        quickjs::register_module_hook(&runtime, Rc::clone(&resolver));
        let context = Context::full(&runtime)?;
        let execution = Self {
            context,
            _runtime: runtime,
            resolver,
            streams,
            bindings_installed: Cell::new(false),
        };
        execution.install_bindings()?;
        Ok(execution)
    }

    pub fn from_config(config: &HostConfig, streams: Streams) -> Result<Self> {
        let resolver = ModuleResolver::from_config(config)?;
        Self::new(Rc::new(resolver), streams)
    }

    /// Installs the host globals. Returns `false` when they were already
    /// present, in which case nothing is touched.
    pub fn install_bindings(&self) -> Result<bool> {
        if self.bindings_installed.get() {
            return Ok(false);
        }
        self.context
            .with(|ctx| bindings::install(&ctx, &self.streams, &self.resolver))?;
        self.bindings_installed.set(true);
        Ok(true)
    }

    pub fn resolver(&self) -> &ModuleResolver {
        &self.resolver
    }

    pub fn streams(&self) -> &Streams {
        &self.streams
    }

    /// Runs `f` with an engine handle scoped to this context.
    pub fn with_engine<R>(&self, f: impl for<'js> FnOnce(&QuickJs<'js>) -> R) -> R {
        self.context.with(|ctx| f(&QuickJs::new(ctx)))
    }

    /// Evaluates a unit and renders its value; `None` is the "no value" result.
    pub fn evaluate(&self, unit: &SourceUnit) -> EvalResult<Option<String>> {
        self.with_engine(|engine| evaluator::evaluate_rendered(engine, unit))
    }

    pub fn eval_script(&self, name: &str, source: &str) -> EvalResult<Option<String>> {
        self.evaluate(&SourceUnit::script(name, source))
    }

    /// Loads `specifier` as a CommonJS module and snapshots its exports.
    pub fn load_module(&self, specifier: &str) -> EvalResult<LoadedModule> {
        self.with_engine(|engine| {
            let exports = wrapper::require(engine, &self.resolver, specifier)?;
            exports.snapshot(engine)
        })
    }
}
