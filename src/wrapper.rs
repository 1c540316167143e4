//! CommonJS loading: the unit's text becomes the body of an
//! `(exports, module)` function, which is called with fresh objects; whatever
//! `module.exports` holds once the body returns is the module's export.

use indexmap::IndexMap;

use crate::{
    diagnostics::EvalResult,
    engine::{Engine, Thrown},
    resolver::{ModuleResolver, Request},
    unit::{ModuleSpecifier, SourceUnit, UnitKind},
};

/// The export of one CommonJS load, owned by whoever asked for it.
#[derive(Debug, Clone)]
pub struct ExportsObject<V> {
    specifier: ModuleSpecifier,
    value: V,
}

impl<V> ExportsObject<V> {
    pub fn specifier(&self) -> &ModuleSpecifier {
        &self.specifier
    }

    pub fn into_value(self) -> V {
        self.value
    }

    /// Copies the export out of the engine so it can outlive the context.
    pub fn snapshot<E: Engine<Value = V>>(&self, engine: &E) -> EvalResult<LoadedModule> {
        let unit = self.specifier.as_str();
        let attribute = |thrown: Thrown| {
            thrown.into_diagnostic(&SourceUnit::new(unit, "", UnitKind::CommonJSModule))
        };
        let json = engine.to_json(&self.value).map_err(attribute)?;
        let mut entries = IndexMap::new();
        // Primitives have no keys; only objects contribute entries.
        if let Ok(keys) = engine.own_keys(&self.value) {
            for key in keys {
                let value = engine.get(&self.value, &key).map_err(attribute)?;
                entries.insert(key, engine.render(&value));
            }
        }
        Ok(LoadedModule {
            specifier: self.specifier.clone(),
            display: engine.render(&self.value),
            json,
            entries,
        })
    }
}

/// An engine-independent copy of a module's export.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModule {
    pub specifier: ModuleSpecifier,
    pub display: Option<String>,
    pub json: Option<String>,
    pub entries: IndexMap<String, Option<String>>,
}

/// The function literal a CommonJS body is compiled into. The body starts on
/// the wrapper's first line so reported line numbers match the file.
pub fn wrap_source(text: &str) -> String {
    format!("(function (exports, module) {{{text}\n}})")
}

pub fn load_commonjs<E: Engine>(engine: &E, unit: &SourceUnit) -> EvalResult<ExportsObject<E::Value>> {
    let _span = tracing::debug_span!("commonjs", unit = %unit.specifier()).entered();
    // Failures are attributed to the module itself, not the synthesized wrapper.
    let attribute = |thrown: Thrown| thrown.into_diagnostic(unit);
    let function = engine
        .run_script(unit.specifier().as_str(), &wrap_source(unit.text()))
        .map_err(attribute)?;

    let exports = engine.new_object().map_err(attribute)?;
    let module = engine.new_object().map_err(attribute)?;
    engine.set(&module, "exports", exports.clone()).map_err(attribute)?;
    engine.call(&function, vec![exports, module.clone()]).map_err(attribute)?;

    // Read after the body ran: `module.exports` may have been replaced.
    let value = engine.get(&module, "exports").map_err(attribute)?;
    tracing::debug!("module loaded");
    Ok(ExportsObject {
        specifier: unit.specifier().clone(),
        value,
    })
}

/// Resolves `specifier` as a CommonJS module and loads it.
pub fn require<E: Engine>(engine: &E, resolver: &ModuleResolver, specifier: &str) -> EvalResult<ExportsObject<E::Value>> {
    let unit = resolver.resolve(specifier, Request::Require)?;
    load_commonjs(engine, &unit)
}
