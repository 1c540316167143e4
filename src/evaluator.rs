use crate::{
    diagnostics::EvalResult,
    engine::Engine,
    unit::{SourceUnit, UnitKind},
    wrapper::{self, ExportsObject},
};

/// Runs one unit against the engine's context according to its kind.
///
/// A CommonJS unit evaluates to its final exports value.
pub fn evaluate<E: Engine>(engine: &E, unit: &SourceUnit) -> EvalResult<E::Value> {
    tracing::debug!(unit = %unit.specifier(), kind = ?unit.kind(), "evaluating unit");
    let name = unit.specifier().as_str();
    let outcome = match unit.kind() {
        UnitKind::Script => engine.run_script(name, unit.text()),
        UnitKind::NativeModule => engine.run_module(name, unit.text()),
        UnitKind::CommonJSModule => {
            return wrapper::load_commonjs(engine, unit).map(ExportsObject::into_value);
        }
    };
    outcome.map_err(|thrown| thrown.into_diagnostic(unit))
}

/// Like [`evaluate`], rendering the result; `None` means "no value".
pub fn evaluate_rendered<E: Engine>(engine: &E, unit: &SourceUnit) -> EvalResult<Option<String>> {
    let value = evaluate(engine, unit)?;
    Ok(engine.render(&value))
}
