use std::{path::Path, rc::Rc};

use rquickjs::{
    CatchResultExt, CaughtError, Ctx, Exception, FromJs, Module, Object, Runtime, Value,
    context::EvalOptions,
    loader::{Loader, Resolver},
    module::Declared,
    prelude::{Coerced, Rest},
};

use crate::{
    engine::{Engine, Thrown, ThrownKind},
    resolver::{ModuleResolver, Request},
};

/// `Engine` over a live QuickJS context.
#[derive(Clone)]
pub struct QuickJs<'js> {
    ctx: Ctx<'js>,
}

impl<'js> QuickJs<'js> {
    pub fn new(ctx: Ctx<'js>) -> Self {
        Self { ctx }
    }

    pub fn ctx(&self) -> &Ctx<'js> {
        &self.ctx
    }

    fn thrown(&self, err: CaughtError<'js>) -> Thrown {
        match err {
            CaughtError::Exception(exception) => {
                let object = exception.as_object();
                let name: Option<String> = object.get("name").ok().flatten();
                let message = object
                    .get::<_, Option<String>>("message")
                    .ok()
                    .flatten()
                    .unwrap_or_default();
                let kind = if name.as_deref() == Some("SyntaxError") {
                    ThrownKind::Syntax
                } else {
                    ThrownKind::Exception
                };
                let text = match name {
                    Some(name) if !name.is_empty() && !message.is_empty() => format!("{name}: {message}"),
                    Some(name) if !name.is_empty() => name,
                    _ => message,
                };
                let stack: Option<String> = object.get("stack").ok().flatten();
                let line = object
                    .get::<_, Option<i32>>("lineNumber")
                    .ok()
                    .flatten()
                    .and_then(|line| u32::try_from(line).ok())
                    .filter(|line| *line > 0)
                    .or_else(|| stack.as_deref().and_then(line_from_stack));
                Thrown {
                    kind,
                    message: text,
                    line,
                }
            }
            CaughtError::Value(value) => {
                Thrown::exception(self.render(&value).unwrap_or_else(|| "undefined".into()))
            }
            CaughtError::Error(error) => Thrown::exception(error.to_string()),
        }
    }

    fn object<'a>(&self, target: &'a Value<'js>, action: &str) -> Result<&'a Object<'js>, Thrown> {
        target.as_object().ok_or_else(|| {
            Thrown::exception(format!(
                "TypeError: cannot {action} a value of type {:?}",
                target.type_of()
            ))
        })
    }
}

impl<'js> Engine for QuickJs<'js> {
    type Value = Value<'js>;

    fn run_script(&self, name: &str, source: &str) -> Result<Value<'js>, Thrown> {
        tracing::debug!(unit = name, "running script");
        let mut options = EvalOptions::default();
        options.global = true;
        options.strict = false;
        self.ctx
            .eval_with_options::<Value, _>(source, options)
            .catch(&self.ctx)
            .map_err(|err| self.thrown(err))
    }

    fn run_module(&self, name: &str, source: &str) -> Result<Value<'js>, Thrown> {
        tracing::debug!(unit = name, "running native module");
        Module::evaluate(self.ctx.clone(), name, source)
            .and_then(|promise| promise.finish::<()>())
            .catch(&self.ctx)
            .map(|()| Value::new_undefined(self.ctx.clone()))
            .map_err(|err| self.thrown(err))
    }

    fn new_object(&self) -> Result<Value<'js>, Thrown> {
        Object::new(self.ctx.clone())
            .map(Object::into_value)
            .catch(&self.ctx)
            .map_err(|err| self.thrown(err))
    }

    fn get(&self, target: &Value<'js>, key: &str) -> Result<Value<'js>, Thrown> {
        self.object(target, "read properties of")?
            .get::<_, Value>(key)
            .catch(&self.ctx)
            .map_err(|err| self.thrown(err))
    }

    fn set(&self, target: &Value<'js>, key: &str, value: Value<'js>) -> Result<(), Thrown> {
        self.object(target, "set properties on")?
            .set(key, value)
            .catch(&self.ctx)
            .map_err(|err| self.thrown(err))
    }

    fn call(&self, function: &Value<'js>, args: Vec<Value<'js>>) -> Result<Value<'js>, Thrown> {
        let function = function.as_function().ok_or_else(|| {
            Thrown::exception(format!(
                "TypeError: value of type {:?} is not a function",
                function.type_of()
            ))
        })?;
        function
            .call::<_, Value>((Rest(args),))
            .catch(&self.ctx)
            .map_err(|err| self.thrown(err))
    }

    fn own_keys(&self, target: &Value<'js>) -> Result<Vec<String>, Thrown> {
        self.object(target, "list keys of")?
            .keys::<String>()
            .collect::<rquickjs::Result<Vec<_>>>()
            .catch(&self.ctx)
            .map_err(|err| self.thrown(err))
    }

    fn render(&self, value: &Value<'js>) -> Option<String> {
        if value.is_undefined() {
            return None;
        }
        match Coerced::<String>::from_js(&self.ctx, value.clone()).catch(&self.ctx) {
            Ok(text) => Some(text.0),
            Err(_) => Some(format!("[{:?}]", value.type_of())),
        }
    }

    fn to_json(&self, value: &Value<'js>) -> Result<Option<String>, Thrown> {
        let json = self
            .ctx
            .json_stringify(value.clone())
            .catch(&self.ctx)
            .map_err(|err| self.thrown(err))?;
        json.map(|text| text.to_string())
            .transpose()
            .catch(&self.ctx)
            .map_err(|err| self.thrown(err))
    }
}

/// First `file:line[:column]` position found in a QuickJS stack trace.
/// Frames look like `at fn (file:line:col)` or, for parse errors, `at file:line:col`.
fn line_from_stack(stack: &str) -> Option<u32> {
    stack.lines().find_map(|frame| {
        let frame = frame.trim();
        let location = match (frame.find('('), frame.rfind(')')) {
            (Some(open), Some(close)) if open < close => &frame[open + 1..close],
            _ => frame.strip_prefix("at ")?,
        };
        let mut fields = location.rsplit(':');
        let last = fields.next()?.parse::<u32>().ok()?;
        match fields.next().and_then(|field| field.parse::<u32>().ok()) {
            Some(line) => Some(line),
            None => Some(last),
        }
    })
}

/// Answers the engine's static `import`s with the host pipeline.
pub fn register_module_hook(runtime: &Runtime, resolver: Rc<ModuleResolver>) {
    runtime.set_loader(
        ImportResolver {
            resolver: Rc::clone(&resolver),
        },
        ImportLoader { resolver },
    );
}

struct ImportResolver {
    resolver: Rc<ModuleResolver>,
}

impl Resolver for ImportResolver {
    fn resolve<'js>(&mut self, ctx: &Ctx<'js>, base: &str, name: &str) -> rquickjs::Result<String> {
        tracing::debug!(%base, %name, "resolving import");
        self.resolver
            .normalize(name)
            .map(|path| path.display().to_string())
            .map_err(|diagnostic| Exception::throw_message(ctx, &diagnostic.to_string()))
    }
}

struct ImportLoader {
    resolver: Rc<ModuleResolver>,
}

impl Loader for ImportLoader {
    fn load<'js>(&mut self, ctx: &Ctx<'js>, name: &str) -> rquickjs::Result<Module<'js, Declared>> {
        let unit = self
            .resolver
            .resolve_path(Path::new(name), Request::Import)
            .map_err(|diagnostic| Exception::throw_message(ctx, &diagnostic.to_string()))?;
        Module::declare(ctx.clone(), unit.specifier().as_str(), unit.text())
    }
}
