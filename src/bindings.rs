use std::{
    cell::RefCell,
    io::{self, Write},
    rc::Rc,
};

use rquickjs::{
    Ctx, Exception, Function, Object, Value,
    prelude::{Coerced, Rest},
};

use crate::{
    quickjs::QuickJs,
    resolver::ModuleResolver,
    wrapper::{self, ExportsObject},
};

/// A writer shared between the host and the functions installed into a context.
#[derive(Clone)]
pub struct SharedWriter(Rc<RefCell<Box<dyn Write>>>);

impl SharedWriter {
    pub fn new(writer: impl Write + 'static) -> Self {
        Self(Rc::new(RefCell::new(Box::new(writer))))
    }

    /// Writes `line` followed by a single newline and flushes.
    pub fn write_line(&self, line: &str) {
        let mut writer = self.0.borrow_mut();
        if let Err(err) = writeln!(writer, "{line}").and_then(|()| writer.flush()) {
            tracing::warn!("failed to write output: {err}");
        }
    }
}

/// Where host-provided print functions and the REPL send their output.
#[derive(Clone)]
pub struct Streams {
    pub out: SharedWriter,
    pub err: SharedWriter,
}

impl Streams {
    pub fn stdio() -> Self {
        Self {
            out: SharedWriter::new(io::stdout()),
            err: SharedWriter::new(io::stderr()),
        }
    }

    /// In-memory streams plus a handle for reading back what was written.
    pub fn captured() -> (Self, Captured) {
        let captured = Captured::default();
        let streams = Self {
            out: SharedWriter::new(captured.out.clone()),
            err: SharedWriter::new(captured.err.clone()),
        };
        (streams, captured)
    }
}

#[derive(Clone, Default)]
pub struct Captured {
    out: Buffer,
    err: Buffer,
}

impl Captured {
    pub fn stdout(&self) -> String {
        self.out.contents()
    }

    pub fn stderr(&self) -> String {
        self.err.contents()
    }
}

#[derive(Clone, Default)]
struct Buffer(Rc<RefCell<Vec<u8>>>);

impl Buffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Installs the host's global names into a context.
///
/// Re-running overwrites each name with an equivalent function and reuses the
/// existing `console` object, so nothing is duplicated.
pub fn install<'js>(ctx: &Ctx<'js>, streams: &Streams, resolver: &Rc<ModuleResolver>) -> rquickjs::Result<()> {
    let globals = ctx.globals();

    let console = match globals.get::<_, Option<Object>>("console")? {
        Some(console) => console,
        None => Object::new(ctx.clone())?,
    };
    let sinks = [
        ("log", &streams.out),
        ("info", &streams.out),
        ("debug", &streams.out),
        ("error", &streams.err),
        ("warn", &streams.err),
    ];
    for (name, sink) in sinks {
        console.set(name, print_function(ctx, name, sink.clone())?)?;
    }
    globals.set("console", console)?;
    globals.set("print", print_function(ctx, "print", streams.out.clone())?)?;

    let load = module_function(ctx, Rc::clone(resolver))?;
    globals.set("verdemod", load.clone())?;
    globals.set("require", load)?;
    tracing::debug!("installed global bindings");
    Ok(())
}

fn print_function<'js>(ctx: &Ctx<'js>, name: &'static str, sink: SharedWriter) -> rquickjs::Result<Function<'js>> {
    Function::new(ctx.clone(), move |args: Rest<Coerced<String>>| {
        let line = args
            .0
            .into_iter()
            .map(|arg| arg.0)
            .collect::<Vec<_>>()
            .join(" ");
        sink.write_line(&line);
    })?
    .with_name(name)
}

/// The module-load entry point. Each call resolves, loads and runs the module
/// from scratch and hands back the exports of that call alone.
fn module_function<'js>(ctx: &Ctx<'js>, resolver: Rc<ModuleResolver>) -> rquickjs::Result<Function<'js>> {
    Function::new(
        ctx.clone(),
        move |ctx: Ctx<'js>, specifier: Coerced<String>| -> rquickjs::Result<Value<'js>> {
            let engine = QuickJs::new(ctx.clone());
            wrapper::require(&engine, &resolver, &specifier.0)
                .map(ExportsObject::into_value)
                .map_err(|diagnostic| Exception::throw_message(&ctx, &diagnostic.to_string()))
        },
    )?
    .with_name("verdemod")
}
