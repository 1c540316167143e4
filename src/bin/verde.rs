use std::{
    io::{self, IsTerminal},
    path::PathBuf,
    process::ExitCode,
    rc::Rc,
};

use clap::{Parser, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use verde::{
    EntryMode, ErrorKind, ExecutionContext, HostConfig, HostError, ModuleResolver, Repl, Request,
    Streams, TransformConfig, batch,
    loader::{FsLoader, SourceLoader},
    repl::Piped,
};

#[derive(Parser)]
#[command(author, version, about = "Run QuickJS scripts with CommonJS, module and JSX loading")]
struct Args {
    /// Script to run; starts an interactive session when omitted
    script: Option<PathBuf>,
    /// Evaluate a snippet and print its value
    #[arg(short, long, conflicts_with = "script")]
    eval: Option<String>,
    /// Run the script one line at a time (statements spanning lines break)
    #[arg(long, requires = "script")]
    lines: bool,
    /// How to evaluate the script
    #[arg(long, value_enum, default_value_t = Kind::Auto)]
    kind: Kind,
    /// Directory bare module specifiers are looked up in
    #[arg(long, default_value = ".")]
    root: PathBuf,
    /// Extension appended to specifiers that have none
    #[arg(long, default_value = "js")]
    ext: String,
    #[arg(long, default_value = "React.createElement")]
    jsx_factory: String,
    #[arg(long, default_value = "React.Fragment")]
    jsx_fragment: String,
    /// Prebuilt transform bundle used instead of the built-in JSX rewrite
    #[arg(long)]
    transform_bundle: Option<PathBuf>,
    /// Global function the transform bundle exposes
    #[arg(long, default_value = "sucraseTransform")]
    transform_entry: String,
    /// Evaluate `.jsx` units without transpiling them
    #[arg(long, conflicts_with = "transform_bundle")]
    no_transform: bool,
    /// REPL history file
    #[arg(long)]
    history: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Auto,
    Script,
    Module,
}

impl Args {
    fn config(&self) -> HostConfig {
        let transform = if self.no_transform {
            TransformConfig::Disabled
        } else if let Some(path) = &self.transform_bundle {
            TransformConfig::Bundle {
                path: path.clone(),
                entry: self.transform_entry.clone(),
            }
        } else {
            TransformConfig::Jsx {
                factory: self.jsx_factory.clone(),
                fragment: self.jsx_fragment.clone(),
            }
        };
        HostConfig {
            root: self.root.clone(),
            default_extension: self.ext.clone(),
            transform,
            entry_mode: match self.kind {
                Kind::Auto => EntryMode::Auto,
                Kind::Script => EntryMode::Script,
                Kind::Module => EntryMode::Module,
            },
            history: self.history.clone(),
            ..HostConfig::default()
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();
    match run(&args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("VERDE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn run(args: &Args) -> Result<ExitCode, HostError> {
    let config = args.config();
    let resolver = Rc::new(ModuleResolver::from_config(&config)?);

    if let Some(source) = &args.eval {
        let context = ExecutionContext::new(resolver, Streams::stdio())?;
        report(&context, context.eval_script("<eval>", source), true);
        return Ok(ExitCode::SUCCESS);
    }

    let Some(script) = &args.script else {
        return run_repl(resolver, &config);
    };

    if args.lines {
        let text = match FsLoader.load(script) {
            Ok(text) => text,
            Err(diagnostic) => {
                eprintln!("{diagnostic}");
                return Ok(ExitCode::FAILURE);
            }
        };
        let context = ExecutionContext::new(resolver, Streams::stdio())?;
        batch::run(&context, &script.display().to_string(), &text);
        return Ok(ExitCode::SUCCESS);
    }

    // Only a missing entry file is fatal; it is detected before any context exists.
    let unit = match resolver.resolve_path(script, Request::Entry(config.entry_mode)) {
        Ok(unit) => unit,
        Err(diagnostic) if diagnostic.kind == ErrorKind::FileNotFound => {
            eprintln!("{diagnostic}");
            return Ok(ExitCode::FAILURE);
        }
        Err(diagnostic) => {
            eprintln!("{diagnostic}");
            return Ok(ExitCode::SUCCESS);
        }
    };
    let context = ExecutionContext::new(resolver, Streams::stdio())?;
    report(&context, context.evaluate(&unit), false);
    Ok(ExitCode::SUCCESS)
}

fn run_repl(resolver: Rc<ModuleResolver>, config: &HostConfig) -> Result<ExitCode, HostError> {
    let context = ExecutionContext::new(resolver, Streams::stdio())?;
    let mut repl = Repl::new(context).with_prompts(&config.prompt, &config.continuation_prompt);
    if io::stdin().is_terminal() {
        repl.run_interactive(config.history.as_deref())?;
    } else {
        repl.run_with(&mut Piped::new(io::stdin().lock()))?;
    }
    Ok(ExitCode::SUCCESS)
}

fn report(context: &ExecutionContext, outcome: verde::EvalResult<Option<String>>, print_value: bool) {
    let streams = context.streams();
    match outcome {
        Ok(Some(value)) if print_value => streams.out.write_line(&value),
        Ok(_) => {}
        Err(diagnostic) => streams.err.write_line(&diagnostic.to_string()),
    }
}
