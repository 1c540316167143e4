use std::path::PathBuf;

/// Which transpile stage, if any, runs over extended-syntax units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformConfig {
    /// Built-in JSX rewrite to classic `factory(type, props, ...children)` calls.
    Jsx { factory: String, fragment: String },
    /// A prebuilt script bundle exposing a global `entry(source) -> string`.
    Bundle { path: PathBuf, entry: String },
    Disabled,
}

impl Default for TransformConfig {
    fn default() -> Self {
        TransformConfig::Jsx {
            factory: "React.createElement".into(),
            fragment: "React.Fragment".into(),
        }
    }
}

/// How the program's entry file is evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EntryMode {
    /// `.mjs` files and files with `import`/`export` declarations are native
    /// modules, everything else is a script.
    #[default]
    Auto,
    Script,
    Module,
}

#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Directory bare specifiers are looked up in.
    pub root: PathBuf,
    /// Appended to specifiers that carry no extension.
    pub default_extension: String,
    /// Extensions whose units go through the transpile stage.
    pub transpile_extensions: Vec<String>,
    pub transform: TransformConfig,
    pub entry_mode: EntryMode,
    pub history: Option<PathBuf>,
    pub prompt: String,
    pub continuation_prompt: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            default_extension: "js".into(),
            transpile_extensions: vec!["jsx".into()],
            transform: TransformConfig::default(),
            entry_mode: EntryMode::default(),
            history: None,
            prompt: "> ".into(),
            continuation_prompt: "... ".into(),
        }
    }
}
