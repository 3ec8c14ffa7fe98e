//! Main orchestration logic.

use crate::cli::{Args, BundleArgs, Command, Emit, OutputFormat, TransformArgs, WatchArgs};
use crate::config::{ConfigError, ProjectConfig};
use crate::output::{Formatter, RunSummary};
use camino::{Utf8Path, Utf8PathBuf};
use css_bundler::{BundleError, Chunk, Graph, StylesheetBundler};
use css_modules::{
    paths, AssetStore, CompilationContext, CompileError, Diagnostic, MemoryStore, OutputMode,
    TransformOutput, Transformer,
};
use globset::{Glob, GlobSet, GlobSetBuilder};
use miette::{NamedSource, SourceSpan};
use std::fs;
use std::sync::Arc;
use thiserror::Error;
use walkdir::WalkDir;

/// Name of the chunk manifest written by `bundle`.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Orchestration errors.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum OrchestratorError {
    /// The project configuration is invalid.
    #[error(transparent)]
    #[diagnostic(code(cssmod::config))]
    Config(#[from] ConfigError),

    /// A stylesheet failed to compile at a known position.
    #[error("{message}")]
    #[diagnostic(code(cssmod::compile))]
    Located {
        message: String,
        #[source_code]
        source_code: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
    },

    /// A stylesheet failed to compile.
    #[error(transparent)]
    #[diagnostic(code(cssmod::compile))]
    Compile(CompileError),

    /// Bundling failed.
    #[error(transparent)]
    #[diagnostic(code(cssmod::bundle))]
    Bundle(BundleError),

    /// An output file could not be written.
    #[error("failed to write {path}")]
    #[diagnostic(code(cssmod::io))]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The chunk manifest could not be serialized.
    #[error("failed to serialize {MANIFEST_FILE}")]
    #[diagnostic(code(cssmod::manifest))]
    Manifest(#[from] serde_json::Error),

    /// Invalid glob pattern.
    #[error("invalid glob pattern: {0}")]
    #[diagnostic(code(cssmod::glob))]
    InvalidGlob(String),

    /// Nothing to bundle.
    #[error("no chunks to bundle")]
    #[diagnostic(
        code(cssmod::bundle),
        help("pass --chunk name=file.module.css or add `chunks` to cssmod.config.json")
    )]
    NoChunks,

    /// Watch error.
    #[error("watch error: {0}")]
    #[diagnostic(code(cssmod::watch))]
    WatchFailed(String),
}

impl From<CompileError> for OrchestratorError {
    fn from(err: CompileError) -> Self {
        let located = err.location().and_then(|(file, span)| {
            let text = fs::read_to_string(file).ok()?;
            (span.as_range().end <= text.len()).then(|| (file.to_string(), text, span))
        });
        match located {
            Some((name, text, span)) => OrchestratorError::Located {
                message: err.to_string(),
                source_code: NamedSource::new(name, text),
                span: span.as_range().into(),
            },
            None => OrchestratorError::Compile(err),
        }
    }
}

impl From<BundleError> for OrchestratorError {
    fn from(err: BundleError) -> Self {
        match err {
            BundleError::Compile(err) => err.into(),
            err => OrchestratorError::Bundle(err),
        }
    }
}

/// Runs the selected command.
pub async fn run(args: Args) -> Result<RunSummary, OrchestratorError> {
    let root = absolute_root(&args.root);
    let dev_env = std::env::var("CSSMOD_DEV").ok();
    let config = ProjectConfig::load(&root, args.config.as_deref())?
        .with_overrides(args.dev, dev_env.as_deref());
    let formatter = Formatter::new(args.output);
    tracing::debug!(%root, development = config.development, "starting");

    let mut summary = match &args.command {
        Command::Transform(transform) => run_transform(&root, &config, transform, &formatter)?,
        Command::Bundle(bundle) => run_bundle(&root, &config, bundle, &formatter)?,
        Command::Watch(watch) => run_watch(&root, &config, watch, &formatter).await?,
    };
    summary.fail_on_warnings = args.fail_on_warnings;

    if args.output == OutputFormat::Human {
        eprintln!("{}", summary.format());
    }
    Ok(summary)
}

/// Compiles one stylesheet after the stylesheets it composes from.
fn run_transform(
    root: &Utf8Path,
    config: &ProjectConfig,
    args: &TransformArgs,
    formatter: &Formatter,
) -> Result<RunSummary, OrchestratorError> {
    let mut transformer = new_transformer(root, config, args.mode.into());
    let target = transformer.context().absolute_path(&args.file);
    if !paths::is_module_stylesheet(&target) {
        return Err(CompileError::UnsupportedFile { path: target }.into());
    }

    let outputs = transform_with_dependencies(&mut transformer, &[target])?;
    let diagnostics: Vec<Diagnostic> = outputs
        .iter()
        .flat_map(|output| output.diagnostics.iter().cloned())
        .collect();
    report(formatter, &diagnostics, true);

    let summary = RunSummary {
        file_count: outputs.len(),
        warning_count: diagnostics.len(),
        ..RunSummary::default()
    };
    let Some(output) = outputs.last() else {
        return Ok(summary);
    };

    match &args.out_dir {
        Some(out_dir) => {
            let out_dir = paths::absolutize(root, out_dir);
            write_store(transformer.store().as_ref(), &out_dir)?;
        }
        None => print_artifacts(output, args.emit)?,
    }
    Ok(summary)
}

fn print_artifacts(output: &TransformOutput, emit: Emit) -> Result<(), OrchestratorError> {
    match emit {
        Emit::Js => print!("{}", output.js),
        Emit::Css => print!("{}", output.css),
        Emit::Map => println!("{}", output.map_json()?),
        Emit::All => {
            println!("/* {} */\n{}", output.keys.js, output.js);
            println!("/* {} */\n{}", output.keys.css, output.css);
            println!("/* {} */\n{}", output.keys.map, output.map_json()?);
        }
    }
    Ok(())
}

/// Bundles the chunks and writes them with a manifest.
fn run_bundle(
    root: &Utf8Path,
    config: &ProjectConfig,
    args: &BundleArgs,
    formatter: &Formatter,
) -> Result<RunSummary, OrchestratorError> {
    let chunks: Vec<Chunk> = if args.chunks.is_empty() {
        config.chunks()
    } else {
        args.chunks
            .iter()
            .map(|chunk| Chunk::new(chunk.name.clone(), chunk.entries.iter().cloned()))
            .collect()
    };
    if chunks.is_empty() {
        return Err(OrchestratorError::NoChunks);
    }

    let mut bundler = StylesheetBundler::new(config.bundle_options(root))?;
    let output = bundler.bundle(&chunks)?;

    let out_dir = paths::absolutize(root, &args.out_dir);
    output
        .write(&out_dir)
        .map_err(|source| OrchestratorError::Write {
            path: out_dir.clone(),
            source,
        })?;
    let manifest = serde_json::to_string_pretty(&output.emitted_stylesheets)?;
    write_file(&out_dir.join(MANIFEST_FILE), &manifest)?;

    report(formatter, &output.diagnostics, false);
    for (chunk, url) in &output.emitted_stylesheets {
        tracing::info!(%chunk, %url, "bundled chunk");
    }

    Ok(RunSummary {
        file_count: output.modules.len(),
        warning_count: output.diagnostics.len(),
        ..RunSummary::default()
    })
}

/// Runs in watch mode.
async fn run_watch(
    root: &Utf8Path,
    config: &ProjectConfig,
    args: &WatchArgs,
    formatter: &Formatter,
) -> Result<RunSummary, OrchestratorError> {
    use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
    use std::time::Duration;

    let dir = args
        .dir
        .as_ref()
        .map(|dir| paths::absolutize(root, dir))
        .unwrap_or_else(|| root.to_owned());
    let ignore = build_ignore_set(&args.ignore)?;
    let out_dir = args.out_dir.as_ref().map(|dir| paths::absolutize(root, dir));
    let mut transformer = new_transformer(root, config, args.mode.into());

    // Initial pass
    let files = find_module_stylesheets(&dir, &ignore);
    match transform_with_dependencies(&mut transformer, &files) {
        Ok(outputs) => {
            let diagnostics: Vec<Diagnostic> = outputs
                .iter()
                .flat_map(|output| output.diagnostics.iter().cloned())
                .collect();
            report(formatter, &diagnostics, false);
            println!("Compiled {} stylesheets", outputs.len());
        }
        Err(err) => eprintln!("{:?}", miette::Report::new(err)),
    }
    if let Some(out_dir) = &out_dir {
        write_store(transformer.store().as_ref(), out_dir)?;
    }

    let (tx, mut rx) = tokio::sync::mpsc::channel(100);
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| {
            if let Ok(event) = res {
                let _ = tx.blocking_send(event);
            }
        },
        Config::default().with_poll_interval(Duration::from_secs(1)),
    )
    .map_err(|e| OrchestratorError::WatchFailed(e.to_string()))?;

    watcher
        .watch(dir.as_std_path(), RecursiveMode::Recursive)
        .map_err(|e| OrchestratorError::WatchFailed(e.to_string()))?;

    println!("Watching {dir} for changes... (Ctrl+C to stop)\n");

    while let Some(event) = rx.recv().await {
        let removed = matches!(event.kind, EventKind::Remove(_));
        let changed: Vec<Utf8PathBuf> = event
            .paths
            .into_iter()
            .filter_map(|path| Utf8PathBuf::from_path_buf(path).ok())
            .filter(|path| paths::is_module_stylesheet(path) && !is_ignored(&ignore, &dir, path))
            .collect();
        if changed.is_empty() {
            continue;
        }
        if !args.preserve_watch_output {
            // Clear screen
            print!("\x1B[2J\x1B[1;1H");
        }

        for path in changed {
            if removed || !path.exists() {
                transformer.context_mut().reset(&path);
                tracing::info!(%path, "stylesheet removed");
                continue;
            }
            match transformer.transform_file(&path) {
                Ok(output) => {
                    report(formatter, &output.diagnostics, false);
                    println!("Recompiled {}", output.keys.js);
                }
                Err(err) => eprintln!("{:?}", miette::Report::new(OrchestratorError::from(err))),
            }
        }
        if let Some(out_dir) = &out_dir {
            write_store(transformer.store().as_ref(), out_dir)?;
        }
    }

    Err(OrchestratorError::WatchFailed(
        "watch channel closed unexpectedly".to_string(),
    ))
}

fn new_transformer(root: &Utf8Path, config: &ProjectConfig, mode: OutputMode) -> Transformer {
    Transformer::new(
        CompilationContext::new(config.namer_options(root)),
        mode.strategy(&config.runtime_module),
        Arc::new(MemoryStore::new()),
    )
}

/// Compiles `entries` and everything they compose from, dependencies first.
fn transform_with_dependencies(
    transformer: &mut Transformer,
    entries: &[Utf8PathBuf],
) -> Result<Vec<TransformOutput>, OrchestratorError> {
    let mut graph = Graph::new();
    graph.load(entries)?;

    let mut outputs = Vec::new();
    for path in graph.order(entries) {
        let Some(file) = graph.file(&path) else {
            continue;
        };
        outputs.push(transformer.transform_source(&path, &file.source)?);
    }
    Ok(outputs)
}

/// Prints diagnostics and mirrors them to the log.
fn report(formatter: &Formatter, diagnostics: &[Diagnostic], to_stderr: bool) {
    for diag in diagnostics {
        tracing::warn!(file = %diag.file, code = %diag.code, "{}", diag.message);
    }
    if diagnostics.is_empty() {
        return;
    }
    let formatted = formatter.format(diagnostics, |file| fs::read_to_string(file).ok());
    if to_stderr {
        eprint!("{formatted}");
    } else {
        print!("{formatted}");
    }
}

/// Writes every stored asset below `out_dir`, keyed by its logical path.
fn write_store(store: &dyn AssetStore, out_dir: &Utf8Path) -> Result<(), OrchestratorError> {
    for key in store.keys() {
        let Some(asset) = store.get(&key) else {
            continue;
        };
        write_file(&out_dir.join(key.trim_start_matches('/')), &asset.body)?;
    }
    Ok(())
}

fn write_file(path: &Utf8Path, content: &str) -> Result<(), OrchestratorError> {
    let write = || {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)
    };
    write().map_err(|source| OrchestratorError::Write {
        path: path.to_owned(),
        source,
    })
}

fn absolute_root(root: &Utf8Path) -> Utf8PathBuf {
    match std::env::current_dir().map(Utf8PathBuf::try_from) {
        Ok(Ok(cwd)) => paths::absolutize(&cwd, root),
        _ => root.to_owned(),
    }
}

fn build_ignore_set(patterns: &[String]) -> Result<GlobSet, OrchestratorError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| OrchestratorError::InvalidGlob(e.to_string()))?;
        builder.add(glob);
    }

    // Add default ignores
    for pattern in ["**/node_modules/**", "**/.git/**"] {
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
        }
    }

    builder
        .build()
        .map_err(|e| OrchestratorError::InvalidGlob(e.to_string()))
}

fn is_ignored(ignore: &GlobSet, dir: &Utf8Path, path: &Utf8Path) -> bool {
    let relative = path.strip_prefix(dir).unwrap_or(path);
    ignore.is_match(relative.as_str())
}

/// Finds every CSS module below `dir`, sorted by path.
fn find_module_stylesheets(dir: &Utf8Path, ignore: &GlobSet) -> Vec<Utf8PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| Utf8PathBuf::try_from(e.into_path()).ok())
        .filter(|path| paths::is_module_stylesheet(path))
        .filter(|path| !is_ignored(ignore, dir, path))
        .collect()
}
