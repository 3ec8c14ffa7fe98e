//! CLI argument parsing.

use camino::Utf8PathBuf;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use css_modules::OutputMode;

/// CSS Modules compiler and stylesheet bundler.
#[derive(Debug, Parser)]
#[command(name = "cssmod")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Project root; stylesheet names are derived from paths relative to it
    #[arg(long, default_value = ".", global = true)]
    pub root: Utf8PathBuf,

    /// Path to cssmod.config.json (defaults to <root>/cssmod.config.json)
    #[arg(long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Output format for diagnostics
    #[arg(long, value_enum, default_value = "human", global = true)]
    pub output: OutputFormat,

    /// Use readable development class names
    #[arg(long, global = true)]
    pub dev: bool,

    /// Exit with an error when warnings were reported
    #[arg(long = "fail-on-warnings", global = true)]
    pub fail_on_warnings: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compile one CSS module
    Transform(TransformArgs),
    /// Bundle CSS modules into chunk stylesheets
    Bundle(BundleArgs),
    /// Recompile CSS modules as they change
    Watch(WatchArgs),
}

#[derive(Debug, ClapArgs)]
pub struct TransformArgs {
    /// The stylesheet to compile
    pub file: Utf8PathBuf,

    /// Shape of the generated module
    #[arg(long, value_enum, default_value = "standalone")]
    pub mode: Mode,

    /// Which artifact to print
    #[arg(long, value_enum, default_value = "js")]
    pub emit: Emit,

    /// Write the artifacts below this directory instead of printing them
    #[arg(long = "out-dir")]
    pub out_dir: Option<Utf8PathBuf>,
}

#[derive(Debug, ClapArgs)]
pub struct BundleArgs {
    /// A chunk as `name=a.module.css,b.module.css` (repeatable; overrides the config)
    #[arg(long = "chunk", value_parser = parse_chunk)]
    pub chunks: Vec<ChunkArg>,

    /// Output directory, relative to the root
    #[arg(long = "out-dir", default_value = "build")]
    pub out_dir: Utf8PathBuf,
}

#[derive(Debug, ClapArgs)]
pub struct WatchArgs {
    /// Directory to watch (defaults to the root)
    pub dir: Option<Utf8PathBuf>,

    /// Shape of the generated modules
    #[arg(long, value_enum, default_value = "loader")]
    pub mode: Mode,

    /// Write the artifacts below this directory
    #[arg(long = "out-dir")]
    pub out_dir: Option<Utf8PathBuf>,

    /// Glob patterns to ignore
    #[arg(long)]
    pub ignore: Vec<String>,

    /// Don't clear the screen between runs
    #[arg(long = "preserve-watch-output")]
    pub preserve_watch_output: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON output
    Json,
}

/// Output mode of the generated module.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum Mode {
    /// Injects the stylesheet itself
    Standalone,
    /// Registers the stylesheet with a runtime module
    Loader,
    /// Plain exports; the stylesheet is bundled separately
    Bundler,
}

impl From<Mode> for OutputMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Standalone => OutputMode::Standalone,
            Mode::Loader => OutputMode::ModuleLoader,
            Mode::Bundler => OutputMode::Bundler,
        }
    }
}

/// Artifact selection for `transform`.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum Emit {
    Js,
    Css,
    Map,
    All,
}

/// A chunk given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkArg {
    pub name: String,
    pub entries: Vec<Utf8PathBuf>,
}

fn parse_chunk(value: &str) -> Result<ChunkArg, String> {
    let (name, files) = value
        .split_once('=')
        .ok_or_else(|| format!("expected `name=file[,file...]`, got `{value}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("chunk name is empty".to_string());
    }
    let entries: Vec<Utf8PathBuf> = files
        .split(',')
        .map(str::trim)
        .filter(|file| !file.is_empty())
        .map(Utf8PathBuf::from)
        .collect();
    Ok(ChunkArg {
        name: name.to_string(),
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_transform_defaults() {
        let args = Args::parse_from(["cssmod", "transform", "a.module.css"]);
        assert_eq!(args.root.as_str(), ".");
        assert_eq!(args.output, OutputFormat::Human);
        assert!(!args.dev);
        let Command::Transform(transform) = args.command else {
            panic!("expected transform");
        };
        assert_eq!(transform.file.as_str(), "a.module.css");
        assert_eq!(transform.mode, Mode::Standalone);
        assert_eq!(transform.emit, Emit::Js);
        assert!(transform.out_dir.is_none());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::parse_from([
            "cssmod",
            "transform",
            "a.module.css",
            "--mode",
            "loader",
            "--emit",
            "all",
            "--root",
            "/project",
            "--output",
            "json",
            "--dev",
        ]);
        assert_eq!(args.root.as_str(), "/project");
        assert_eq!(args.output, OutputFormat::Json);
        assert!(args.dev);
        let Command::Transform(transform) = args.command else {
            panic!("expected transform");
        };
        assert_eq!(OutputMode::from(transform.mode), OutputMode::ModuleLoader);
        assert_eq!(transform.emit, Emit::All);
    }

    #[test]
    fn test_bundle_chunks() {
        let args = Args::parse_from([
            "cssmod",
            "bundle",
            "--chunk",
            "main=a.module.css, b.module.css",
            "--chunk",
            "admin=admin.module.css",
        ]);
        let Command::Bundle(bundle) = args.command else {
            panic!("expected bundle");
        };
        assert_eq!(bundle.out_dir.as_str(), "build");
        assert_eq!(
            bundle.chunks,
            vec![
                ChunkArg {
                    name: "main".to_string(),
                    entries: vec!["a.module.css".into(), "b.module.css".into()],
                },
                ChunkArg {
                    name: "admin".to_string(),
                    entries: vec!["admin.module.css".into()],
                },
            ]
        );
    }

    #[test]
    fn test_invalid_chunk() {
        let result = Args::try_parse_from(["cssmod", "bundle", "--chunk", "main"]);
        assert!(result.is_err());
        let result = Args::try_parse_from(["cssmod", "bundle", "--chunk", "=a.module.css"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_watch() {
        let args = Args::parse_from(["cssmod", "watch", "src", "--ignore", "**/vendor/**"]);
        let Command::Watch(watch) = args.command else {
            panic!("expected watch");
        };
        assert_eq!(watch.dir.as_deref().map(|dir| dir.as_str()), Some("src"));
        assert_eq!(watch.mode, Mode::Loader);
        assert_eq!(watch.ignore, vec!["**/vendor/**"]);
    }
}
