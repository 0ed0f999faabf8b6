//! rdl2-print: list the scene classes available to a context
//!
//! Built-in classes are always listed. Plugin classes found on the DSO
//! search path are loaded first unless `--builtin-only` is given, or only the
//! classes named with `-c` are loaded.

mod printer;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rdl2_core::{config, ContextConfig, SceneContext};
use tracing_subscriber::EnvFilter;

use printer::{ClassInfo, Options};

#[derive(Debug, Parser)]
#[command(name = "rdl2-print", version, about = "Print available SceneClasses and their attributes")]
struct Cli {
    /// Path to search for additional SceneClasses (DSOs); may repeat
    #[arg(short = 'd', long = "dso-path", value_name = "PATH")]
    dso_paths: Vec<String>,

    /// SceneClasses to print; may repeat
    #[arg(short = 'c', long = "class", value_name = "CLASS NAME")]
    classes: Vec<String>,

    /// Attributes to print; may repeat
    #[arg(short = 'a', long = "attr", value_name = "ATTRIBUTE NAME")]
    attributes: Vec<String>,

    /// Config file; defaults to $RDL2_CONFIG or <prefix>/etc/rdl2.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Do not load plugin classes from the DSO path
    #[arg(long)]
    builtin_only: bool,

    /// Do not include attributes
    #[arg(long)]
    no_attrs: bool,

    /// Do not include attribute comments
    #[arg(long)]
    no_comments: bool,

    /// Do not sort attributes alphabetically
    #[arg(long)]
    no_sort: bool,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn options(&self) -> Options {
        Options {
            attributes: self.attributes.clone(),
            sort: !self.no_sort,
            show_attrs: !self.no_attrs,
            comments: !self.no_comments,
        }
    }
}

/// Config from `--config`, else the default location; defaults if absent
fn load_config(path: Option<&PathBuf>) -> ContextConfig {
    let path = match path {
        Some(path) => path.clone(),
        None => match config::default_config_path() {
            Ok(path) => path,
            Err(_) => return ContextConfig::default(),
        },
    };
    if !path.exists() {
        return ContextConfig::default();
    }
    ContextConfig::load(&path).unwrap_or_else(|e| {
        eprintln!("rdl2-print: ignoring config {:?}: {}", path, e);
        ContextConfig::default()
    })
}

fn init_tracing(config: &ContextConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(cli.config.as_ref());
    init_tracing(&config);

    if !cli.dso_paths.is_empty() {
        let mut dso_path = cli.dso_paths.join(":");
        if let Some(configured) = config.dso_path.take().filter(|p| !p.is_empty()) {
            dso_path.push(':');
            dso_path.push_str(&configured);
        }
        config.dso_path = Some(dso_path);
    }

    let context = SceneContext::with_config(&config)?;
    tracing::debug!(dso_path = %context.dso_path(), "Searching for SceneClasses");

    let classes = if cli.classes.is_empty() {
        if !cli.builtin_only {
            context.load_all_scene_classes();
        }
        context.scene_classes()
    } else {
        cli.classes
            .iter()
            .map(|name| context.create_scene_class(name))
            .collect::<Result<Vec<_>, _>>()?
    };

    let options = cli.options();
    let infos: Vec<ClassInfo> = classes.iter().map(|class| ClassInfo::new(class, &options)).collect();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&infos)?);
    } else {
        for info in &infos {
            print!("{}", info.to_text(options.comments));
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("rdl2-print: {}", e);
            ExitCode::FAILURE
        }
    }
}
