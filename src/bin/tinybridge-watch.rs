use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Parser, ValueEnum};
use tinybridge::scene::SceneHandle;
use tinybridge::{Bridge, CatalogFlavor, NodeConfig, ScriptWatcher};
use tracing_subscriber::filter::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Flavor {
    Absolute,
    Layout,
}

impl From<Flavor> for CatalogFlavor {
    fn from(flavor: Flavor) -> Self {
        match flavor {
            Flavor::Absolute => CatalogFlavor::Absolute,
            Flavor::Layout => CatalogFlavor::Layout,
        }
    }
}

#[derive(Parser)]
#[command(name = "tinybridge-watch", version, about = "Run a Tiny script node in a headless scene")]
struct Cli {
    /// Script file to load and watch
    script: PathBuf,

    /// Number of frames to run
    #[arg(long, default_value_t = 1)]
    frames: u32,

    /// Seconds per frame
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,

    /// Which node catalog the script sees
    #[arg(long, value_enum, default_value_t = Flavor::Absolute)]
    flavor: Flavor,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();
    if !cli.script.is_file() {
        bail!("script not found: {}", cli.script.display());
    }

    let scene = SceneHandle::default();
    let bridge = Bridge::new();
    let root = scene.with(|s| s.root());
    let config = NodeConfig::default().with_flavor(cli.flavor.into());
    let watcher = ScriptWatcher::new(&cli.script, config).install(&scene, &bridge, root);

    for _ in 0..cli.frames {
        scene.tick(cli.dt);
    }

    if watcher.borrow().current().is_none() {
        bail!("{} did not produce a node", cli.script.display());
    }
    println!("{}", scene.with(|s| s.describe_tree(root)));
    Ok(())
}
