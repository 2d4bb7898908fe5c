use anyhow::Result;
use log::info;

use deferred_lights::app::{describe, run_interactive};
use deferred_lights::CliOptions;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let config = CliOptions::parse()?;
    let scene = config.load_scene()?;
    info!(
        "scene has {} objects, assets at {}",
        scene.objects.len(),
        config.assets.display()
    );

    if config.describe {
        println!("{}", describe(&scene, &config.counts));
        return Ok(());
    }
    run_interactive(config, scene)
}
