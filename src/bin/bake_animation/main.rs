use std::env;

use rig_bake::{bake_to_path, BakeConfig, GltfScene};

pub fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let config_path = args
        .get(1)
        .map(String::as_str)
        .unwrap_or("bake_config.json");
    let config = BakeConfig::load_or(config_path, BakeConfig::default_animation())?;

    let scene = GltfScene::open(&config.input_path)?;
    bake_to_path(&scene, &config.output_path)?;

    Ok(())
}
