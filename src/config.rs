use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;
use crate::sibling_with_suffix;

pub const ANIMATION_SUFFIX: &str = "animData.json";
pub const MESH_SUFFIX: &str = "MeshData.json";

/// Input scene and output document of one bake.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BakeConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

fn load_json<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let json_file = std::fs::File::open(path)?;
    let json_reader = std::io::BufReader::new(json_file);
    let config: T = serde_json::from_reader(json_reader)?;
    Ok(config)
}

impl BakeConfig {
    /// Output placed next to the input, named after it.
    pub fn for_input(input_path: impl Into<PathBuf>, suffix: &str) -> Self {
        let input_path = input_path.into();
        let output_path = sibling_with_suffix(&input_path, suffix);
        Self {
            input_path,
            output_path,
        }
    }

    pub fn default_animation() -> Self {
        Self::for_input("assets/skeletonanim.glb", ANIMATION_SUFFIX)
    }

    pub fn default_mesh() -> Self {
        Self::for_input("assets/stair2.glb", MESH_SUFFIX)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_json(path.as_ref())
    }

    /// Reads `path` if it exists, otherwise falls back to `default`. A config
    /// file that exists but does not parse is an error.
    pub fn load_or(path: impl AsRef<Path>, default: Self) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("{} not found, using {}", path.display(), default.input_path.display());
            return Ok(default);
        }
        Self::load(path)
    }
}
