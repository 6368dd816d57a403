//! Host configuration, loaded from a YAML file.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use turtle_core::inventory::valid_slot;
use turtle_core::{Block, ItemStack, Position, SimWorld};

/// Built-in demo programs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Program {
    /// Dig forward, unloading slot 16 behind when it fills up.
    #[default]
    Tunnel,
    /// Walk one lap of a square.
    Square,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TurtleConfig {
    /// Agent label; prefixes every record name.
    pub label: String,

    /// Directory holding the save, in-flight, path and world records.
    pub state_dir: PathBuf,

    /// Ticks to run per invocation.
    pub ticks: u64,

    /// Seed for the path's random selector stream.
    pub seed: u64,

    /// Delay used by the programs' retry decorators.
    pub retry_delay_ticks: u32,

    pub program: Program,

    /// Side length of the square program.
    pub square_side: u32,

    /// Initial world, used when no world record exists yet.
    pub world: WorldConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub fuel: u32,
    pub blocks: Vec<BlockConfig>,
    pub items: Vec<SlotConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockConfig {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub name: String,
    #[serde(default)]
    pub unbreakable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotConfig {
    pub slot: u8,
    pub name: String,
    pub count: u32,
}

fn default_label() -> String {
    "turtle".to_string()
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".turtle")
}

fn default_ticks() -> u64 {
    200
}

fn default_square_side() -> u32 {
    3
}

impl Default for TurtleConfig {
    fn default() -> Self {
        Self {
            label: default_label(),
            state_dir: default_state_dir(),
            ticks: default_ticks(),
            seed: 0,
            retry_delay_ticks: 1,
            program: Program::default(),
            square_side: default_square_side(),
            world: WorldConfig::default(),
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        // A short corridor of stone capped with bedrock.
        let mut blocks: Vec<BlockConfig> = (1..=6)
            .map(|i| BlockConfig {
                x: 0,
                y: 0,
                z: -i,
                name: "stone".to_string(),
                unbreakable: false,
            })
            .collect();
        blocks.push(BlockConfig {
            x: 0,
            y: 0,
            z: -7,
            name: "bedrock".to_string(),
            unbreakable: true,
        });
        Self {
            fuel: 100,
            blocks,
            items: Vec::new(),
        }
    }
}

impl TurtleConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            Some(path) => {
                tracing::info!(path = %path.display(), "No config file, using defaults");
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.label.is_empty() {
            bail!("label must not be empty");
        }
        if self.square_side == 0 {
            bail!("square_side must be at least 1");
        }
        for item in &self.world.items {
            if !valid_slot(item.slot) {
                bail!("item slot {} out of range 1..=16", item.slot);
            }
        }
        Ok(())
    }
}

impl WorldConfig {
    pub fn build(&self) -> SimWorld {
        let world = SimWorld::new(self.fuel);
        for b in &self.blocks {
            let block = if b.unbreakable {
                Block::unbreakable(&b.name)
            } else {
                Block::new(&b.name)
            };
            world.set_block(Position::new(b.x, b.y, b.z), Some(block));
        }
        for item in &self.items {
            world.give(item.slot, ItemStack::new(&item.name, item.count));
        }
        world
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turtle_core::WorldView;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: TurtleConfig = serde_yaml::from_str(
            "label: digger\nprogram: square\nworld:\n  fuel: 12\n",
        )
        .unwrap();
        assert_eq!(config.label, "digger");
        assert_eq!(config.program, Program::Square);
        assert_eq!(config.ticks, 200);
        assert_eq!(config.retry_delay_ticks, 1);
        assert_eq!(config.world.fuel, 12);
        // Unset world fields come from the default world.
        assert_eq!(config.world.blocks.len(), 7);
    }

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = TurtleConfig::load_or_default(Some(&dir.path().join("nope.yaml"))).unwrap();
        assert_eq!(config.label, "turtle");
        assert_eq!(config.program, Program::Tunnel);
    }

    #[test]
    fn bad_slots_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("turtle.yaml");
        std::fs::write(
            &path,
            "world:\n  items:\n    - { slot: 17, name: coal, count: 3 }\n",
        )
        .unwrap();
        let err = TurtleConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("slot 17"));
    }

    #[test]
    fn world_config_builds_the_sim() {
        let config = WorldConfig {
            fuel: 5,
            blocks: vec![BlockConfig {
                x: 0,
                y: 0,
                z: -1,
                name: "dirt".into(),
                unbreakable: false,
            }],
            items: vec![SlotConfig {
                slot: 4,
                name: "coal".into(),
                count: 9,
            }],
        };
        let world = config.build();
        assert_eq!(world.fuel_level(), 5);
        assert_eq!(
            world.block_at(Position::new(0, 0, -1)),
            Some(Block::new("dirt"))
        );
        assert_eq!(world.item_in_slot(4), Some(ItemStack::new("coal", 9)));
    }
}
