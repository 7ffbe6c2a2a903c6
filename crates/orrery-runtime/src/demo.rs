// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The runtime's input file: engine config, scene and spinning nodes.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use orrery_aspects::LogicAspect;
use orrery_control::{AspectEngine, EngineConfig};
use orrery_core::math::{Quaternion, Vec3};
use orrery_data::SceneDescription;
use orrery_jobs::LogicFrame;
use serde::Deserialize;

/// Built-in scene used when no file is given.
pub const DEMO: &str = include_str!("../assets/demo.ron");

/// A node rotated around the Y axis by a logic callback.
#[derive(Debug, Clone, Deserialize)]
pub struct Spin {
    /// Name of the scene node.
    pub node: String,
    /// Angular speed.
    pub radians_per_second: f32,
}

/// Everything the runtime reads from its input file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeFile {
    pub engine: EngineConfig,
    pub spin: Vec<Spin>,
    pub scene: SceneDescription,
}

impl RuntimeFile {
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let file: Self = ron::from_str(text).context("failed to parse runtime file")?;
        file.engine.validate()?;
        Ok(file)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_ron_str(&text)
    }
}

/// Spawns the scene into the engine and installs one spin callback per
/// [`Spin`] entry.
pub fn populate(engine: &mut AspectEngine, file: &RuntimeFile) -> Result<()> {
    let scene = engine.scene().clone();
    scene
        .write()
        .map_err(|_| anyhow!("scene lock poisoned"))?
        .instantiate(&file.scene)?;

    let Some(logic) = engine.aspect_mut::<LogicAspect>() else {
        if !file.spin.is_empty() {
            log::warn!("no logic aspect registered, spins are ignored");
        }
        return Ok(());
    };

    for spin in &file.spin {
        let id = scene
            .read()
            .map_err(|_| anyhow!("scene lock poisoned"))?
            .find_by_name(&spin.node)
            .ok_or_else(|| anyhow!("spin target '{}' not found in scene", spin.node))?;

        let scene = scene.clone();
        let rate = spin.radians_per_second;
        logic
            .manager()
            .add_callback(format!("spin-{}", spin.node), move |frame: &LogicFrame| {
                let Ok(mut scene) = scene.write() else {
                    return;
                };
                let Some(mut transform) = scene.transform(id).copied() else {
                    return;
                };
                let step = Quaternion::from_axis_angle(Vec3::Y, rate * frame.delta_seconds());
                transform.rotation = (step * transform.rotation).normalize();
                if let Err(e) = scene.set_transform(id, transform) {
                    log::warn!("spin: {}", e);
                }
            });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_aspects::AspectFactory;

    #[test]
    fn demo_file_parses() {
        let file = RuntimeFile::from_ron_str(DEMO).unwrap();
        assert_eq!(file.scene.node_count(), 4);
        assert_eq!(file.spin.len(), 2);
        assert_eq!(file.engine.aspects.len(), 2);
    }

    #[test]
    fn demo_runs_and_spins() {
        let mut file = RuntimeFile::from_ron_str(DEMO).unwrap();
        file.engine.worker_threads = 2;
        let mut engine = AspectEngine::from_config(file.engine.clone(), &AspectFactory::with_builtin()).unwrap();
        populate(&mut engine, &file).unwrap();

        engine.run_for(3).unwrap();
        assert_eq!(engine.metrics().jobs_failed(), 0);
        assert_eq!(engine.aspects().len(), 2);
        engine.shutdown();
    }

    #[test]
    fn unknown_spin_target_is_an_error() {
        let mut file = RuntimeFile::from_ron_str(DEMO).unwrap();
        file.spin.push(Spin {
            node: "pluto".into(),
            radians_per_second: 1.0,
        });
        file.engine.worker_threads = 0;
        let mut engine = AspectEngine::from_config(file.engine.clone(), &AspectFactory::with_builtin()).unwrap();
        assert!(populate(&mut engine, &file).is_err());
    }
}
