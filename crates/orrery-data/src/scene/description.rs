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

//! Declarative scene descriptions, loadable from RON.

use orrery_core::ecs::EntityId;
use orrery_core::math::Aabb;
use serde::{Deserialize, Serialize};

use super::{Scene, SceneError};
use crate::components::Transform;

/// A tree of nodes to instantiate into a [`Scene`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    /// Root nodes.
    pub nodes: Vec<NodeDescription>,
}

/// One node of a [`SceneDescription`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeDescription {
    /// Optional display name.
    pub name: Option<String>,
    /// Local transform.
    pub transform: Transform,
    /// Optional local bounding box.
    pub bounds: Option<Aabb>,
    /// Child nodes.
    pub children: Vec<NodeDescription>,
}

impl SceneDescription {
    /// Parses a description from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self, SceneError> {
        ron::from_str(text).map_err(|e| SceneError::Description(e.to_string()))
    }

    /// Total number of nodes in the description.
    pub fn node_count(&self) -> usize {
        fn count(nodes: &[NodeDescription]) -> usize {
            nodes.iter().map(|n| 1 + count(&n.children)).sum()
        }
        count(&self.nodes)
    }
}

impl Scene {
    /// Spawns every node of `description`. Returns the new root ids.
    pub fn instantiate(&mut self, description: &SceneDescription) -> Result<Vec<EntityId>, SceneError> {
        let mut roots = Vec::with_capacity(description.nodes.len());
        for node in &description.nodes {
            let id = self.spawn(node.transform);
            self.fill(id, node)?;
            roots.push(id);
        }
        log::debug!(
            "Scene: instantiated {} nodes ({} roots)",
            description.node_count(),
            roots.len()
        );
        Ok(roots)
    }

    fn fill(&mut self, id: EntityId, node: &NodeDescription) -> Result<(), SceneError> {
        if let Some(name) = &node.name {
            self.set_name(id, name.clone())?;
        }
        if let Some(bounds) = node.bounds {
            self.set_local_bounds(id, bounds)?;
        }
        for child in &node.children {
            let child_id = self.spawn_child(id, child.transform)?;
            self.fill(child_id, child)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_core::math::Vec3;

    const SOLAR: &str = r#"(
        nodes: [
            (
                name: Some("sun"),
                bounds: Some((min: (x: -1.0, y: -1.0, z: -1.0), max: (x: 1.0, y: 1.0, z: 1.0))),
                children: [
                    (
                        name: Some("earth"),
                        transform: (translation: (x: 10.0, y: 0.0, z: 0.0)),
                        children: [
                            (name: Some("moon"), transform: (translation: (x: 2.0, y: 0.0, z: 0.0))),
                        ],
                    ),
                ],
            ),
        ],
    )"#;

    #[test]
    fn parses_and_instantiates_nested_nodes() {
        let description = SceneDescription::from_ron_str(SOLAR).unwrap();
        assert_eq!(description.node_count(), 3);

        let mut scene = Scene::new();
        let roots = scene.instantiate(&description).unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(scene.len(), 3);

        let earth = scene.find_by_name("earth").unwrap();
        let moon = scene.find_by_name("moon").unwrap();
        assert_eq!(scene.parent(moon), Some(earth));
        assert_eq!(scene.parent(earth), Some(roots[0]));
        assert_eq!(
            scene.transform(moon).unwrap().translation,
            Vec3::new(2.0, 0.0, 0.0)
        );
        assert!(scene.bounding_volume(roots[0]).unwrap().local.is_valid());
        assert!(!scene.bounding_volume(moon).unwrap().local.is_valid());
    }

    #[test]
    fn malformed_text_is_reported() {
        let err = SceneDescription::from_ron_str("(nodes: [ (name: 3) ])").unwrap_err();
        assert!(matches!(err, SceneError::Description(_)));
    }
}
