// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity construction helpers shared by both schema dialects

use rustc_hash::FxHashMap;

use crate::guid::GuidGenerator;
use crate::step::{EntityId, StepModel, StepValue};

/// A [`StepModel`] plus GlobalId source, owner history and shared geometry
pub struct ModelBuilder {
    pub model: StepModel,
    guids: GuidGenerator,
    owner_history: Option<EntityId>,
    points: FxHashMap<[u64; 3], EntityId>,
    directions: FxHashMap<[u64; 3], EntityId>,
}

impl ModelBuilder {
    pub fn new(model: StepModel, guids: GuidGenerator) -> Self {
        Self {
            model,
            guids,
            owner_history: None,
            points: FxHashMap::default(),
            directions: FxHashMap::default(),
        }
    }

    pub fn set_owner_history(&mut self, owner_history: EntityId) {
        self.owner_history = Some(owner_history);
    }

    pub fn create(&mut self, type_name: &'static str, attributes: Vec<StepValue>) -> EntityId {
        self.model.create(type_name, attributes)
    }

    /// Create an IfcRoot subtype: GlobalId and OwnerHistory are prepended to `rest`
    pub fn rooted(&mut self, type_name: &'static str, rest: Vec<StepValue>) -> EntityId {
        let mut attributes = Vec::with_capacity(rest.len() + 2);
        attributes.push(StepValue::String(self.guids.next_id()));
        attributes.push(self.owner_history.into());
        attributes.extend(rest);
        self.model.create(type_name, attributes)
    }

    /// IfcCartesianPoint, deduplicated
    pub fn point(&mut self, coords: [f64; 3]) -> EntityId {
        let key = coords.map(f64::to_bits);
        if let Some(&id) = self.points.get(&key) {
            return id;
        }
        let id = self
            .model
            .create("IFCCARTESIANPOINT", vec![StepValue::reals(coords)]);
        self.points.insert(key, id);
        id
    }

    pub fn point_2d(&mut self, x: f64, y: f64) -> EntityId {
        self.model
            .create("IFCCARTESIANPOINT", vec![StepValue::reals([x, y])])
    }

    /// IfcDirection, deduplicated
    pub fn direction(&mut self, ratios: [f64; 3]) -> EntityId {
        let key = ratios.map(f64::to_bits);
        if let Some(&id) = self.directions.get(&key) {
            return id;
        }
        let id = self
            .model
            .create("IFCDIRECTION", vec![StepValue::reals(ratios)]);
        self.directions.insert(key, id);
        id
    }

    /// IfcAxis2Placement3D at `location` with default axes
    pub fn axis_placement(&mut self, location: [f64; 3]) -> EntityId {
        let point = self.point(location);
        self.model.create(
            "IFCAXIS2PLACEMENT3D",
            vec![point.into(), StepValue::Null, StepValue::Null],
        )
    }

    /// IfcAxis2Placement3D with explicit Z axis and reference direction
    pub fn oriented_axis_placement(&mut self, location: [f64; 3]) -> EntityId {
        let point = self.point(location);
        let z = self.direction([0.0, 0.0, 1.0]);
        let x = self.direction([1.0, 0.0, 0.0]);
        self.model
            .create("IFCAXIS2PLACEMENT3D", vec![point.into(), z.into(), x.into()])
    }

    /// IfcLocalPlacement relative to `parent`
    pub fn local_placement(&mut self, parent: Option<EntityId>, location: [f64; 3]) -> EntityId {
        let axis = self.axis_placement(location);
        self.model
            .create("IFCLOCALPLACEMENT", vec![parent.into(), axis.into()])
    }

    pub fn text_property(&mut self, name: &str, value: &str) -> EntityId {
        self.model.create(
            "IFCPROPERTYSINGLEVALUE",
            vec![
                StepValue::string(name),
                StepValue::Null,
                StepValue::typed("IFCTEXT", StepValue::string(value)),
                StepValue::Null,
            ],
        )
    }

    pub fn label_property(&mut self, name: &str, value: &str) -> EntityId {
        self.model.create(
            "IFCPROPERTYSINGLEVALUE",
            vec![
                StepValue::string(name),
                StepValue::Null,
                StepValue::typed("IFCLABEL", StepValue::string(value)),
                StepValue::Null,
            ],
        )
    }

    pub fn real_property(&mut self, name: &str, value: f64) -> EntityId {
        self.model.create(
            "IFCPROPERTYSINGLEVALUE",
            vec![
                StepValue::string(name),
                StepValue::Null,
                StepValue::typed("IFCREAL", StepValue::real(value)),
                StepValue::Null,
            ],
        )
    }

    pub fn length_property(&mut self, name: &str, value: f64) -> EntityId {
        self.model.create(
            "IFCPROPERTYSINGLEVALUE",
            vec![
                StepValue::string(name),
                StepValue::Null,
                StepValue::typed("IFCLENGTHMEASURE", StepValue::real(value)),
                StepValue::Null,
            ],
        )
    }

    /// IfcPropertySet attached to `related` through IfcRelDefinesByProperties
    pub fn property_set(
        &mut self,
        name: &str,
        properties: Vec<EntityId>,
        related: &[EntityId],
    ) -> EntityId {
        let pset = self.rooted(
            "IFCPROPERTYSET",
            vec![
                StepValue::string(name),
                StepValue::Null,
                StepValue::refs(properties),
            ],
        );
        self.rooted(
            "IFCRELDEFINESBYPROPERTIES",
            vec![
                StepValue::Null,
                StepValue::Null,
                StepValue::refs(related.iter().copied()),
                pset.into(),
            ],
        );
        pset
    }

    /// IfcRelAggregates(parent -> children)
    pub fn aggregate(&mut self, parent: EntityId, children: &[EntityId]) -> EntityId {
        self.rooted(
            "IFCRELAGGREGATES",
            vec![
                StepValue::Null,
                StepValue::Null,
                parent.into(),
                StepValue::refs(children.iter().copied()),
            ],
        )
    }

    pub fn finish(self) -> StepModel {
        self.model
    }
}
