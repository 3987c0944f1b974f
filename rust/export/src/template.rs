// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use geomark_core::SchemaVersion;
use geomark_geo::DEFAULT_TARGET_EPSG;
use serde::{Deserialize, Serialize};

/// Names and ownership written into the spatial hierarchy of every export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectTemplate {
    pub person_given_name: String,
    pub person_family_name: String,
    pub organization_name: String,

    pub project_name: String,
    pub project_description: Option<String>,
    pub site_name: String,
    pub site_description: Option<String>,
    pub building_name: String,
    pub building_description: Option<String>,
    pub storey_name: String,
    pub storey_description: Option<String>,

    pub schema: SchemaVersion,
    pub target_epsg: u32,
}

impl Default for ProjectTemplate {
    fn default() -> Self {
        Self {
            person_given_name: "Default".to_string(),
            person_family_name: "User".to_string(),
            organization_name: "Default Organization".to_string(),
            project_name: "Default Project".to_string(),
            project_description: Some("Default Description".to_string()),
            site_name: "Default Site".to_string(),
            site_description: Some("Default Site Description".to_string()),
            building_name: "Default Building".to_string(),
            building_description: Some("Default Building Description".to_string()),
            storey_name: "Default Storey".to_string(),
            storey_description: Some("Default Storey Description".to_string()),
            schema: SchemaVersion::Ifc2x3,
            target_epsg: DEFAULT_TARGET_EPSG,
        }
    }
}
