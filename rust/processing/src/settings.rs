// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Project settings files
//!
//! ```json
//! {
//!   "project_settings": { "ifc_project_name": "...", "ifc_site_name": "...", ... },
//!   "owner_information": { "person_given_name": "...", ... },
//!   "defaults": { "schema": "IFC4X3", "target_epsg": 5110 }
//! }
//! ```
//!
//! Every section and key is optional; missing values keep the
//! [`ProjectTemplate`] defaults.

use std::path::Path;

use geomark_core::SchemaVersion;
use geomark_export::ProjectTemplate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProcessingError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ifc_project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ifc_project_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ifc_site_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ifc_site_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ifc_building: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ifc_building_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ifc_building_storey: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ifc_building_storey_description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnerSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,
}

/// Pipeline defaults stored next to the project names
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultsSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_epsg: Option<u32>,
}

/// Contents of a project settings file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub project_settings: ProjectSection,
    #[serde(default)]
    pub owner_information: OwnerSection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsSection>,
}

impl Settings {
    pub fn from_json(text: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Overlay the configured names onto the template defaults
    pub fn to_template(&self) -> ProjectTemplate {
        let mut template = ProjectTemplate::default();
        let ps = &self.project_settings;
        let owner = &self.owner_information;

        fn set(target: &mut String, value: &Option<String>) {
            if let Some(v) = value {
                *target = v.clone();
            }
        }
        fn set_opt(target: &mut Option<String>, value: &Option<String>) {
            if value.is_some() {
                *target = value.clone();
            }
        }

        set(&mut template.project_name, &ps.ifc_project_name);
        set_opt(&mut template.project_description, &ps.ifc_project_description);
        set(&mut template.site_name, &ps.ifc_site_name);
        set_opt(&mut template.site_description, &ps.ifc_site_description);
        set(&mut template.building_name, &ps.ifc_building);
        set_opt(&mut template.building_description, &ps.ifc_building_description);
        set(&mut template.storey_name, &ps.ifc_building_storey);
        set_opt(
            &mut template.storey_description,
            &ps.ifc_building_storey_description,
        );

        set(&mut template.person_given_name, &owner.person_given_name);
        set(&mut template.person_family_name, &owner.person_family_name);
        set(&mut template.organization_name, &owner.organization_name);

        if let Some(defaults) = &self.defaults {
            if let Some(schema) = defaults.schema {
                template.schema = schema;
            }
            if let Some(epsg) = defaults.target_epsg {
                template.target_epsg = epsg;
            }
        }
        template
    }

    /// Placeholder settings for users to fill in
    pub fn template() -> Self {
        let text = |s: &str| Some(s.to_string());
        Self {
            project_settings: ProjectSection {
                ifc_project_name: text("PROJECT_NAME"),
                ifc_project_description: text("Project Description"),
                ifc_site_name: text("Site Name"),
                ifc_site_description: text("Site Description"),
                ifc_building: text("Building Name"),
                ifc_building_description: text("Building Description"),
                ifc_building_storey: text("Storey Name"),
                ifc_building_storey_description: text("Storey Description"),
            },
            owner_information: OwnerSection {
                person_given_name: text("First Name"),
                person_family_name: text("Last Name"),
                organization_name: text("Organization Name"),
            },
            defaults: None,
        }
    }

    pub fn to_json(&self) -> String {
        // Plain strings and integers always serialize
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Read a settings file
pub fn load_settings(path: &Path) -> Result<Settings> {
    let text = std::fs::read_to_string(path).map_err(|e| ProcessingError::Settings {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let settings = Settings::from_json(&text).map_err(|e| ProcessingError::Settings {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    debug!(path = %path.display(), "Loaded project settings");
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_keep_defaults() {
        let settings = Settings::from_json(
            r#"{
                "project_settings": { "ifc_project_name": "Fornebu", "ifc_site_name": "Lysaker" },
                "owner_information": { "organization_name": "Kartverket" }
            }"#,
        )
        .unwrap();
        let template = settings.to_template();
        assert_eq!(template.project_name, "Fornebu");
        assert_eq!(template.site_name, "Lysaker");
        assert_eq!(template.organization_name, "Kartverket");
        assert_eq!(template.building_name, "Default Building");
        assert_eq!(template.person_given_name, "Default");
        assert_eq!(template.schema, SchemaVersion::Ifc2x3);
    }

    #[test]
    fn test_defaults_section() {
        let settings = Settings::from_json(
            r#"{ "defaults": { "schema": "IFC4X3_ADD2", "target_epsg": 25832 } }"#,
        )
        .unwrap();
        let template = settings.to_template();
        assert_eq!(template.schema, SchemaVersion::Ifc4x3);
        assert_eq!(template.target_epsg, 25832);
    }

    #[test]
    fn test_generated_template_parses_back() {
        let json = Settings::template().to_json();
        assert!(json.contains("\"ifc_project_name\": \"PROJECT_NAME\""));
        let parsed = Settings::from_json(&json).unwrap();
        assert_eq!(parsed, Settings::template());
        assert_eq!(parsed.to_template().storey_name, "Storey Name");
    }

    #[test]
    fn test_load_settings_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = load_settings(&path).unwrap_err();
        assert!(err.to_string().contains("settings.json"));
        assert!(load_settings(&dir.path().join("missing.json")).is_err());
    }
}
