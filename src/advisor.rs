//! Advisor (persona) definitions and registry
//!
//! An advisor pairs a hosted assistant identity with the copy shown next to
//! the chat. Each built-in advisor is enabled when its assistant id is
//! configured.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Static description of a built-in advisor
#[derive(Debug, Clone)]
pub struct AdvisorDef {
    /// Stable id used by clients (e.g., "ny")
    pub id: &'static str,
    pub name: &'static str,
    pub tagline: &'static str,
    /// Image shown beside the title, relative to the asset root
    pub image: &'static str,
    /// Capabilities and knowledge-base summary
    pub description: &'static str,
    /// Environment variable holding the assistant id
    pub assistant_env_var: &'static str,
}

const NY_DESCRIPTION: &str = "\
This AI assistant leverages GPT-4 technology with a knowledge cutoff in April 2024 to provide expert guidance on solar energy policies and incentives in New York. It integrates detailed document analysis for tailored, strategic advice.

Key Documents in the Knowledge Base:
- 2024 Solar and Wind Tax Model: Guidance on tax models for solar and wind projects. Published by the New York State Tax Department.
- 2024_Solar_and_Wind_Appraisal_Model_User_Guide: Details on how to appraise solar and wind projects. Published by the New York State Tax Department.
- 2024-Gold-Book-Public: Comprehensive industry data and standards. Published by NYISO.
- New York Community Solar Policy Guide for Asset Owners & Developers: Guidelines for community solar projects. Created by Perch Energy's internal policy team.
- NY SUN Long Island + Upstate-Program-Manual: Program details for NY SUN's initiatives. Published by NYSERDA.
- NYSEG Queue Order by Substation: Latest queue order by substation for NYSEG. Published by NYSEG itself.
- Residential-SC-Program-Manual: Information on the residential solar credit program.
- Net Metering rules
- Value Stack Overview, Reference Guide: Published by NYSERDA.";

const MD_DESCRIPTION: &str = "\
This AI assistant provides guidance on solar energy policies and incentives in Maryland, answering from the state program documents in its knowledge base.";

/// Get all built-in advisor definitions
pub fn all_advisors() -> &'static [AdvisorDef] {
    &[
        AdvisorDef {
            id: "ny",
            name: "NY Solar Advisor",
            tagline: "Your interactive AI-powered guide to Solar policies and incentives in the state of NY",
            image: "ny.png",
            description: NY_DESCRIPTION,
            assistant_env_var: "NY_ADVISOR",
        },
        AdvisorDef {
            id: "md",
            name: "MD Solar Advisor",
            tagline: "Your interactive AI-powered guide to Solar policies and incentives in the state of Maryland",
            image: "md.png",
            description: MD_DESCRIPTION,
            assistant_env_var: "MD_ADVISOR",
        },
    ]
}

/// An enabled advisor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advisor {
    pub id: String,
    pub name: String,
    pub tagline: String,
    pub image: String,
    pub description: String,
    /// Gateway identity; never sent to clients
    #[serde(skip)]
    pub assistant_id: String,
}

impl Advisor {
    fn from_def(def: &AdvisorDef, assistant_id: String) -> Self {
        Self {
            id: def.id.to_string(),
            name: def.name.to_string(),
            tagline: def.tagline.to_string(),
            image: def.image.to_string(),
            description: def.description.to_string(),
            assistant_id,
        }
    }
}

/// Configuration for advisors
#[derive(Debug, Clone, Default)]
pub struct AdvisorConfig {
    /// Advisor id -> assistant id
    pub assistant_ids: HashMap<String, String>,
    pub default_advisor: Option<String>,
}

impl AdvisorConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let assistant_ids = all_advisors()
            .iter()
            .filter_map(|def| {
                lookup(def.assistant_env_var)
                    .filter(|id| !id.trim().is_empty())
                    .map(|id| (def.id.to_string(), id.trim().to_string()))
            })
            .collect();

        Self {
            assistant_ids,
            default_advisor: lookup("DEFAULT_ADVISOR"),
        }
    }
}

/// Registry of enabled advisors
pub struct AdvisorRegistry {
    advisors: HashMap<String, Arc<Advisor>>,
    default_advisor: Option<String>,
}

impl AdvisorRegistry {
    pub fn new(config: &AdvisorConfig) -> Self {
        let advisors: HashMap<String, Arc<Advisor>> = all_advisors()
            .iter()
            .filter_map(|def| {
                let assistant_id = config.assistant_ids.get(def.id)?;
                Some((
                    def.id.to_string(),
                    Arc::new(Advisor::from_def(def, assistant_id.clone())),
                ))
            })
            .collect();

        // Explicit default if enabled, otherwise the first enabled built-in
        let default_advisor = config
            .default_advisor
            .clone()
            .filter(|id| advisors.contains_key(id))
            .or_else(|| {
                all_advisors()
                    .iter()
                    .find(|def| advisors.contains_key(def.id))
                    .map(|def| def.id.to_string())
            });

        Self {
            advisors,
            default_advisor,
        }
    }

    /// Get an advisor by id
    pub fn get(&self, id: &str) -> Option<Arc<Advisor>> {
        self.advisors.get(id).cloned()
    }

    /// Get the default advisor
    pub fn default(&self) -> Option<Arc<Advisor>> {
        self.default_advisor.as_deref().and_then(|id| self.get(id))
    }

    pub fn default_advisor_id(&self) -> Option<&str> {
        self.default_advisor.as_deref()
    }

    pub fn has_advisors(&self) -> bool {
        !self.advisors.is_empty()
    }

    /// Enabled advisors in definition order
    pub fn list(&self) -> Vec<Arc<Advisor>> {
        all_advisors()
            .iter()
            .filter_map(|def| self.get(def.id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_only_configured_advisors_are_enabled() {
        let config = AdvisorConfig::from_lookup(lookup(&[("NY_ADVISOR", "asst_ny")]));
        let registry = AdvisorRegistry::new(&config);

        assert!(registry.has_advisors());
        assert_eq!(registry.get("ny").unwrap().assistant_id, "asst_ny");
        assert!(registry.get("md").is_none());
        assert_eq!(registry.default_advisor_id(), Some("ny"));
    }

    #[test]
    fn test_blank_assistant_id_is_ignored() {
        let config = AdvisorConfig::from_lookup(lookup(&[("NY_ADVISOR", "  ")]));
        let registry = AdvisorRegistry::new(&config);
        assert!(!registry.has_advisors());
        assert!(registry.default().is_none());
    }

    #[test]
    fn test_explicit_default_must_be_enabled() {
        let config = AdvisorConfig::from_lookup(lookup(&[
            ("NY_ADVISOR", "asst_ny"),
            ("MD_ADVISOR", "asst_md"),
            ("DEFAULT_ADVISOR", "md"),
        ]));
        assert_eq!(AdvisorRegistry::new(&config).default_advisor_id(), Some("md"));

        let config = AdvisorConfig::from_lookup(lookup(&[
            ("NY_ADVISOR", "asst_ny"),
            ("DEFAULT_ADVISOR", "md"),
        ]));
        assert_eq!(AdvisorRegistry::new(&config).default_advisor_id(), Some("ny"));
    }

    #[test]
    fn test_assistant_id_is_not_serialized() {
        let config = AdvisorConfig::from_lookup(lookup(&[("NY_ADVISOR", "asst_secret")]));
        let registry = AdvisorRegistry::new(&config);
        let json = serde_json::to_string(&*registry.get("ny").unwrap()).unwrap();
        assert!(!json.contains("asst_secret"));
        assert!(json.contains("NY Solar Advisor"));
    }

    #[test]
    fn test_list_keeps_definition_order() {
        let config = AdvisorConfig::from_lookup(lookup(&[
            ("MD_ADVISOR", "asst_md"),
            ("NY_ADVISOR", "asst_ny"),
        ]));
        let ids: Vec<_> = AdvisorRegistry::new(&config)
            .list()
            .iter()
            .map(|a| a.id.clone())
            .collect();
        assert_eq!(ids, vec!["ny", "md"]);
    }
}
