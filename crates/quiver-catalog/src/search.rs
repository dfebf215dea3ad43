//! Catalog search

use quiver_core::types::{Catalog, ExtensionEntry, SkillEntry};
use serde::Serialize;

/// Matching entries from both collections
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResults {
    pub extensions: Vec<ExtensionEntry>,
    pub skills: Vec<SkillEntry>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty() && self.skills.is_empty()
    }

    pub fn len(&self) -> usize {
        self.extensions.len() + self.skills.len()
    }
}

/// Case-insensitive substring search.
///
/// Extensions match on id, name, description or any tag; skills on name,
/// description or any tag. An empty query matches everything.
pub fn search(catalog: &Catalog, query: &str) -> SearchResults {
    let needle = query.trim().to_lowercase();
    let hit = |field: &str| field.to_lowercase().contains(&needle);

    let extensions = catalog
        .extensions
        .iter()
        .filter(|e| {
            hit(&e.id) || hit(&e.name) || hit(&e.description) || e.tags.iter().any(|t| hit(t))
        })
        .cloned()
        .collect();

    let skills = catalog
        .skills
        .iter()
        .filter(|s| hit(&s.name) || hit(&s.description) || s.tags.iter().any(|t| hit(t)))
        .cloned()
        .collect();

    SearchResults { extensions, skills }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiver_core::types::UnitKind;

    fn catalog() -> Catalog {
        Catalog {
            version: 1,
            updated_at: None,
            registry: None,
            extensions: vec![
                ExtensionEntry {
                    id: "memory-lance".to_string(),
                    name: "LanceDB Memory".to_string(),
                    description: "Vector memory backed by LanceDB".to_string(),
                    package_spec: Some("@acme/memory-lance@1.0.0".to_string()),
                    version: "1.0.0".to_string(),
                    kind: UnitKind::Memory,
                    tags: vec!["vector".to_string()],
                },
                ExtensionEntry {
                    id: "slack".to_string(),
                    name: "Slack".to_string(),
                    description: "Slack channel".to_string(),
                    package_spec: None,
                    version: "2.1.0".to_string(),
                    kind: UnitKind::Channel,
                    tags: vec!["chat".to_string()],
                },
            ],
            skills: vec![SkillEntry {
                name: "pdf-tools".to_string(),
                description: "Read and fill PDF forms".to_string(),
                archive_url: Some("gs://bucket/pdf-tools.tgz".to_string()),
                version: "0.2.0".to_string(),
                tags: vec!["documents".to_string(), "Vector".to_string()],
            }],
        }
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let results = search(&catalog(), "");
        assert_eq!(results.extensions.len(), 2);
        assert_eq!(results.skills.len(), 1);
    }

    #[test]
    fn test_no_match_returns_empty_collections() {
        let results = search(&catalog(), "NONEXISTENT-XYZ");
        assert!(results.extensions.is_empty());
        assert!(results.skills.is_empty());
    }

    #[test]
    fn test_match_is_case_insensitive_across_fields() {
        let results = search(&catalog(), "VECTOR");
        assert_eq!(results.extensions.len(), 1);
        assert_eq!(results.extensions[0].id, "memory-lance");
        assert_eq!(results.skills.len(), 1);

        let results = search(&catalog(), "forms pdf");
        assert!(results.extensions.is_empty());
        assert!(results.skills.is_empty());

        let results = search(&catalog(), "fill pdf");
        assert_eq!(results.skills.len(), 1);
    }

    #[test]
    fn test_extension_id_matches() {
        let results = search(&catalog(), "slack");
        assert_eq!(results.len(), 1);
    }
}
