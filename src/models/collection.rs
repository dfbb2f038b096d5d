use serde::{Deserialize, Serialize};

/// The content types served by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Collection {
    Applications,
    Pages,
    ContentBlocks,
    ApiTokens,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Applications,
        Collection::Pages,
        Collection::ContentBlocks,
        Collection::ApiTokens,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Collection::Applications => "applications",
            Collection::Pages => "pages",
            Collection::ContentBlocks => "content-blocks",
            Collection::ApiTokens => "api-tokens",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Only applications and pages keep a separate published snapshot
    pub fn has_draft_and_publish(&self) -> bool {
        matches!(self, Collection::Applications | Collection::Pages)
    }

    /// Whether the collection may be read through the public REST surface
    pub fn is_public(&self) -> bool {
        !matches!(self, Collection::ApiTokens)
    }

    pub fn relation_target(&self, field: &str) -> Option<Collection> {
        match (self, field) {
            (Collection::Pages, "application") => Some(Collection::Applications),
            (Collection::ContentBlocks, "page") => Some(Collection::Pages),
            _ => None,
        }
    }

    pub fn relation_fields(&self) -> &'static [&'static str] {
        match self {
            Collection::Pages => &["application"],
            Collection::ContentBlocks => &["page"],
            _ => &[],
        }
    }

    /// Field tuple that must be unique among a collection's drafts
    pub fn unique_fields(&self) -> &'static [&'static str] {
        match self {
            Collection::Applications => &["domain"],
            Collection::Pages => &["application", "slug"],
            Collection::ApiTokens => &["accessKey"],
            Collection::ContentBlocks => &[],
        }
    }

    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Collection::Applications => &["name", "domain"],
            Collection::Pages => &["title", "application"],
            Collection::ContentBlocks => &["blockType", "page"],
            Collection::ApiTokens => &["name", "accessKey"],
        }
    }

    /// Fields fixed at creation
    pub fn immutable_fields(&self) -> &'static [&'static str] {
        match self {
            Collection::Pages => &["application"],
            _ => &[],
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for c in Collection::ALL {
            assert_eq!(Collection::from_name(c.name()), Some(c));
        }
        assert_eq!(Collection::from_name("users"), None);
    }

    #[test]
    fn relations_point_up_the_tree() {
        assert_eq!(Collection::ContentBlocks.relation_target("page"), Some(Collection::Pages));
        assert_eq!(Collection::Pages.relation_target("application"), Some(Collection::Applications));
        assert_eq!(Collection::Applications.relation_target("pages"), None);
    }
}
