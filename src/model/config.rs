use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration from plank.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    pub board: BoardInfo,
    /// Known tags: id plus the display name shown on cards and matched by
    /// the tag filter
    #[serde(default)]
    pub tags: Vec<TagDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardInfo {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagDef {
    pub id: String,
    pub name: String,
}

impl BoardConfig {
    pub fn named(name: &str) -> Self {
        BoardConfig {
            board: BoardInfo {
                name: name.to_string(),
            },
            tags: Vec::new(),
        }
    }

    /// Build the id → display-name lookup used by the filter engine
    pub fn tag_registry(&self) -> TagRegistry {
        let mut names = HashMap::new();
        for tag in &self.tags {
            names.insert(tag.id.to_lowercase(), tag.name.clone());
        }
        TagRegistry { names }
    }
}

/// Tag id → display name lookup, case-insensitive on the id
#[derive(Debug, Clone, Default)]
pub struct TagRegistry {
    names: HashMap<String, String>,
}

impl TagRegistry {
    pub fn display_name(&self, tag_id: &str) -> Option<&str> {
        self.names.get(&tag_id.to_lowercase()).map(String::as_str)
    }
}
