//! Creature documents and write payloads

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{CatalogError, Result};

/// A persisted creature document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creature {
    /// Store-assigned opaque identifier
    pub id: Uuid,
    /// Caller-visible sequence number, unique across the catalog
    pub no: u32,
    /// Lower-cased name, unique across the catalog
    pub name: String,
    /// Descriptive fields the catalog passes through untouched
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Creature {
    /// Overlay a patch on this document without touching the store.
    pub fn merged_with(mut self, patch: &CreaturePatch) -> Self {
        if let Some(no) = patch.no {
            self.no = no;
        }
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        for (key, value) in &patch.attributes {
            self.attributes.insert(key.clone(), value.clone());
        }
        self
    }
}

/// Create payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCreature {
    pub no: u32,
    pub name: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl NewCreature {
    pub fn new(no: u32, name: impl Into<String>) -> Self {
        Self {
            no,
            name: name.into(),
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_no(self.no)?;
        validate_name(&self.name)?;
        reject_reserved_keys(&self.attributes)
    }

    /// Assign an id and produce the stored document.
    pub fn into_creature(self, id: Uuid) -> Creature {
        Creature {
            id,
            no: self.no,
            name: self.name,
            attributes: self.attributes,
        }
    }
}

/// Partial update payload. Absent fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreaturePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl CreaturePatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn no(no: u32) -> Self {
        Self {
            no: Some(no),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(no) = self.no {
            validate_no(no)?;
        }
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        reject_reserved_keys(&self.attributes)
    }
}

/// Pagination for `list`. `limit` falls back to the configured default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ListQuery {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
        }
    }
}

fn validate_no(no: u32) -> Result<()> {
    if no == 0 {
        return Err(CatalogError::BadRequest(
            "no must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(CatalogError::BadRequest("name must not be empty".to_string()));
    }
    Ok(())
}

// `id` cannot be smuggled in through the flattened attributes
fn reject_reserved_keys(attributes: &Map<String, Value>) -> Result<()> {
    if attributes.contains_key("id") {
        return Err(CatalogError::BadRequest("id cannot be set".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn creature_serializes_flat() {
        let creature = NewCreature::new(25, "pikachu")
            .with_attribute("type", json!("electric"))
            .into_creature(Uuid::nil());
        let value = serde_json::to_value(&creature).unwrap();
        assert_eq!(value["no"], json!(25));
        assert_eq!(value["name"], json!("pikachu"));
        assert_eq!(value["type"], json!("electric"));
        assert_eq!(value["id"], json!("00000000-0000-0000-0000-000000000000"));
    }

    #[test]
    fn patch_keeps_unknown_fields_as_attributes() {
        let patch: CreaturePatch =
            serde_json::from_value(json!({"name": "Raichu", "height": 8})).unwrap();
        assert_eq!(patch.name.as_deref(), Some("Raichu"));
        assert_eq!(patch.no, None);
        assert_eq!(patch.attributes.get("height"), Some(&json!(8)));
    }

    #[test]
    fn merge_overlays_only_present_fields() {
        let original = NewCreature::new(25, "pikachu")
            .with_attribute("type", json!("electric"))
            .into_creature(Uuid::nil());
        let mut patch = CreaturePatch::name("raichu");
        patch.attributes.insert("height".into(), json!(8));

        let merged = original.merged_with(&patch);
        assert_eq!(merged.no, 25);
        assert_eq!(merged.name, "raichu");
        assert_eq!(merged.attributes.get("type"), Some(&json!("electric")));
        assert_eq!(merged.attributes.get("height"), Some(&json!(8)));
    }

    #[test]
    fn validation_rejects_zero_no_and_blank_name() {
        assert!(NewCreature::new(0, "bulbasaur").validate().is_err());
        assert!(NewCreature::new(1, "   ").validate().is_err());
        assert!(NewCreature::new(1, "bulbasaur").validate().is_ok());
        assert!(CreaturePatch::no(0).validate().is_err());
        assert!(CreaturePatch::default().validate().is_ok());
    }

    #[test]
    fn id_is_not_writable_through_attributes() {
        let payload = NewCreature::new(1, "bulbasaur").with_attribute("id", json!("x"));
        assert!(matches!(
            payload.validate(),
            Err(CatalogError::BadRequest(_))
        ));
    }
}
