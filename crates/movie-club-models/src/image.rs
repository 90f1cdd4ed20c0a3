use serde::{Deserialize, Serialize};

/// Reference to an uploaded asset document (`{"_type": "reference", "_ref": "image-..."}`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssetReference {
    #[serde(rename = "_type", default = "reference_type")]
    pub kind: String,
    #[serde(rename = "_ref")]
    pub reference: String,
}

fn reference_type() -> String {
    "reference".to_string()
}

/// Image field as stored on a document. Queries may project the asset URL alongside the reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageRef {
    #[serde(rename = "_type", default = "image_type")]
    pub kind: String,
    pub asset: AssetReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>, // Only present on projected reads
}

fn image_type() -> String {
    "image".to_string()
}

impl ImageRef {
    pub fn from_asset_id(asset_id: impl Into<String>) -> Self {
        Self {
            kind: image_type(),
            asset: AssetReference {
                kind: reference_type(),
                reference: asset_id.into(),
            },
            url: None,
        }
    }

    pub fn asset_id(&self) -> &str {
        &self.asset.reference
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Slug {
    #[serde(rename = "_type", default = "slug_type")]
    pub kind: String,
    pub current: String,
}

fn slug_type() -> String {
    "slug".to_string()
}

impl Slug {
    /// Build a URL slug from a title: lowercase ASCII alphanumerics separated by single dashes
    pub fn from_title(title: &str) -> Self {
        let mut current = String::with_capacity(title.len());
        let mut pending_dash = false;
        for c in title.chars() {
            if c.is_ascii_alphanumeric() {
                if pending_dash && !current.is_empty() {
                    current.push('-');
                }
                pending_dash = false;
                current.push(c.to_ascii_lowercase());
            } else {
                pending_dash = true;
            }
        }
        // Slugs are capped the same way the studio does it
        current.truncate(96);
        let current = current.trim_end_matches('-').to_string();

        Self { kind: slug_type(), current }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_from_title() {
        assert_eq!(Slug::from_title("The Matrix").current, "the-matrix");
        assert_eq!(Slug::from_title("  Spider-Man: No Way Home ").current, "spider-man-no-way-home");
        assert_eq!(Slug::from_title("Amélie").current, "am-lie");
        assert_eq!(Slug::from_title("!!!").current, "");
    }

    #[test]
    fn test_image_ref_serializes_store_shape() {
        let image = ImageRef::from_asset_id("image-abc-500x750-jpg");
        let json = serde_json::to_value(&image).unwrap();
        assert_eq!(json["_type"], "image");
        assert_eq!(json["asset"]["_ref"], "image-abc-500x750-jpg");
        assert_eq!(json["asset"]["_type"], "reference");
        assert!(json.get("url").is_none());
    }
}
