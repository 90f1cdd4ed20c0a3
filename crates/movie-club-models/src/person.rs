use serde::{Deserialize, Serialize};
use crate::image::ImageRef;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Person {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String, // Unique, taken from the identity provider display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
}

/// Person document before the store assigns an id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewPerson {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
}

/// Person field on a rating or comment.
///
/// Reads that project `person->` come back expanded; raw documents and fresh
/// patch results only carry the reference. A projection that lost the name
/// (`{"_id": ..}` only) also lands in `Reference` so it gets resolved later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PersonRef {
    Expanded(Person),
    Reference {
        #[serde(rename = "_ref", alias = "_id")]
        reference: String,
        #[serde(rename = "_type", default = "reference_type")]
        kind: String,
    },
}

fn reference_type() -> String {
    "reference".to_string()
}

impl PersonRef {
    pub fn reference(id: impl Into<String>) -> Self {
        PersonRef::Reference {
            reference: id.into(),
            kind: reference_type(),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            PersonRef::Expanded(person) => &person.id,
            PersonRef::Reference { reference, .. } => reference,
        }
    }

    pub fn person(&self) -> Option<&Person> {
        match self {
            PersonRef::Expanded(person) => Some(person),
            PersonRef::Reference { .. } => None,
        }
    }

    pub fn is_expanded(&self) -> bool {
        matches!(self, PersonRef::Expanded(_))
    }

    /// Collapse to the reference form used when writing documents
    pub fn to_reference(&self) -> Self {
        Self::reference(self.id())
    }
}

impl From<Person> for PersonRef {
    fn from(person: Person) -> Self {
        PersonRef::Expanded(person)
    }
}

/// Signed-in user as reported by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_ref_deserializes_both_shapes() {
        let expanded: PersonRef = serde_json::from_str(r#"{"_id":"p1","name":"Ada"}"#).unwrap();
        assert!(expanded.is_expanded());
        assert_eq!(expanded.id(), "p1");
        assert_eq!(expanded.person().unwrap().name, "Ada");

        let reference: PersonRef = serde_json::from_str(r#"{"_ref":"p2","_type":"reference"}"#).unwrap();
        assert!(!reference.is_expanded());
        assert_eq!(reference.id(), "p2");
        assert!(reference.person().is_none());

        let nameless: PersonRef = serde_json::from_str(r#"{"_id":"p3"}"#).unwrap();
        assert!(!nameless.is_expanded());
        assert_eq!(nameless.id(), "p3");
    }

    #[test]
    fn test_person_ref_to_reference() {
        let person = Person { id: "p1".to_string(), name: "Ada".to_string(), image: None };
        let json = serde_json::to_value(PersonRef::from(person).to_reference()).unwrap();
        assert_eq!(json["_ref"], "p1");
        assert_eq!(json["_type"], "reference");
    }
}
