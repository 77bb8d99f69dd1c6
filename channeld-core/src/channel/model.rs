//! Channel records and the documents that create or update them

use super::errors::{ChannelError, ChannelResult};
use super::object_id::ObjectId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Keys owned by the service; never stored as attributes
pub const RESERVED_KEYS: [&str; 5] = ["id", "_id", "identities", "createdAt", "updatedAt"];

/// Participant reference that may belong to channels
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(pub String);

impl IdentityId {
    pub fn new(id: impl Into<String>) -> Self {
        IdentityId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IdentityId {
    fn from(s: &str) -> Self {
        IdentityId(s.to_string())
    }
}

impl From<String> for IdentityId {
    fn from(s: String) -> Self {
        IdentityId(s)
    }
}

/// Membership entry as returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub id: IdentityId,
}

impl From<IdentityId> for IdentityRecord {
    fn from(id: IdentityId) -> Self {
        IdentityRecord { id }
    }
}

/// Untyped channel fields from a create or update request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelDocument(pub Map<String, Value>);

impl ChannelDocument {
    /// Accept only JSON objects
    pub fn from_value(value: Value) -> ChannelResult<Self> {
        match value {
            Value::Object(map) => Ok(ChannelDocument(map)),
            other => Err(ChannelError::InvalidDocument(format!(
                "expected an object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Split into storable attributes and an optional membership list
    pub fn into_parts(self) -> ChannelResult<(Map<String, Value>, Option<Vec<IdentityId>>)> {
        let mut attributes = self.0;
        let identities = match attributes.remove("identities") {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => {
                let mut members: Vec<IdentityId> = Vec::with_capacity(items.len());
                for item in items {
                    let Value::String(id) = item else {
                        return Err(ChannelError::InvalidDocument(
                            "identities must be an array of strings".to_string(),
                        ));
                    };
                    let id = IdentityId(id);
                    if !members.contains(&id) {
                        members.push(id);
                    }
                }
                Some(members)
            }
            Some(_) => {
                return Err(ChannelError::InvalidDocument(
                    "identities must be an array of strings".to_string(),
                ))
            }
        };

        for key in RESERVED_KEYS {
            attributes.remove(key);
        }

        Ok((attributes, identities))
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A stored channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: ObjectId,

    /// Members in insertion order
    pub identities: Vec<IdentityId>,

    /// Milliseconds since the epoch
    pub created_at: u64,

    pub updated_at: u64,

    /// Opaque fields supplied by clients
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Channel {
    /// Build a new channel from a create document
    pub fn new(document: ChannelDocument) -> ChannelResult<Self> {
        let (attributes, identities) = document.into_parts()?;
        let now = now_millis();

        Ok(Channel {
            id: ObjectId::generate(),
            identities: identities.unwrap_or_default(),
            created_at: now,
            updated_at: now,
            attributes,
        })
    }

    /// Merge an update document into this channel
    ///
    /// Top-level keys overwrite; `null` deletes the key. A present
    /// `identities` list replaces the membership.
    pub fn apply_update(&mut self, document: ChannelDocument) -> ChannelResult<()> {
        let (attributes, identities) = document.into_parts()?;

        for (key, value) in attributes {
            if value.is_null() {
                self.attributes.remove(&key);
            } else {
                self.attributes.insert(key, value);
            }
        }

        if let Some(identities) = identities {
            self.identities = identities;
        }

        self.updated_at = now_millis().max(self.updated_at);
        Ok(())
    }

    pub fn has_identity(&self, identity: &IdentityId) -> bool {
        self.identities.contains(identity)
    }

    pub fn add_identity(&mut self, identity: IdentityId) -> ChannelResult<()> {
        if self.has_identity(&identity) {
            return Err(ChannelError::IdentityExists {
                channel: self.id,
                identity,
            });
        }

        self.identities.push(identity);
        self.updated_at = now_millis().max(self.updated_at);
        Ok(())
    }

    pub fn remove_identity(&mut self, identity: &IdentityId) -> ChannelResult<()> {
        let before = self.identities.len();
        self.identities.retain(|member| member != identity);
        if self.identities.len() == before {
            return Err(ChannelError::IdentityNotFound {
                channel: self.id,
                identity: identity.clone(),
            });
        }

        self.updated_at = now_millis().max(self.updated_at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> ChannelDocument {
        ChannelDocument::from_value(value).unwrap()
    }

    #[test]
    fn test_document_rejects_non_objects() {
        assert!(ChannelDocument::from_value(json!([1, 2])).is_err());
        assert!(ChannelDocument::from_value(json!("name")).is_err());
        assert!(ChannelDocument::from_value(json!(null)).is_err());
    }

    #[test]
    fn test_new_strips_reserved_keys() {
        let channel = Channel::new(doc(json!({
            "id": "forged",
            "_id": "forged",
            "createdAt": 1,
            "name": "general",
            "identities": ["alice", "bob", "alice"],
        })))
        .unwrap();

        assert_eq!(channel.attributes.len(), 1);
        assert_eq!(channel.attributes["name"], json!("general"));
        assert_eq!(
            channel.identities,
            vec![IdentityId::from("alice"), IdentityId::from("bob")]
        );
        assert_eq!(channel.created_at, channel.updated_at);
    }

    #[test]
    fn test_identities_must_be_strings() {
        let result = Channel::new(doc(json!({ "identities": [1, 2] })));
        assert!(matches!(result, Err(ChannelError::InvalidDocument(_))));

        let result = Channel::new(doc(json!({ "identities": "alice" })));
        assert!(matches!(result, Err(ChannelError::InvalidDocument(_))));
    }

    #[test]
    fn test_update_merges_and_deletes() {
        let mut channel = Channel::new(doc(json!({ "name": "general", "topic": "chat" }))).unwrap();

        channel
            .apply_update(doc(json!({ "name": "random", "topic": null, "nsfw": false })))
            .unwrap();

        assert_eq!(channel.attributes["name"], json!("random"));
        assert_eq!(channel.attributes["nsfw"], json!(false));
        assert!(!channel.attributes.contains_key("topic"));
        assert!(channel.identities.is_empty());
    }

    #[test]
    fn test_update_replaces_membership_only_when_present() {
        let mut channel = Channel::new(doc(json!({ "identities": ["alice"] }))).unwrap();

        channel.apply_update(doc(json!({ "name": "x" }))).unwrap();
        assert_eq!(channel.identities, vec![IdentityId::from("alice")]);

        channel.apply_update(doc(json!({ "identities": ["carol"] }))).unwrap();
        assert_eq!(channel.identities, vec![IdentityId::from("carol")]);
    }

    #[test]
    fn test_membership_changes() {
        let mut channel = Channel::new(ChannelDocument::default()).unwrap();
        let alice = IdentityId::from("alice");

        channel.add_identity(alice.clone()).unwrap();
        assert!(channel.has_identity(&alice));
        assert!(matches!(
            channel.add_identity(alice.clone()),
            Err(ChannelError::IdentityExists { .. })
        ));

        channel.remove_identity(&alice).unwrap();
        assert!(!channel.has_identity(&alice));
        assert!(matches!(
            channel.remove_identity(&alice),
            Err(ChannelError::IdentityNotFound { .. })
        ));
    }

    #[test]
    fn test_channel_json_shape() {
        let channel = Channel::new(doc(json!({ "name": "general", "identities": ["a"] }))).unwrap();
        let value = serde_json::to_value(&channel).unwrap();

        assert_eq!(value["id"], json!(channel.id.to_string()));
        assert_eq!(value["name"], json!("general"));
        assert_eq!(value["identities"], json!(["a"]));
        assert!(value.get("createdAt").is_some());
        assert!(value.get("attributes").is_none());

        let back: Channel = serde_json::from_value(value).unwrap();
        assert_eq!(back, channel);
    }
}
