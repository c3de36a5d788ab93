//! Contact model
//!
//! Two shapes of the same data: [`ContactRecord`] (one per person, as handed
//! to consumers) and [`CacheEntry`] (one per phone number, as persisted and
//! reconciled).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Label used when a number carries no `type` parameter
pub const UNKNOWN_NUMBER_TYPE: &str = "unknown";

/// Producer of a contact entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Observed from the local aggregator; pruned when no longer observed
    Local,
    /// Written by another producer; never pruned by reconciliation
    External,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Local => "local",
            Origin::External => "external",
        }
    }
}

impl Serialize for Origin {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Only the external producer's labels are external; any other label
/// belongs to a local producer.
impl<'de> Deserialize<'de> for Origin {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "external" | "kdeconnect" => Ok(Origin::External),
            _ => Ok(Origin::Local),
        }
    }
}

/// Decimal digits of a phone number, in order
pub fn digits(number: &str) -> String {
    number.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Persisted per-number entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(default)]
    pub name: String,
    pub number: String,
    #[serde(rename = "type", default = "default_number_type")]
    pub kind: String,
    pub origin: Origin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<PathBuf>,
}

fn default_number_type() -> String {
    UNKNOWN_NUMBER_TYPE.to_string()
}

impl CacheEntry {
    pub fn new(name: &str, number: &str, origin: Origin) -> Self {
        Self {
            name: name.to_string(),
            number: number.to_string(),
            kind: default_number_type(),
            origin,
            avatar: None,
        }
    }

    pub fn with_kind(mut self, kind: &str) -> Self {
        self.kind = kind.to_string();
        self
    }

    pub fn with_avatar(mut self, avatar: impl Into<PathBuf>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    pub fn digits(&self) -> String {
        digits(&self.number)
    }

    /// Whether `other` is an observation of the same entry: same digits,
    /// and either this entry has no name or the names agree.
    pub fn matches(&self, other: &CacheEntry) -> bool {
        (self.name.is_empty() || self.name == other.name) && self.digits() == other.digits()
    }
}

/// A phone number and its label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub number: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// One person with all their numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub id: String,
    pub name: String,
    pub numbers: Vec<PhoneNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<PathBuf>,
    pub origin: Origin,
    /// Content fingerprint; changes whenever the record does
    #[serde(default)]
    pub timestamp: String,
}

impl ContactRecord {
    pub fn new(id: &str, name: &str, origin: Origin) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            numbers: Vec::new(),
            avatar: None,
            origin,
            timestamp: String::new(),
        }
    }

    pub fn add_number(&mut self, number: &str, kind: &str) {
        let number = PhoneNumber {
            number: number.to_string(),
            kind: kind.to_string(),
        };
        if !self.numbers.contains(&number) {
            self.numbers.push(number);
        }
    }

    /// Recompute `timestamp` from the rest of the record
    pub fn stamp(&mut self) {
        self.timestamp.clear();
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        self.timestamp = blake3::hash(&bytes).to_hex().to_string();
    }

    /// Flatten into one cache entry per number
    pub fn entries(&self) -> Vec<CacheEntry> {
        self.numbers
            .iter()
            .map(|n| CacheEntry {
                name: self.name.clone(),
                number: n.number.clone(),
                kind: n.kind.clone(),
                origin: self.origin,
                avatar: self.avatar.clone(),
            })
            .collect()
    }
}

/// Stable id for a grouping key
fn contact_id(key: &str) -> String {
    blake3::hash(key.as_bytes()).to_hex().as_str()[..16].to_string()
}

/// Merged view of the cache, grouped per person
#[derive(Debug, Clone, Default)]
pub struct ContactBook {
    contacts: Vec<ContactRecord>,
}

impl ContactBook {
    /// Group cache entries by display name. Entries without a name stand
    /// alone, keyed by their digits.
    pub fn from_entries(entries: &[CacheEntry]) -> Self {
        let mut contacts: Vec<ContactRecord> = Vec::new();

        for entry in entries {
            let key = if entry.name.is_empty() {
                format!("#{}", entry.digits())
            } else {
                entry.name.clone()
            };
            let id = contact_id(&key);

            let index = match contacts.iter().position(|c| c.id == id) {
                Some(index) => index,
                None => {
                    let name = if entry.name.is_empty() { &entry.number } else { &entry.name };
                    contacts.push(ContactRecord::new(&id, name, entry.origin));
                    contacts.len() - 1
                }
            };

            let contact = &mut contacts[index];
            contact.add_number(&entry.number, &entry.kind);
            if contact.avatar.is_none() {
                contact.avatar = entry.avatar.clone();
            }
        }

        for contact in &mut contacts {
            contact.stamp();
        }

        Self { contacts }
    }

    pub fn contacts(&self) -> &[ContactRecord] {
        &self.contacts
    }

    pub fn into_contacts(self) -> Vec<ContactRecord> {
        self.contacts
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Find the contact for a number, optionally disambiguated by name.
    ///
    /// Numbers match when either digit string ends with the other. An exact
    /// name match (or no name in the query) wins immediately; otherwise the
    /// first number match is returned.
    pub fn query(&self, name: Option<&str>, number: &str) -> Option<&ContactRecord> {
        let wanted = digits(number);
        if wanted.is_empty() {
            return None;
        }

        let mut fallback = None;

        for contact in &self.contacts {
            for n in &contact.numbers {
                let have = digits(&n.number);
                if have.is_empty() || !(wanted.ends_with(&have) || have.ends_with(&wanted)) {
                    continue;
                }

                match name {
                    None => return Some(contact),
                    Some(name) if name.is_empty() || name == contact.name => return Some(contact),
                    Some(_) => {
                        fallback.get_or_insert(contact);
                    }
                }
            }
        }

        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digits_projection() {
        assert_eq!(digits("+1 (555) 123-4567"), "15551234567");
        assert_eq!(digits("555-1234"), "5551234");
        assert_eq!(digits("ext."), "");
    }

    #[test]
    fn test_origin_serde() {
        let json = serde_json::to_string(&Origin::External).unwrap();
        assert_eq!(json, "\"external\"");

        let legacy: Origin = serde_json::from_str("\"kdeconnect\"").unwrap();
        assert_eq!(legacy, Origin::External);
        let folks: Origin = serde_json::from_str("\"folks\"").unwrap();
        assert_eq!(folks, Origin::Local);
    }

    #[test]
    fn test_cache_entry_wire_format() {
        let entry = CacheEntry::new("Jo", "555-1234", Origin::Local).with_kind("cell");
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "cell");
        assert_eq!(value["origin"], "local");
        assert!(value.get("avatar").is_none());

        let parsed: CacheEntry =
            serde_json::from_str(r#"{"name":"Ann","number":"1","origin":"external"}"#).unwrap();
        assert_eq!(parsed.kind, UNKNOWN_NUMBER_TYPE);
    }

    #[test]
    fn test_matches_requires_name_compatibility() {
        let cached = CacheEntry::new("Jo", "555-1234", Origin::External);
        assert!(cached.matches(&CacheEntry::new("Jo", "5551234", Origin::Local)));
        assert!(!cached.matches(&CacheEntry::new("Joe", "5551234", Origin::Local)));

        let nameless = CacheEntry::new("", "555 1234", Origin::External);
        assert!(nameless.matches(&CacheEntry::new("Joe", "5551234", Origin::Local)));
    }

    #[test]
    fn test_book_groups_by_name() {
        let entries = vec![
            CacheEntry::new("Jo", "555-1234", Origin::Local).with_kind("cell"),
            CacheEntry::new("Ann", "1", Origin::External),
            CacheEntry::new("Jo", "555-9999", Origin::Local).with_avatar("/tmp/jo.jpeg"),
            CacheEntry::new("", "777", Origin::External),
        ];

        let book = ContactBook::from_entries(&entries);
        assert_eq!(book.len(), 3);

        let jo = &book.contacts()[0];
        assert_eq!(jo.name, "Jo");
        assert_eq!(jo.numbers.len(), 2);
        assert_eq!(jo.avatar, Some(PathBuf::from("/tmp/jo.jpeg")));
        assert!(!jo.timestamp.is_empty());

        let unnamed = &book.contacts()[2];
        assert_eq!(unnamed.name, "777");
    }

    #[test]
    fn test_ids_and_stamps_are_stable() {
        let entries = vec![CacheEntry::new("Jo", "555-1234", Origin::Local)];
        let a = ContactBook::from_entries(&entries);
        let b = ContactBook::from_entries(&entries);
        assert_eq!(a.contacts()[0].id, b.contacts()[0].id);
        assert_eq!(a.contacts()[0].timestamp, b.contacts()[0].timestamp);

        let changed = vec![CacheEntry::new("Jo", "555-4321", Origin::Local)];
        let c = ContactBook::from_entries(&changed);
        assert_eq!(a.contacts()[0].id, c.contacts()[0].id);
        assert_ne!(a.contacts()[0].timestamp, c.contacts()[0].timestamp);
    }

    #[test]
    fn test_query_suffix_and_name() {
        let entries = vec![
            CacheEntry::new("Jo", "555-1234", Origin::Local),
            CacheEntry::new("Jo Work", "+1 555 1234", Origin::Local),
        ];
        let book = ContactBook::from_entries(&entries);

        assert_eq!(book.query(None, "15551234").unwrap().name, "Jo");
        assert_eq!(book.query(Some("Jo Work"), "5551234").unwrap().name, "Jo Work");
        assert_eq!(book.query(Some("Someone"), "1234").unwrap().name, "Jo");
        assert!(book.query(None, "999").is_none());
        assert!(book.query(None, "n/a").is_none());
    }

    #[test]
    fn test_record_flattens_per_number() {
        let mut record = ContactRecord::new("abc", "Jo", Origin::Local);
        record.add_number("555-1234", "cell");
        record.add_number("555-1234", "cell");
        record.add_number("555-9999", "work");
        record.avatar = Some(PathBuf::from("/tmp/jo.jpeg"));

        let entries = record.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].kind, "work");
        assert_eq!(entries[1].avatar, Some(PathBuf::from("/tmp/jo.jpeg")));
    }
}
