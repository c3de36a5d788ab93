//! Contact extraction
//!
//! Walks the aggregator's individuals through the bridge and turns each
//! one with at least one phone number into a [`ContactRecord`].

use crate::aggregator::{Aggregator, FieldDetails, Individual};
use crate::avatar::AvatarStore;
use crate::contact::{ContactRecord, Origin, UNKNOWN_NUMBER_TYPE};
use crate::error::{AlmanacError, Result};
use gtype_bridge::{adapt, Element, Marshaler, NativeValue};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Parameter carrying a phone number's label
pub const TYPE_PARAMETER: &str = "type";

/// Marshaled field value and its parameters
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDetail {
    pub value: NativeValue,
    pub parameters: HashMap<String, NativeValue>,
}

impl FieldDetail {
    /// Marshal a field and its parameters. Repeated parameter names keep
    /// their first value; parameters with non-string names are ignored.
    pub fn read(marshaler: &Marshaler, details: &dyn FieldDetails) -> Self {
        // SAFETY: FieldDetails guarantees the handle is valid for its type.
        let value = unsafe { marshaler.marshal(details.value(), details.value_type()) };

        let mut parameters = HashMap::new();
        if let Some(collection) = details.parameters() {
            for element in adapt(marshaler, collection.as_ref()) {
                if let Element::Entry { key: NativeValue::String(key), value } = element {
                    parameters.entry(key).or_insert(value);
                }
            }
        }

        Self { value, parameters }
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).and_then(NativeValue::as_str)
    }
}

/// Builds contact records from an aggregator
pub struct Extractor<'a> {
    marshaler: &'a Marshaler,
    avatars: &'a AvatarStore,
}

impl<'a> Extractor<'a> {
    pub fn new(marshaler: &'a Marshaler, avatars: &'a AvatarStore) -> Self {
        Self { marshaler, avatars }
    }

    /// Extract every individual with phone numbers. Individuals that fail
    /// with a skippable error are logged and left out; any other error
    /// ends the walk.
    pub fn collect<A: Aggregator + ?Sized>(&self, aggregator: &A) -> Result<Vec<ContactRecord>> {
        let Some(individuals) = aggregator.individuals() else {
            warn!("Aggregator exposes no individuals");
            return Ok(Vec::new());
        };

        let mut records = Vec::new();
        let mut skipped = 0;

        for element in adapt(self.marshaler, individuals.as_ref()) {
            let key = element.key().and_then(NativeValue::as_str).map(str::to_string);

            match self.extract_element(aggregator, element.into_value(), key) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) if e.is_skippable() => {
                    warn!("Skipping individual: {}", e);
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        info!("Extracted {} contacts ({} skipped)", records.len(), skipped);
        Ok(records)
    }

    fn extract_element<A: Aggregator + ?Sized>(
        &self,
        aggregator: &A,
        value: NativeValue,
        key: Option<String>,
    ) -> Result<Option<ContactRecord>> {
        let object = value.into_object()?;
        let individual = aggregator.individual(object).ok_or_else(|| {
            let reason = format!("object {:#x} is not an individual", object.address());
            AlmanacError::Extraction(reason)
        })?;

        self.extract(aggregator, individual.as_ref(), key)
    }

    /// Extract one individual; `Ok(None)` when it has no phone numbers.
    ///
    /// The record id is the individual's id, else `fallback_id`, else a
    /// random UUID.
    pub fn extract<A: Aggregator + ?Sized>(
        &self,
        aggregator: &A,
        individual: &dyn Individual,
        fallback_id: Option<String>,
    ) -> Result<Option<ContactRecord>> {
        let Some(numbers) = individual.phone_numbers() else {
            return Ok(None);
        };

        let mut details = Vec::new();
        for element in adapt(self.marshaler, numbers.as_ref()) {
            let object = element.into_value().into_object()?;
            let fields = aggregator.field_details(object).ok_or_else(|| {
                let reason = format!("object {:#x} has no field details", object.address());
                AlmanacError::Extraction(reason)
            })?;
            details.push(FieldDetail::read(self.marshaler, fields.as_ref()));
        }

        if details.is_empty() {
            return Ok(None);
        }

        let id = individual
            .id()
            .filter(|id| !id.is_empty())
            .or(fallback_id)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let name = individual.display_name().unwrap_or_default();

        let mut record = ContactRecord::new(&id, &name, Origin::Local);
        for detail in details {
            let kind = detail.parameter(TYPE_PARAMETER).unwrap_or(UNKNOWN_NUMBER_TYPE).to_string();
            let number = detail.value.into_string()?;
            record.add_number(&number, &kind);
        }

        if let Some(avatar) = individual.avatar() {
            let path = self
                .avatars
                .resolve(Some(&id), avatar)
                .map_err(|e| AlmanacError::Extraction(format!("avatar for {}: {}", id, e)))?;
            record.avatar = Some(path);
        }

        record.stamp();
        debug!("Extracted {} with {} numbers", record.id, record.numbers.len());
        Ok(Some(record))
    }
}
