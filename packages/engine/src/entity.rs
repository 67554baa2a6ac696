//! Patient entity assembled from a registration submission
//!
//! The engine only ever appends to a [`Patient`]: names, addresses and
//! attributes are added, never replaced or removed. The id stays unset until
//! the registration collaborator assigns one.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Submitted request parameters: form field name to raw string value.
pub type SubmittedValues = HashMap<String, String>;

/// Request keys read by [`CoreBinding`].
pub mod keys {
    pub const GENDER: &str = "gender";
    pub const BIRTHDATE: &str = "birthdate";
    pub const BIRTHDATE_ESTIMATED: &str = "birthdateEstimated";
    pub const PREFIX: &str = "prefix";
    pub const GIVEN_NAME: &str = "givenName";
    pub const MIDDLE_NAME: &str = "middleName";
    pub const FAMILY_NAME: &str = "familyName";
    pub const FAMILY_NAME2: &str = "familyName2";
    pub const ADDRESS1: &str = "address1";
    pub const ADDRESS2: &str = "address2";
    pub const CITY_VILLAGE: &str = "cityVillage";
    pub const STATE_PROVINCE: &str = "stateProvince";
    pub const COUNTRY: &str = "country";
    pub const POSTAL_CODE: &str = "postalCode";
}

/// Look up a submitted value, treating blank (empty or whitespace-only) as absent.
pub fn non_blank<'a>(submitted: &'a SubmittedValues, key: &str) -> Option<&'a str> {
    submitted
        .get(key)
        .map(|s| s.as_str())
        .filter(|s| !s.trim().is_empty())
}

/// Identifier assigned by the registration collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(pub u64);

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonName {
    pub prefix: Option<String>,
    pub given_name: Option<String>,
    pub middle_name: Option<String>,
    pub family_name: Option<String>,
    pub family_name2: Option<String>,
    pub preferred: bool,
}

impl PersonName {
    pub fn new(given_name: impl Into<String>, family_name: impl Into<String>) -> Self {
        Self {
            given_name: Some(given_name.into()),
            family_name: Some(family_name.into()),
            ..Self::default()
        }
    }

    /// Whether no name part has been filled in.
    pub fn is_blank(&self) -> bool {
        [
            &self.prefix,
            &self.given_name,
            &self.middle_name,
            &self.family_name,
            &self.family_name2,
        ]
        .into_iter()
        .all(Option::is_none)
    }
}

impl fmt::Display for PersonName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [
            &self.prefix,
            &self.given_name,
            &self.middle_name,
            &self.family_name,
            &self.family_name2,
        ]
        .into_iter()
        .filter_map(|part| part.as_deref())
        .collect();
        write!(f, "{}", parts.join(" "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonAddress {
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city_village: Option<String>,
    pub state_province: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub preferred: bool,
}

impl PersonAddress {
    /// Whether no address part has been filled in.
    pub fn is_blank(&self) -> bool {
        self.parts().all(|(_, part)| part.is_none())
    }

    /// Address parts keyed by their request key, in display order.
    pub fn parts(&self) -> impl Iterator<Item = (&'static str, Option<&str>)> {
        [
            (keys::ADDRESS1, self.address1.as_deref()),
            (keys::ADDRESS2, self.address2.as_deref()),
            (keys::CITY_VILLAGE, self.city_village.as_deref()),
            (keys::STATE_PROVINCE, self.state_province.as_deref()),
            (keys::COUNTRY, self.country.as_deref()),
            (keys::POSTAL_CODE, self.postal_code.as_deref()),
        ]
        .into_iter()
    }
}

/// Storage format of a person attribute type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeFormat {
    #[default]
    Text,
    Integer,
    Float,
    Boolean,
    Date,
}

/// Typed value of a person attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", content = "value", rename_all = "lowercase")]
pub enum AttributeValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
}

impl AttributeFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            AttributeFormat::Text => "text",
            AttributeFormat::Integer => "integer",
            AttributeFormat::Float => "float",
            AttributeFormat::Boolean => "boolean",
            AttributeFormat::Date => "date",
        }
    }

    /// Parse a raw submitted string into a value of this format.
    ///
    /// Returns `None` if the string does not fit the format. Dates use
    /// `YYYY-MM-DD`; booleans accept `true`/`false`/`yes`/`no`/`1`/`0`.
    pub fn parse(self, raw: &str) -> Option<AttributeValue> {
        let trimmed = raw.trim();
        match self {
            AttributeFormat::Text => Some(AttributeValue::Text(raw.to_string())),
            AttributeFormat::Integer => trimmed.parse().ok().map(AttributeValue::Integer),
            AttributeFormat::Float => trimmed
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(AttributeValue::Float),
            AttributeFormat::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(AttributeValue::Boolean(true)),
                "false" | "no" | "0" => Some(AttributeValue::Boolean(false)),
                _ => None,
            },
            AttributeFormat::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .map(AttributeValue::Date),
        }
    }
}

/// Entry of the attribute-type directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonAttributeType {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub format: AttributeFormat,
}

impl PersonAttributeType {
    pub fn new(uuid: impl Into<String>, name: impl Into<String>, format: AttributeFormat) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            format,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonAttribute {
    pub attribute_type: PersonAttributeType,
    /// Value as submitted
    pub raw_value: String,
    pub value: AttributeValue,
}

/// The record being registered.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: Option<PatientId>,
    pub gender: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub birthdate_estimated: bool,
    names: Vec<PersonName>,
    addresses: Vec<PersonAddress>,
    attributes: Vec<PersonAttribute>,
}

impl Patient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a name; the first one added becomes the preferred name.
    pub fn add_name(&mut self, mut name: PersonName) {
        if self.names.is_empty() {
            name.preferred = true;
        }
        self.names.push(name);
    }

    /// Append an address; the first one added becomes the preferred address.
    pub fn add_address(&mut self, mut address: PersonAddress) {
        if self.addresses.is_empty() {
            address.preferred = true;
        }
        self.addresses.push(address);
    }

    pub fn add_attribute(&mut self, attribute: PersonAttribute) {
        self.attributes.push(attribute);
    }

    pub fn names(&self) -> &[PersonName] {
        &self.names
    }

    pub fn addresses(&self) -> &[PersonAddress] {
        &self.addresses
    }

    pub fn attributes(&self) -> &[PersonAttribute] {
        &self.attributes
    }

    /// Find an attribute by its type uuid.
    pub fn attribute(&self, type_uuid: &str) -> Option<&PersonAttribute> {
        self.attributes
            .iter()
            .find(|a| a.attribute_type.uuid == type_uuid)
    }

    pub fn preferred_name(&self) -> Option<&PersonName> {
        self.names
            .iter()
            .find(|n| n.preferred)
            .or_else(|| self.names.first())
    }

    /// Display name used in notices; empty if the patient has no name.
    pub fn display_name(&self) -> String {
        self.preferred_name()
            .map(|n| n.to_string())
            .unwrap_or_default()
    }
}

/// Typed top-level bindings read from fixed request keys.
///
/// Blank values stay unset. An unparseable birthdate also stays unset, so
/// validation reports it as missing rather than the request failing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoreBinding {
    pub patient: Patient,
    pub name: PersonName,
    pub address: PersonAddress,
}

impl CoreBinding {
    pub fn from_submitted(submitted: &SubmittedValues) -> Self {
        let get = |key: &str| non_blank(submitted, key).map(|s| s.trim().to_string());

        let mut patient = Patient::new();
        patient.gender = get(keys::GENDER);
        patient.birthdate = get(keys::BIRTHDATE).and_then(|raw| {
            let parsed = NaiveDate::parse_from_str(&raw, "%Y-%m-%d").ok();
            if parsed.is_none() {
                tracing::debug!(value = %raw, "Ignoring unparseable birthdate");
            }
            parsed
        });
        patient.birthdate_estimated = get(keys::BIRTHDATE_ESTIMATED)
            .and_then(|raw| AttributeFormat::Boolean.parse(&raw))
            .is_some_and(|v| v == AttributeValue::Boolean(true));

        let name = PersonName {
            prefix: get(keys::PREFIX),
            given_name: get(keys::GIVEN_NAME),
            middle_name: get(keys::MIDDLE_NAME),
            family_name: get(keys::FAMILY_NAME),
            family_name2: get(keys::FAMILY_NAME2),
            preferred: false,
        };

        let address = PersonAddress {
            address1: get(keys::ADDRESS1),
            address2: get(keys::ADDRESS2),
            city_village: get(keys::CITY_VILLAGE),
            state_province: get(keys::STATE_PROVINCE),
            country: get(keys::COUNTRY),
            postal_code: get(keys::POSTAL_CODE),
            preferred: false,
        };

        Self {
            patient,
            name,
            address,
        }
    }

    /// Attach the bound name and address to the patient.
    ///
    /// A completely blank address is not attached.
    pub fn into_patient(self) -> Patient {
        let mut patient = self.patient;
        patient.add_name(self.name);
        if !self.address.is_blank() {
            patient.add_address(self.address);
        }
        patient
    }
}
