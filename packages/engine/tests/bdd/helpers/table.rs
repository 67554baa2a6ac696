//! Conversion of Gherkin tables into engine inputs.

use cucumber::gherkin::Step;
use registration_engine::{AttributeFormat, PersonAttributeType, SubmittedValues};

/// Parse a two-column `| key | value |` table into submitted form values.
///
/// A header row `| field | value |` is skipped. Empty cells stay empty strings,
/// so blank submissions can be expressed.
pub fn parse_table_to_submitted(step: &Step) -> SubmittedValues {
    let mut values = SubmittedValues::new();
    let Some(table) = step.table.as_ref() else {
        return values;
    };

    for row in &table.rows {
        if row.len() < 2 || (row[0] == "field" && row[1] == "value") {
            continue;
        }
        values.insert(row[0].clone(), row[1].clone());
    }
    values
}

/// Parse a `| uuid | name | format |` table into person attribute types.
pub fn parse_table_to_attribute_types(step: &Step) -> Vec<PersonAttributeType> {
    let Some(table) = step.table.as_ref() else {
        return Vec::new();
    };

    table
        .rows
        .iter()
        .skip(1)
        .filter(|row| row.len() >= 3)
        .map(|row| PersonAttributeType::new(&row[0], &row[1], parse_format(&row[2])))
        .collect()
}

/// Parse a `| code | message |` table into message pairs.
pub fn parse_table_to_messages(step: &Step) -> Vec<(String, String)> {
    let Some(table) = step.table.as_ref() else {
        return Vec::new();
    };

    table
        .rows
        .iter()
        .skip(1)
        .filter(|row| row.len() >= 2)
        .map(|row| (row[0].clone(), row[1].clone()))
        .collect()
}

fn parse_format(raw: &str) -> AttributeFormat {
    match raw.trim().to_lowercase().as_str() {
        "integer" => AttributeFormat::Integer,
        "float" => AttributeFormat::Float,
        "boolean" => AttributeFormat::Boolean,
        "date" => AttributeFormat::Date,
        _ => AttributeFormat::Text,
    }
}

/// Split a comma-separated step argument into trimmed items.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
