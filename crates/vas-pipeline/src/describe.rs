//! Derived description
//!
//! Funding, competitive, market and IP-risk analyses take a short text
//! description of the company instead of the raw URL/document. It is built
//! once from the company profile.

use crate::types::PhaseOutput;
use serde_json::{Map, Value};

const NAME_FIELDS: &[&str] = &["company_name", "companyName", "name"];
const DESCRIPTION_FIELDS: &[&str] = &[
    "description",
    "company_description",
    "companyDescription",
    "summary",
    "overview",
];
const DETAIL_FIELDS: &[(&str, &[&str])] = &[
    ("Industry", &["industry", "sector"]),
    ("Stage", &["stage", "funding_stage", "fundingStage"]),
    ("Location", &["location", "headquarters", "hq"]),
];
const NESTED_OBJECTS: &[&str] = &["company", "profile", "overview"];

/// Build the shared text description from a company profile
///
/// Returns `None` when the profile names neither the company nor what it
/// does.
#[must_use]
pub fn derive_description(company: &PhaseOutput) -> Option<String> {
    match company.data() {
        Value::String(text) => {
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        Value::Object(map) => describe_object(map),
        _ => None,
    }
}

fn describe_object(map: &Map<String, Value>) -> Option<String> {
    let scopes = scopes(map);
    let name = first_text(&scopes, NAME_FIELDS);
    let description = first_text(&scopes, DESCRIPTION_FIELDS);

    let mut lines = vec![match (name, description) {
        (Some(name), Some(description)) => format!("{name}: {description}"),
        (Some(name), None) => name,
        (None, Some(description)) => description,
        (None, None) => return None,
    }];
    for (label, fields) in DETAIL_FIELDS {
        if let Some(value) = first_text(&scopes, fields) {
            lines.push(format!("{label}: {value}"));
        }
    }
    Some(lines.join("\n"))
}

/// The profile itself, then any nested profile objects
fn scopes(map: &Map<String, Value>) -> Vec<&Map<String, Value>> {
    let mut scopes = vec![map];
    scopes.extend(
        NESTED_OBJECTS
            .iter()
            .filter_map(|field| map.get(*field).and_then(Value::as_object)),
    );
    scopes
}

fn first_text(scopes: &[&Map<String, Value>], fields: &[&str]) -> Option<String> {
    scopes.iter().find_map(|scope| {
        fields.iter().find_map(|field| {
            scope
                .get(*field)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn name_description_and_details() {
        let profile = PhaseOutput::new(json!({
            "company_name": "Acme Robotics",
            "description": "Warehouse picking robots",
            "industry": "Logistics",
            "headquarters": "Pittsburgh, PA"
        }));
        assert_eq!(
            derive_description(&profile).unwrap(),
            "Acme Robotics: Warehouse picking robots\nIndustry: Logistics\nLocation: Pittsburgh, PA"
        );
    }

    #[test]
    fn nested_profile_is_searched() {
        let profile = PhaseOutput::new(json!({
            "status": "ok",
            "company": { "name": "Acme", "summary": "Robots" }
        }));
        assert_eq!(derive_description(&profile).unwrap(), "Acme: Robots");
    }

    #[test]
    fn plain_text_profile_is_used_directly() {
        let profile = PhaseOutput::new(json!("  Acme builds robots. "));
        assert_eq!(derive_description(&profile).unwrap(), "Acme builds robots.");
    }

    #[test]
    fn profile_without_identity_yields_nothing() {
        let profile = PhaseOutput::new(json!({"industry": "Logistics", "name": "  "}));
        assert!(derive_description(&profile).is_none());
        assert!(derive_description(&PhaseOutput::new(json!(42))).is_none());
    }
}
