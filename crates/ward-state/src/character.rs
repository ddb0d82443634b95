//! Character payload wrapper and attribute validation.
//!
//! The character is an opaque JSON object owned by the backend; the store
//! only shape-checks it and gates a handful of known attributes with type
//! and range rules. Unknown attributes pass through untouched.

use serde_json::Value;

use ward_core::error::EngineError;

/// An opaque character payload. Must be a JSON object; individual fields
/// are reached through [`Character::attribute`].
#[derive(Debug, Clone, PartialEq)]
pub struct Character {
    fields: serde_json::Map<String, Value>,
}

impl Character {
    /// Shape-check and accept a character payload.
    pub fn from_payload(payload: Value) -> Result<Self, EngineError> {
        match payload {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(EngineError::InvalidCharacter(format!(
                "expected an object, got {other}"
            ))),
        }
    }

    pub fn attribute(&self, attr: &str) -> Option<&Value> {
        self.fields.get(attr)
    }

    /// Overwrite or insert an attribute. Validation happens at the store
    /// boundary, not here.
    pub fn set_attribute(&mut self, attr: &str, value: Value) {
        self.fields.insert(attr.to_string(), value);
    }

    pub fn lives(&self) -> Option<i64> {
        self.attribute("lives").and_then(Value::as_i64)
    }

    pub fn insight(&self) -> Option<i64> {
        self.attribute("insight").and_then(Value::as_i64)
    }
}

/// Per-attribute type and range rules. Attributes outside the known set
/// accept any value; the payload is opaque beyond these gates.
pub fn validate_attribute(attr: &str, value: &Value) -> Result<(), EngineError> {
    let require_int_min = |min: i64| -> Result<(), EngineError> {
        match value.as_i64() {
            Some(v) if v >= min => Ok(()),
            Some(v) => Err(EngineError::InvalidAttribute {
                attr: attr.to_string(),
                reason: format!("must be >= {min}, got {v}"),
            }),
            None => Err(EngineError::InvalidAttribute {
                attr: attr.to_string(),
                reason: "must be an integer".to_string(),
            }),
        }
    };

    match attr {
        "lives" | "insight" => require_int_min(0),
        "max_lives" | "level" => require_int_min(1),
        _ => Ok(()),
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // -----------------------------------------------------------------------
    // Test 1: Only object payloads are accepted
    // -----------------------------------------------------------------------
    #[test]
    fn object_payloads_only() {
        let character = Character::from_payload(json!({
            "name": "Resident", "lives": 3, "insight": 20
        }))
        .unwrap();
        assert_eq!(character.lives(), Some(3));
        assert_eq!(character.insight(), Some(20));
        assert_eq!(character.attribute("name"), Some(&json!("Resident")));

        assert!(matches!(
            Character::from_payload(json!([1, 2])),
            Err(EngineError::InvalidCharacter(_))
        ));
        assert!(matches!(
            Character::from_payload(json!(null)),
            Err(EngineError::InvalidCharacter(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Test 2: Known attributes enforce type and range
    // -----------------------------------------------------------------------
    #[test]
    fn known_attribute_rules() {
        assert!(validate_attribute("lives", &json!(0)).is_ok());
        assert!(validate_attribute("lives", &json!(-1)).is_err());
        assert!(validate_attribute("lives", &json!("three")).is_err());

        assert!(validate_attribute("max_lives", &json!(1)).is_ok());
        assert!(validate_attribute("max_lives", &json!(0)).is_err());

        assert!(validate_attribute("level", &json!(1)).is_ok());
        assert!(validate_attribute("level", &json!(0)).is_err());

        assert!(validate_attribute("insight", &json!(50)).is_ok());
        assert!(validate_attribute("insight", &json!(-5)).is_err());
    }

    // -----------------------------------------------------------------------
    // Test 3: Unknown attributes accept anything
    // -----------------------------------------------------------------------
    #[test]
    fn unknown_attributes_free() {
        assert!(validate_attribute("special_ability", &json!("rewind")).is_ok());
        assert!(validate_attribute("loadout", &json!({"slots": 3})).is_ok());
        assert!(validate_attribute("flags", &json!(null)).is_ok());
    }

    // -----------------------------------------------------------------------
    // Test 4: set_attribute overwrites in place
    // -----------------------------------------------------------------------
    #[test]
    fn set_attribute_overwrites() {
        let mut character = Character::from_payload(json!({"lives": 3})).unwrap();
        character.set_attribute("lives", json!(2));
        assert_eq!(character.lives(), Some(2));

        character.set_attribute("insight", json!(10));
        assert_eq!(character.insight(), Some(10));
    }
}
