use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::schema::Schema;

/// Validate internal consistency of a declared schema.
///
/// This checks:
/// - property names are non-empty and free of whitespace
/// - no two properties share a name
pub fn validate_schema(schema: &Schema) -> Result<()> {
    let mut names = BTreeSet::new();

    for property in &schema.properties {
        if property.name.trim().is_empty() {
            return Err(Error::InvalidSchema("property name is empty".to_string()));
        }
        if property.name.chars().any(char::is_whitespace) {
            return Err(Error::InvalidSchema(format!(
                "property name contains whitespace: '{}'",
                property.name
            )));
        }
        if !names.insert(property.name.as_str()) {
            return Err(Error::InvalidSchema(format!(
                "duplicate property name: {}",
                property.name
            )));
        }
    }

    Ok(())
}
