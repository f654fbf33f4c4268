//! Composite keys: derived keys that combine an index name with attribute values.
//!
//! Layout: `\0` `object_type` `\0` (`attribute` `\0`)*
//!
//! The leading NUL puts every composite key below every simple key, and the
//! NUL after each attribute makes a partial key an exact prefix of all keys
//! that extend it.

use crate::error::{StoreError, StoreResult};

/// First character of every composite key.
pub const COMPOSITE_KEY_NAMESPACE: char = '\u{0}';

/// Upper sentinel for prefix scans; attributes may not contain it.
pub(crate) const MAX_UNICODE_RUNE: char = char::MAX;

/// Build a composite key from an index name and attribute values.
pub fn create_composite_key(object_type: &str, attributes: &[&str]) -> StoreResult<String> {
    if object_type.is_empty() {
        return Err(StoreError::InvalidCompositeKey(
            "object type must not be empty".into(),
        ));
    }
    validate_component(object_type)?;

    let mut key = String::with_capacity(
        2 + object_type.len() + attributes.iter().map(|a| a.len() + 1).sum::<usize>(),
    );
    key.push(COMPOSITE_KEY_NAMESPACE);
    key.push_str(object_type);
    key.push(COMPOSITE_KEY_NAMESPACE);
    for attribute in attributes {
        validate_component(attribute)?;
        key.push_str(attribute);
        key.push(COMPOSITE_KEY_NAMESPACE);
    }
    Ok(key)
}

/// Split a composite key back into its index name and attributes.
pub fn split_composite_key(key: &str) -> StoreResult<(String, Vec<String>)> {
    let body = key
        .strip_prefix(COMPOSITE_KEY_NAMESPACE)
        .ok_or_else(|| StoreError::InvalidCompositeKey(format!("{key:?} is not a composite key")))?;
    let body = body
        .strip_suffix(COMPOSITE_KEY_NAMESPACE)
        .ok_or_else(|| StoreError::InvalidCompositeKey(format!("{key:?} is truncated")))?;

    let mut parts = body.split(COMPOSITE_KEY_NAMESPACE).map(str::to_string);
    let object_type = parts
        .next()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| StoreError::InvalidCompositeKey(format!("{key:?} has no object type")))?;
    Ok((object_type, parts.collect()))
}

/// Returns `true` if `key` lives in the composite-key namespace.
pub fn is_composite_key(key: &str) -> bool {
    key.starts_with(COMPOSITE_KEY_NAMESPACE)
}

fn validate_component(component: &str) -> StoreResult<()> {
    if component.contains(COMPOSITE_KEY_NAMESPACE) || component.contains(MAX_UNICODE_RUNE) {
        return Err(StoreError::InvalidCompositeKey(format!(
            "{component:?} contains a reserved character"
        )));
    }
    Ok(())
}
