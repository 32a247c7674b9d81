//! Built-in precondition checks.

use async_trait::async_trait;
use serde_json::json;

use crate::core::{find_unique_spec, SpecKind};
use crate::error::Result;

use super::{Checkable, PreconditionCheck};

/// Passes when the test object is listed by the backend.
#[derive(Debug, Clone, Copy)]
pub struct TestobjectExists;

#[async_trait]
impl PreconditionCheck for TestobjectExists {
    fn name(&self) -> &'static str {
        "testobject_exists"
    }

    async fn check(&self, checkable: &mut dyn Checkable) -> Result<bool> {
        let testobject = checkable.testobject().clone();
        let existing = checkable
            .backend()
            .get_testobjects(&testobject.domain, &testobject.stage, &testobject.instance)
            .await?;

        if existing.contains(&testobject.name) {
            return Ok(true);
        }
        checkable.add_detail("existing_testobjects", json!(existing));
        checkable.update_summary(&format!("Testobject {testobject} does not exist."));
        Ok(false)
    }
}

/// Passes when the test object holds at least one row.
#[derive(Debug, Clone, Copy)]
pub struct TestobjectNotEmpty;

#[async_trait]
impl PreconditionCheck for TestobjectNotEmpty {
    fn name(&self) -> &'static str {
        "testobject_not_empty"
    }

    async fn check(&self, checkable: &mut dyn Checkable) -> Result<bool> {
        let testobject = checkable.testobject().clone();
        let rowcount = checkable.backend().get_rowcount(&testobject, None).await?;

        checkable.add_detail("rowcount", json!(rowcount));
        if rowcount > 0 {
            return Ok(true);
        }
        checkable.update_summary(&format!("Testobject {testobject} is empty."));
        Ok(false)
    }
}

/// Passes when exactly one specification exists per required kind.
#[derive(Debug, Clone, Copy)]
pub struct SpecsAreUnique;

#[async_trait]
impl PreconditionCheck for SpecsAreUnique {
    fn name(&self) -> &'static str {
        "specs_are_unique"
    }

    async fn check(&self, checkable: &mut dyn Checkable) -> Result<bool> {
        let mut duplicated: Vec<SpecKind> = Vec::new();
        for kind in checkable.required_specs() {
            let count = checkable
                .specs()
                .iter()
                .filter(|s| s.kind() == *kind)
                .count();
            if count > 1 {
                duplicated.push(*kind);
            }
        }

        if duplicated.is_empty() {
            return Ok(true);
        }
        let names: Vec<String> = duplicated.iter().map(|k| k.to_string()).collect();
        checkable.add_detail("duplicated_spec_kinds", json!(names));
        checkable.update_summary(&format!(
            "More than one specification provided for: {}.",
            names.join(", ")
        ));
        Ok(false)
    }
}

/// Passes when a schema specification declares non-empty primary keys.
#[derive(Debug, Clone, Copy)]
pub struct PrimaryKeysAreSpecified;

#[async_trait]
impl PreconditionCheck for PrimaryKeysAreSpecified {
    fn name(&self) -> &'static str {
        "primary_keys_are_specified"
    }

    async fn check(&self, checkable: &mut dyn Checkable) -> Result<bool> {
        let primary_keys = find_unique_spec(checkable.specs(), SpecKind::Schema)
            .and_then(|s| s.as_schema())
            .map(|schema| schema.primary_keys.clone())
            .unwrap_or_default();

        if !primary_keys.is_empty() {
            checkable.add_detail("primary_keys", json!(primary_keys));
            return Ok(true);
        }
        checkable.update_summary(
            "No primary keys specified in the schema specification.",
        );
        Ok(false)
    }
}
