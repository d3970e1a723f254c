//! Resource permissions with action bitmasks

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const ACTION_CREATE: u32 = 1;
pub const ACTION_READ: u32 = 1 << 1;
pub const ACTION_UPDATE: u32 = 1 << 2;
pub const ACTION_DELETE: u32 = 1 << 3;

/// A resource pattern plus the actions allowed on it.
///
/// Resources are `:`-separated segments, e.g. `NAMESPACE:{namespace}:USER:{userId}`.
/// A `*` segment matches any single segment, and a trailing `*` matches the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub resource: String,
    pub action: u32,
}

impl Permission {
    pub fn new(resource: impl Into<String>, action: u32) -> Self {
        Self {
            resource: resource.into(),
            action,
        }
    }

    /// Human readable name of a single action bit
    pub fn action_name(&self) -> &'static str {
        match self.action {
            ACTION_CREATE => "CREATE",
            ACTION_READ => "READ",
            ACTION_UPDATE => "UPDATE",
            ACTION_DELETE => "DELETE",
            _ => "",
        }
    }

    /// Substitute `{placeholder}` segments from `resources`
    pub fn resolve(&self, resources: &HashMap<String, String>) -> Permission {
        let mut resource = self.resource.clone();
        for (placeholder, value) in resources {
            if !value.is_empty() {
                resource = resource.replace(placeholder.as_str(), value);
            }
        }
        Permission::new(resource, self.action)
    }

    /// Whether this (held) permission covers `required`
    pub fn grants(&self, required: &Permission) -> bool {
        self.action & required.action == required.action
            && resource_matches(&self.resource, &required.resource)
    }
}

fn resource_matches(held: &str, required: &str) -> bool {
    let held: Vec<&str> = held.split(':').collect();
    let required: Vec<&str> = required.split(':').collect();

    for (i, segment) in held.iter().enumerate() {
        if i >= required.len() {
            return false;
        }
        if *segment == "*" {
            if i == held.len() - 1 {
                return true;
            }
            continue;
        }
        if *segment != required[i] {
            return false;
        }
    }

    held.len() == required.len()
}
