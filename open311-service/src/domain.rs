//! Open311 resource catalogue
//!
//! Declares the resource types the service exposes, their searchable
//! fields, the relations `populate` may expand, and the constraints their
//! collections enforce on write.

use crate::facade::{RegistryError, ResourceRegistry, ResourceType};

/// Area of responsibility that owns services and requests
pub fn jurisdiction() -> ResourceType {
    ResourceType::new("Jurisdiction")
        .searchable(["code", "name", "phone", "email", "domain", "about", "address"])
        .relation("jurisdiction", "Jurisdiction")
        .required(["code", "name"])
        .unique(["code"])
}

/// Grouping of related services (e.g. Water, Billing)
pub fn service_group() -> ResourceType {
    ResourceType::new("ServiceGroup")
        .searchable(["code", "name", "description"])
        .relation("jurisdiction", "Jurisdiction")
        .required(["code", "name"])
        .unique(["code"])
}

/// Kind of issue a request can be filed under
pub fn service() -> ResourceType {
    ResourceType::new("Service")
        .searchable(["code", "name", "description"])
        .relation("jurisdiction", "Jurisdiction")
        .relation("group", "ServiceGroup")
        .relation("priority", "Priority")
        .required(["code", "name", "group"])
        .unique(["code"])
}

/// Urgency level
pub fn priority() -> ResourceType {
    ResourceType::new("Priority")
        .searchable(["name"])
        .relation("jurisdiction", "Jurisdiction")
        .required(["name"])
        .unique(["name"])
}

/// Stage of a request's lifecycle
pub fn status() -> ResourceType {
    ResourceType::new("Status")
        .searchable(["name"])
        .relation("jurisdiction", "Jurisdiction")
        .required(["name"])
        .unique(["name"])
}

/// An issue reported by a citizen or operator
pub fn service_request() -> ResourceType {
    ResourceType::new("ServiceRequest")
        .searchable([
            "code",
            "description",
            "address",
            "reporter.name",
            "reporter.phone",
            "reporter.email",
            "reporter.account",
        ])
        .relation("jurisdiction", "Jurisdiction")
        .relation("group", "ServiceGroup")
        .relation("service", "Service")
        .relation("priority", "Priority")
        .relation("status", "Status")
        .relation("changelogs", "Changelog")
        .required(["service", "description"])
        .unique(["code"])
}

/// One recorded change to a request (status, priority, or comment)
pub fn changelog() -> ResourceType {
    ResourceType::new("Changelog")
        .searchable(["comment"])
        .relation("request", "ServiceRequest")
        .relation("status", "Status")
        .relation("priority", "Priority")
        .required(["request"])
}

/// Registry holding every Open311 resource type
pub fn open311_registry() -> Result<ResourceRegistry, RegistryError> {
    let mut registry = ResourceRegistry::new();
    for resource in [
        jurisdiction(),
        service_group(),
        service(),
        priority(),
        status(),
        service_request(),
        changelog(),
    ] {
        registry.register(resource)?;
    }
    registry.validate()?;
    Ok(registry)
}
