//! Core types and static field tables for the read gateway.

use serde_json::Value;

use crate::mapping::FieldMapper;

/// Data format version served by default.
pub const DATA_FORMAT_VERSION: &str = "0.2.0";

/// Page size used when the client sends no limit.
pub const DEFAULT_PAGE_SIZE: usize = 30;

/// Upper bound for a requested page size.
pub const MAX_PAGE_SIZE: usize = 300;

/// Identifier field carried by every resolved item.
pub const ID_FIELD: &str = "id";

/// Field carrying the data format version of an off-chain document.
pub const FORMAT_VERSION_FIELD: &str = "dataFormatVersion";

/// Document root holding the description of an entity.
pub const DESCRIPTION_ROOT: &str = "descriptionUri";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A document root passed through to the response, possibly under another key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentRoot {
    /// Key in the entity's data index (e.g. `ratePlansUri`).
    pub internal: &'static str,
    /// Key in the response item (e.g. `ratePlans`).
    pub response_key: &'static str,
}

/// Static description of one entity kind served by the gateway.
#[derive(Debug)]
pub struct Segment {
    /// Singular noun used in messages and error codes (`hotel`).
    pub noun: &'static str,
    /// Collection name, also the request path segment (`hotels`).
    pub collection: &'static str,
    /// Properties read directly from the on-chain record.
    pub on_chain_fields: &'static [&'static str],
    /// Fields found in the description document.
    pub description_fields: &'static [&'static str],
    /// Other document roots that can be requested by name.
    pub document_roots: &'static [DocumentRoot],
    /// Public name to internal name, applied per path segment.
    pub field_mapping: &'static [(&'static str, &'static str)],
    pub default_list_fields: &'static [&'static str],
    pub default_detail_fields: &'static [&'static str],
    /// Roots reported by the meta operation.
    pub meta_roots: &'static [&'static str],
    /// Schema model validated against, if the segment validates at all.
    pub schema_model: Option<&'static str>,
}

impl Segment {
    /// Field mapper built from this segment's mapping table.
    pub fn mapper(&self) -> FieldMapper {
        FieldMapper::new(self.field_mapping)
    }

    pub fn is_document_root(&self, name: &str) -> bool {
        self.document_roots.iter().any(|root| root.internal == name)
    }
}

pub static HOTELS: Segment = Segment {
    noun: "hotel",
    collection: "hotels",
    on_chain_fields: &["manager"],
    description_fields: &[
        "name",
        "description",
        "location",
        "contacts",
        "address",
        "roomTypes",
        "timezone",
        "currency",
        "images",
        "amenities",
        "updatedAt",
        "defaultCancellationAmount",
        "cancellationPolicies",
    ],
    document_roots: &[
        DocumentRoot {
            internal: "ratePlansUri",
            response_key: "ratePlans",
        },
        DocumentRoot {
            internal: "availabilityUri",
            response_key: "availability",
        },
        DocumentRoot {
            internal: "notificationsUri",
            response_key: "notificationsUri",
        },
        DocumentRoot {
            internal: "bookingUri",
            response_key: "bookingUri",
        },
    ],
    field_mapping: &[
        ("managerAddress", "manager"),
        ("ratePlans", "ratePlansUri"),
        ("availability", "availabilityUri"),
    ],
    default_list_fields: &["id", "location", "name"],
    default_detail_fields: &[
        "id",
        "location",
        "name",
        "description",
        "contacts",
        "address",
        "currency",
        "images",
        "amenities",
        "updatedAt",
    ],
    meta_roots: &["descriptionUri", "ratePlansUri", "availabilityUri"],
    schema_model: Some("HotelDetail"),
};

pub static AIRLINES: Segment = Segment {
    noun: "airline",
    collection: "airlines",
    on_chain_fields: &["manager"],
    description_fields: &[
        "name",
        "code",
        "contacts",
        "currency",
        "updatedAt",
        "defaultCancellationAmount",
        "cancellationPolicies",
    ],
    document_roots: &[
        DocumentRoot {
            internal: "flightsUri",
            response_key: "flights",
        },
        DocumentRoot {
            internal: "notificationsUri",
            response_key: "notificationsUri",
        },
        DocumentRoot {
            internal: "bookingUri",
            response_key: "bookingUri",
        },
    ],
    field_mapping: &[("managerAddress", "manager"), ("flights", "flightsUri")],
    default_list_fields: &["id", "name", "code"],
    default_detail_fields: &["id", "name", "code", "contacts", "currency", "updatedAt"],
    meta_roots: &["descriptionUri", "flightsUri"],
    schema_model: None,
};

/// Requested fields split by where their data lives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    /// Internal names in client-requested order, echoed in pagination links.
    pub mapped: Vec<String>,
    /// Whole fields read from the on-chain record.
    pub on_chain: Vec<String>,
    /// Paths flattened out of the off-chain data index.
    pub to_flatten: Vec<String>,
}

impl FieldSet {
    /// True when the client asked for nothing but the identifier.
    pub fn only_identifier(&self) -> bool {
        self.mapped.len() == 1 && self.mapped[0] == ID_FIELD
    }

    /// Comma-joined mapped fields as used in a `fields=` query parameter.
    pub fn query_value(&self) -> String {
        self.mapped.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_identifier() {
        let fields = FieldSet {
            mapped: vec!["id".into()],
            ..FieldSet::default()
        };
        assert!(fields.only_identifier());

        let fields = FieldSet {
            mapped: vec!["id".into(), "name".into()],
            ..FieldSet::default()
        };
        assert!(!fields.only_identifier());
    }

    #[test]
    fn document_roots() {
        assert!(HOTELS.is_document_root("ratePlansUri"));
        assert!(!HOTELS.is_document_root("flightsUri"));
        assert!(AIRLINES.is_document_root("flightsUri"));
    }
}
