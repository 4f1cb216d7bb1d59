//! The fixed target-field table and its lookups.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::normalize::normalize_header;

/// Target path of the load reference number. Validation enforces
/// cross-record uniqueness on this field.
pub const REFERENCE_PATH: &str = "load.brokerageLoadId";

/// Value type of a target field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    /// `YYYY-MM-DD`.
    Date,
    /// Plain decimal, no currency symbol or thousands separator.
    Number,
    /// One of a fixed set of accepted values.
    Enum,
}

/// One entry of the target schema.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Dotted locator in the API request body.
    pub path: &'static str,
    /// Operator-facing label.
    pub label: &'static str,
    pub field_type: FieldType,
    pub required: bool,
    /// Known spreadsheet-header names for this field.
    pub aliases: &'static [&'static str],
    /// Accepted values for enum fields, empty otherwise.
    pub enum_values: &'static [&'static str],
}

/// Target schema in declaration order. Declaration order is the tiebreak
/// for mapping suggestions, so required identity and routing fields come
/// first.
const FIELDS: &[FieldSpec] = &[
    FieldSpec {
        path: "load.brokerageLoadId",
        label: "Load reference",
        field_type: FieldType::Text,
        required: true,
        aliases: &[
            "load id",
            "load #",
            "load number",
            "reference",
            "reference number",
            "shipment number",
            "shipment id",
            "shipment ref",
            "brokerage load id",
            "pro number",
        ],
        enum_values: &[],
    },
    FieldSpec {
        path: "load.mode",
        label: "Mode",
        field_type: FieldType::Enum,
        required: true,
        aliases: &["mode", "transport mode", "shipment type", "move type"],
        enum_values: &["FTL", "LTL", "DRAYAGE"],
    },
    FieldSpec {
        path: "load.customerName",
        label: "Customer name",
        field_type: FieldType::Text,
        required: true,
        aliases: &[
            "customer name",
            "cust name",
            "shipper name",
            "client",
            "company",
            "account name",
        ],
        enum_values: &[],
    },
    FieldSpec {
        path: "load.pickups.0.address.street1",
        label: "Pickup street",
        field_type: FieldType::Text,
        required: false,
        aliases: &[
            "pickup address",
            "origin address",
            "pickup street",
            "origin street",
            "street address",
            "address",
        ],
        enum_values: &[],
    },
    FieldSpec {
        path: "load.pickups.0.address.city",
        label: "Pickup city",
        field_type: FieldType::Text,
        required: true,
        aliases: &["origin city", "pickup city", "from city", "city"],
        enum_values: &[],
    },
    FieldSpec {
        path: "load.pickups.0.address.stateOrProvince",
        label: "Pickup state",
        field_type: FieldType::Text,
        required: false,
        aliases: &["origin state", "pickup state", "from state", "state"],
        enum_values: &[],
    },
    FieldSpec {
        path: "load.pickups.0.address.postalCode",
        label: "Pickup postal code",
        field_type: FieldType::Text,
        required: false,
        aliases: &[
            "origin zip",
            "pickup zip",
            "from zip",
            "zip",
            "zip code",
            "postal code",
        ],
        enum_values: &[],
    },
    FieldSpec {
        path: "load.pickups.0.address.country",
        label: "Pickup country",
        field_type: FieldType::Text,
        required: false,
        aliases: &["origin country", "pickup country", "country"],
        enum_values: &[],
    },
    FieldSpec {
        path: "load.pickups.0.scheduledDate",
        label: "Pickup date",
        field_type: FieldType::Date,
        required: true,
        aliases: &[
            "pickup date",
            "ship date",
            "origin date",
            "ready date",
            "pickup appointment",
        ],
        enum_values: &[],
    },
    FieldSpec {
        path: "load.dropoffs.0.address.street1",
        label: "Delivery street",
        field_type: FieldType::Text,
        required: false,
        aliases: &[
            "delivery address",
            "dest address",
            "destination address",
            "delivery street",
            "to street",
        ],
        enum_values: &[],
    },
    FieldSpec {
        path: "load.dropoffs.0.address.city",
        label: "Delivery city",
        field_type: FieldType::Text,
        required: true,
        aliases: &["dest city", "delivery city", "destination city", "to city"],
        enum_values: &[],
    },
    FieldSpec {
        path: "load.dropoffs.0.address.stateOrProvince",
        label: "Delivery state",
        field_type: FieldType::Text,
        required: false,
        aliases: &[
            "dest state",
            "delivery state",
            "destination state",
            "to state",
        ],
        enum_values: &[],
    },
    FieldSpec {
        path: "load.dropoffs.0.address.postalCode",
        label: "Delivery postal code",
        field_type: FieldType::Text,
        required: false,
        aliases: &["dest zip", "delivery zip", "destination zip", "to zip"],
        enum_values: &[],
    },
    FieldSpec {
        path: "load.dropoffs.0.address.country",
        label: "Delivery country",
        field_type: FieldType::Text,
        required: false,
        aliases: &["dest country", "delivery country", "destination country"],
        enum_values: &[],
    },
    FieldSpec {
        path: "load.dropoffs.0.scheduledDate",
        label: "Delivery date",
        field_type: FieldType::Date,
        required: false,
        aliases: &[
            "delivery date",
            "due date",
            "dest date",
            "appointment date",
            "delivery appointment",
        ],
        enum_values: &[],
    },
    FieldSpec {
        path: "load.rateType",
        label: "Rate type",
        field_type: FieldType::Enum,
        required: false,
        aliases: &["rate type", "contract type", "pricing", "rate category"],
        enum_values: &["SPOT", "CONTRACT", "DEDICATED", "PROJECT"],
    },
    FieldSpec {
        path: "load.status",
        label: "Status",
        field_type: FieldType::Enum,
        required: false,
        aliases: &["status", "load status", "shipment status", "stage"],
        enum_values: &[
            "DRAFT",
            "CUSTOMER_CONFIRMED",
            "COVERED",
            "DISPATCHED",
            "IN_TRANSIT",
            "DELIVERED",
            "CANCELED",
        ],
    },
    FieldSpec {
        path: "load.equipment.equipmentType",
        label: "Equipment",
        field_type: FieldType::Enum,
        required: false,
        aliases: &["equipment", "equipment type", "trailer type", "truck type"],
        enum_values: &["DRY_VAN", "FLATBED", "REEFER", "CONTAINER", "OTHER"],
    },
    FieldSpec {
        path: "load.items.0.quantity",
        label: "Quantity",
        field_type: FieldType::Number,
        required: false,
        aliases: &["qty", "quantity", "units", "pallet count", "pieces"],
        enum_values: &[],
    },
    FieldSpec {
        path: "load.items.0.totalWeightLbs",
        label: "Total weight (lbs)",
        field_type: FieldType::Number,
        required: false,
        aliases: &[
            "weight",
            "total weight",
            "weight lbs",
            "gross weight",
            "shipment weight",
        ],
        enum_values: &[],
    },
    FieldSpec {
        path: "load.items.0.description",
        label: "Commodity",
        field_type: FieldType::Text,
        required: false,
        aliases: &[
            "commodity",
            "product",
            "freight description",
            "item description",
            "description",
        ],
        enum_values: &[],
    },
    FieldSpec {
        path: "load.totalRateUsd",
        label: "Total rate (USD)",
        field_type: FieldType::Number,
        required: false,
        aliases: &[
            "rate",
            "total rate",
            "linehaul",
            "price",
            "amount",
            "cost",
            "revenue",
        ],
        enum_values: &[],
    },
    FieldSpec {
        path: "load.carrierName",
        label: "Carrier name",
        field_type: FieldType::Text,
        required: false,
        aliases: &["carrier", "carrier name"],
        enum_values: &[],
    },
];

/// Normalized alias → indices into [`FIELDS`], in declaration order.
static ALIAS_INDEX: LazyLock<BTreeMap<String, Vec<usize>>> = LazyLock::new(|| {
    let mut index: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (idx, spec) in FIELDS.iter().enumerate() {
        for alias in spec.aliases {
            index.entry(normalize_header(alias)).or_default().push(idx);
        }
        // The path's final segment is itself an accepted name, so a file
        // that already uses API field names maps cleanly.
        if let Some(last) = spec.path.rsplit('.').next() {
            index.entry(normalize_header(last)).or_default().push(idx);
        }
        index.entry(normalize_header(spec.path)).or_default().push(idx);
    }
    index
});

/// Common enum-value variations, per field path.
static ENUM_VARIATIONS: LazyLock<BTreeMap<&'static str, BTreeMap<&'static str, &'static str>>> =
    LazyLock::new(|| {
        let mut map: BTreeMap<&str, BTreeMap<&str, &str>> = BTreeMap::new();
        map.insert(
            "load.mode",
            BTreeMap::from([
                ("full truckload", "FTL"),
                ("full truck load", "FTL"),
                ("truckload", "FTL"),
                ("less than truckload", "LTL"),
                ("less truckload", "LTL"),
            ]),
        );
        map.insert(
            "load.status",
            BTreeMap::from([("cancelled", "CANCELED"), ("customer confirmed", "CUSTOMER_CONFIRMED"), ("in transit", "IN_TRANSIT")]),
        );
        map.insert(
            "load.equipment.equipmentType",
            BTreeMap::from([
                ("dry van", "DRY_VAN"),
                ("dryvan", "DRY_VAN"),
                ("van", "DRY_VAN"),
                ("flat bed", "FLATBED"),
                ("flat", "FLATBED"),
                ("refrigerated", "REEFER"),
            ]),
        );
        map
    });

/// All target fields in declaration order.
pub fn fields() -> &'static [FieldSpec] {
    FIELDS
}

/// Looks up a field by exact path.
pub fn field(path: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|spec| spec.path == path)
}

/// Type of the field at `path`.
///
/// # Panics
///
/// Panics when `path` is not in the registry. Callers reach this point
/// only with paths produced by the registry itself, so an unknown path is
/// a bug upstream, not an operating condition.
pub fn field_type(path: &str) -> FieldType {
    match field(path) {
        Some(spec) => spec.field_type,
        None => panic!("target path '{path}' is not in the load schema"),
    }
}

/// Paths of all required fields, in declaration order.
pub fn required_fields() -> Vec<&'static str> {
    FIELDS
        .iter()
        .filter(|spec| spec.required)
        .map(|spec| spec.path)
        .collect()
}

/// Resolves a candidate header against the alias table.
///
/// Returns `(target path, confidence)` pairs for every field whose alias
/// table contains the normalized candidate, in declaration order. An exact
/// alias hit carries full confidence; fuzzier tiers live in the mapping
/// engine, not here.
pub fn resolve_aliases(candidate: &str) -> Vec<(&'static str, f32)> {
    let normalized = normalize_header(candidate);
    if normalized.is_empty() {
        return Vec::new();
    }
    let Some(indices) = ALIAS_INDEX.get(&normalized) else {
        return Vec::new();
    };
    let mut seen = Vec::new();
    let mut out = Vec::new();
    for &idx in indices {
        if seen.contains(&idx) {
            continue;
        }
        seen.push(idx);
        out.push((FIELDS[idx].path, 1.0));
    }
    out
}

/// Canonicalizes a raw value for an enum field.
///
/// Accepts the canonical values case-insensitively plus the known
/// variations ("full truckload" → `FTL`). Returns `None` when the value is
/// not acceptable, and for fields that are not enums.
pub fn canonicalize_enum(path: &str, raw: &str) -> Option<&'static str> {
    let spec = field(path)?;
    if spec.field_type != FieldType::Enum {
        return None;
    }
    let normalized = normalize_header(raw);
    for value in spec.enum_values {
        if normalize_header(value) == normalized {
            return Some(value);
        }
    }
    ENUM_VARIATIONS
        .get(path)
        .and_then(|variations| variations.get(normalized.as_str()))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaration_order_is_stable() {
        assert_eq!(FIELDS[0].path, REFERENCE_PATH);
        assert!(FIELDS.len() > 20);
    }

    #[test]
    fn required_fields_cover_the_core() {
        let required = required_fields();
        assert!(required.contains(&"load.brokerageLoadId"));
        assert!(required.contains(&"load.pickups.0.address.city"));
        assert!(required.contains(&"load.dropoffs.0.address.city"));
        assert!(!required.contains(&"load.carrierName"));
    }

    #[test]
    fn alias_resolution_is_normalization_insensitive() {
        let hits = resolve_aliases("Load_ID");
        assert_eq!(hits, vec![("load.brokerageLoadId", 1.0)]);
        let hits = resolve_aliases("LOAD #");
        assert_eq!(hits, vec![("load.brokerageLoadId", 1.0)]);
    }

    #[test]
    fn path_segments_resolve_to_their_field() {
        let hits = resolve_aliases("brokerageLoadId");
        assert_eq!(hits, vec![("load.brokerageLoadId", 1.0)]);
    }

    #[test]
    fn enum_variations_canonicalize() {
        assert_eq!(canonicalize_enum("load.mode", "Full Truckload"), Some("FTL"));
        assert_eq!(canonicalize_enum("load.mode", "ftl"), Some("FTL"));
        assert_eq!(
            canonicalize_enum("load.equipment.equipmentType", "Dry-Van"),
            Some("DRY_VAN")
        );
        assert_eq!(canonicalize_enum("load.mode", "parcel"), None);
    }

    #[test]
    #[should_panic(expected = "not in the load schema")]
    fn unknown_path_is_a_caller_bug() {
        let _ = field_type("load.nope");
    }
}
