//! Well-known IRIs
//!
//! Standard RDF/XSD terms plus the internal `app:/terms#` vocabulary used for
//! value kinds and for the pseudo-resources of aggregate query results.

pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

/// Internal terms namespace
pub const TERMS: &str = "app:/terms#";

/// Shape serialization namespace
pub const SHAPES: &str = "app:/shapes#";

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDF_FIRST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#first";
pub const RDF_REST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#rest";
pub const RDF_NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";
pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";

pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
pub const RDFS_SUBCLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";

pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
pub const XSD_FLOAT: &str = "http://www.w3.org/2001/XMLSchema#float";
pub const XSD_INT: &str = "http://www.w3.org/2001/XMLSchema#int";
pub const XSD_LONG: &str = "http://www.w3.org/2001/XMLSchema#long";
pub const XSD_DATE: &str = "http://www.w3.org/2001/XMLSchema#date";
pub const XSD_DATETIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";

// ─────────────────────────────────────────────────────────────────────────────
// Value kinds
// ─────────────────────────────────────────────────────────────────────────────

/// Any value
pub const VALUE_TYPE: &str = "app:/terms#value";
/// IRI or blank node
pub const RESOURCE_TYPE: &str = "app:/terms#resource";
/// Blank node
pub const BNODE_TYPE: &str = "app:/terms#bnode";
/// IRI reference
pub const IRI_TYPE: &str = "app:/terms#iri";
/// Any literal
pub const LITERAL_TYPE: &str = "app:/terms#literal";

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate results
// ─────────────────────────────────────────────────────────────────────────────

/// Reserved pseudo-subject aggregate results are nested under
pub const TERMS_ROOT: &str = "app:/terms#root";
pub const TERMS_STATS: &str = "app:/terms#stats";
pub const TERMS_ITEMS: &str = "app:/terms#items";
pub const TERMS_VALUE: &str = "app:/terms#value";
pub const TERMS_COUNT: &str = "app:/terms#count";
pub const TERMS_MIN: &str = "app:/terms#min";
pub const TERMS_MAX: &str = "app:/terms#max";

const NUMERIC: &[&str] = &[
    XSD_INTEGER,
    XSD_DECIMAL,
    XSD_DOUBLE,
    XSD_FLOAT,
    XSD_INT,
    XSD_LONG,
    "http://www.w3.org/2001/XMLSchema#short",
    "http://www.w3.org/2001/XMLSchema#byte",
    "http://www.w3.org/2001/XMLSchema#nonNegativeInteger",
    "http://www.w3.org/2001/XMLSchema#positiveInteger",
    "http://www.w3.org/2001/XMLSchema#negativeInteger",
    "http://www.w3.org/2001/XMLSchema#nonPositiveInteger",
    "http://www.w3.org/2001/XMLSchema#unsignedInt",
    "http://www.w3.org/2001/XMLSchema#unsignedLong",
];

/// Check whether a datatype IRI denotes a numeric XSD type
pub fn is_numeric(datatype: &str) -> bool {
    NUMERIC.contains(&datatype)
}

/// Check whether `lower` is subsumed by `upper` in the value kind lattice
///
/// `value` derives everything, `resource` derives IRIs and blank nodes, and
/// `literal` derives every type outside the resource branch.
pub fn derives(upper: &str, lower: &str) -> bool {
    upper == lower
        || upper == VALUE_TYPE
        || (upper == RESOURCE_TYPE && (lower == IRI_TYPE || lower == BNODE_TYPE))
        || (upper == LITERAL_TYPE && !is_resource_kind(lower) && lower != VALUE_TYPE)
}

fn is_resource_kind(iri: &str) -> bool {
    iri == RESOURCE_TYPE || iri == IRI_TYPE || iri == BNODE_TYPE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derives_lattice() {
        assert!(derives(VALUE_TYPE, XSD_STRING));
        assert!(derives(VALUE_TYPE, IRI_TYPE));
        assert!(derives(RESOURCE_TYPE, IRI_TYPE));
        assert!(derives(RESOURCE_TYPE, BNODE_TYPE));
        assert!(derives(LITERAL_TYPE, XSD_STRING));
        assert!(derives(LITERAL_TYPE, "urn:custom#type"));

        assert!(!derives(IRI_TYPE, RESOURCE_TYPE));
        assert!(!derives(LITERAL_TYPE, IRI_TYPE));
        assert!(!derives(LITERAL_TYPE, VALUE_TYPE));
        assert!(!derives(RESOURCE_TYPE, XSD_STRING));
    }
}
