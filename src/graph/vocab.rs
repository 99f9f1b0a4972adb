//! Well-known IRIs used by extraction and hierarchy resolution.

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
pub const RDFS_SUBCLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";

pub const OWL_ONTOLOGY: &str = "http://www.w3.org/2002/07/owl#Ontology";
pub const OWL_CLASS: &str = "http://www.w3.org/2002/07/owl#Class";

pub const DCTERMS_TITLE: &str = "http://purl.org/dc/terms/title";

/// OBO "definition" annotation property (IAO:0000115).
pub const IAO_DEFINITION: &str = "http://purl.obolibrary.org/obo/IAO_0000115";
