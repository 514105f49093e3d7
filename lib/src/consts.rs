//! Defines constant NamedNodeRefs for the vocabularies a Solid client reads and writes:
//! RDF, XSD, LDP, the Solid/PIM terms, FOAF, WAC (`acl:`) and ACP (`acp:`).

use oxigraph::model::NamedNodeRef;

/// Local Things get IRIs under this prefix until they are saved into a Resource.
pub const LOCAL_NODE_PREFIX: &str = "https://inrupt.com/.well-known/sdk-local-node/";

/// Key of the default graph inside a [`crate::store::GraphIndex`].
pub const DEFAULT_GRAPH: &str = "default";

// rdf
pub const TYPE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/1999/02/22-rdf-syntax-ns#type");
pub const LANG_STRING: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/1999/02/22-rdf-syntax-ns#langString");

// xsd
pub const XSD_STRING: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#string");
pub const XSD_BOOLEAN: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#boolean");
pub const XSD_DATE_TIME: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#dateTime");
pub const XSD_DATE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#date");
pub const XSD_TIME: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#time");
pub const XSD_DECIMAL: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#decimal");
pub const XSD_INTEGER: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#integer");

// ldp
pub const LDP_CONTAINS: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/ldp#contains");
pub const LDP_RESOURCE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/ldp#Resource");
pub const LDP_CONTAINER: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/ldp#Container");
pub const LDP_BASIC_CONTAINER: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/ldp#BasicContainer");

// solid / pim
pub const PIM_STORAGE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/pim/space#storage");
pub const PIM_STORAGE_TYPE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/pim/space#Storage");
/// `Link` rel under which a storage root names its owner.
pub const SOLID_POD_OWNER: &str = "http://www.w3.org/ns/solid/terms#podOwner";

// foaf
pub const FOAF_AGENT: NamedNodeRef<'_> = NamedNodeRef::new_unchecked("http://xmlns.com/foaf/0.1/Agent");

// acl (Web Access Control)
pub const ACL_AUTHORIZATION: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#Authorization");
pub const ACL_ACCESS_TO: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#accessTo");
pub const ACL_DEFAULT: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#default");
pub const ACL_DEFAULT_FOR_NEW: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#defaultForNew");
pub const ACL_MODE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#mode");
pub const ACL_AGENT: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#agent");
pub const ACL_AGENT_GROUP: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#agentGroup");
pub const ACL_AGENT_CLASS: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#agentClass");
pub const ACL_ORIGIN: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#origin");
pub const ACL_AUTHENTICATED_AGENT: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#AuthenticatedAgent");
pub const ACL_READ: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#Read");
pub const ACL_APPEND: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#Append");
pub const ACL_WRITE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#Write");
pub const ACL_CONTROL: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#Control");

// acp (Access Control Policies)
pub const ACP_ACCESS_CONTROL_RESOURCE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/solid/acp#AccessControlResource");
pub const ACP_ACCESS_CONTROL: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/solid/acp#AccessControl");
pub const ACP_POLICY: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/solid/acp#Policy");
pub const ACP_MATCHER: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/solid/acp#Matcher");
pub const ACP_RESOURCE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/solid/acp#resource");
pub const ACP_HAS_ACCESS_CONTROL: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/solid/acp#accessControl");
pub const ACP_HAS_MEMBER_ACCESS_CONTROL: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/solid/acp#memberAccessControl");
pub const ACP_APPLY: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/solid/acp#apply");
pub const ACP_ACCESS: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/solid/acp#access");
pub const ACP_ACCESS_MEMBERS: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/solid/acp#accessMembers");
pub const ACP_ALLOW: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/solid/acp#allow");
pub const ACP_DENY: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/solid/acp#deny");
pub const ACP_ALL_OF: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/solid/acp#allOf");
pub const ACP_ANY_OF: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/solid/acp#anyOf");
pub const ACP_NONE_OF: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/solid/acp#noneOf");
pub const ACP_AGENT: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/solid/acp#agent");
pub const ACP_CLIENT: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/solid/acp#client");
pub const ACP_ISSUER: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/solid/acp#issuer");
pub const ACP_VC: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/solid/acp#vc");
pub const ACP_PUBLIC_AGENT: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/solid/acp#PublicAgent");
pub const ACP_AUTHENTICATED_AGENT: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/solid/acp#AuthenticatedAgent");
pub const ACP_CREATOR_AGENT: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/solid/acp#CreatorAgent");
pub const ACP_PUBLIC_CLIENT: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/solid/acp#PublicClient");

/// The `acl:` mode IRIs ACP policies allow or deny.
pub const ACP_MODES: [NamedNodeRef<'_>; 3] = [ACL_READ, ACL_APPEND, ACL_WRITE];
