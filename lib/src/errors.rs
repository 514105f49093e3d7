// Typed error values. Public functions return `anyhow::Result` and raise these with
// `anyhow!(...)`, so callers can recover them with `downcast_ref`.

use std::fmt;

/// A request returned a non-2xx status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub message: String,
}

impl FetchError {
    pub fn new(url: &str, status: u16, status_text: &str, message: &str) -> Self {
        Self {
            url: url.to_string(),
            status,
            status_text: status_text.to_string(),
            message: message.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// 401 and 403: the current user may not see the Resource.
    pub fn is_forbidden(&self) -> bool {
        self.status == 401 || self.status == 403
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} [{}]: the server responded with {} {}",
            self.message, self.url, self.status, self.status_text
        )
    }
}

impl std::error::Error for FetchError {}

/// Returned by the HTTP transport when the client runs in offline mode.
#[derive(Debug)]
pub struct OfflineRetrievalError {
    pub url: String,
}

impl fmt::Display for OfflineRetrievalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Refusing to fetch {} in offline mode", self.url)
    }
}

impl std::error::Error for OfflineRetrievalError {}

/// Raised by the Thing accessors when an argument has the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessorError {
    ThingExpected(String),
    ValidPropertyUrlExpected(String),
    ValidValueUrlExpected(String),
    ValidThingUrlExpected(String),
    /// The value has no lexical form in the named datatype.
    UnrepresentableValue(String),
}

impl fmt::Display for AccessorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AccessorError::ThingExpected(received) => {
                write!(f, "Expected a Thing, but received: [{received}]")
            }
            AccessorError::ValidPropertyUrlExpected(received) => {
                write!(f, "Expected a valid URL to identify a property, but received: [{received}]")
            }
            AccessorError::ValidValueUrlExpected(received) => {
                write!(f, "Expected a valid URL value, but received: [{received}]")
            }
            AccessorError::ValidThingUrlExpected(received) => {
                write!(f, "Expected a valid URL to identify a Thing, but received: [{received}]")
            }
            AccessorError::UnrepresentableValue(datatype) => {
                write!(f, "The value cannot be written as a literal of type [{datatype}]")
            }
        }
    }
}

impl std::error::Error for AccessorError {}

/// A quad term of a kind the store cannot index, named by its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermError {
    UnsupportedGraphType(String),
    UnsupportedSubjectType(String),
    UnsupportedPredicateType(String),
    UnsupportedObjectType(String),
}

impl fmt::Display for TermError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (position, term) = match self {
            TermError::UnsupportedGraphType(t) => ("graph", t),
            TermError::UnsupportedSubjectType(t) => ("subject", t),
            TermError::UnsupportedPredicateType(t) => ("predicate", t),
            TermError::UnsupportedObjectType(t) => ("object", t),
        };
        write!(f, "Cannot store {term} as the {position} of a quad")
    }
}

impl std::error::Error for TermError {}

/// Access that one of the protocols cannot express.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessModeError {
    /// WAC has a single Control mode, so controlRead and controlWrite must agree.
    AsymmetricControl { control_read: bool, control_write: bool },
    /// The Resource advertises neither an ACL nor an ACR.
    NoAccessControl(String),
}

impl fmt::Display for AccessModeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AccessModeError::AsymmetricControl {
                control_read,
                control_write,
            } => write!(
                f,
                "When setting access using Web Access Control, controlRead ({control_read}) and controlWrite ({control_write}) must be equal"
            ),
            AccessModeError::NoAccessControl(url) => {
                write!(f, "No access control document is linked from {url}")
            }
        }
    }
}

impl std::error::Error for AccessModeError {}

/// A Local Node could not be turned into a real IRI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalNodeError {
    NoBaseIri(String),
}

impl fmt::Display for LocalNodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LocalNodeError::NoBaseIri(name) => write!(
                f,
                "The Thing [{name}] has not been saved to a Resource yet, so it has no URL"
            ),
        }
    }
}

impl std::error::Error for LocalNodeError {}
