use crate::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! identifier {
    ($(#[$doc:meta])* $name:ident, parts = $parts:expr) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an identifier string without checking its shape.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// The last dot-separated component.
            pub fn name(&self) -> &str {
                self.0.rsplit('.').next().unwrap_or(&self.0)
            }

            #[allow(dead_code)]
            fn parent_str(&self) -> &str {
                self.0.rsplit_once('.').map(|(parent, _)| parent).unwrap_or("")
            }

            #[allow(dead_code)]
            fn root_str(&self) -> &str {
                self.0.split('.').next().unwrap_or("")
            }
        }

        impl FromStr for $name {
            type Err = TypesError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let parts: Vec<&str> = s.split('.').collect();
                if parts.len() != $parts || parts.iter().any(|p| p.is_empty()) {
                    return Err(TypesError::InvalidIdentifier {
                        identifier: s.to_string(),
                        expected: $parts,
                    });
                }
                Ok(Self(s.to_string()))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}

identifier!(
    /// Identifies a scheme manager, the root of a trust hierarchy (`irma-demo`).
    SchemeManagerIdentifier,
    parts = 1
);

identifier!(
    /// Identifies an issuer within a scheme manager (`irma-demo.RU`).
    IssuerIdentifier,
    parts = 2
);

identifier!(
    /// Identifies a credential type (`irma-demo.RU.studentCard`).
    CredentialTypeIdentifier,
    parts = 3
);

identifier!(
    /// Identifies an attribute type (`irma-demo.RU.studentCard.studentID`).
    AttributeTypeIdentifier,
    parts = 4
);

impl IssuerIdentifier {
    pub fn scheme_manager(&self) -> SchemeManagerIdentifier {
        SchemeManagerIdentifier::new(self.parent_str())
    }
}

impl CredentialTypeIdentifier {
    pub fn issuer(&self) -> IssuerIdentifier {
        IssuerIdentifier::new(self.parent_str())
    }

    pub fn scheme_manager(&self) -> SchemeManagerIdentifier {
        SchemeManagerIdentifier::new(self.root_str())
    }
}

impl AttributeTypeIdentifier {
    pub fn credential_type(&self) -> CredentialTypeIdentifier {
        CredentialTypeIdentifier::new(self.parent_str())
    }

    pub fn issuer(&self) -> IssuerIdentifier {
        self.credential_type().issuer()
    }

    pub fn scheme_manager(&self) -> SchemeManagerIdentifier {
        SchemeManagerIdentifier::new(self.root_str())
    }
}
