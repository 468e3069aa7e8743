use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic outcome of verifying a disclosure or signed message.
///
/// Statuses are results, not errors. When several apply, the most severe one
/// wins: `Invalid` > `Expired` > `MissingAttributes` > `Valid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProofStatus {
    Valid,
    MissingAttributes,
    Expired,
    Invalid,
}

impl ProofStatus {
    fn severity(self) -> u8 {
        match self {
            ProofStatus::Valid => 0,
            ProofStatus::MissingAttributes => 1,
            ProofStatus::Expired => 2,
            ProofStatus::Invalid => 3,
        }
    }

    /// The more severe of the two statuses.
    pub fn combine(self, other: ProofStatus) -> ProofStatus {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }

    pub fn is_valid(self) -> bool {
        self == ProofStatus::Valid
    }
}

impl fmt::Display for ProofStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProofStatus::Valid => "VALID",
            ProofStatus::MissingAttributes => "MISSING_ATTRIBUTES",
            ProofStatus::Expired => "EXPIRED",
            ProofStatus::Invalid => "INVALID",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence() {
        use ProofStatus::*;
        assert_eq!(Valid.combine(MissingAttributes), MissingAttributes);
        assert_eq!(MissingAttributes.combine(Expired), Expired);
        assert_eq!(Expired.combine(Invalid), Invalid);
        assert_eq!(Invalid.combine(Valid), Invalid);
        assert_eq!(Expired.combine(MissingAttributes), Expired);
    }

    #[test]
    fn wire_names() {
        assert_eq!(
            serde_json::to_string(&ProofStatus::MissingAttributes).unwrap(),
            "\"MISSING_ATTRIBUTES\""
        );
        assert_eq!(ProofStatus::Invalid.to_string(), "INVALID");
    }
}
