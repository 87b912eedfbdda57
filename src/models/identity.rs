use serde::{Deserialize, Serialize};

/// A registrar's attestation about an on-chain identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JudgementKind {
    Unknown,
    FeePaid,
    Reasonable,
    KnownGood,
    OutOfDate,
    LowQuality,
    Erroneous,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Judgement {
    pub registrar: u32,
    pub kind: JudgementKind,
}

/// On-chain identity record, flattened from the identity pallet.
///
/// `display_parent` carries the super-identity's display name when the
/// account is a sub-account; `parent` is the super-account's SS58 address.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Identity {
    pub display: Option<String>,
    pub legal: Option<String>,
    pub web: Option<String>,
    pub email: Option<String>,
    pub twitter: Option<String>,
    pub riot: Option<String>,
    pub display_parent: Option<String>,
    pub parent: Option<String>,
    pub judgements: Vec<Judgement>,
}

impl Identity {
    /// An identity is verified iff some registrar judged it KnownGood or
    /// Reasonable. FeePaid alone is a pending request, not a verdict.
    pub fn is_verified(&self) -> bool {
        self.judgements
            .iter()
            .any(|j| matches!(j.kind, JudgementKind::KnownGood | JudgementKind::Reasonable))
    }

    pub fn has_all_fields(&self) -> bool {
        [
            &self.display,
            &self.legal,
            &self.web,
            &self.email,
            &self.twitter,
            &self.riot,
        ]
        .iter()
        .all(|field| field.as_deref().is_some_and(|s| !s.is_empty()))
    }

    pub fn has_sub_identity(&self) -> bool {
        self.display_parent.as_deref().is_some_and(|s| !s.is_empty())
    }

    pub fn display_or_empty(&self) -> &str {
        self.display.as_deref().unwrap_or("")
    }

    /// "{parent}/{display}" when both are present, else the bare display.
    pub fn name(&self) -> String {
        match (self.display_parent.as_deref(), self.display.as_deref()) {
            (Some(parent), Some(display)) if !parent.is_empty() && !display.is_empty() => {
                format!("{}/{}", parent, display)
            }
            _ => self.display_or_empty().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn judged(kind: JudgementKind) -> Identity {
        Identity {
            judgements: vec![Judgement { registrar: 0, kind }],
            ..Identity::default()
        }
    }

    #[test]
    fn fee_paid_alone_is_not_verified() {
        assert!(!judged(JudgementKind::FeePaid).is_verified());
        assert!(judged(JudgementKind::Reasonable).is_verified());
        assert!(judged(JudgementKind::KnownGood).is_verified());
        assert!(!judged(JudgementKind::LowQuality).is_verified());
    }

    #[test]
    fn name_joins_parent_and_display() {
        let identity = Identity {
            display: Some("node-1".into()),
            display_parent: Some("Acme".into()),
            ..Identity::default()
        };
        assert_eq!(identity.name(), "Acme/node-1");

        let bare = Identity {
            display: Some("solo".into()),
            ..Identity::default()
        };
        assert_eq!(bare.name(), "solo");
        assert_eq!(Identity::default().name(), "");
    }
}
