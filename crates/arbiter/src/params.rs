//! Compiled-in protocol parameters.
//!
//! Every bot competing for the same messages must run with byte-identical
//! parameters. A bot with a different emoji or time slice computes a
//! different participant set or ranking and silently breaks agreement, so
//! nothing here is read from configuration. Compare [`ProtocolParams::fingerprint`]
//! across deployments instead.

use std::{fmt, str::FromStr, time::Duration};

use {
    serde::{Deserialize, Serialize},
    sha2::{Digest, Sha256},
};

/// A reaction kind on the annotation channel: emoji id plus type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnnotationKind {
    pub id: u32,
    pub type_tag: &'static str,
}

impl AnnotationKind {
    #[must_use]
    pub const fn new(id: u32, type_tag: &'static str) -> Self {
        Self { id, type_tag }
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.type_tag)
    }
}

/// Which protocol variant a deployment runs.
///
/// The two variants claim with different emojis. Never run both against
/// the same message population.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Deterministic ranking with feedback-confirmed backup candidates.
    #[default]
    Full,
    /// Single direct-index winner, no backup loop.
    Reduced,
}

impl Variant {
    #[must_use]
    pub const fn params(self) -> &'static ProtocolParams {
        match self {
            Self::Full => &ProtocolParams::FULL,
            Self::Reduced => &ProtocolParams::REDUCED,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Reduced => "reduced",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "reduced" => Ok(Self::Reduced),
            other => Err(format!("unknown protocol variant: {other}")),
        }
    }
}

/// Backup confirmation settings of the full variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupParams {
    feedback: AnnotationKind,
    feedback_wait: Duration,
}

impl BackupParams {
    /// Secondary emoji posted by the candidate whose turn it is.
    #[must_use]
    pub const fn feedback(&self) -> AnnotationKind {
        self.feedback
    }

    #[must_use]
    pub const fn feedback_wait(&self) -> Duration {
        self.feedback_wait
    }
}

/// The full parameter set of one protocol variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolParams {
    variant: Variant,
    primary: AnnotationKind,
    claim_wait: Duration,
    time_slice: u32,
    backup: Option<BackupParams>,
}

impl ProtocolParams {
    pub const FULL: Self = Self {
        variant: Variant::Full,
        primary: AnnotationKind::new(289, "1"),
        claim_wait: Duration::from_millis(1000),
        time_slice: 60,
        backup: Some(BackupParams {
            feedback: AnnotationKind::new(124, "1"),
            feedback_wait: Duration::from_millis(700),
        }),
    };

    pub const REDUCED: Self = Self {
        variant: Variant::Reduced,
        primary: AnnotationKind::new(282, "1"),
        // Covers set -> server sync -> visible to fetch.
        claim_wait: Duration::from_millis(1500),
        time_slice: 60,
        backup: None,
    };

    #[must_use]
    pub const fn variant(&self) -> Variant {
        self.variant
    }

    /// Emoji used to claim a message.
    #[must_use]
    pub const fn primary(&self) -> AnnotationKind {
        self.primary
    }

    /// Propagation window between claiming and collecting participants.
    #[must_use]
    pub const fn claim_wait(&self) -> Duration {
        self.claim_wait
    }

    /// Seconds per slice when mapping the message time onto a ranking start.
    #[must_use]
    pub const fn time_slice(&self) -> u32 {
        self.time_slice
    }

    #[must_use]
    pub const fn backup(&self) -> Option<&BackupParams> {
        self.backup.as_ref()
    }

    /// Canonical text encoding hashed by [`Self::fingerprint`].
    #[must_use]
    pub fn canonical(&self) -> String {
        let mut out = format!(
            "variant={};primary={};claim_wait_ms={};time_slice={}",
            self.variant,
            self.primary,
            self.claim_wait.as_millis(),
            self.time_slice,
        );
        if let Some(backup) = &self.backup {
            out.push_str(&format!(
                ";feedback={};feedback_wait_ms={}",
                backup.feedback,
                backup.feedback_wait.as_millis()
            ));
        }
        out
    }

    /// Hex SHA-256 of the canonical encoding.
    ///
    /// Two deployments agree on the protocol iff their fingerprints match.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        Sha256::digest(self.canonical().as_bytes())
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_claim_with_distinct_emojis() {
        assert_ne!(ProtocolParams::FULL.primary(), ProtocolParams::REDUCED.primary());
        assert!(ProtocolParams::FULL.backup().is_some());
        assert!(ProtocolParams::REDUCED.backup().is_none());
    }

    #[test]
    fn feedback_emoji_differs_from_claim_emoji() {
        let backup = ProtocolParams::FULL.backup().unwrap();
        assert_ne!(backup.feedback(), ProtocolParams::FULL.primary());
    }

    #[test]
    fn canonical_encoding_is_stable() {
        assert_eq!(
            ProtocolParams::FULL.canonical(),
            "variant=full;primary=289:1;claim_wait_ms=1000;time_slice=60;\
             feedback=124:1;feedback_wait_ms=700"
        );
        assert_eq!(
            ProtocolParams::REDUCED.canonical(),
            "variant=reduced;primary=282:1;claim_wait_ms=1500;time_slice=60"
        );
    }

    #[test]
    fn fingerprint_detects_divergent_parameters() {
        let full = ProtocolParams::FULL.fingerprint();
        assert_eq!(full.len(), 64);
        assert_eq!(full, ProtocolParams::FULL.fingerprint());

        let drifted = ProtocolParams {
            time_slice: 30,
            ..ProtocolParams::FULL
        };
        assert_ne!(drifted.fingerprint(), full);
        assert_ne!(ProtocolParams::REDUCED.fingerprint(), full);
    }

    #[test]
    fn variant_parses_case_insensitively() {
        assert_eq!("Full".parse::<Variant>().unwrap(), Variant::Full);
        assert_eq!(" reduced ".parse::<Variant>().unwrap(), Variant::Reduced);
        assert!("lite".parse::<Variant>().is_err());
        assert_eq!(Variant::Reduced.params(), &ProtocolParams::REDUCED);
    }
}
