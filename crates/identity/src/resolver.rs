use serde::Serialize;
use tracing::{debug, warn};

use crate::jid::{Jid, JidKind, PHONE_SERVER, SEPARATOR};
use crate::mapping::MappingLookup;

/// How a canonical value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    /// Input had no suffix.
    AlreadyCanonical,
    /// Phone (or other non-LID) suffix removed.
    Stripped,
    /// LID translated through the mapping.
    Mapped,
    /// LID with no mapping entry; the LID stands in for the phone number.
    Unmapped,
    /// Mapping read failed; same fallback as `Unmapped`.
    LookupFailed,
}

impl ResolutionSource {
    pub fn is_degraded(self) -> bool {
        matches!(self, Self::Unmapped | Self::LookupFailed)
    }
}

impl std::fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyCanonical => write!(f, "already_canonical"),
            Self::Stripped => write!(f, "stripped"),
            Self::Mapped => write!(f, "mapped"),
            Self::Unmapped => write!(f, "unmapped"),
            Self::LookupFailed => write!(f, "lookup_failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub canonical: String,
    pub source: ResolutionSource,
}

/// Turns stored identity values into canonical phone numbers.
///
/// Holds no state besides the injected mapping, so two calls with the same
/// input against the same mapping snapshot always agree.
pub struct IdentityResolver<M> {
    mapping: M,
}

impl<M: MappingLookup> IdentityResolver<M> {
    pub fn new(mapping: M) -> Self {
        Self { mapping }
    }

    pub fn mapping(&self) -> &M {
        &self.mapping
    }

    /// Canonical phone number for `identity_value`. Never fails.
    pub fn resolve(&self, identity_value: &str) -> String {
        self.resolve_detailed(identity_value).canonical
    }

    pub fn resolve_detailed(&self, identity_value: &str) -> Resolution {
        let jid = Jid::parse(identity_value);
        match jid.kind {
            JidKind::Bare => Resolution {
                canonical: identity_value.to_string(),
                source: ResolutionSource::AlreadyCanonical,
            },
            JidKind::PhoneNumber => Resolution {
                canonical: jid.user.to_string(),
                source: ResolutionSource::Stripped,
            },
            JidKind::Other(server) => {
                debug!(value = identity_value, server, "stripping unrecognized JID server");
                Resolution {
                    canonical: jid.user.to_string(),
                    source: ResolutionSource::Stripped,
                }
            }
            JidKind::Lid => self.resolve_lid(jid.user),
        }
    }

    fn resolve_lid(&self, local_id: &str) -> Resolution {
        match self.mapping.lookup(local_id) {
            Ok(Some(phone)) if !phone.is_empty() => {
                // Mapping files occasionally hold a full JID; keep the user part.
                let phone = Jid::parse(&phone).user.to_string();
                debug!(lid = local_id, phone = %phone, "LID mapped");
                Resolution {
                    canonical: phone,
                    source: ResolutionSource::Mapped,
                }
            }
            Ok(_) => {
                warn!(lid = local_id, "LID mapping not found, using LID as fallback");
                Resolution {
                    canonical: local_id.to_string(),
                    source: ResolutionSource::Unmapped,
                }
            }
            Err(e) => {
                warn!(lid = local_id, error = %e, "LID mapping unreadable, using LID as fallback");
                Resolution {
                    canonical: local_id.to_string(),
                    source: ResolutionSource::LookupFailed,
                }
            }
        }
    }

    /// Standard network form `<phone>@s.whatsapp.net`.
    ///
    /// Values already in that form are returned as-is; empty input stays empty.
    pub fn normalize_to_phone_jid(&self, identity_value: &str) -> String {
        if identity_value.is_empty() {
            return String::new();
        }
        if Jid::parse(identity_value).kind == JidKind::PhoneNumber {
            return identity_value.to_string();
        }
        format!("{}{SEPARATOR}{PHONE_SERVER}", self.resolve(identity_value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupError;
    use crate::mapping::{MemoryMapping, NoMapping};

    struct BrokenMapping;

    impl MappingLookup for BrokenMapping {
        fn lookup(&self, _local_id: &str) -> Result<Option<String>, LookupError> {
            Err(LookupError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "denied",
            )))
        }
    }

    fn resolver() -> IdentityResolver<MemoryMapping> {
        IdentityResolver::new(MemoryMapping::new().with_entry("555111", "15551234567"))
    }

    #[test]
    fn mapped_lid() {
        let r = resolver().resolve_detailed("555111@lid");
        assert_eq!(r.canonical, "15551234567");
        assert_eq!(r.source, ResolutionSource::Mapped);
        assert!(!r.source.is_degraded());
    }

    #[test]
    fn unmapped_lid_falls_back_to_itself() {
        let r = resolver().resolve_detailed("999999@lid");
        assert_eq!(r.canonical, "999999");
        assert_eq!(r.source, ResolutionSource::Unmapped);
        assert!(r.source.is_degraded());
    }

    #[test]
    fn lookup_error_is_swallowed() {
        let r = IdentityResolver::new(BrokenMapping).resolve_detailed("42@lid");
        assert_eq!(r.canonical, "42");
        assert_eq!(r.source, ResolutionSource::LookupFailed);
    }

    #[test]
    fn empty_mapping_value_counts_as_absent() {
        let resolver = IdentityResolver::new(MemoryMapping::new().with_entry("7", ""));
        assert_eq!(resolver.resolve_detailed("7@lid").source, ResolutionSource::Unmapped);
    }

    #[test]
    fn mapped_jid_value_is_reduced_to_phone() {
        let resolver =
            IdentityResolver::new(MemoryMapping::new().with_entry("77", "15550001111@s.whatsapp.net"));
        assert_eq!(resolver.resolve("77@lid"), "15550001111");
    }

    #[test]
    fn lid_detected_by_trailing_marker() {
        let resolver = resolver();
        let r = resolver.resolve_detailed("555111@device@lid");
        assert_eq!(r.canonical, "15551234567");
        assert_eq!(r.source, ResolutionSource::Mapped);
        assert_eq!(resolver.mapping().len(), 1);
    }

    #[test]
    fn phone_jid_is_stripped() {
        let r = resolver().resolve_detailed("573001234567@s.whatsapp.net");
        assert_eq!(r.canonical, "573001234567");
        assert_eq!(r.source, ResolutionSource::Stripped);
    }

    #[test]
    fn bare_value_is_unchanged() {
        let r = resolver().resolve_detailed("15551234567");
        assert_eq!(r.canonical, "15551234567");
        assert_eq!(r.source, ResolutionSource::AlreadyCanonical);
        assert_eq!(resolver().resolve(""), "");
    }

    #[test]
    fn resolution_is_repeatable() {
        let resolver = resolver();
        let first = resolver.resolve("555111@lid");
        for _ in 0..3 {
            assert_eq!(resolver.resolve("555111@lid"), first);
        }
    }

    #[test]
    fn normalize_to_phone_jid() {
        let resolver = resolver();
        assert_eq!(resolver.normalize_to_phone_jid("555111@lid"), "15551234567@s.whatsapp.net");
        assert_eq!(resolver.normalize_to_phone_jid("1@s.whatsapp.net"), "1@s.whatsapp.net");
        assert_eq!(resolver.normalize_to_phone_jid("15551234567"), "15551234567@s.whatsapp.net");
        assert_eq!(resolver.normalize_to_phone_jid(""), "");
        assert_eq!(
            IdentityResolver::new(NoMapping).normalize_to_phone_jid("8@lid"),
            "8@s.whatsapp.net"
        );
    }
}
