//! Phone extraction from an incoming message context.
//!
//! Message contexts carry the sender in one of two places: the top-level
//! `from` field or the nested `key.remoteJid`. Fields are tried in that
//! order; when neither holds a value the result is `None`.

use serde::Deserialize;
use tracing::warn;

use crate::mapping::MappingLookup;
use crate::resolver::IdentityResolver;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageKey {
    #[serde(default, rename = "remoteJid")]
    pub remote_jid: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageContext {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub key: Option<MessageKey>,
}

impl MessageContext {
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    /// First non-empty sender JID, if any.
    pub fn sender_jid(&self) -> Option<&str> {
        let nested = self.key.as_ref().and_then(|k| k.remote_jid.as_deref());
        [self.from.as_deref(), nested]
            .into_iter()
            .flatten()
            .find(|jid| !jid.is_empty())
    }
}

/// Canonical phone number of the message sender.
pub fn phone_from_context<M: MappingLookup>(
    ctx: &MessageContext,
    resolver: &IdentityResolver<M>,
) -> Option<String> {
    match ctx.sender_jid() {
        Some(jid) => Some(resolver.resolve(jid)),
        None => {
            warn!("no sender JID in message context");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MemoryMapping;

    fn resolver() -> IdentityResolver<MemoryMapping> {
        IdentityResolver::new(MemoryMapping::new().with_entry("555111", "15551234567"))
    }

    #[test]
    fn from_field_wins() {
        let ctx = MessageContext::from_json(
            r#"{"from": "555111@lid", "key": {"remoteJid": "999@s.whatsapp.net"}}"#,
        )
        .unwrap();
        assert_eq!(phone_from_context(&ctx, &resolver()).as_deref(), Some("15551234567"));
    }

    #[test]
    fn falls_back_to_remote_jid() {
        let ctx = MessageContext::from_json(r#"{"key": {"remoteJid": "999@s.whatsapp.net"}}"#)
            .unwrap();
        assert_eq!(phone_from_context(&ctx, &resolver()).as_deref(), Some("999"));
    }

    #[test]
    fn empty_from_is_skipped() {
        let ctx = MessageContext {
            from: Some(String::new()),
            key: Some(MessageKey {
                remote_jid: Some("321@s.whatsapp.net".into()),
            }),
        };
        assert_eq!(ctx.sender_jid(), Some("321@s.whatsapp.net"));
    }

    #[test]
    fn nothing_available() {
        let ctx = MessageContext::from_json("{}").unwrap();
        assert_eq!(phone_from_context(&ctx, &resolver()), None);

        let ctx = MessageContext::from_json(r#"{"key": {}}"#).unwrap();
        assert_eq!(ctx.sender_jid(), None);
    }
}
