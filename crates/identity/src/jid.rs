//! JID encoding classification.
//!
//! A stored identity value is either a bare phone number (canonical) or a
//! network-encoded `<user>@<server>` string. The server part decides how the
//! user part is turned into a phone number.

/// Separator between the user part and the server marker.
pub const SEPARATOR: char = '@';

/// Server marker for locally-scoped identifiers.
pub const LID_SERVER: &str = "lid";

/// Server marker for standard phone-number JIDs.
pub const PHONE_SERVER: &str = "s.whatsapp.net";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JidKind<'a> {
    /// `<lid>@lid`, requires a mapping lookup.
    Lid,
    /// `<phone>@s.whatsapp.net`, the user part is already a phone number.
    PhoneNumber,
    /// Any other `@server` suffix. Stripped like a phone JID.
    Other(&'a str),
    /// No suffix at all.
    Bare,
}

/// A classified identity value, borrowing from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jid<'a> {
    pub user: &'a str,
    pub kind: JidKind<'a>,
}

impl<'a> Jid<'a> {
    /// The server is the text after the last separator, the user the text
    /// before the first, so `a@b@lid` is a LID with user `a`.
    pub fn parse(value: &'a str) -> Self {
        let (Some((user, _)), Some((_, server))) =
            (value.split_once(SEPARATOR), value.rsplit_once(SEPARATOR))
        else {
            return Jid { user: value, kind: JidKind::Bare };
        };
        let kind = match server {
            LID_SERVER => JidKind::Lid,
            PHONE_SERVER => JidKind::PhoneNumber,
            other => JidKind::Other(other),
        };
        Jid { user, kind }
    }

    pub fn is_lid(&self) -> bool {
        self.kind == JidKind::Lid
    }
}

/// True when the value carries no encoding suffix.
pub fn is_canonical(value: &str) -> bool {
    !value.contains(SEPARATOR)
}

pub fn is_lid(value: &str) -> bool {
    Jid::parse(value).is_lid()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_lid() {
        let jid = Jid::parse("221582278529209@lid");
        assert_eq!(jid.user, "221582278529209");
        assert_eq!(jid.kind, JidKind::Lid);
        assert!(jid.is_lid());
    }

    #[test]
    fn classify_phone() {
        let jid = Jid::parse("573001234567@s.whatsapp.net");
        assert_eq!(jid.user, "573001234567");
        assert_eq!(jid.kind, JidKind::PhoneNumber);
    }

    #[test]
    fn classify_other_server() {
        let jid = Jid::parse("120363025@g.us");
        assert_eq!(jid.user, "120363025");
        assert_eq!(jid.kind, JidKind::Other("g.us"));
    }

    #[test]
    fn classify_bare() {
        let jid = Jid::parse("15551234567");
        assert_eq!(jid.user, "15551234567");
        assert_eq!(jid.kind, JidKind::Bare);
        assert!(is_canonical("15551234567"));
        assert!(is_canonical(""));
        assert!(!is_canonical("1@lid"));
    }

    #[test]
    fn lid_marker_must_be_exact() {
        // "@lidx" is not a LID, just an unknown server.
        assert!(!is_lid("123@lidx"));
        assert!(is_lid("123@lid"));
    }

    #[test]
    fn classify_by_last_server_marker() {
        let jid = Jid::parse("201234@b@lid");
        assert_eq!(jid.kind, JidKind::Lid);
        assert_eq!(jid.user, "201234");

        let jid = Jid::parse("5730@lid@s.whatsapp.net");
        assert_eq!(jid.kind, JidKind::PhoneNumber);
        assert_eq!(jid.user, "5730");
        assert!(is_canonical(jid.user));
    }
}
