//! Login refusal reasons reported in `ConnectionRefused.errors`.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionRefusedReason {
    InvalidSlot,
    InvalidGame,
    IncompatibleVersion,
    InvalidPassword,
    InvalidItemsHandling,
}

impl ConnectionRefusedReason {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "InvalidSlot" => Some(Self::InvalidSlot),
            "InvalidGame" => Some(Self::InvalidGame),
            "IncompatibleVersion" => Some(Self::IncompatibleVersion),
            "InvalidPassword" => Some(Self::InvalidPassword),
            "InvalidItemsHandling" => Some(Self::InvalidItemsHandling),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::InvalidSlot => "InvalidSlot",
            Self::InvalidGame => "InvalidGame",
            Self::IncompatibleVersion => "IncompatibleVersion",
            Self::InvalidPassword => "InvalidPassword",
            Self::InvalidItemsHandling => "InvalidItemsHandling",
        }
    }

    /// Human readable explanation shown to the user.
    pub fn description(self) -> &'static str {
        match self {
            Self::InvalidSlot => "The slot name did not match any slot on the server.",
            Self::InvalidGame => "The slot is set to a different game on the server.",
            Self::IncompatibleVersion => "The client version is not supported by the server.",
            Self::InvalidPassword => "The password is invalid.",
            Self::InvalidItemsHandling => "The item handling flags requested are invalid.",
        }
    }
}

impl fmt::Display for ConnectionRefusedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_roundtrips() {
        for reason in [
            ConnectionRefusedReason::InvalidSlot,
            ConnectionRefusedReason::InvalidGame,
            ConnectionRefusedReason::IncompatibleVersion,
            ConnectionRefusedReason::InvalidPassword,
            ConnectionRefusedReason::InvalidItemsHandling,
        ] {
            assert_eq!(ConnectionRefusedReason::from_code(reason.code()), Some(reason));
        }
        assert_eq!(ConnectionRefusedReason::from_code("Banned"), None);
    }
}
