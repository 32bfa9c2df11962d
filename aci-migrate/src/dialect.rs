use std::fmt::{self, Display, Formatter};

use serde::Serialize;

/// Target network operating systems for generated configuration text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Nxos,
    Eos,
    Junos,
    Ios,
}

impl Dialect {
    pub fn display_name(self) -> &'static str {
        match self {
            Dialect::Nxos => "NX-OS",
            Dialect::Eos => "Arista EOS",
            Dialect::Junos => "Junos",
            Dialect::Ios => "Cisco IOS",
        }
    }

    /// Line comment leader.
    pub fn comment(self) -> &'static str {
        match self {
            Dialect::Junos => "#",
            _ => "!",
        }
    }
}

impl Display for Dialect {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Dialect::Nxos => "nxos",
            Dialect::Eos => "eos",
            Dialect::Junos => "junos",
            Dialect::Ios => "ios",
        })
    }
}
