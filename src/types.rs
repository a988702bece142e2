use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Closed set of notification backends.
///
/// - `LocalPrint`: print the report to the local console. Always succeeds,
///   and doubles as the fallback target when a remote delivery fails.
/// - `RemotePush`: POST the report to an HTTP push service.
///
/// Names are matched case-insensitively. `console` and `xxtui` are accepted
/// as aliases so older configuration files keep working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum ChannelKind {
    LocalPrint,
    RemotePush,
}

impl Default for ChannelKind {
    fn default() -> Self {
        ChannelKind::LocalPrint
    }
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::LocalPrint => "local-print",
            ChannelKind::RemotePush => "remote-push",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "local-print" | "console" => Ok(ChannelKind::LocalPrint),
            "remote-push" | "xxtui" => Ok(ChannelKind::RemotePush),
            other => Err(format!(
                "{other} (expected \"local-print\" or \"remote-push\")"
            )),
        }
    }
}

impl TryFrom<String> for ChannelKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
