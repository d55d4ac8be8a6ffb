//! Authorization descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which credentials the transport should attach to a request.
///
/// The request pipeline only carries this value. Resolving it into an
/// `Authorization` header is up to the stage that owns the credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AuthType {
    /// Try every credential in turn.
    All,
    /// App key and secret.
    App,
    /// App key and secret, or master secret.
    Basic,
    /// OAuth client credentials.
    Client,
    /// Session if available, otherwise master.
    #[default]
    Default,
    /// App key and master secret.
    Master,
    /// No credentials.
    None,
    /// Active user session.
    Session,
}

impl AuthType {
    /// Name as it appears in configuration.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::All => "All",
            Self::App => "App",
            Self::Basic => "Basic",
            Self::Client => "Client",
            Self::Default => "Default",
            Self::Master => "Master",
            Self::None => "None",
            Self::Session => "Session",
        }
    }

    /// Whether the transport attaches any credentials at all.
    pub const fn requires_credentials(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
