//! Session keys and the shareable location that carries them.
//!
//! The server assigns a key on the first message of a conversation. The
//! client exposes that key as a `/?chat=KEY` location so a conversation can
//! be resumed later with `logchat --url` or `logchat --chat`. All location
//! updates go through [`SessionLocation::sync`].

use std::fmt;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::utils::url::construct_api_url;

/// Query parameter that carries the session key in a location.
pub const CHAT_QUERY_PARAM: &str = "chat";
/// Base used to resolve relative locations like `/?chat=abc`.
const RELATIVE_ROOT: &str = "http://localhost/";

/// Server-issued identifier correlating a sequence of chat exchanges.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionKey(String);

impl SessionKey {
    /// Returns `None` for empty or whitespace-only input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| "session key must not be empty".to_string())
    }
}

impl From<SessionKey> for String {
    fn from(value: SessionKey) -> Self {
        value.0
    }
}

/// Shareable location of the current conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionLocation {
    key: Option<SessionKey>,
}

impl SessionLocation {
    pub fn from_key(key: Option<SessionKey>) -> Self {
        Self { key }
    }

    /// Reads the session key from a location such as
    /// `http://host/?chat=abc123`, `/?chat=abc123` or `?chat=abc123`.
    ///
    /// A location without a `chat` parameter (or with an empty one) yields a
    /// location with no session.
    pub fn from_url(raw: &str) -> Result<Self, String> {
        let url = match Url::parse(raw) {
            Ok(url) => url,
            Err(_) => Url::parse(RELATIVE_ROOT)
                .and_then(|base| base.join(raw))
                .map_err(|err| format!("invalid location '{raw}': {err}"))?,
        };

        let key = url
            .query_pairs()
            .find(|(name, _)| name == CHAT_QUERY_PARAM)
            .and_then(|(_, value)| SessionKey::parse(&value));

        Ok(Self { key })
    }

    pub fn key(&self) -> Option<&SessionKey> {
        self.key.as_ref()
    }

    /// Points the location at `key`. Returns `true` when the location changed.
    pub fn sync(&mut self, key: Option<&SessionKey>) -> bool {
        if self.key.as_ref() == key {
            return false;
        }
        self.key = key.cloned();
        true
    }

    /// Path form of the location, `/` when there is no session. The key is
    /// form-encoded so any key survives a trip through [`Self::from_url`].
    pub fn path(&self) -> String {
        self.key
            .as_ref()
            .and_then(chat_query)
            .map(|query| format!("/?{query}"))
            .unwrap_or_else(|| "/".to_string())
    }

    pub fn share_url(&self, base_url: &str) -> String {
        construct_api_url(base_url, &self.path())
    }
}

fn chat_query(key: &SessionKey) -> Option<String> {
    let mut url = Url::parse(RELATIVE_ROOT).ok()?;
    url.query_pairs_mut()
        .append_pair(CHAT_QUERY_PARAM, key.as_str());
    url.query().map(str::to_owned)
}
