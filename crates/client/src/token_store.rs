//! In-memory token custody
//!
//! Tokens live only as long as the [`TokenStore`] that holds them; nothing is
//! written to disk. Clones of a store share the same slot, so a store created
//! at session start can be handed to every component of that session.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Access/refresh credential pair
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl TokenPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

/// Holder of the current session's token pair, if any
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    pair: Arc<RwLock<Option<TokenPair>>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored pair
    pub fn set(&self, access: impl Into<String>, refresh: impl Into<String>) {
        self.set_pair(TokenPair::new(access, refresh));
    }

    pub fn set_pair(&self, pair: TokenPair) {
        *self.pair.write().unwrap_or_else(PoisonError::into_inner) = Some(pair);
    }

    /// Discard both tokens
    pub fn clear(&self) {
        *self.pair.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Store `pair` only if the session still holds `expected_refresh`
    ///
    /// Returns `false` when the session was cleared or replaced in the
    /// meantime, leaving the store untouched.
    pub fn replace_if_refresh(&self, expected_refresh: &str, pair: TokenPair) -> bool {
        let mut slot = self.pair.write().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|current| current.refresh == expected_refresh) {
            *slot = Some(pair);
            true
        } else {
            false
        }
    }

    /// Clear the store only if it still holds `expected_refresh`
    pub fn clear_if_refresh(&self, expected_refresh: &str) -> bool {
        let mut slot = self.pair.write().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|current| current.refresh == expected_refresh) {
            *slot = None;
            true
        } else {
            false
        }
    }

    /// Current access token
    pub fn get(&self) -> Option<String> {
        self.read(|pair| pair.access.clone())
            .filter(|token| !token.is_empty())
    }

    /// Current refresh token; an empty string counts as absent
    pub fn refresh_token(&self) -> Option<String> {
        self.read(|pair| pair.refresh.clone())
            .filter(|token| !token.is_empty())
    }

    pub fn pair(&self) -> Option<TokenPair> {
        self.read(TokenPair::clone)
    }

    pub fn is_authenticated(&self) -> bool {
        self.get().is_some()
    }

    fn read<T>(&self, f: impl FnOnce(&TokenPair) -> T) -> Option<T> {
        self.pair
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(f)
    }
}
