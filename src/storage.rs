//! Local key/value persistence
//!
//! The cart is kept as one JSON document under [`CART_KEY`]; the session
//! token and the post-login destination live beside it.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::warn;

use crate::domain::aggregates::Cart;

pub const CART_KEY: &str = "cart";
pub const AUTH_TOKEN_KEY: &str = "auth_token";
pub const REDIRECT_URL_KEY: &str = "redirect_url";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// String key/value store with local-storage semantics.
pub trait KeyValueStore: Send + Sync + fmt::Debug {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().unwrap_or_else(PoisonError::into_inner).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).remove(key);
        Ok(())
    }
}

/// One file per key under a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }
        Ok(self.dir.join(key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)?) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Cart-aware view over a [`KeyValueStore`].
#[derive(Debug, Clone)]
pub struct LocalCartStore {
    store: Arc<dyn KeyValueStore>,
}

impl LocalCartStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self { Self { store } }

    /// Loads the persisted cart. Missing, unreadable or malformed state
    /// yields an empty cart.
    pub fn load_cart(&self) -> Cart {
        let raw = match self.store.get(CART_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Cart::new(),
            Err(e) => {
                warn!(error = %e, "could not read persisted cart");
                return Cart::new();
            }
        };
        let parsed = match serde_json::from_str::<Cart>(&raw) {
            Ok(cart) => cart,
            Err(e) => {
                warn!(error = %e, "persisted cart is not valid JSON, starting empty");
                return Cart::new();
            }
        };
        Cart::restore(parsed).unwrap_or_else(|e| {
            warn!(error = %e, "persisted cart failed shape check, starting empty");
            Cart::new()
        })
    }

    pub fn save_cart(&self, cart: &Cart) -> Result<(), StorageError> {
        self.store.set(CART_KEY, &serde_json::to_string(cart)?)
    }

    /// The bearer token of the current session. An empty token counts as none.
    pub fn auth_token(&self) -> Option<String> {
        match self.store.get(AUTH_TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.trim().is_empty()),
            Err(e) => {
                warn!(error = %e, "could not read auth token");
                None
            }
        }
    }

    pub fn set_auth_token(&self, token: &str) -> Result<(), StorageError> { self.store.set(AUTH_TOKEN_KEY, token) }
    pub fn clear_auth_token(&self) -> Result<(), StorageError> { self.store.remove(AUTH_TOKEN_KEY) }

    pub fn set_redirect_url(&self, url: &str) -> Result<(), StorageError> { self.store.set(REDIRECT_URL_KEY, url) }
    pub fn redirect_url(&self) -> Result<Option<String>, StorageError> { self.store.get(REDIRECT_URL_KEY) }
}
