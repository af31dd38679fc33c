//! Process-wide driver registry.
//!
//! Registration is once per name for the lifetime of the process; there is
//! deliberately no unregister operation. Registered taps are looked up by
//! name on every [`open`] call.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

use tracing::debug;

use crate::client::Client;
use crate::error::{DbTapError, Result};
use crate::tap::Tap;
use crate::traits::DatabaseDriver;

static REGISTRY: LazyLock<RwLock<HashMap<String, Arc<Tap>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Registers `driver` under `name` and returns the tap handle used to
/// configure hooks.
///
/// # Panics
///
/// Panics if `name` is already registered. Use [`try_register`] to get a
/// `Result` instead.
pub fn register(name: &str, driver: impl DatabaseDriver + 'static) -> Arc<Tap> {
    match try_register(name, driver) {
        Ok(tap) => tap,
        Err(e) => panic!("{e}"),
    }
}

/// Registers `driver` under `name`, failing with
/// [`DbTapError::DuplicateDriver`] if the name is taken.
pub fn try_register(name: &str, driver: impl DatabaseDriver + 'static) -> Result<Arc<Tap>> {
    let mut registry = REGISTRY.write().unwrap();
    if registry.contains_key(name) {
        return Err(DbTapError::DuplicateDriver(name.to_string()));
    }
    let tap = Arc::new(Tap::new(name, Box::new(driver)));
    registry.insert(name.to_string(), Arc::clone(&tap));
    debug!(driver = name, "registered driver");
    Ok(tap)
}

/// Looks up a registered tap by name.
pub fn lookup(name: &str) -> Option<Arc<Tap>> {
    REGISTRY.read().unwrap().get(name).cloned()
}

/// Opens a connection through the driver registered under `name` and wraps
/// it in a [`Client`]. The connection string is passed through to the inner
/// driver untouched.
pub async fn open(name: &str, dsn: &str) -> Result<Client> {
    let tap = lookup(name).ok_or_else(|| DbTapError::UnknownDriver(name.to_string()))?;
    let conn = tap.open(dsn).await?;
    Ok(Client::new(conn))
}
