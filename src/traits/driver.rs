use async_trait::async_trait;

use crate::error::Result;
use crate::traits::DriverConnection;

/// Trait for database driver implementations.
/// Drivers are responsible for:
/// - Opening connections from a driver-specific connection string
/// - Converting [`crate::types::SqlValue`] parameters to native types
/// - Declaring, via the [`DriverConnection`] constructors, which optional
///   capabilities each opened connection supports
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Open a new connection. The connection string format is entirely owned
    /// by the driver; the layers above pass it through untouched.
    async fn open(&self, dsn: &str) -> Result<DriverConnection>;
}
