//! Port for the one-time catalog bootstrap.

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised by catalog seeders.
    pub enum CatalogSeedError {
        /// Writing the starter entries failed.
        Write { message: String } as ServiceUnavailable => "catalog seed failed: {message}",
    }
}

/// Writes starter entries into an empty catalog.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogSeeder: Send + Sync {
    /// Seed the catalog, returning how many entries were written.
    async fn seed(&self) -> Result<usize, CatalogSeedError>;
}

/// Seeder that writes nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureCatalogSeeder;

#[async_trait]
impl CatalogSeeder for FixtureCatalogSeeder {
    async fn seed(&self) -> Result<usize, CatalogSeedError> {
        Ok(0)
    }
}
