//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod catalog_seeder;
mod catalog_source;
mod founding_counter_store;
mod identity_provider;
mod payment_confirmation;
mod profile_repository;

#[cfg(test)]
pub use catalog_seeder::MockCatalogSeeder;
pub use catalog_seeder::{CatalogSeedError, CatalogSeeder, FixtureCatalogSeeder};
#[cfg(test)]
pub use catalog_source::MockCatalogSource;
pub use catalog_source::{CatalogFeed, CatalogSource, SyncError};
#[cfg(test)]
pub use founding_counter_store::MockFoundingCounterStore;
pub use founding_counter_store::{CounterStoreError, CounterUpdate, FoundingCounterStore};
#[cfg(test)]
pub use identity_provider::MockIdentityProvider;
pub use identity_provider::{AuthError, IdentityProvider};
#[cfg(test)]
pub use payment_confirmation::MockPaymentConfirmation;
pub use payment_confirmation::{
    FIXTURE_CUSTOMER_REFERENCE, FixturePaymentConfirmation, PaymentConfirmation, PaymentError,
    PaymentReceipt,
};
#[cfg(test)]
pub use profile_repository::MockProfileRepository;
pub use profile_repository::{
    FixtureProfileRepository, ProfileRepository, ProfileRepositoryError,
};
