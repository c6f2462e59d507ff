//! Ports the domain exposes for infrastructure to implement.

mod state_store;

pub use state_store::StateStoreRepository;
