pub mod cli;
mod environment_name;
mod list;
pub mod prefix;
mod register;
pub mod registry;
pub mod store;
mod unregister;

pub use environment_name::{EnvironmentName, ParseEnvironmentNameError};
pub use prefix::{inspect, MarkerState};
pub use registry::{KnownEnvironment, Registry, RegistryError, UnregisterOutcome};
pub use store::{EnvironmentsFile, InMemoryStore, PrefixStore, StoreError};
