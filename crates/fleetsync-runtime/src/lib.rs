pub mod directory;
pub mod materialize;
pub mod process;
pub mod reconcile;
pub mod testing;

pub use directory::{DirectoryEnv, FleetDirectory, PeerDirectory};
pub use materialize::ConfigMaterializer;
pub use process::{PidofController, ProcessController, RestartOutcome};
pub use reconcile::{Components, CycleOutcome, ReconcileConfig, ReconcileLoop, ReconciliationState};
