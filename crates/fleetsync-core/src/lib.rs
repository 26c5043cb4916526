pub mod clock;
pub mod config;
pub mod cooldown;
pub mod discovery;
pub mod error;
pub mod membership;
pub mod render;
pub mod snapshot;

pub use clock::{Clock, SystemClock, Timestamp};
pub use config::FleetConfig;
pub use cooldown::CooldownGate;
pub use error::{DiscoveryError, FleetError, RenderError, RestartError, Result};
pub use membership::{has_changed, MembershipDelta, MembershipSet};
pub use render::ConfigTemplate;
pub use snapshot::EnvironmentSnapshot;
