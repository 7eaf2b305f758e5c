pub mod bus;
pub mod events;

pub use bus::{Envelope, EventType, CHANNEL_INSTALLER_EVENTS};
pub use events::{normalize_quotes, PayloadError, ProvisionEvent, ProvisionRequest};
