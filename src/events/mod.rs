pub mod channel;
pub mod event;

pub use channel::{EventChannel, EventPublisher, EventReceiver};
pub use event::{EventType, SampledEvent};
