pub mod decoder;
pub mod fetch;
pub mod frame;
pub mod roster;
pub mod telemetry;

pub use fetch::{CameraSlot, FetchStats, FetchWorker, SweepOutcome};
pub use frame::{DecodedImage, FrameMessage};
pub use roster::{FeedStatus, PollOutcome, RosterHandle, RosterPoller, RosterState};
