pub mod queue;

pub use queue::{bounded, FrameReceiver, FrameSender, QueueStats, TryRecvError};
