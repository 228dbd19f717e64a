pub mod codec;
pub mod outbox;
pub mod protocol;

pub use codec::{read_frame, FrameError};
pub use outbox::{run_writer, Browser, Outbox};
pub use protocol::{Banner, BrowserCommand, BrowserEvent};
