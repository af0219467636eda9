//! Out-of-band control events.

use std::fmt;

/// Control event travelling along links next to rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// No more rows will arrive; buffered output must be flushed.
    EndOfStream,
    /// Orderly halt. Rows already emitted stay valid and an `EndOfStream`
    /// follows.
    Stop,
    /// Abandon the run. Buffering nodes drop what they hold.
    Cancel,
}

impl Signal {
    pub const ALL: [Signal; 3] = [Signal::EndOfStream, Signal::Stop, Signal::Cancel];
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Signal::EndOfStream => "END_OF_STREAM",
            Signal::Stop => "STOP",
            Signal::Cancel => "CANCEL",
        };
        f.write_str(name)
    }
}
