//! Outbound command transport abstraction.

use thiserror::Error;

/// Failure to hand a command to the device link.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The device link is gone.
    #[error("device disconnected")]
    Disconnected,
    /// The link refused the command.
    #[error("command rejected: {0}")]
    Rejected(&'static str),
}

/// Synchronous command sink towards the wheel.
///
/// `send` may block briefly while the link accepts the command; `queued`
/// reports how many accepted commands have not yet reached the device, so
/// the pacer can back off rather than pile up.
pub trait SlotTransport: Send {
    fn send(&mut self, command: &[u8]) -> Result<(), TransportError>;
    fn queued(&self) -> usize;
}

pub mod mock {
    //! In-memory transport for tests, recording every command.

    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::{SlotTransport, TransportError};

    #[derive(Debug, Default)]
    struct MockState {
        writes: Vec<Vec<u8>>,
        backlog: usize,
        fail_next: Option<TransportError>,
    }

    /// Cloneable handle; all clones share one write history.
    #[derive(Debug, Clone, Default)]
    pub struct MockTransport {
        state: Arc<Mutex<MockState>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every command sent so far, oldest first.
        pub fn writes(&self) -> Vec<Vec<u8>> {
            self.state.lock().writes.clone()
        }

        pub fn write_count(&self) -> usize {
            self.state.lock().writes.len()
        }

        /// Pretend `n` commands sit undelivered in the device queue.
        pub fn set_backlog(&self, n: usize) {
            self.state.lock().backlog = n;
        }

        /// Make the next `send` fail with `error`.
        pub fn fail_next(&self, error: TransportError) {
            self.state.lock().fail_next = Some(error);
        }
    }

    impl SlotTransport for MockTransport {
        fn send(&mut self, command: &[u8]) -> Result<(), TransportError> {
            let mut state = self.state.lock();
            if let Some(error) = state.fail_next.take() {
                return Err(error);
            }
            state.writes.push(command.to_vec());
            Ok(())
        }

        fn queued(&self) -> usize {
            self.state.lock().backlog
        }
    }
}
