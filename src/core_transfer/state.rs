use crate::core_transfer::error::TransferError;

/// Lifecycle of one data connection.
///
/// `Idle -> Connecting -> Streaming -> Draining -> Complete`, with `Failed`
/// reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Idle,
    Connecting,
    Streaming,
    Draining,
    Complete,
    Failed,
}

impl TransferState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TransferState::Complete | TransferState::Failed)
    }

    pub fn can_advance_to(self, next: TransferState) -> bool {
        use TransferState::*;
        match (self, next) {
            (Idle, Connecting)
            | (Connecting, Streaming)
            | (Streaming, Draining)
            | (Draining, Complete) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Moves to `next`, rejecting transitions outside the table.
    pub fn advance(&mut self, next: TransferState) -> Result<(), TransferError> {
        if !self.can_advance_to(next) {
            return Err(TransferError::InvalidTransition {
                from: *self,
                to: next,
            });
        }
        *self = next;
        Ok(())
    }
}
