use crate::bookings::BookingStatus;

/// Service for managing booking status transitions
pub struct BookingStatusMachine;

impl BookingStatusMachine {
    /// Check if a status transition is valid
    ///
    /// # Valid Transitions
    /// - Pending → Confirmed, Rejected
    /// - Confirmed → Cancelled, Completed, NoShow
    /// - Cancelled, Rejected, Completed, NoShow → (terminal, nothing)
    ///
    /// Same-status transitions are not valid: repeating a cancellation must
    /// be rejected rather than re-applied.
    pub fn is_valid_transition(from: BookingStatus, to: BookingStatus) -> bool {
        matches!(
            (from, to),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Rejected)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Completed)
                | (BookingStatus::Confirmed, BookingStatus::NoShow)
        )
    }

    /// Attempt to transition from one status to another
    ///
    /// # Returns
    /// `Ok(to)` if the transition is valid, `Err(message)` otherwise
    pub fn transition(from: BookingStatus, to: BookingStatus) -> Result<BookingStatus, String> {
        if Self::is_valid_transition(from, to) {
            Ok(to)
        } else {
            Err(format!("Invalid status transition from {} to {}", from, to))
        }
    }
}
