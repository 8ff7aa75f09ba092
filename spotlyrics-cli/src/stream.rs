use spotlyrics_core::RequestState;

/// Bookkeeping for stdin mode, where every fetch supersedes the one before
#[derive(Debug, Default)]
pub struct StreamProgress {
    in_flight: bool,
}

impl StreamProgress {
    /// Record the answer to a fetch. A rejection also abandons whatever was in flight.
    pub fn fetched(&mut self, accepted: bool) {
        self.in_flight = accepted;
    }

    /// Record a resolution and return whether its state should be printed.
    ///
    /// The state is read after the resolution was broadcast. If it is busy again a
    /// newer request is already in flight and the resolution is not printed; that
    /// newer request resolves on its own later.
    pub fn resolved(&mut self, state: &RequestState) -> bool {
        if state.busy {
            return false;
        }
        self.in_flight = false;
        true
    }

    #[must_use]
    pub const fn in_flight(&self) -> bool {
        self.in_flight
    }
}
