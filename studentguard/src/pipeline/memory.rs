//! Form state that a session reset wipes.

/// A value tagged with the reset generation it was recorded under.
///
/// Reads pass the session's current reset generation; once a reset has been
/// dispatched the generations differ and the value reads as absent.
#[derive(Debug, Clone)]
pub(crate) struct ResetScoped<T> {
    entry: Option<(u64, T)>,
}

impl<T> ResetScoped<T> {
    pub(crate) const fn new() -> Self {
        Self { entry: None }
    }

    pub(crate) fn set(&mut self, epoch: u64, value: T) {
        self.entry = Some((epoch, value));
    }

    pub(crate) fn get(&self, epoch: u64) -> Option<&T> {
        self.entry
            .as_ref()
            .filter(|(recorded, _)| *recorded == epoch)
            .map(|(_, value)| value)
    }

    pub(crate) fn clear(&mut self) {
        self.entry = None;
    }
}
