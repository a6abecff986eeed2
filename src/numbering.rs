use crate::error::Result;
use crate::storage::KeyValueStore;

pub const COUNTER_KEY: &str = "RECEIPT_COUNTER_VALUE";
pub const DEFAULT_PREFIX: &str = "TKR2025";

/// The persisted receipt counter. The stored value is the *next* number to
/// hand out; it only moves forward through [`ReceiptCounter::commit`].
pub struct ReceiptCounter<'s> {
    store: &'s dyn KeyValueStore,
    prefix: String,
}

impl<'s> ReceiptCounter<'s> {
    pub fn new(store: &'s dyn KeyValueStore, prefix: impl Into<String>) -> Self {
        ReceiptCounter {
            store,
            prefix: prefix.into(),
        }
    }

    /// The number the next receipt will get (1 when nothing is stored).
    pub fn peek(&self) -> u32 {
        match self.store.get(COUNTER_KEY) {
            None => 1,
            Some(raw) => raw.trim().parse::<u32>().ok().filter(|n| *n > 0).unwrap_or_else(|| {
                log::warn!("Stored receipt counter {raw:?} is not a positive integer, restarting at 1");
                1
            }),
        }
    }

    /// `PREFIX-NNNN`
    pub fn format(&self, number: u32) -> String {
        format!("{}-{number:04}", self.prefix)
    }

    /// Record that `used` was issued; the next number becomes `used + 1`.
    pub fn commit(&self, used: u32) -> Result<()> {
        let next = used.saturating_add(1);
        self.store.set(COUNTER_KEY, &next.to_string())?;
        log::debug!("Receipt counter advanced to {next}");
        Ok(())
    }
}
