use std::fmt;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Where in a lifecycle operation the engine is. Labels every error and
/// stage-transition log line.
///
/// Create runs `Ordering -> Confirming -> AwaitingContract ->
/// DrainingTransactions -> PoweringOn -> Settled`, strictly in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Ordering,
    Confirming,
    /// Contract `PENDING -> ACTIVE`.
    AwaitingContract,
    /// No `PENDING`/`COMMENCED` transactions left on the device.
    DrainingTransactions,
    /// Startup issued; waiting for the device to report `ONLINE`.
    PoweringOn,
    /// Final attributes written. **Terminal** for Create.
    Settled,
    /// Cancel transaction issued; waiting for `COMPLETED`.
    Cancelling,
    /// Refreshing order and device attributes.
    Reading,
    UpdatingFirewall,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Ordering => "ordering",
            Stage::Confirming => "confirming",
            Stage::AwaitingContract => "awaiting_contract",
            Stage::DrainingTransactions => "draining_transactions",
            Stage::PoweringOn => "powering_on",
            Stage::Settled => "settled",
            Stage::Cancelling => "cancelling",
            Stage::Reading => "reading",
            Stage::UpdatingFirewall => "updating_firewall",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
