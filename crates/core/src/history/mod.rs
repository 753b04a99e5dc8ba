//! Append-only conversion and transfer history.

mod ledger;
mod service;
mod types;

pub use ledger::HistoryLedger;
pub use service::HistoryService;
pub use types::{
    ConversionRecord, HistoryFilter, LedgerEntry, LedgerRecord, NewConversion, NewTransfer,
    TransferRecord,
};
