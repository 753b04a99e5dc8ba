//! History query trait.

use fxledger_shared::types::PageResponse;

use super::types::{ConversionRecord, HistoryFilter, TransferRecord};
use crate::error::LedgerResult;

/// Read side of the append-only history.
///
/// Records are appended only by `AccountStore::commit_movement`, in the same
/// atomic unit as the balance changes they describe. There is no update or
/// delete.
pub trait HistoryLedger: Send + Sync {
    /// Conversions matching the filter, newest first.
    fn conversions(
        &self,
        filter: HistoryFilter,
    ) -> impl std::future::Future<Output = LedgerResult<PageResponse<ConversionRecord>>> + Send;

    /// Transfers sent or received by the filtered user, newest first.
    fn transfers(
        &self,
        filter: HistoryFilter,
    ) -> impl std::future::Future<Output = LedgerResult<PageResponse<TransferRecord>>> + Send;
}
