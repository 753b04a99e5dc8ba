//! Role-checked history queries.

use std::sync::Arc;

use fxledger_shared::types::PageResponse;

use super::ledger::HistoryLedger;
use super::types::{ConversionRecord, HistoryFilter, TransferRecord};
use crate::error::LedgerResult;
use crate::users::Principal;

/// Service for reading history on behalf of a principal.
///
/// A principal may always read their own records. Any other scope, including
/// the unrestricted one, requires an administrator.
pub struct HistoryService<H: HistoryLedger> {
    history: Arc<H>,
}

impl<H: HistoryLedger> HistoryService<H> {
    /// Creates a new history service.
    #[must_use]
    pub fn new(history: Arc<H>) -> Self {
        Self { history }
    }

    /// Lists conversions visible to the principal.
    pub async fn conversions(
        &self,
        principal: &Principal,
        filter: HistoryFilter,
    ) -> LedgerResult<PageResponse<ConversionRecord>> {
        Self::authorize(principal, &filter)?;
        self.history.conversions(filter).await
    }

    /// Lists transfers visible to the principal.
    pub async fn transfers(
        &self,
        principal: &Principal,
        filter: HistoryFilter,
    ) -> LedgerResult<PageResponse<TransferRecord>> {
        Self::authorize(principal, &filter)?;
        self.history.transfers(filter).await
    }

    fn authorize(principal: &Principal, filter: &HistoryFilter) -> LedgerResult<()> {
        if filter.user == Some(principal.user_id) {
            principal.ensure_active()
        } else {
            principal.ensure_superuser()
        }
    }
}
