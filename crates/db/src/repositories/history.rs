//! History repository: append-only conversion and transfer records.

use fxledger_core::LedgerResult;
use fxledger_core::history::{ConversionRecord, HistoryFilter, HistoryLedger, LedgerEntry, TransferRecord};
use fxledger_shared::types::PageResponse;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::entities::{conversion_history, transfers};
use crate::mapping::db_error;

/// Postgres-backed history ledger.
#[derive(Debug, Clone)]
pub struct HistoryRepository {
    db: DatabaseConnection,
}

impl HistoryRepository {
    /// Creates a new history repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Appends a committed entry. Must run inside the movement's transaction.
pub(crate) async fn insert_entry<C: ConnectionTrait>(conn: &C, entry: &LedgerEntry) -> LedgerResult<()> {
    match entry {
        LedgerEntry::Conversion(record) => {
            conversion_history::ActiveModel {
                id: Set(record.id.into_inner()),
                user_id: Set(record.user_id.into_inner()),
                currency_from: Set(record.currency_from.to_string()),
                currency_to: Set(record.currency_to.to_string()),
                value_from: Set(record.value_from),
                value_to: Set(record.value_to),
                created_at: Set(record.created_at.into()),
            }
            .insert(conn)
            .await
            .map_err(db_error)?;
        }
        LedgerEntry::Transfer(record) => {
            transfers::ActiveModel {
                id: Set(record.id.into_inner()),
                from_user: Set(record.from_user.into_inner()),
                to_user: Set(record.to_user.into_inner()),
                currency: Set(record.currency.to_string()),
                amount: Set(record.amount),
                created_at: Set(record.created_at.into()),
            }
            .insert(conn)
            .await
            .map_err(db_error)?;
        }
    }
    Ok(())
}

impl HistoryLedger for HistoryRepository {
    async fn conversions(
        &self,
        filter: HistoryFilter,
    ) -> LedgerResult<PageResponse<ConversionRecord>> {
        let mut query = conversion_history::Entity::find();
        if let Some(user) = filter.user {
            query = query.filter(conversion_history::Column::UserId.eq(user.into_inner()));
        }

        let total = query.clone().count(&self.db).await.map_err(db_error)?;
        let rows = query
            .order_by_desc(conversion_history::Column::CreatedAt)
            .order_by_desc(conversion_history::Column::Id)
            .offset(filter.page.offset())
            .limit(filter.page.limit())
            .all(&self.db)
            .await
            .map_err(db_error)?;

        let data = rows
            .into_iter()
            .map(ConversionRecord::try_from)
            .collect::<LedgerResult<Vec<_>>>()?;
        Ok(PageResponse::new(data, filter.page, total))
    }

    async fn transfers(&self, filter: HistoryFilter) -> LedgerResult<PageResponse<TransferRecord>> {
        let mut query = transfers::Entity::find();
        if let Some(user) = filter.user {
            query = query.filter(
                Condition::any()
                    .add(transfers::Column::FromUser.eq(user.into_inner()))
                    .add(transfers::Column::ToUser.eq(user.into_inner())),
            );
        }

        let total = query.clone().count(&self.db).await.map_err(db_error)?;
        let rows = query
            .order_by_desc(transfers::Column::CreatedAt)
            .order_by_desc(transfers::Column::Id)
            .offset(filter.page.offset())
            .limit(filter.page.limit())
            .all(&self.db)
            .await
            .map_err(db_error)?;

        let data = rows
            .into_iter()
            .map(TransferRecord::try_from)
            .collect::<LedgerResult<Vec<_>>>()?;
        Ok(PageResponse::new(data, filter.page, total))
    }
}
