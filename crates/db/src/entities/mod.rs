//! `SeaORM` entity definitions.

pub mod accounts;
pub mod conversion_history;
pub mod transfers;
pub mod users;
