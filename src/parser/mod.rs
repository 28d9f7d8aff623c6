//! Parser Module
//!
//! calamineを使用した名簿（Excel）解析の実装。

mod roster;

pub(crate) use roster::RosterParser;
pub use roster::{ID_HEADER, NAME_HEADER};
