pub mod postgres;
pub mod traits;

pub use postgres::{PostgresEventRepository, PostgresRankingRepository};
pub use traits::{EventRepository, RankingRepository};
