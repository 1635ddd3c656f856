//! 食事する哲学者の問題のシミュレーション。
//!
//! 席と箸を持つ [`Table`] を哲学者 (スレッド) が取り合う。
//! 箸は左右 2 本を 1 つのクリティカルセクションで確保し、片方しか取れなければ戻す。
//! 確保に失敗し続けた哲学者は [`CancellationToken`] を立て、全員が次のループで止まる。

pub mod cancel;
pub mod config;
pub mod error;
pub mod pairing;
pub mod philosopher;
pub mod resource;
pub mod simulation;
pub mod table;
pub mod think;

pub use cancel::CancellationToken;
pub use config::{SimulationConfig, ThinkConfig};
pub use error::{ConfigError, SimulationError};
pub use pairing::ResourcePairing;
pub use philosopher::{AbortReason, Phase, Philosopher, PhilosopherReport};
pub use resource::{adjacent_utensils, SeatClaim, SeatId, UtensilClaim, UtensilId};
pub use simulation::{Simulation, SimulationReport};
pub use table::{Arbiter, StatsSnapshot, Table, TableSnapshot};
pub use think::ThinkTime;
