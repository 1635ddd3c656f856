use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::pairing::ResourcePairing;
use crate::resource::{adjacent_utensils, ResourcePool, SeatClaim, SeatId, UtensilClaim};

// 確保トークンがどのテーブルのものかを判別するための通し番号
static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(1);

/// 席と箸の確保・解放を仲裁するもの。
/// 哲学者はこの trait 越しにしか資源を触らない
pub trait Arbiter {
    /// 空いている最初の席を確保する。満席なら None (待たない)
    fn acquire_seat(&self) -> Option<SeatClaim>;

    fn release_seat(&self, seat: SeatClaim);

    /// 席に隣接する左右の箸を一度に確保する。
    /// 片方でも取れなければ、この呼び出しで取ったものを戻して空のペアを返す
    fn acquire_adjacent_utensils(&self, seat: SeatId) -> ResourcePairing;

    fn release_utensils(&self, pairing: ResourcePairing);
}

#[derive(Debug, Default)]
pub struct TableStats {
    seat_claims: AtomicU64,
    pairings: AtomicU64,
    rollbacks: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub seat_claims: u64,
    pub pairings: u64,
    // 片方だけ取れて戻した回数
    pub rollbacks: u64,
}

impl TableStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            seat_claims: self.seat_claims.load(Ordering::Relaxed),
            pairings: self.pairings.load(Ordering::Relaxed),
            rollbacks: self.rollbacks.load(Ordering::Relaxed),
        }
    }
}

// 席と箸の使用状況。2 つのロックを順に取るので、両者の間は同時刻ではない
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSnapshot {
    pub seats: Vec<bool>,
    pub utensils: Vec<bool>,
}

impl TableSnapshot {
    pub fn utensils_held(&self) -> usize {
        self.utensils.iter().filter(|t| **t).count()
    }

    pub fn seats_occupied(&self) -> usize {
        self.seats.iter().filter(|t| **t).count()
    }
}

#[derive(Debug)]
struct TableInner {
    id: u64,
    len: usize,
    // 席と箸は別々のロックで守る。席待ちが箸の確保を止めないように
    seats: Mutex<ResourcePool>,
    utensils: Mutex<ResourcePool>,
    stats: TableStats,
}

#[derive(Debug, Clone)]
pub struct Table {
    inner: Arc<TableInner>,
}

impl Table {
    /// 席と箸をそれぞれ `len` 個持つテーブル
    pub fn new(len: usize) -> Self {
        // 1 席だと左右の箸が同じになって誰も食べられない
        assert!(len >= 2);

        Table {
            inner: Arc::new(TableInner {
                id: NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed),
                len,
                seats: Mutex::new(ResourcePool::new(len)),
                utensils: Mutex::new(ResourcePool::new(len)),
                stats: TableStats::default(),
            }),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    pub fn snapshot(&self) -> TableSnapshot {
        let seats = self.inner.seats.lock().flags();
        let utensils = self.inner.utensils.lock().flags();
        TableSnapshot { seats, utensils }
    }

    fn check_owner(&self, table: u64) {
        assert_eq!(
            table, self.inner.id,
            "claim token belongs to another table"
        );
    }
}

impl Arbiter for Table {
    fn acquire_seat(&self) -> Option<SeatClaim> {
        let id = self.inner.seats.lock().claim_first_free()?;
        self.inner.stats.seat_claims.fetch_add(1, Ordering::Relaxed);
        trace!(seat = id, "seat claimed");

        Some(SeatClaim {
            table: self.inner.id,
            id: SeatId(id),
        })
    }

    fn release_seat(&self, seat: SeatClaim) {
        self.check_owner(seat.table);
        self.inner.seats.lock().release(seat.id.0);
        trace!(seat = seat.id.0, "seat released");
    }

    fn acquire_adjacent_utensils(&self, seat: SeatId) -> ResourcePairing {
        let (left, right) = adjacent_utensils(seat, self.inner.len);

        // 左右の確認と確保は 1 つのクリティカルセクションで行う
        let mut utensils = self.inner.utensils.lock();
        let got_left = utensils.try_claim(left.0);
        let got_right = utensils.try_claim(right.0);

        if got_left && got_right {
            drop(utensils);
            self.inner.stats.pairings.fetch_add(1, Ordering::Relaxed);
            trace!(seat = seat.0, left = left.0, right = right.0, "utensils claimed");

            return ResourcePairing::complete(
                UtensilClaim {
                    table: self.inner.id,
                    id: left,
                },
                UtensilClaim {
                    table: self.inner.id,
                    id: right,
                },
            );
        }

        // 片方しか取れなかったので戻す
        if got_left {
            utensils.release(left.0);
        }
        if got_right {
            utensils.release(right.0);
        }
        drop(utensils);

        if got_left || got_right {
            self.inner.stats.rollbacks.fetch_add(1, Ordering::Relaxed);
        }
        ResourcePairing::empty()
    }

    fn release_utensils(&self, mut pairing: ResourcePairing) {
        let (left, right) = pairing.take();

        let mut utensils = self.inner.utensils.lock();
        for claim in left.into_iter().chain(right) {
            self.check_owner(claim.table);
            utensils.release(claim.id.0);
        }
    }
}
