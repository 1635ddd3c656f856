use std::fmt;

// 席 ID (1 始まり)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeatId(pub usize);

// 箸 ID (1 始まり)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtensilId(pub usize);

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UtensilId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 席 `seat` に隣接する (左, 右) の箸。
/// 席 i は箸 i-1 (1 の場合は n に巻き戻る) と箸 i を使う
pub fn adjacent_utensils(seat: SeatId, n: usize) -> (UtensilId, UtensilId) {
    assert!(seat.0 >= 1 && seat.0 <= n);

    let left = if seat.0 == 1 { n } else { seat.0 - 1 };
    (UtensilId(left), UtensilId(seat.0))
}

// 席を確保していることの証明。Clone できないので二重解放はできない
#[derive(Debug, PartialEq, Eq)]
pub struct SeatClaim {
    pub(crate) table: u64,
    pub(crate) id: SeatId,
}

impl SeatClaim {
    pub fn id(&self) -> SeatId {
        self.id
    }
}

// 箸を確保していることの証明
#[derive(Debug, PartialEq, Eq)]
pub struct UtensilClaim {
    pub(crate) table: u64,
    pub(crate) id: UtensilId,
}

impl UtensilClaim {
    pub fn id(&self) -> UtensilId {
        self.id
    }
}

// 固定長のリソース置き場。taken[i] は ID i+1 のリソースが使用中かどうか
// 排他制御は呼び出し側 (Table) の Mutex で行う
#[derive(Debug)]
pub struct ResourcePool {
    taken: Vec<bool>,
}

impl ResourcePool {
    pub fn new(len: usize) -> Self {
        ResourcePool {
            taken: vec![false; len],
        }
    }

    pub fn is_taken(&self, id: usize) -> bool {
        self.taken[id - 1]
    }

    // 最初に見つかった空きを確保して、その ID を返す
    pub fn claim_first_free(&mut self) -> Option<usize> {
        let idx = self.taken.iter().position(|t| !*t)?;
        self.taken[idx] = true;
        Some(idx + 1)
    }

    // 空いていれば確保する
    pub fn try_claim(&mut self, id: usize) -> bool {
        let slot = &mut self.taken[id - 1];
        if *slot {
            return false;
        }
        *slot = true;
        true
    }

    // 確保されていないものを解放するのは呼び出し側のバグ
    pub fn release(&mut self, id: usize) {
        let slot = &mut self.taken[id - 1];
        assert!(*slot, "releasing resource {id} which is not taken");
        *slot = false;
    }

    pub fn flags(&self) -> Vec<bool> {
        self.taken.clone()
    }

    pub fn count_taken(&self) -> usize {
        self.taken.iter().filter(|t| **t).count()
    }
}
