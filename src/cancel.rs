use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 全哲学者で共有する中断フラグ。false -> true にしか変化しない
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    // このトークンを最初に立てた呼び出しだけが true を返す
    pub fn cancel(&self) -> bool {
        !self.flag.swap(true, Ordering::AcqRel)
    }
}
