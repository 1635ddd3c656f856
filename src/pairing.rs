use crate::resource::{UtensilClaim, UtensilId};

/// 食事中の哲学者が持つ左右の箸。
/// Table から返されるのは両方そろっているか、両方空かのどちらか
#[derive(Debug, Default)]
pub struct ResourcePairing {
    pub(crate) left: Option<UtensilClaim>,
    pub(crate) right: Option<UtensilClaim>,
}

impl ResourcePairing {
    pub fn empty() -> Self {
        ResourcePairing::default()
    }

    pub(crate) fn complete(left: UtensilClaim, right: UtensilClaim) -> Self {
        ResourcePairing {
            left: Some(left),
            right: Some(right),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.left.is_some() && self.right.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    pub fn left(&self) -> Option<UtensilId> {
        self.left.as_ref().map(UtensilClaim::id)
    }

    pub fn right(&self) -> Option<UtensilId> {
        self.right.as_ref().map(UtensilClaim::id)
    }

    // 解放用に中身を取り出して空にする
    pub(crate) fn take(&mut self) -> (Option<UtensilClaim>, Option<UtensilClaim>) {
        (self.left.take(), self.right.take())
    }
}
