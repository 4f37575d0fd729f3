//! 单槽位可逆替换。
//!
//! # 教案式说明
//! - **意图（Why）**：拦截器需要“换上调度器、之后原样换回”的能力，且换回时要区分
//!   “原本不存在”与“原本存在但为空”。
//! - **逻辑（How）**：仅在进入替换态的那一次记录 `was_defined` 与原值；替换态下的重复 `swap`
//!   只改写槽位，不刷新基线。`restore` 按基线写回或删除槽位。
//! - **契约（What）**：无论中途调用多少次 `swap`，`restore` 都回到本轮首次 `swap` 之前的状态；
//!   未替换时 `restore` 为 no-op。

use std::{borrow::Cow, fmt, sync::Arc};

use crate::slot::SlotHost;

/// 对外部宿主上一个槽位的可逆替换。
pub struct PropertySwap<T: ?Sized, V> {
    target: Arc<T>,
    key: Cow<'static, str>,
    original: Option<V>,
    was_defined: bool,
    swapped: bool,
}

impl<T, V> PropertySwap<T, V>
where
    T: SlotHost<V> + ?Sized,
    V: Clone,
{
    /// 绑定 `(target, key)`，并以当前值作为临时基线。
    ///
    /// 临时基线让 [`Self::original_value`] 在首次替换前也能给出结果；真正的基线在首次 `swap` 时重新采集。
    pub fn new(target: Arc<T>, key: impl Into<Cow<'static, str>>) -> Self {
        let key = key.into();
        let original = target.slot(&key);
        Self {
            target,
            key,
            original,
            was_defined: false,
            swapped: false,
        }
    }

    /// 写入新值；若尚未处于替换态，先记录存在性与原值。
    pub fn swap(&mut self, value: V) {
        if !self.swapped {
            self.was_defined = self.target.has_own_slot(&self.key);
            self.original = self.target.slot(&self.key);
            self.swapped = true;
        }
        self.target.set_slot(&self.key, value);
    }

    /// 回到首次替换前的状态。
    pub fn restore(&mut self) {
        if !self.swapped {
            return;
        }
        match (self.was_defined, self.original.clone()) {
            (true, Some(original)) => self.target.set_slot(&self.key, original),
            _ => {
                self.target.remove_slot(&self.key);
            }
        }
        self.swapped = false;
    }

    /// 槽位当前值（实时读取宿主）。
    pub fn value(&self) -> Option<V> {
        self.target.slot(&self.key)
    }

    /// 记录的基线值。
    pub fn original_value(&self) -> Option<&V> {
        self.original.as_ref()
    }

    /// 首次替换时槽位是否存在。
    pub fn was_defined(&self) -> bool {
        self.was_defined
    }

    /// 被替换槽位所在的宿主。
    pub fn target(&self) -> &Arc<T> {
        &self.target
    }

    /// 槽位键名。
    pub fn key(&self) -> &str {
        &self.key
    }

    /// 当前是否处于替换态。
    pub fn is_swapped(&self) -> bool {
        self.swapped
    }
}

impl<T: ?Sized, V> fmt::Debug for PropertySwap<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertySwap")
            .field("key", &self.key)
            .field("was_defined", &self.was_defined)
            .field("swapped", &self.swapped)
            .field("has_original", &self.original.is_some())
            .finish()
    }
}
