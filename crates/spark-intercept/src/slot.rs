//! 槽位宿主抽象：以“键 → 值”的可变间接层表示外部对象上的可替换成员。
//!
//! # 设计初衷（Why）
//! - Rust 对象没有运行期可改写的方法表，拦截只能发生在一层显式的间接寻址上：
//!   所有调用点先按键读取槽位，再调用取出的值；
//! - “属性缺失”与“属性存在但值为空”是两个独立维度，宿主必须分别报告存在性与取值。
//!
//! # 契约说明（What）
//! - [`SlotHost`] 使用 `&self` 接收者与内部可变性，宿主由外部持有，拦截器只保存 `Arc` 句柄；
//! - [`SlotTable`] 为默认实现，[`SlotTable::invoke`] 是方法槽位的标准调用入口。
//!
//! # 权衡与注意事项（Trade-offs）
//! - 读取总是克隆值并立即释放锁，调用过程中不持有任何宿主锁，因此调度器可以安全地重入同一张表。

use std::{collections::HashMap, fmt, sync::Arc};

use parking_lot::RwLock;

use crate::error::InterceptError;

/// 存放在槽位中的可调用对象：`A` 为参数元组，`R` 为返回值。
///
/// 失败通过 `R = Result<T, E>` 或 panic 表达，拦截层不改写二者。
pub type Method<A, R> = Arc<dyn Fn(A) -> R + Send + Sync>;

/// 方法槽位表的简写。
pub type MethodTable<A, R> = SlotTable<Method<A, R>>;

/// 将闭包封装为 [`Method`]。
pub fn method<A, R, F>(f: F) -> Method<A, R>
where
    F: Fn(A) -> R + Send + Sync + 'static,
{
    Arc::new(f)
}

/// 外部宿主对象的槽位访问契约。
///
/// # 教案式说明
/// - **意图（Why）**：把“读、判存在、写、删”四个原语抽象出来，使 [`crate::PropertySwap`]
///   无需关心宿主的具体布局。
/// - **契约（What）**：
///   - `slot` 返回当前值的克隆，缺失时为 `None`；
///   - `has_own_slot` 只报告存在性，与值无关；
///   - `set_slot` 在缺失时新建槽位；
///   - `remove_slot` 删除槽位并返回旧值。
/// - **风险提示（Trade-offs）**：实现方不得在回调外长期持锁，否则调度器重入时可能死锁。
pub trait SlotHost<V>: Send + Sync {
    /// 读取槽位当前值。
    fn slot(&self, key: &str) -> Option<V>;

    /// 判断槽位是否存在。
    fn has_own_slot(&self, key: &str) -> bool;

    /// 写入槽位，缺失时新建。
    fn set_slot(&self, key: &str, value: V);

    /// 删除槽位，返回被删除的值。
    fn remove_slot(&self, key: &str) -> Option<V>;
}

/// 基于 `RwLock<HashMap>` 的默认槽位宿主。
pub struct SlotTable<V> {
    slots: RwLock<HashMap<String, V>>,
}

impl<V> SlotTable<V> {
    /// 构造空表。
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// 以构建器风格预置一个槽位。
    pub fn with_slot(self, key: impl Into<String>, value: V) -> Self {
        self.slots.write().insert(key.into(), value);
        self
    }

    /// 当前存在的槽位数量。
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// 表是否为空。
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    /// 按字典序返回全部键。
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.slots.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl<V> Default for SlotTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for SlotTable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotTable")
            .field("keys", &self.keys())
            .finish()
    }
}

impl<V> SlotHost<V> for SlotTable<V>
where
    V: Clone + Send + Sync,
{
    fn slot(&self, key: &str) -> Option<V> {
        self.slots.read().get(key).cloned()
    }

    fn has_own_slot(&self, key: &str) -> bool {
        self.slots.read().contains_key(key)
    }

    fn set_slot(&self, key: &str, value: V) {
        self.slots.write().insert(key.to_owned(), value);
    }

    fn remove_slot(&self, key: &str) -> Option<V> {
        self.slots.write().remove(key)
    }
}

impl<A, R> SlotTable<Method<A, R>> {
    /// 按键调用方法槽位。
    ///
    /// # 教案式说明
    /// - **意图（Why）**：这是宿主侧唯一的调用入口，拦截器替换槽位后，所有经由此处的调用都会进入调度器。
    /// - **逻辑（How）**：先克隆槽位中的 `Arc`，读锁在语句结束时释放，然后再执行调用。
    /// - **契约（What）**：槽位缺失时返回 [`InterceptError::MethodNotFound`]；方法自身的返回值原样透传。
    pub fn invoke(&self, key: &str, args: A) -> Result<R, InterceptError> {
        let target = self
            .slots
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| InterceptError::method_not_found(key))?;
        Ok(target(args))
    }
}
