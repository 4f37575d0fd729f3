//! 忽略失败的执行辅助。
//!
//! # 教案式说明
//! - **意图（Why）**：批量重放时单条失败不应中断整个批次，也不应把失败抛给调用方。
//! - **逻辑（How）**：以 `catch_unwind` 执行闭包，panic 时返回 `None` 或给定默认值。
//! - **风险提示（Trade-offs）**：闭包以 `AssertUnwindSafe` 包装，调用方需自行保证被打断的闭包不会留下
//!   半更新的共享状态；panic 信息仍会经由全局 panic hook 输出。

use std::panic::{self, AssertUnwindSafe};

/// 执行 `f`，失败时返回 `None`。
pub fn ignore_errors<R, F>(f: F) -> Option<R>
where
    F: FnOnce() -> R,
{
    panic::catch_unwind(AssertUnwindSafe(f)).ok()
}

/// 执行 `f`，失败时返回 `default`。
pub fn ignore_errors_or<R, F>(f: F, default: R) -> R
where
    F: FnOnce() -> R,
{
    ignore_errors(f).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failing() -> i32 {
        panic!("replay target failed")
    }

    #[test]
    fn failure_is_swallowed() {
        assert_eq!(ignore_errors(failing), None);
    }

    #[test]
    fn failure_resolves_to_default() {
        assert_eq!(ignore_errors_or(failing, i32::MAX), i32::MAX);
    }

    #[test]
    fn success_returns_actual_value() {
        assert_eq!(ignore_errors(|| 5), Some(5));
        assert_eq!(ignore_errors_or(|| 5, i32::MAX), 5);
    }
}
