//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 拦截子系统自身只有一类可诊断错误：目标槽位上不存在可调用的原始方法；
//! - 中间件与拦截函数产生的失败不经过这里，它们通过返回值 `R` 或 panic 原样传递给调用点。
//!
//! ## 设计要求（What）
//! - 错误类型派生 `thiserror::Error`，兼容 `std::error::Error` 与 `?` 传播；
//! - 变体携带槽位键，便于日志与断言定位。

use thiserror::Error;

/// 拦截器错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：`enable` 与 `call_original` 需要一个原始方法才能工作，缺失时必须显式告知调用方，
///   而不是在调度路径上 panic。
/// - **契约 (What)**：所有变体均为 `Send + Sync + 'static`，可克隆、可比较，便于测试断言。
/// - **设计权衡 (Trade-offs)**：调用方误用（例如对未安装的实例调用 `restore`）按静默 no-op 处理，
///   不在此处建模。
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum InterceptError {
    /// 目标对象上没有名为 `key` 的槽位，无法安装调度器或调用原始实现。
    #[error("method `{key}` is not present on the target")]
    MethodNotFound { key: String },
}

impl InterceptError {
    /// 以槽位键构造 [`InterceptError::MethodNotFound`]。
    pub fn method_not_found(key: &str) -> Self {
        InterceptError::MethodNotFound {
            key: key.to_owned(),
        }
    }

    /// 返回与错误关联的槽位键。
    pub fn key(&self) -> &str {
        match self {
            InterceptError::MethodNotFound { key } => key,
        }
    }
}
