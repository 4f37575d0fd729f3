#![deny(unsafe_code)]

//! spark-intercept: 面向外部宿主对象的可逆单方法拦截器。
//!
//! # 教案式概览
//! - **意图（Why）**：在不改写宿主代码的前提下，临时把某个命名方法替换为带观测能力的调度器，
//!   并在受限操作结束后把宿主恢复到替换前的状态。
//! - **结构（How）**：自底向上分为 [`slot`]（槽位宿主抽象）、[`swap`]（单槽可逆替换）、
//!   [`pipeline`]（有序中间件）、[`interceptor`]（状态机与调度算法）、[`adapters`]（前置/后置糖衣）
//!   与 [`loggable`]（请求记录与重放）。
//! - **契约（What）**：每个拦截器只绑定一个 `(target, key)`；`enable`/`disable`/`restore` 幂等，
//!   未调用 `restore` 时宿主保持被替换状态，属于调用方责任。
//! - **风险提示（Trade-offs）**：同一槽位上并存的两个拦截器会互相覆盖恢复基线，本 crate 仅在
//!   `restore` 时检测并告警，不提供槽位独占锁。

pub mod adapters;
pub mod config;
pub mod error;
pub mod interceptor;
pub mod loggable;
pub mod pipeline;
pub mod slot;
pub mod swap;
pub mod util;

pub use adapters::{AfterInvocation, BeforeInvocation, intercept_after, intercept_before};
pub use config::InterceptorConfig;
pub use error::InterceptError;
pub use interceptor::{InterceptorState, MethodInterceptor, OriginalInvoker, RestoreGuard};
pub use loggable::{LoggableMethodInterceptor, ReplaySummary};
pub use pipeline::{
    FnMiddleware, Middleware, MiddlewareDescriptor, MiddlewareOutcome, MiddlewarePipeline,
    PipelineVerdict,
};
pub use slot::{Method, MethodTable, SlotHost, SlotTable, method};
pub use swap::PropertySwap;
pub use util::{ignore_errors, ignore_errors_or};

/// 统一结果别名，错误类型默认为 [`InterceptError`]。
pub type Result<T, E = InterceptError> = core::result::Result<T, E>;
