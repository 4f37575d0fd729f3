//! 前置/后置调用适配器。
//!
//! 两个函数都只是把单一用途的回调包装成符合拦截函数签名的闭包，不持有额外状态。

use crate::interceptor::OriginalInvoker;

/// 后置回调的裁决。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AfterInvocation<R> {
    /// 返回原始实现的结果。
    KeepOriginal,
    /// 以新值替换原始结果。
    Replace(R),
}

/// 前置回调的裁决。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BeforeInvocation<R> {
    /// 继续调用原始实现并返回其结果。
    Continue,
    /// 以该值作为最终结果，原始实现不会被调用。
    Return(R),
}

/// 先调用原始实现，再把 `(结果, 参数)` 交给回调决定最终返回值。
///
/// # 契约（What）
/// - 原始实现总是先于回调执行，且恰好执行一次；
/// - 回调返回 [`AfterInvocation::KeepOriginal`] 时原样返回原始结果；
/// - 参数在交给原始实现前克隆一份供回调观察，因此要求 `A: Clone`。
pub fn intercept_after<A, R, F>(
    callback: F,
) -> impl Fn(&OriginalInvoker<A, R>, A) -> R + Send + Sync + 'static
where
    A: Clone + 'static,
    R: 'static,
    F: Fn(&R, &A) -> AfterInvocation<R> + Send + Sync + 'static,
{
    move |invoker: &OriginalInvoker<A, R>, args: A| {
        let result = invoker.invoke(args.clone());
        match callback(&result, &args) {
            AfterInvocation::KeepOriginal => result,
            AfterInvocation::Replace(replacement) => replacement,
        }
    }
}

/// 先把参数交给回调；回调返回 [`BeforeInvocation::Continue`] 时才调用原始实现。
pub fn intercept_before<A, R, F>(
    callback: F,
) -> impl Fn(&OriginalInvoker<A, R>, A) -> R + Send + Sync + 'static
where
    A: 'static,
    R: 'static,
    F: Fn(&A) -> BeforeInvocation<R> + Send + Sync + 'static,
{
    move |invoker: &OriginalInvoker<A, R>, args: A| match callback(&args) {
        BeforeInvocation::Return(value) => value,
        BeforeInvocation::Continue => invoker.invoke(args),
    }
}
