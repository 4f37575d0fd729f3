//! 方法拦截器：状态机与调度算法。
//!
//! # 教案式概览
//! - **意图（Why）**：在外部宿主的一个方法槽位上安装调度器，使调用先经过中间件管线，再交给用户提供的
//!   拦截函数；拦截函数持有原始实现的句柄，自行决定是否、何时、如何调用它。
//! - **状态（What）**：`Uninstalled`、`InstalledDisabled`、`InstalledEnabled` 三态。
//!   - `enable`：置位启用标记；未安装时通过 [`PropertySwap`] 装入调度器；
//!   - `disable`：清除启用标记，调度器保留在槽位中并退化为纯透传；
//!   - `restore`：无论启用与否都移除调度器。
//! - **调度（How）**：
//!   1. 未启用时直接转发给原始实现，绕过管线与拦截函数；
//!   2. 启用时依序执行中间件；
//!   3. 任一中间件短路则立即返回其结果；
//!   4. 否则以最终参数调用拦截函数，并传入绑定原始实现的 [`OriginalInvoker`]。
//! - **重入（Trade-offs）**：调用期间不持有任何锁；[`OriginalInvoker`] 始终绕过调度器，
//!   因此拦截函数内部递归调用原始实现不会重新进入本调度器。

use std::{
    borrow::Cow,
    fmt,
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, Ordering},
    },
};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::{
    config::InterceptorConfig,
    error::InterceptError,
    pipeline::{
        FnMiddleware, Middleware, MiddlewareDescriptor, MiddlewareOutcome, MiddlewarePipeline,
        PipelineVerdict,
    },
    slot::{Method, SlotHost},
    swap::PropertySwap,
};

type InterceptionFn<A, R> = Arc<dyn Fn(&OriginalInvoker<A, R>, A) -> R + Send + Sync>;

/// 指向替换前原始实现的句柄。
///
/// 调用它永远不会经过调度器；克隆只增加引用计数。
pub struct OriginalInvoker<A, R> {
    method: Method<A, R>,
}

impl<A, R> OriginalInvoker<A, R> {
    pub fn new(method: Method<A, R>) -> Self {
        Self { method }
    }

    /// 以给定参数调用原始实现。
    pub fn invoke(&self, args: A) -> R {
        (self.method)(args)
    }

    /// 原始实现本身。
    pub fn method(&self) -> &Method<A, R> {
        &self.method
    }
}

impl<A, R> Clone for OriginalInvoker<A, R> {
    fn clone(&self) -> Self {
        Self {
            method: Arc::clone(&self.method),
        }
    }
}

impl<A, R> fmt::Debug for OriginalInvoker<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OriginalInvoker").finish_non_exhaustive()
    }
}

/// 拦截器对外可观测的状态。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterceptorState {
    Uninstalled,
    InstalledDisabled,
    InstalledEnabled,
}

struct Installation<T: ?Sized, A, R> {
    swap: PropertySwap<T, Method<A, R>>,
    // 当前装入槽位的调度器，用于 restore 时识别他方覆盖。
    dispatcher: Option<Method<A, R>>,
}

struct Shared<T: ?Sized, A, R> {
    key: Cow<'static, str>,
    target: Arc<T>,
    config: InterceptorConfig,
    enabled: AtomicBool,
    installation: Mutex<Installation<T, A, R>>,
    pipeline: MiddlewarePipeline<A, R>,
    interception: InterceptionFn<A, R>,
}

impl<T: ?Sized, A, R> Shared<T, A, R> {
    fn dispatch(&self, original: &Method<A, R>, args: A) -> R {
        if !self.enabled.load(Ordering::Acquire) {
            trace!(
                label = %self.config.label,
                key = %self.key,
                "interceptor disabled, forwarding to original"
            );
            return original(args);
        }

        let args = match self.pipeline.run(args) {
            PipelineVerdict::Proceed(args) => args,
            PipelineVerdict::ShortCircuit(output) => return output,
        };

        trace!(
            label = %self.config.label,
            key = %self.key,
            "dispatching to interception function"
        );
        let invoker = OriginalInvoker::new(Arc::clone(original));
        (self.interception)(&invoker, args)
    }
}

/// 绑定单个 `(target, key)` 的方法拦截器。
///
/// # 教案式说明
/// - **意图（Why）**：提供“构造 → enable → 受限操作 → restore”的调用协议，把对外部对象的改动限定在
///   调用方可控的窗口内。
/// - **结构（How）**：句柄持有 `Arc<Shared>`；槽位中的调度器只持有 `Weak<Shared>` 与原始实现，
///   句柄被丢弃后调度器自动退化为透传，不形成引用环。
/// - **契约（What）**：
///   - `enable`/`disable`/`restore` 幂等，可乱序、重复调用；
///   - `enable` 在槽位缺失时返回 [`InterceptError::MethodNotFound`]，已安装的调度器总有原始实现可转发；
///   - 未调用 `restore` 时宿主保持被替换状态，由调用方负责。
/// - **风险提示（Trade-offs）**：两个拦截器同时占用同一槽位会互相覆盖恢复基线；`restore` 只检测并告警。
pub struct MethodInterceptor<T: ?Sized, A, R> {
    shared: Arc<Shared<T, A, R>>,
}

impl<T, A, R> MethodInterceptor<T, A, R>
where
    T: SlotHost<Method<A, R>> + ?Sized + 'static,
    A: 'static,
    R: 'static,
{
    /// 以默认配置构造拦截器，不触碰目标槽位。
    pub fn new<F>(target: Arc<T>, key: impl Into<Cow<'static, str>>, interception: F) -> Self
    where
        F: Fn(&OriginalInvoker<A, R>, A) -> R + Send + Sync + 'static,
    {
        Self::with_config(target, key, interception, InterceptorConfig::default())
    }

    pub fn with_config<F>(
        target: Arc<T>,
        key: impl Into<Cow<'static, str>>,
        interception: F,
        config: InterceptorConfig,
    ) -> Self
    where
        F: Fn(&OriginalInvoker<A, R>, A) -> R + Send + Sync + 'static,
    {
        let key = key.into();
        let swap = PropertySwap::new(Arc::clone(&target), key.clone());
        Self {
            shared: Arc::new(Shared {
                key,
                target,
                config,
                enabled: AtomicBool::new(false),
                installation: Mutex::new(Installation {
                    swap,
                    dispatcher: None,
                }),
                pipeline: MiddlewarePipeline::new(),
                interception: Arc::new(interception),
            }),
        }
    }

    /// 启用拦截；未安装时装入调度器。
    pub fn enable(&self) -> Result<(), InterceptError> {
        let mut installation = self.shared.installation.lock();
        if installation.swap.is_swapped() {
            self.shared.enabled.store(true, Ordering::Release);
            debug!(label = %self.shared.config.label, key = %self.shared.key, "interceptor enabled");
            return Ok(());
        }

        let original = self
            .shared
            .target
            .slot(&self.shared.key)
            .ok_or_else(|| InterceptError::method_not_found(&self.shared.key))?;
        let dispatcher = Self::build_dispatcher(Arc::downgrade(&self.shared), original);

        self.shared.enabled.store(true, Ordering::Release);
        installation.swap.swap(Arc::clone(&dispatcher));
        installation.dispatcher = Some(dispatcher);
        debug!(
            label = %self.shared.config.label,
            key = %self.shared.key,
            "dispatcher installed and enabled"
        );
        Ok(())
    }

    /// 停用拦截；调度器保留在槽位中并退化为透传。
    pub fn disable(&self) {
        self.shared.enabled.store(false, Ordering::Release);
        debug!(label = %self.shared.config.label, key = %self.shared.key, "interceptor disabled");
    }

    /// 移除调度器，把槽位恢复到安装前的状态。
    pub fn restore(&self) {
        let mut installation = self.shared.installation.lock();
        if !installation.swap.is_swapped() {
            trace!(
                label = %self.shared.config.label,
                key = %self.shared.key,
                "restore ignored, dispatcher not installed"
            );
            return;
        }

        if self.shared.config.warn_on_foreign_restore {
            let still_ours = match (installation.swap.value(), installation.dispatcher.as_ref()) {
                (Some(current), Some(ours)) => Arc::ptr_eq(&current, ours),
                _ => false,
            };
            if !still_ours {
                warn!(
                    label = %self.shared.config.label,
                    key = %self.shared.key,
                    "slot no longer holds this dispatcher, restoring baseline over a foreign value"
                );
            }
        }

        installation.swap.restore();
        installation.dispatcher = None;
        debug!(label = %self.shared.config.label, key = %self.shared.key, "dispatcher removed");
    }

    /// 启用拦截并返回在析构时自动 `restore` 的守卫。
    pub fn enable_scoped(&self) -> Result<RestoreGuard<'_, T, A, R>, InterceptError> {
        self.enable()?;
        Ok(RestoreGuard { interceptor: self })
    }

    /// 以闭包形式追加中间件。
    pub fn register_middleware<F>(&self, middleware: F)
    where
        F: Fn(&A) -> MiddlewareOutcome<A, R> + Send + Sync + 'static,
    {
        let descriptor = MiddlewareDescriptor::anonymous(format!(
            "{}.{}",
            self.shared.config.label,
            self.shared.pipeline.len()
        ));
        self.register(Arc::new(FnMiddleware::new(descriptor, middleware)));
    }

    /// 追加中间件实例。
    pub fn register(&self, middleware: Arc<dyn Middleware<A, R>>) {
        debug!(
            label = %self.shared.config.label,
            key = %self.shared.key,
            middleware = %middleware.descriptor().name(),
            "middleware registered"
        );
        self.shared.pipeline.register(middleware);
    }

    /// 按注册顺序返回中间件描述。
    pub fn middleware_descriptors(&self) -> Vec<MiddlewareDescriptor> {
        self.shared.pipeline.descriptors()
    }

    /// 返回原始实现的句柄。
    ///
    /// 首次安装前返回构造时观察到的值；此后返回最近一次安装时采集的基线。
    pub fn original_invoker(&self) -> Result<OriginalInvoker<A, R>, InterceptError> {
        self.shared
            .installation
            .lock()
            .swap
            .original_value()
            .cloned()
            .map(OriginalInvoker::new)
            .ok_or_else(|| InterceptError::method_not_found(&self.shared.key))
    }

    /// 无视当前状态直接调用原始实现。
    pub fn call_original(&self, args: A) -> Result<R, InterceptError> {
        let invoker = self.original_invoker()?;
        Ok(invoker.invoke(args))
    }

    /// 由“是否已安装”与“是否启用”两个独立维度合成的当前状态。
    pub fn state(&self) -> InterceptorState {
        let installed = self.shared.installation.lock().swap.is_swapped();
        match (installed, self.shared.enabled.load(Ordering::Acquire)) {
            (false, _) => InterceptorState::Uninstalled,
            (true, false) => InterceptorState::InstalledDisabled,
            (true, true) => InterceptorState::InstalledEnabled,
        }
    }

    /// 已安装且已启用。
    pub fn is_active(&self) -> bool {
        self.state() == InterceptorState::InstalledEnabled
    }

    pub fn is_installed(&self) -> bool {
        self.state() != InterceptorState::Uninstalled
    }

    /// 被拦截的方法键名。
    pub fn key(&self) -> &str {
        &self.shared.key
    }

    /// 被拦截的宿主对象。
    pub fn target(&self) -> &Arc<T> {
        &self.shared.target
    }

    /// 构造时传入的配置。
    pub fn config(&self) -> &InterceptorConfig {
        &self.shared.config
    }

    fn build_dispatcher(shared: Weak<Shared<T, A, R>>, original: Method<A, R>) -> Method<A, R> {
        Arc::new(move |args: A| match shared.upgrade() {
            Some(shared) => shared.dispatch(&original, args),
            None => original(args),
        })
    }
}

impl<T: ?Sized, A, R> fmt::Debug for MethodInterceptor<T, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodInterceptor")
            .field("label", &self.shared.config.label)
            .field("key", &self.shared.key)
            .field("enabled", &self.shared.enabled.load(Ordering::Acquire))
            .field("middlewares", &self.shared.pipeline.len())
            .finish()
    }
}

/// 作用域守卫：析构时调用 [`MethodInterceptor::restore`]。
pub struct RestoreGuard<'a, T, A, R>
where
    T: SlotHost<Method<A, R>> + ?Sized + 'static,
    A: 'static,
    R: 'static,
{
    interceptor: &'a MethodInterceptor<T, A, R>,
}

impl<T, A, R> RestoreGuard<'_, T, A, R>
where
    T: SlotHost<Method<A, R>> + ?Sized + 'static,
    A: 'static,
    R: 'static,
{
    pub fn interceptor(&self) -> &MethodInterceptor<T, A, R> {
        self.interceptor
    }
}

impl<T, A, R> Drop for RestoreGuard<'_, T, A, R>
where
    T: SlotHost<Method<A, R>> + ?Sized + 'static,
    A: 'static,
    R: 'static,
{
    fn drop(&mut self) {
        self.interceptor.restore();
    }
}
