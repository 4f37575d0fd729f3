//! 记录请求并可重放的拦截器。
//!
//! # 教案式说明
//! - **意图（Why）**：在拦截窗口内把每次调用的参数记下来，窗口结束后可以查看、清空，
//!   或把它们逐条交给原始实现重放。
//! - **结构（How）**：构造时向内部 [`MethodInterceptor`] 注册的第一个中间件即日志中间件，
//!   因此它总能观察到每次启用状态下的调用，不受后续短路影响；未启用时调用直接透传，不会被记录。
//! - **契约（What）**：重放逐条隔离失败，单条失败既不会中断批次，也不会传播给调用方。

use std::{borrow::Cow, collections::VecDeque, fmt, ops::Deref, sync::Arc};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::{
    config::InterceptorConfig,
    interceptor::{MethodInterceptor, OriginalInvoker},
    pipeline::{FnMiddleware, MiddlewareDescriptor, MiddlewareOutcome},
    slot::{Method, SlotHost},
    util::ignore_errors,
};

/// 一次重放的统计结果。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// 成功交给原始实现执行的条目数。
    pub replayed: usize,
    /// 因原始实现缺失或 panic 而被跳过的条目数。
    pub failed: usize,
}

impl ReplaySummary {
    pub fn total(&self) -> usize {
        self.replayed + self.failed
    }
}

/// 自动记录调用参数的方法拦截器，解引用为 [`MethodInterceptor`]。
pub struct LoggableMethodInterceptor<T: ?Sized, A, R> {
    interceptor: MethodInterceptor<T, A, R>,
    log: Arc<Mutex<VecDeque<A>>>,
}

impl<T, A, R> LoggableMethodInterceptor<T, A, R>
where
    T: SlotHost<Method<A, R>> + ?Sized + 'static,
    A: Clone + Send + 'static,
    R: 'static,
{
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
        let capacity = config.log_capacity;
        let descriptor = MiddlewareDescriptor::new(
            format!("{}.request_log", config.label),
            "observability",
            "records every intercepted argument tuple for later replay",
        );
        let interceptor = MethodInterceptor::with_config(target, key, interception, config);
        let log = Arc::new(Mutex::new(VecDeque::new()));

        let sink = Arc::clone(&log);
        let request_log = move |args: &A| -> MiddlewareOutcome<A, R> {
            let mut log = sink.lock();
            if let Some(capacity) = capacity {
                while log.len() >= capacity.max(1) {
                    log.pop_front();
                }
            }
            log.push_back(args.clone());
            trace!(logged = log.len(), "request logged");
            MiddlewareOutcome::Continue
        };
        interceptor.register(Arc::new(FnMiddleware::new(descriptor, request_log)));

        Self { interceptor, log }
    }

    /// 取出并清空已记录的请求。
    pub fn flush_logged_requests(&self) -> Vec<A> {
        let drained: Vec<A> = self.log.lock().drain(..).collect();
        debug!(
            label = %self.interceptor.config().label,
            flushed = drained.len(),
            "request log flushed"
        );
        drained
    }

    /// 已记录请求的快照，不清空日志。
    pub fn logged_requests(&self) -> Vec<A> {
        self.log.lock().iter().cloned().collect()
    }

    pub fn logged_len(&self) -> usize {
        self.log.lock().len()
    }

    /// 清空日志，并把每条请求交给原始实现重放。
    ///
    /// 每条请求独立执行：原始实现缺失或 panic 都只记为失败并继续下一条。
    pub fn execute_original_logged_requests(&self) -> ReplaySummary {
        let mut summary = ReplaySummary::default();
        for (index, request) in self.flush_logged_requests().into_iter().enumerate() {
            match ignore_errors(|| self.interceptor.call_original(request)) {
                Some(Ok(_)) => summary.replayed += 1,
                Some(Err(err)) => {
                    warn!(
                        label = %self.interceptor.config().label,
                        index,
                        error = %err,
                        "replay skipped"
                    );
                    summary.failed += 1;
                }
                None => {
                    warn!(label = %self.interceptor.config().label, index, "replay panicked");
                    summary.failed += 1;
                }
            }
        }
        debug!(
            label = %self.interceptor.config().label,
            replayed = summary.replayed,
            failed = summary.failed,
            "logged requests replayed"
        );
        summary
    }

    pub fn interceptor(&self) -> &MethodInterceptor<T, A, R> {
        &self.interceptor
    }
}

impl<T: ?Sized, A, R> Deref for LoggableMethodInterceptor<T, A, R> {
    type Target = MethodInterceptor<T, A, R>;

    fn deref(&self) -> &Self::Target {
        &self.interceptor
    }
}

impl<T: ?Sized, A, R> fmt::Debug for LoggableMethodInterceptor<T, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggableMethodInterceptor")
            .field("interceptor", &self.interceptor)
            .field("logged", &self.log.lock().len())
            .finish()
    }
}
