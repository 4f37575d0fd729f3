//! 拦截调用前的有序中间件管线。
//!
//! # 设计背景（Why）
//! - 借鉴 Pipeline Middleware 的“按注册顺序执行”模式：每个阶段可以放行、改写入参或直接给出结果；
//! - 三态结果以显式枚举 [`MiddlewareOutcome`] 表达，调用点无需探测“哪个字段存在”。
//!
//! # 契约说明（What）
//! - 注册只追加、不删除；
//! - 第一个 `ShortCircuit` 立即终止管线，后续阶段不再执行；
//! - 未短路时，历次 `OverrideInput` 累积后的参数作为最终参数交给拦截函数。

use std::{borrow::Cow, fmt, sync::Arc};

use parking_lot::RwLock;
use tracing::trace;

/// 单个中间件阶段的执行结果。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MiddlewareOutcome<A, R> {
    /// 不做改动，继续执行下一阶段。
    Continue,
    /// 以新参数替换当前参数，继续执行下一阶段。
    OverrideInput(A),
    /// 以给定值作为最终结果，终止管线。
    ShortCircuit(R),
}

/// 管线整体的裁决。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineVerdict<A, R> {
    /// 所有阶段均已放行，携带最终参数。
    Proceed(A),
    /// 某一阶段给出了最终结果。
    ShortCircuit(R),
}

/// 描述中间件的元数据，辅助日志与排障。
///
/// - `name`：组件的稳定标识，建议使用 `vendor.component` 命名；
/// - `category`：可选分类（如 `observability`、`rewrite`）；
/// - `summary`：人类可读描述。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MiddlewareDescriptor {
    name: Cow<'static, str>,
    category: Cow<'static, str>,
    summary: Cow<'static, str>,
}

impl MiddlewareDescriptor {
    /// 构造新的描述对象。
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        category: impl Into<Cow<'static, str>>,
        summary: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            summary: summary.into(),
        }
    }

    /// 构造匿名描述，常用于闭包中间件或测试。
    pub fn anonymous(stage: impl Into<Cow<'static, str>>) -> Self {
        let stage = stage.into();
        Self {
            name: Cow::Owned(format!("anonymous.{stage}")),
            category: Cow::Borrowed("unspecified"),
            summary: Cow::Owned(format!("auto-generated descriptor for {stage}")),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }
}

/// 中间件契约。
///
/// # 契约维度速览
/// - **语义**：`handle` 只观察参数的借用，需要改写时返回 [`MiddlewareOutcome::OverrideInput`]；
/// - **错误**：中间件自身的失败以 `ShortCircuit(Err(..))`（当 `R` 为 `Result` 时）或 panic 表达，
///   管线不捕获、不重试；
/// - **并发**：实例需 `Send + Sync`，内部状态以 `Arc`/锁保护。
pub trait Middleware<A, R>: Send + Sync {
    /// 返回中间件描述。
    fn descriptor(&self) -> MiddlewareDescriptor {
        MiddlewareDescriptor::anonymous("middleware")
    }

    /// 处理一次调用的参数。
    fn handle(&self, args: &A) -> MiddlewareOutcome<A, R>;
}

/// 将闭包适配为 [`Middleware`]。
pub struct FnMiddleware<F> {
    descriptor: MiddlewareDescriptor,
    handler: F,
}

impl<F> FnMiddleware<F> {
    pub fn new(descriptor: MiddlewareDescriptor, handler: F) -> Self {
        Self {
            descriptor,
            handler,
        }
    }
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware")
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

impl<A, R, F> Middleware<A, R> for FnMiddleware<F>
where
    F: Fn(&A) -> MiddlewareOutcome<A, R> + Send + Sync,
{
    fn descriptor(&self) -> MiddlewareDescriptor {
        self.descriptor.clone()
    }

    fn handle(&self, args: &A) -> MiddlewareOutcome<A, R> {
        (self.handler)(args)
    }
}

/// 有序中间件管线。
///
/// # 教案式说明
/// - **意图（Why）**：调度器在已安装状态下仍允许追加中间件，因此注册与执行需要在 `&self` 上并发安全。
/// - **逻辑（How）**：`run` 先在读锁下克隆阶段列表快照并释放锁，再逐个执行；阶段内部注册的新中间件
///   从下一次调用开始生效，不会造成死锁。
/// - **契约（What）**：执行顺序即注册顺序；首个短路胜出。
pub struct MiddlewarePipeline<A, R> {
    stages: RwLock<Vec<Arc<dyn Middleware<A, R>>>>,
}

impl<A, R> MiddlewarePipeline<A, R> {
    pub fn new() -> Self {
        Self {
            stages: RwLock::new(Vec::new()),
        }
    }

    /// 追加一个阶段。
    pub fn register(&self, middleware: Arc<dyn Middleware<A, R>>) {
        self.stages.write().push(middleware);
    }

    pub fn len(&self) -> usize {
        self.stages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.read().is_empty()
    }

    /// 按注册顺序返回所有阶段的描述。
    pub fn descriptors(&self) -> Vec<MiddlewareDescriptor> {
        self.stages
            .read()
            .iter()
            .map(|stage| stage.descriptor())
            .collect()
    }

    /// 依次执行所有阶段。
    pub fn run(&self, args: A) -> PipelineVerdict<A, R> {
        let stages: Vec<Arc<dyn Middleware<A, R>>> = self.stages.read().clone();
        let mut args = args;
        for (index, stage) in stages.iter().enumerate() {
            match stage.handle(&args) {
                MiddlewareOutcome::Continue => {}
                MiddlewareOutcome::OverrideInput(next) => {
                    trace!(stage = index, "middleware overrode input");
                    args = next;
                }
                MiddlewareOutcome::ShortCircuit(output) => {
                    trace!(
                        stage = index,
                        middleware = %stage.descriptor().name(),
                        "middleware short-circuited the call"
                    );
                    return PipelineVerdict::ShortCircuit(output);
                }
            }
        }
        PipelineVerdict::Proceed(args)
    }
}

impl<A, R> Default for MiddlewarePipeline<A, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, R> fmt::Debug for MiddlewarePipeline<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewarePipeline")
            .field("stages", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn stage<F>(name: &'static str, f: F) -> Arc<dyn Middleware<i32, String>>
    where
        F: Fn(&i32) -> MiddlewareOutcome<i32, String> + Send + Sync + 'static,
    {
        Arc::new(FnMiddleware::new(
            MiddlewareDescriptor::new(name, "test", "pipeline stage"),
            f,
        ))
    }

    #[test]
    fn empty_pipeline_proceeds_with_original_args() {
        let pipeline: MiddlewarePipeline<i32, String> = MiddlewarePipeline::new();
        assert_eq!(pipeline.run(7), PipelineVerdict::Proceed(7));
    }

    #[test]
    fn overrides_accumulate_in_registration_order() {
        let pipeline = MiddlewarePipeline::new();
        pipeline.register(stage("double", |x| MiddlewareOutcome::OverrideInput(x * 2)));
        pipeline.register(stage("noop", |_| MiddlewareOutcome::Continue));
        pipeline.register(stage("inc", |x| MiddlewareOutcome::OverrideInput(x + 1)));
        assert_eq!(pipeline.run(5), PipelineVerdict::Proceed(11));
    }

    #[test]
    fn first_short_circuit_wins() {
        let late_runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&late_runs);

        let pipeline = MiddlewarePipeline::new();
        pipeline.register(stage("first", |_| MiddlewareOutcome::OverrideInput(1)));
        pipeline.register(stage("second", |x| {
            MiddlewareOutcome::ShortCircuit(format!("short:{x}"))
        }));
        pipeline.register(stage("third", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            MiddlewareOutcome::ShortCircuit("late".to_owned())
        }));

        assert_eq!(
            pipeline.run(0),
            PipelineVerdict::ShortCircuit("short:1".to_owned())
        );
        assert_eq!(late_runs.load(Ordering::SeqCst), 0, "短路后的阶段不得执行");
    }

    #[test]
    fn descriptors_follow_registration_order() {
        let pipeline = MiddlewarePipeline::new();
        pipeline.register(stage("a", |_| MiddlewareOutcome::Continue));
        pipeline.register(stage("b", |_| MiddlewareOutcome::Continue));
        let names: Vec<String> = pipeline
            .descriptors()
            .iter()
            .map(|d| d.name().to_owned())
            .collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(pipeline.len(), 2);
    }

    #[test]
    fn stage_may_register_more_stages_while_running() {
        let pipeline: Arc<MiddlewarePipeline<i32, String>> = Arc::new(MiddlewarePipeline::new());
        let weak = Arc::downgrade(&pipeline);
        pipeline.register(stage("grow", move |_| {
            if let Some(pipeline) = weak.upgrade() {
                pipeline.register(stage("grown", |x| MiddlewareOutcome::OverrideInput(x + 100)));
            }
            MiddlewareOutcome::Continue
        }));

        assert_eq!(pipeline.run(1), PipelineVerdict::Proceed(1), "新阶段下一次调用才生效");
        assert_eq!(pipeline.len(), 2);
        assert_eq!(pipeline.run(1), PipelineVerdict::Proceed(101));
    }

    #[test]
    fn anonymous_descriptor_is_labelled() {
        let descriptor = MiddlewareDescriptor::anonymous("rewrite");
        assert_eq!(descriptor.name(), "anonymous.rewrite");
        assert_eq!(descriptor.category(), "unspecified");
    }
}
