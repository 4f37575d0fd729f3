//! 可记录拦截器：记录、查看、清空与重放。

use std::sync::Arc;

use parking_lot::Mutex;
use spark_intercept::{
    InterceptorConfig, LoggableMethodInterceptor, MethodTable, MiddlewareOutcome,
    OriginalInvoker, ReplaySummary, SlotTable, method,
};

type Delivery = (String, u32);

/// 记录原始实现实际收到的请求，模拟“延后投递”的宿主。
fn mailer() -> (Arc<MethodTable<Delivery, bool>>, Arc<Mutex<Vec<Delivery>>>) {
    let delivered = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&delivered);
    let target = Arc::new(SlotTable::new().with_slot(
        "deliver",
        method(move |request: Delivery| {
            sink.lock().push(request);
            true
        }),
    ));
    (target, delivered)
}

fn hold(_: &OriginalInvoker<Delivery, bool>, _: Delivery) -> bool {
    false
}

#[test]
fn requests_are_logged_in_call_order() {
    let (target, delivered) = mailer();
    let interceptor = LoggableMethodInterceptor::new(Arc::clone(&target), "deliver", hold);
    interceptor.enable().expect("安装");

    target.invoke("deliver", ("a".to_owned(), 1)).expect("调用");
    target.invoke("deliver", ("b".to_owned(), 2)).expect("调用");

    let peeked = interceptor.logged_requests();
    assert_eq!(peeked, [("a".to_owned(), 1), ("b".to_owned(), 2)]);
    assert_eq!(interceptor.logged_len(), 2, "查看不清空日志");
    assert!(delivered.lock().is_empty(), "拦截期间原始实现未被调用");
    interceptor.restore();
}

#[test]
fn flush_returns_and_clears() {
    let (target, _) = mailer();
    let interceptor = LoggableMethodInterceptor::new(Arc::clone(&target), "deliver", hold);
    interceptor.enable().expect("安装");
    target.invoke("deliver", ("a".to_owned(), 1)).expect("调用");

    let flushed = interceptor.flush_logged_requests();
    assert_eq!(flushed.len(), 1);
    assert_eq!(interceptor.logged_len(), 0);
    assert!(interceptor.flush_logged_requests().is_empty());
    interceptor.restore();
}

#[test]
fn short_circuited_calls_are_still_logged() {
    let (target, _) = mailer();
    let interceptor = LoggableMethodInterceptor::new(Arc::clone(&target), "deliver", hold);
    interceptor.register_middleware(|_: &Delivery| MiddlewareOutcome::ShortCircuit(true));
    interceptor.enable().expect("安装");

    assert_eq!(target.invoke("deliver", ("x".to_owned(), 9)), Ok(true));
    assert_eq!(interceptor.logged_len(), 1, "日志中间件先于短路执行");
    interceptor.restore();
}

#[test]
fn disabled_calls_are_not_logged() {
    let (target, delivered) = mailer();
    let interceptor = LoggableMethodInterceptor::new(Arc::clone(&target), "deliver", hold);
    interceptor.enable().expect("安装");
    interceptor.disable();

    assert_eq!(target.invoke("deliver", ("now".to_owned(), 1)), Ok(true));
    assert_eq!(interceptor.logged_len(), 0);
    assert_eq!(delivered.lock().len(), 1);
    interceptor.restore();
}

/// 拦截窗口结束后重放：原始实现按记录顺序收到全部请求，日志被清空。
#[test]
fn replay_delivers_logged_requests_to_the_original() {
    let (target, delivered) = mailer();
    let interceptor = LoggableMethodInterceptor::with_config(
        Arc::clone(&target),
        "deliver",
        hold,
        InterceptorConfig::default().with_label("mailer.deferred"),
    );
    interceptor.enable().expect("安装");
    for n in 0..3 {
        assert_eq!(target.invoke("deliver", (format!("m{n}"), n)), Ok(false));
    }
    interceptor.restore();

    let summary = interceptor.execute_original_logged_requests();
    assert_eq!(summary, ReplaySummary { replayed: 3, failed: 0 });
    assert_eq!(summary.total(), 3);
    let names: Vec<String> = delivered
        .lock()
        .iter()
        .map(|(name, _)| name.clone())
        .collect();
    assert_eq!(names, ["m0", "m1", "m2"]);
    assert_eq!(interceptor.logged_len(), 0);
}

/// 重放时原始实现的 panic 被逐条隔离，批次继续执行。
#[test]
fn replay_isolates_panicking_entries() {
    let delivered = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&delivered);
    let target: Arc<MethodTable<u32, u32>> = Arc::new(SlotTable::new().with_slot(
        "ack",
        method(move |id: u32| {
            if id % 2 == 1 {
                panic!("odd id {id} rejected");
            }
            sink.lock().push(id);
            id
        }),
    ));
    let interceptor = LoggableMethodInterceptor::new(
        Arc::clone(&target),
        "ack",
        |_: &OriginalInvoker<u32, u32>, id| id,
    );
    interceptor.enable().expect("安装");
    for id in 0..5 {
        target.invoke("ack", id).expect("调用");
    }

    let summary = interceptor.execute_original_logged_requests();
    assert_eq!(summary, ReplaySummary { replayed: 3, failed: 2 });
    assert_eq!(delivered.lock().as_slice(), [0, 2, 4]);
    interceptor.restore();
}
