//! 拦截器配置。
//!
//! # 教案式说明
//! - **意图（Why）**：拦截器的日志标签、请求日志上限等差异需要外部化，使同一实现可在不同业务场景复用。
//! - **结构（How）**：普通结构体 + `Default` + `serde::Deserialize`，缺省字段回退到默认值，
//!   宿主可直接从 TOML 配置段加载。
//! - **契约（What）**：
//!   - `label`：低基数字符串，出现在每条日志事件中；
//!   - `log_capacity`：可记录拦截器保留的最大请求数，`None` 表示不设上限，满时淘汰最旧条目；
//!   - `warn_on_foreign_restore`：`restore` 发现槽位已被他方改写时是否输出告警。

use serde::Deserialize;

/// 单个拦截器的可配置项，缺省字段回退到 [`InterceptorConfig::default`]。
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InterceptorConfig {
    /// 日志事件中的 `label` 字段，同时作为中间件名称前缀。
    pub label: String,
    /// 请求日志上限；`None` 表示不设上限。
    pub log_capacity: Option<usize>,
    /// `restore` 发现槽位被他方改写时是否告警。
    pub warn_on_foreign_restore: bool,
}

impl InterceptorConfig {
    /// 覆盖日志标签。
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// 设置请求日志上限，`0` 按 `1` 处理。
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = Some(capacity);
        self
    }

    /// 开启或关闭他方覆盖告警。
    pub fn with_foreign_restore_warning(mut self, enabled: bool) -> Self {
        self.warn_on_foreign_restore = enabled;
        self
    }
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        Self {
            label: "interceptor".to_owned(),
            log_capacity: None,
            warn_on_foreign_restore: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: InterceptorConfig = toml::from_str(r#"label = "checkout.submit""#)
            .expect("配置片段应能解析");
        assert_eq!(config.label, "checkout.submit");
        assert_eq!(config.log_capacity, None);
        assert!(config.warn_on_foreign_restore);
    }

    #[test]
    fn full_toml_overrides_every_field() {
        let config: InterceptorConfig = toml::from_str(
            r#"
            label = "picker"
            log_capacity = 16
            warn_on_foreign_restore = false
            "#,
        )
        .expect("配置应能解析");
        assert_eq!(
            config,
            InterceptorConfig::default()
                .with_label("picker")
                .with_log_capacity(16)
                .with_foreign_restore_warning(false)
        );
    }
}
