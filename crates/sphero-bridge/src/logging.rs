//! 日志初始化

use tracing_subscriber::EnvFilter;

/// 安装全局 tracing subscriber
///
/// `RUST_LOG` 优先；未设置或无法解析时使用 `default_directive`（例如 `"sphero_cli=info"`）。
/// 同时把 `log` 记录桥接到 tracing。重复调用返回错误，不会 panic。
pub fn init_tracing(default_directive: &str) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();

    // 已经安装过 log 桥接时忽略
    let _ = tracing_log::LogTracer::init();
    tracing::subscriber::set_global_default(subscriber)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_an_error() {
        // 同一进程里第一次可能已被其它测试安装
        let _ = init_tracing("sphero_bridge=debug");
        assert!(init_tracing("sphero_bridge=debug").is_err());
    }
}
