// ==========================================
// 贸易 EDI 核心 - 日志初始化
// ==========================================
// 工具: tracing + tracing-subscriber（EnvFilter）
// 约定: 库代码只发 tracing 事件，订阅器由进程入口或测试装配
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 进程级日志初始化（嵌入方在入口调用一次，重复调用会 panic）
///
/// # 环境变量
/// - RUST_LOG: 过滤器，未设置时默认 info
///   例如: RUST_LOG=trade_edi_core=debug
///
/// # 示例
/// ```no_run
/// use trade_edi_core::logging;
/// logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .init();
}

/// 测试日志初始化: debug 级别，输出交给测试框架捕获
///
/// try_init 吞掉重复装配错误 —— 同一测试进程内可被多个用例调用
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
