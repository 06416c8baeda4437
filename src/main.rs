// ==========================================
// 智能传送带分拣系统 - 命令行入口
// ==========================================
// 用法: smart-conveyor <function> [args...]
// 例如: smart-conveyor storeItem '{"id":"I1","type":{"id":"1","description":"Oven"}}'
// 输出: 成功时 stdout 打印负载；失败时打印错误信封并以非零码退出
// ==========================================

use smart_conveyor::api::to_error_response;
use smart_conveyor::app::{get_default_db_path, AppState};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // 初始化日志系统
    smart_conveyor::logging::init();

    let mut args = std::env::args().skip(1);
    let Some(function) = args.next() else {
        eprintln!("用法: smart-conveyor <function> [args...]");
        return ExitCode::from(2);
    };
    let params: Vec<String> = args.collect();

    tracing::info!("{} v{}", smart_conveyor::APP_NAME, smart_conveyor::VERSION);

    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    let app_state = match AppState::new(db_path) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("AppState初始化失败: {:#}", e);
            eprintln!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match app_state.conveyor_api.invoke(&function, &params).await {
        Ok(Some(payload)) => {
            println!("{}", payload);
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(function = %function, error = %err, "调用失败");
            println!("{}", to_error_response(&err).to_json());
            ExitCode::FAILURE
        }
    }
}
