use anyhow::Result;
use clap::Parser;
use log::{error, info};
use std::sync::Arc;

use rayswap::{CancelFlag, Config, SwapOrchestrator, SwapRequest};

/// Raydium swap-base-in: 报价 -> 组装 -> 签名 -> 提交
#[derive(Parser, Debug)]
#[command(name = "rayswap", version, about = "Swap tokens through the Raydium Trade API")]
struct Args {
    /// 输入 mint（base58）
    input_mint: String,

    /// 输出 mint（base58）
    output_mint: String,

    /// 输入数量（最小单位）
    amount: u64,

    /// 滑点百分比，缺省使用 DEFAULT_SLIPPAGE_PERCENT
    slippage_percent: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    env_logger::init();

    let args = Args::parse();

    info!("🚀 rayswap - Raydium Swap");
    info!("================================================");

    // 加载配置
    let config = Arc::new(Config::from_env()?);
    config.print_summary();

    let orchestrator = SwapOrchestrator::from_config(config.clone())?;

    // Ctrl+C 只设置取消标志，正在进行的网络请求照常完成
    let cancel: CancelFlag = orchestrator.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("🛑 收到 Ctrl+C，在下一阶段前取消");
            cancel.cancel();
        }
    });

    let request = SwapRequest {
        input_mint: args.input_mint,
        output_mint: args.output_mint,
        amount: args.amount,
        slippage_percent: args.slippage_percent,
    };

    match orchestrator
        .execute_with_deadline(&request, config.swap_deadline())
        .await
    {
        Ok(txid) => {
            println!("{}", txid);
            Ok(())
        }
        Err(e) => {
            error!("❌ Swap failed: {}", e);
            std::process::exit(1);
        }
    }
}
