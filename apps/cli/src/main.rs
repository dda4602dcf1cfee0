//! # Sphero CLI
//!
//! Command-line bridge between a Sphero fleet and a NetLogo simulation.
//!
//! ```bash
//! # 生成默认配置
//! sphero-cli config init
//!
//! # 在 NetLogo 模型目录下运行（交互式朝向校准）
//! sphero-cli run --workdir ~/netlogo/model
//!
//! # 检查仿真文件
//! sphero-cli inspect commandsToRobots.txt --kind command
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod commands;
mod operator;
mod utils;

use commands::{ConfigCommand, InspectCommand, RunCommand};

/// Sphero CLI - Sphero 编队与 NetLogo 同步工具
#[derive(Parser, Debug)]
#[command(name = "sphero-cli")]
#[command(about = "Bridge a Sphero fleet with a NetLogo simulation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 运行桥接（连接 → 校准 → 同步）
    Run {
        #[command(flatten)]
        args: RunCommand,
    },

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 检查仿真配置/指令文件
    Inspect {
        #[command(flatten)]
        args: InspectCommand,
    },
}

fn main() -> Result<()> {
    sphero_bridge::init_tracing("sphero_cli=info,sphero_client=info,sphero_driver=warn")
        .context("初始化日志失败")?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { args } => args.execute(),
        Commands::Config(cmd) => cmd.execute(),
        Commands::Inspect { args } => args.execute(),
    }
}
