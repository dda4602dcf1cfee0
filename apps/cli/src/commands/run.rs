//! run 命令
//!
//! 连接编队、校准朝向，然后与 NetLogo 逐步同步直到仿真停止。

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use sphero_bridge::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::operator::ConsoleOperator;
use crate::utils::load_config;

/// 设备后端
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// 内置仿真机器人
    #[default]
    Sim,
}

/// 运行命令参数
#[derive(Args, Debug)]
pub struct RunCommand {
    /// 桥接配置文件（默认 ~/.config/sphero-bridge/bridge.toml）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// NetLogo 模型目录（覆盖 artifacts.directory）
    #[arg(short, long)]
    pub workdir: Option<PathBuf>,

    /// 无人值守：自动确认所有提示，朝向保持 0°
    #[arg(long)]
    pub unattended: bool,

    /// 设备后端
    #[arg(long, value_enum, default_value_t = Backend::Sim)]
    pub backend: Backend,
}

impl RunCommand {
    pub fn execute(&self) -> Result<()> {
        let (mut config, source) = load_config(self.config.as_deref())?;
        if let Some(dir) = &self.workdir {
            config.artifacts.directory = dir.clone();
        }
        config.validate().context("配置无效")?;

        println!("📋 配置: {}", source);
        println!("📂 NetLogo 目录: {}", config.artifacts.directory.display());
        println!("🤖 编队: {} 个机器人", config.fleet.robots.len());
        println!();

        let fleet = match self.backend {
            Backend::Sim => simulated_fleet(&config.fleet.robots, SimConfig::default()),
        };
        info!("Using {:?} backend with {} robots", self.backend, fleet.len());

        let interrupt = InterruptFlag::new();
        let handler_flag = interrupt.clone();
        ctrlc::set_handler(move || {
            eprintln!("\n🛑 收到 Ctrl-C，正在停车并断开连接...");
            handler_flag.trigger();
        })
        .context("安装 Ctrl-C 处理器失败")?;

        let fleet = Arc::new(fleet);
        let config = Arc::new(config);
        let summary = if self.unattended {
            RunLifecycle::new(fleet, config, ScriptedOperator::accept_all(), interrupt).run()?
        } else {
            RunLifecycle::new(fleet, config, ConsoleOperator::new(), interrupt).run()?
        };

        // 人工中断属于正常收尾，不返回错误状态
        print_summary(&summary);
        Ok(())
    }
}

fn print_summary(summary: &RunSummary) {
    let metrics = &summary.metrics;

    println!();
    match summary.stop_reason {
        Some(reason) => println!("✅ 仿真结束: {}", reason),
        None if summary.interrupted => println!("🛑 运行已手动停止，机器人已停车并断开"),
        None => println!("⚠️ 仿真未完成"),
    }
    println!("📊 运行统计:");
    println!("  同步周期: {}", metrics.ticks);
    println!("  roll 指令: {} (失败 {})", metrics.rolls_issued, metrics.roll_failures);
    println!("  里程计样本: {}", metrics.odometry_samples);
    println!(
        "  碰撞: {} 次上报, {} 次忽略",
        metrics.collisions_reported, metrics.collisions_ignored
    );
    println!("  低电量警告: {}", metrics.low_power_warnings);
    println!("  被拒绝的指令行: {}", metrics.rejected_lines);
    if summary.restarts > 0 {
        println!("  重新连接: {} 次", summary.restarts);
    }
}
