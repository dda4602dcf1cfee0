//! inspect 命令
//!
//! 离线检查 NetLogo 写出的配置文件或指令文件，逐行报告会被接受还是拒绝。

use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use sphero_bridge::protocol::{CommandUpdate, SimulatorConfig, TargetField, parse_statement};
use std::fs;
use std::path::PathBuf;

/// 文件类型
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// 仿真配置文件（config.txt）
    Config,
    /// 指令文件（commandsToRobots.txt）
    Command,
}

/// 检查命令参数
#[derive(Args, Debug)]
pub struct InspectCommand {
    /// 要检查的文件
    pub file: PathBuf,

    /// 文件类型
    #[arg(short, long, value_enum, default_value_t = ArtifactKind::Command)]
    pub kind: ArtifactKind,
}

impl InspectCommand {
    pub fn execute(&self) -> Result<()> {
        let text = fs::read_to_string(&self.file)
            .with_context(|| format!("读取文件失败: {}", self.file.display()))?;

        println!("🔍 {} ({:?})", self.file.display(), self.kind);

        let rejected = match self.kind {
            ArtifactKind::Config => inspect_config(&text),
            ArtifactKind::Command => inspect_commands(&text),
        };

        if rejected > 0 {
            bail!("{} 行被拒绝", rejected);
        }
        println!("✅ 全部通过");
        Ok(())
    }
}

fn inspect_commands(text: &str) -> usize {
    let mut accepted = 0;
    let mut rejected = 0;

    for (i, line) in text.lines().enumerate() {
        match CommandUpdate::parse(line) {
            Ok(Some(update)) => {
                accepted += 1;
                let field = match update.field {
                    TargetField::Speed => "速度",
                    TargetField::Heading => "航向",
                };
                println!("  {:>4}  机器人 {} {} = {}", i + 1, update.robot, field, update.value);
            },
            Ok(None) => {},
            Err(e) => {
                rejected += 1;
                println!("  {:>4}  ❌ {}", i + 1, e);
            },
        }
    }

    println!("  共 {} 条指令, {} 行被拒绝", accepted, rejected);
    rejected
}

fn inspect_config(text: &str) -> usize {
    let mut rejected = 0;
    for (i, line) in text.lines().enumerate() {
        if let Err(e) = parse_statement(line) {
            rejected += 1;
            println!("  {:>4}  ❌ {}", i + 1, e);
        }
    }

    match SimulatorConfig::parse(text) {
        Ok(config) => {
            println!("  机器人数量: {}", config.fleet_size);
            println!("  缩放系数: {}", config.scale);
            for (robot, [x, y]) in &config.initial_positions {
                println!("  初始位置[{}]: ({}, {})", robot, x, y);
            }
            for robot in 0..config.fleet_size {
                if config.initial_position(robot).is_none() {
                    rejected += 1;
                    println!("  ❌ 缺少机器人 {} 的初始位置", robot);
                }
            }
        },
        Err(e) => {
            // 语法错误已逐行报告过
            if rejected == 0 {
                rejected += 1;
            }
            println!("  ❌ {}", e);
        },
    }
    rejected
}
