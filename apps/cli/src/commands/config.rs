//! 配置管理命令
//!
//! 生成、查看桥接配置文件（TOML）。

use anyhow::{Result, bail};
use clap::Subcommand;
use sphero_bridge::BridgeConfig;
use std::path::PathBuf;

use crate::utils::{default_config_path, load_config};

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 写出默认配置
    Init {
        /// 目标路径（默认 ~/.config/sphero-bridge/bridge.toml）
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// 覆盖已有文件
        #[arg(long)]
        force: bool,
    },

    /// 显示生效的配置
    Show {
        /// 配置文件路径
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// 显示默认配置文件路径
    Path,
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Init { path, force } => Self::init_(path, force),
            ConfigCommand::Show { config } => Self::show_(config),
            ConfigCommand::Path => Self::path_(),
        }
    }

    fn init_(path: Option<PathBuf>, force: bool) -> Result<()> {
        let path = match path {
            Some(path) => path,
            None => default_config_path()?,
        };

        if path.exists() && !force {
            bail!("配置文件已存在: {}（使用 --force 覆盖）", path.display());
        }

        BridgeConfig::default().save(&path)?;
        println!("✅ 已写入默认配置: {}", path.display());
        println!("   请在 [[fleet.robots]] 中填写每个 Sphero 的蓝牙地址");
        Ok(())
    }

    fn show_(config: Option<PathBuf>) -> Result<()> {
        let (config, source) = load_config(config.as_deref())?;
        println!("# 来源: {}", source);
        print!("{}", config.to_toml_string()?);
        Ok(())
    }

    fn path_() -> Result<()> {
        let path = default_config_path()?;
        let status = if path.exists() { "存在" } else { "不存在" };
        println!("{} ({})", path.display(), status);
        Ok(())
    }
}
