//! 仿真文件
//!
//! - 配置文件：仿真端写，桥接端读；存在即就绪，消失即停止
//! - 指令文件：仿真端只追加，桥接端用行游标增量读取
//! - 报告文件：桥接端整体覆盖写（临时文件 + rename），仿真端读

use crate::error::{BridgeError, Result};
use sphero_protocol::ProceedReport;
use sphero_tools::ArtifactSettings;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// 三个文件的路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub config: PathBuf,
    pub command: PathBuf,
    pub report: PathBuf,
}

impl ArtifactPaths {
    pub fn from_settings(settings: &ArtifactSettings) -> Self {
        Self {
            config: settings.config_path(),
            command: settings.command_path(),
            report: settings.report_path(),
        }
    }

    /// 删除上次运行遗留的配置/指令文件（不存在视为成功）
    pub fn clear_stale(&self) -> Result<()> {
        for path in [&self.config, &self.command] {
            match std::fs::remove_file(path) {
                Ok(()) => debug!("Removed stale artifact {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {},
                Err(e) => return Err(BridgeError::artifact(path, e)),
            }
        }
        Ok(())
    }

    pub fn config_exists(&self) -> bool {
        self.config.exists()
    }

    pub fn command_exists(&self) -> bool {
        self.command.exists()
    }

    /// 读取配置文件全文；文件不存在返回 `Ok(None)`
    pub fn read_config(&self) -> Result<Option<String>> {
        read_optional(&self.config)
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(BridgeError::artifact(path, e)),
    }
}

/// 一个周期新读到的指令行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBatch {
    /// 第一行的行号（0 起）
    pub start: usize,
    pub lines: Vec<String>,
}

impl CommandBatch {
    /// 提交后游标的位置
    pub fn end(&self) -> usize {
        self.start + self.lines.len()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// 指令文件增量读取器
///
/// 游标只在 [`commit`](Self::commit) 时前进且不会后退，
/// 同一行在多次重新打开之间只会交付一次。
/// 末尾没有换行符的行视为仿真端尚未写完，留到下个周期。
#[derive(Debug)]
pub struct CommandReader {
    path: PathBuf,
    consumed: usize,
    /// 文件短于游标的情况已经告警过
    shrink_reported: AtomicBool,
}

impl CommandReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            consumed: 0,
            shrink_reported: AtomicBool::new(false),
        }
    }

    /// 读取游标之后的完整行
    ///
    /// 文件不存在（包括检查存在与打开之间被删除）返回 `Ok(None)`。
    pub fn read_new(&self) -> Result<Option<CommandBatch>> {
        let Some(text) = read_optional(&self.path)? else {
            return Ok(None);
        };

        let complete: Vec<&str> = text.split_inclusive('\n').filter(|l| l.ends_with('\n')).collect();
        self.check_shrink(complete.len());

        let lines = complete
            .iter()
            .skip(self.consumed)
            .map(|l| l.trim_end_matches(['\n', '\r']).to_string())
            .collect();

        Ok(Some(CommandBatch {
            start: self.consumed,
            lines,
        }))
    }

    /// 文件短于游标时只告警一次，长回游标位置后复位；返回本次是否告警
    fn check_shrink(&self, lines: usize) -> bool {
        if lines >= self.consumed {
            self.shrink_reported.store(false, Ordering::Relaxed);
            return false;
        }
        if self.shrink_reported.swap(true, Ordering::Relaxed) {
            return false;
        }
        warn!(
            "Command file {} shrank to {} lines (cursor at {}), waiting for new lines",
            self.path.display(),
            lines,
            self.consumed
        );
        true
    }

    /// 提交已处理的批次
    pub fn commit(&mut self, batch: &CommandBatch) {
        self.consumed = self.consumed.max(batch.end());
    }

    /// 已消费的行数
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// 报告写入器（原子替换）
#[derive(Debug, Clone)]
pub struct ReportWriter {
    path: PathBuf,
    precision: u32,
}

impl ReportWriter {
    pub fn new(path: impl Into<PathBuf>, precision: u32) -> Self {
        Self {
            path: path.into(),
            precision,
        }
    }

    /// 写出报告
    ///
    /// 先写同目录临时文件，再 rename 覆盖目标，读者只会看到完整的旧报告或新报告。
    pub fn write(&self, report: &ProceedReport) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(dir).map_err(|e| BridgeError::artifact(dir, e))?;
        file.write_all(report.render(self.precision).as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| BridgeError::artifact(file.path().to_path_buf(), e))?;
        file.persist(&self.path)
            .map_err(|e| BridgeError::artifact(&self.path, e.error))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
