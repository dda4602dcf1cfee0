//! 运行生命周期与恢复
//!
//! 会话外层的重试壳：
//!
//! - 操作员报告蓝牙异常：断开全部设备，从 `Connecting` 重新开始（编队列表保留）
//! - 人工中断：同样的收尾流程，记录后正常返回
//! - 其它错误：记录上下文，尽力停车并断开，向上返回

use crate::error::Result;
use crate::operator::Operator;
use crate::session::{ConnectionCheck, Session, TeardownGuard};
use crate::sync::StopReason;
use crate::watcher::InterruptFlag;
use sphero_driver::{Fleet, FleetMetricsSnapshot};
use sphero_tools::BridgeConfig;
use std::sync::Arc;
use tracing::{error, info, warn};

/// 一次会话尝试的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// 仿真结束
    Finished(StopReason),
    /// 需要整体重启
    Restart,
}

/// 整个运行的摘要
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// 正常结束时的停止原因（中断时为 `None`）
    pub stop_reason: Option<StopReason>,
    /// 整体重启次数
    pub restarts: u32,
    pub interrupted: bool,
    pub metrics: FleetMetricsSnapshot,
}

/// 运行生命周期
pub struct RunLifecycle<O> {
    fleet: Arc<Fleet>,
    config: Arc<BridgeConfig>,
    operator: O,
    interrupt: InterruptFlag,
}

impl<O: Operator> RunLifecycle<O> {
    pub fn new(
        fleet: Arc<Fleet>,
        config: Arc<BridgeConfig>,
        operator: O,
        interrupt: InterruptFlag,
    ) -> Self {
        Self {
            fleet,
            config,
            operator,
            interrupt,
        }
    }

    pub fn operator(&self) -> &O {
        &self.operator
    }

    pub fn fleet(&self) -> &Arc<Fleet> {
        &self.fleet
    }

    /// 运行直到仿真结束、人工中断或致命错误
    ///
    /// 无论哪种结果都会先尽力停车、取消订阅并断开全部设备，
    /// 会话中途 panic 时由 [`TeardownGuard`] 在展开过程中收尾。
    pub fn run(&mut self) -> Result<RunSummary> {
        let guard = TeardownGuard::new(self.fleet.clone());
        let mut restarts = 0u32;
        let result = loop {
            match self.attempt() {
                Ok(RunOutcome::Restart) => {
                    restarts += 1;
                    info!("Restarting connection setup (restart #{})", restarts);
                },
                Ok(RunOutcome::Finished(reason)) => break Ok(Some(reason)),
                Err(e) if e.is_interrupt() => break Ok(None),
                Err(e) => break Err(e),
            }
        };

        guard.finish();
        let metrics = self.fleet.metrics().snapshot();

        match result {
            Ok(Some(reason)) => {
                info!("NetLogo model run was stopped ({})", reason);
                Ok(RunSummary {
                    stop_reason: Some(reason),
                    restarts,
                    interrupted: false,
                    metrics,
                })
            },
            Ok(None) => {
                warn!("Run was stopped manually");
                Ok(RunSummary {
                    stop_reason: None,
                    restarts,
                    interrupted: true,
                    metrics,
                })
            },
            Err(e) => {
                error!("Run aborted: {}", e);
                Err(e)
            },
        }
    }

    /// 一次完整的会话尝试
    pub fn attempt(&mut self) -> Result<RunOutcome> {
        let session = Session::new(self.fleet.clone(), self.config.clone(), self.interrupt.clone());
        let session = match session.connect()?.confirm(&mut self.operator)? {
            ConnectionCheck::Confirmed(session) => session,
            ConnectionCheck::Rejected(_) => return Ok(RunOutcome::Restart),
        };

        let stopped = session
            .orient(&mut self.operator)?
            .start_streaming(&mut self.operator)?
            .await_config(&mut self.operator)?
            .register(&mut self.operator)?
            .run()?;
        Ok(RunOutcome::Finished(stopped.reason()))
    }
}
