//! 操作员交互
//!
//! 控制台提示属于外部胶水：会话只通过 [`Operator`] trait 提问，
//! CLI 用终端实现，测试与无人值守运行用 [`ScriptedOperator`]。

use crate::error::Result;
use std::collections::VecDeque;

/// 操作员
pub trait Operator {
    /// 确认所有机器人都已正确连接（蓝牙指示灯正常）
    ///
    /// 返回 `false` 表示蓝牙状态异常，需要整体重启。
    fn confirm_connection(&mut self, labels: &[String]) -> Result<bool>;

    /// 请求一次朝向调整输入
    ///
    /// 返回原始文本：空白为接受，整数为相对调整量（度）。
    fn heading_adjustment(&mut self, label: &str, current: u16) -> Result<String>;

    /// 确认机器人已经摆放到仿真初始位置
    fn confirm_placement(&mut self) -> Result<bool>;

    /// 提示信息（例如“请在 NetLogo 中按 setup”）
    fn notify(&mut self, _message: &str) {}
}

impl<O: Operator + ?Sized> Operator for &mut O {
    fn confirm_connection(&mut self, labels: &[String]) -> Result<bool> {
        (**self).confirm_connection(labels)
    }

    fn heading_adjustment(&mut self, label: &str, current: u16) -> Result<String> {
        (**self).heading_adjustment(label, current)
    }

    fn confirm_placement(&mut self) -> Result<bool> {
        (**self).confirm_placement()
    }

    fn notify(&mut self, message: &str) {
        (**self).notify(message)
    }
}

/// 预先编排好回答的操作员
///
/// 队列耗尽后：连接确认 `true`、朝向输入为空（接受）、摆放确认 `true`。
#[derive(Debug, Clone, Default)]
pub struct ScriptedOperator {
    connections: VecDeque<bool>,
    adjustments: VecDeque<String>,
    placements: VecDeque<bool>,
    notes: Vec<String>,
}

impl ScriptedOperator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 全部接受（无人值守运行）
    pub fn accept_all() -> Self {
        Self::default()
    }

    pub fn with_connections<I: IntoIterator<Item = bool>>(mut self, answers: I) -> Self {
        self.connections.extend(answers);
        self
    }

    pub fn with_adjustments<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.adjustments.extend(inputs.into_iter().map(Into::into));
        self
    }

    pub fn with_placements<I: IntoIterator<Item = bool>>(mut self, answers: I) -> Self {
        self.placements.extend(answers);
        self
    }

    /// 收到的提示
    pub fn notes(&self) -> &[String] {
        &self.notes
    }
}

impl Operator for ScriptedOperator {
    fn confirm_connection(&mut self, _labels: &[String]) -> Result<bool> {
        Ok(self.connections.pop_front().unwrap_or(true))
    }

    fn heading_adjustment(&mut self, _label: &str, _current: u16) -> Result<String> {
        Ok(self.adjustments.pop_front().unwrap_or_default())
    }

    fn confirm_placement(&mut self) -> Result<bool> {
        Ok(self.placements.pop_front().unwrap_or(true))
    }

    fn notify(&mut self, message: &str) {
        self.notes.push(message.to_string());
    }
}
