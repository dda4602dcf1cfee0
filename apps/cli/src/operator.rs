//! 终端操作员（inquire）

use inquire::InquireError;
use sphero_bridge::client::{Operator, Result};
use sphero_bridge::BridgeError;

/// 通过终端提示与操作员交互
#[derive(Debug, Default)]
pub struct ConsoleOperator;

impl ConsoleOperator {
    pub fn new() -> Self {
        Self
    }
}

/// Ctrl-C / Esc 视为人工中断
fn prompt_error(e: InquireError) -> BridgeError {
    match e {
        InquireError::OperationInterrupted | InquireError::OperationCanceled => {
            BridgeError::Interrupted
        },
        other => BridgeError::Operator(other.to_string()),
    }
}

impl Operator for ConsoleOperator {
    fn confirm_connection(&mut self, labels: &[String]) -> Result<bool> {
        println!("已连接: {}", labels.join(", "));
        let confirmed = inquire::Confirm::new("所有 Sphero 都是常亮白灯吗？")
            .with_default(true)
            .with_help_message("回答 n 会断开全部蓝牙连接并重新开始")
            .prompt()
            .map_err(prompt_error)?;
        if !confirmed {
            println!("重新建立蓝牙连接。如果仍然失败，请重启 Sphero 或蓝牙适配器。");
        }
        Ok(confirmed)
    }

    fn heading_adjustment(&mut self, label: &str, current: u16) -> Result<String> {
        let prompt = format!("{} 朝向调整（度）:", label);
        let help = format!("当前 {}°；正数顺时针，0 试跑一段，直接回车接受", current);
        inquire::Text::new(&prompt)
            .with_help_message(&help)
            .prompt()
            .map_err(prompt_error)
    }

    fn confirm_placement(&mut self) -> Result<bool> {
        inquire::Confirm::new("Sphero 都已摆放到 NetLogo 中对应的初始位置了吗？")
            .with_default(true)
            .prompt()
            .map_err(prompt_error)
    }

    fn notify(&mut self, message: &str) {
        println!("{}", message);
    }
}
