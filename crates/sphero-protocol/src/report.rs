//! 回写报告渲染
//!
//! 每个控制周期整体覆盖写出三行 NetLogo 语句，由仿真端直接执行：
//!
//! ```text
//! (foreach (sort spheros) [7 -3] [5 4] [[ s x y ] -> ask s [ set odometry-pos (list x y) ]])
//! (foreach (sort spheros) [0 0] [[ s h ] -> ask s [ set measured-heading h ]])
//! (foreach (sort spheros) [12.5 0] [[ s speed ] -> ask s [ set measured-speed speed ]])
//! ```

/// 单周期报告
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProceedReport {
    /// 仿真坐标系下的位置
    pub positions: Vec<[f64; 2]>,
    /// 相对内部航向基准的实测航向（度，[0, 360)）
    pub headings: Vec<f64>,
    /// 实测速度（cm/s）
    pub speeds: Vec<f64>,
}

impl ProceedReport {
    /// 创建预分配容量的空报告
    pub fn with_capacity(fleet_size: usize) -> Self {
        Self {
            positions: Vec::with_capacity(fleet_size),
            headings: Vec::with_capacity(fleet_size),
            speeds: Vec::with_capacity(fleet_size),
        }
    }

    /// 追加一个机器人的数据（按编队下标顺序调用）
    pub fn push(&mut self, position: [f64; 2], heading: f64, speed: f64) {
        self.positions.push(position);
        self.headings.push(heading);
        self.speeds.push(speed);
    }

    /// 机器人数量
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// 渲染为三行 NetLogo 语句（含结尾换行）
    pub fn render(&self, precision: u32) -> String {
        let xs: Vec<f64> = self.positions.iter().map(|p| p[0]).collect();
        let ys: Vec<f64> = self.positions.iter().map(|p| p[1]).collect();

        format!(
            "(foreach (sort spheros) {} {} [[ s x y ] -> ask s [ set odometry-pos (list x y) ]])\n\
             (foreach (sort spheros) {} [[ s h ] -> ask s [ set measured-heading h ]])\n\
             (foreach (sort spheros) {} [[ s speed ] -> ask s [ set measured-speed speed ]])\n",
            format_list(&xs, precision),
            format_list(&ys, precision),
            format_list(&self.headings, precision),
            format_list(&self.speeds, precision),
        )
    }
}

/// 四舍五入到指定小数位
///
/// 结果加 0.0 把 `-0.0` 折成 `0.0`，避免输出 `-0`。
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor + 0.0
}

/// NetLogo 列表字面量：`[a b c]`
fn format_list(values: &[f64], precision: u32) -> String {
    let items: Vec<String> = values
        .iter()
        .map(|v| format!("{}", round_to(*v, precision)))
        .collect();
    format!("[{}]", items.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(1.235001, 2), 1.24);
        assert_eq!(round_to(0.1 + 0.2, 2), 0.3);
        assert_eq!(round_to(-0.001, 2).to_string(), "0");
        assert_eq!(round_to(7.0, 0), 7.0);
    }

    #[test]
    fn test_render_three_lines() {
        let mut report = ProceedReport::with_capacity(2);
        report.push([7.0, 5.0], 0.0, 12.346);
        report.push([-3.0, 4.0], 359.5, 0.0);

        let text = report.render(2);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "(foreach (sort spheros) [7 -3] [5 4] [[ s x y ] -> ask s [ set odometry-pos (list x y) ]])"
        );
        assert_eq!(
            lines[1],
            "(foreach (sort spheros) [0 359.5] [[ s h ] -> ask s [ set measured-heading h ]])"
        );
        assert_eq!(
            lines[2],
            "(foreach (sort spheros) [12.35 0] [[ s speed ] -> ask s [ set measured-speed speed ]])"
        );
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_empty_report() {
        let report = ProceedReport::default();
        assert!(report.is_empty());
        let text = report.render(2);
        assert!(text.starts_with("(foreach (sort spheros) [] []"));
    }
}
