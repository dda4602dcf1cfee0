//! 白名单赋值语句解析
//!
//! 仿真端每行写出一条赋值语句，语法固定为：
//!
//! ```text
//! statement := key [ '[' index ']' ] [ '[:]' ] '=' value
//! value     := number | '[' number ( ',' number )* ']'
//! ```
//!
//! 空行与 `#` 开头的注释行被忽略。本模块只负责语法，
//! 键是否在白名单内由 `config` / `command` 模块判定。

use crate::{ProtocolError, Result};

/// 解析后的赋值语句
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Statement {
    /// 变量名
    pub key: String,
    /// 数组下标（标量赋值时为 `None`）
    pub index: Option<usize>,
    /// 右值
    pub value: Value,
}

/// 右值
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// 单个数值
    Scalar(f64),
    /// 数值列表（如 `[1.5, -2.0]`）
    List(Vec<f64>),
}

impl Value {
    /// 取标量值，列表视为类型错误
    pub fn as_scalar(&self, key: &str) -> Result<f64> {
        match self {
            Value::Scalar(v) => Ok(*v),
            Value::List(_) => Err(ProtocolError::invalid_value(key, "expected a number, got a list")),
        }
    }

    /// 取二元组（坐标）
    pub fn as_pair(&self, key: &str) -> Result<[f64; 2]> {
        match self {
            Value::List(values) if values.len() == 2 => Ok([values[0], values[1]]),
            Value::List(values) => Err(ProtocolError::invalid_value(
                key,
                format!("expected 2 numbers, got {}", values.len()),
            )),
            Value::Scalar(_) => Err(ProtocolError::invalid_value(key, "expected a list of 2 numbers")),
        }
    }
}

impl Statement {
    /// 要求语句带下标
    pub fn require_index(&self) -> Result<usize> {
        self.index
            .ok_or_else(|| ProtocolError::invalid_value(&self.key, "missing robot index"))
    }

    /// 要求语句不带下标
    pub fn require_no_index(&self) -> Result<()> {
        match self.index {
            None => Ok(()),
            Some(_) => Err(ProtocolError::invalid_value(&self.key, "unexpected index")),
        }
    }
}

/// 解析一行
///
/// # 返回
///
/// - `Ok(None)`: 空行或注释
/// - `Ok(Some(stmt))`: 合法语句
/// - `Err(ProtocolError::Malformed)`: 语法错误
pub fn parse_statement(line: &str) -> Result<Option<Statement>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let (lhs, rhs) = trimmed
        .split_once('=')
        .ok_or_else(|| ProtocolError::malformed(trimmed, "missing '='"))?;
    if rhs.contains('=') {
        return Err(ProtocolError::malformed(trimmed, "more than one '='"));
    }

    let (key, index) = parse_target(trimmed, lhs.trim())?;
    let value = parse_value(trimmed, rhs.trim())?;

    Ok(Some(Statement {
        key: key.to_string(),
        index,
        value,
    }))
}

/// 解析左值：`key`、`key[3]`、`key[3][:]`
fn parse_target<'a>(line: &str, lhs: &'a str) -> Result<(&'a str, Option<usize>)> {
    let (key, mut rest) = match lhs.find('[') {
        Some(pos) => (lhs[..pos].trim(), lhs[pos..].trim()),
        None => (lhs, ""),
    };

    if !is_identifier(key) {
        return Err(ProtocolError::malformed(line, "invalid identifier"));
    }

    let mut index = None;
    if !rest.is_empty() && !rest.starts_with("[:]") {
        let inner = &rest[1..];
        let close = inner
            .find(']')
            .ok_or_else(|| ProtocolError::malformed(line, "unclosed '['"))?;
        let text = inner[..close].trim();
        let parsed = text
            .parse::<usize>()
            .map_err(|_| ProtocolError::malformed(line, format!("invalid index '{}'", text)))?;
        index = Some(parsed);
        rest = inner[close + 1..].trim();
    }

    if let Some(after_slice) = rest.strip_prefix("[:]") {
        rest = after_slice.trim();
    }

    if !rest.is_empty() {
        return Err(ProtocolError::malformed(line, format!("unexpected '{}'", rest)));
    }

    Ok((key, index))
}

fn parse_value(line: &str, rhs: &str) -> Result<Value> {
    if rhs.is_empty() {
        return Err(ProtocolError::malformed(line, "empty value"));
    }

    if let Some(body) = rhs.strip_prefix('[') {
        let body = body
            .strip_suffix(']')
            .ok_or_else(|| ProtocolError::malformed(line, "unclosed list"))?;
        if body.trim().is_empty() {
            return Err(ProtocolError::malformed(line, "empty list"));
        }
        let values = body
            .split(',')
            .map(|item| parse_number(line, item.trim()))
            .collect::<Result<Vec<_>>>()?;
        return Ok(Value::List(values));
    }

    parse_number(line, rhs).map(Value::Scalar)
}

fn parse_number(line: &str, text: &str) -> Result<f64> {
    // f64::from_str 接受 "inf"/"NaN"，协议只允许有限数值
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ProtocolError::malformed(line, format!("invalid number '{}'", text))),
    }
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {},
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_statement() {
        let stmt = parse_statement("scale = 0.5").unwrap().unwrap();
        assert_eq!(stmt.key, "scale");
        assert_eq!(stmt.index, None);
        assert_eq!(stmt.value, Value::Scalar(0.5));
    }

    #[test]
    fn test_indexed_statement() {
        let stmt = parse_statement("sphero_target_speeds[2] = 50").unwrap().unwrap();
        assert_eq!(stmt.key, "sphero_target_speeds");
        assert_eq!(stmt.index, Some(2));
        assert_eq!(stmt.value, Value::Scalar(50.0));
    }

    #[test]
    fn test_slice_assignment() {
        // NetLogo 侧实际写出的格式：first_netlogo_pos[0][:] = [5, 5]
        let stmt = parse_statement("first_netlogo_pos[0][:] = [5, -3.25]")
            .unwrap()
            .unwrap();
        assert_eq!(stmt.index, Some(0));
        assert_eq!(stmt.value, Value::List(vec![5.0, -3.25]));
        assert_eq!(stmt.value.as_pair("first_netlogo_pos").unwrap(), [5.0, -3.25]);
    }

    #[test]
    fn test_blank_and_comment_lines() {
        assert_eq!(parse_statement("").unwrap(), None);
        assert_eq!(parse_statement("   \n").unwrap(), None);
        assert_eq!(parse_statement("# generated by NetLogo").unwrap(), None);
    }

    #[test]
    fn test_rejects_code() {
        // 任何不符合语法的内容都被拒绝，而不是执行
        assert!(parse_statement("import os").is_err());
        assert!(parse_statement("os.system('rm -rf /')").is_err());
        assert!(parse_statement("x = __import__('os')").is_err());
        assert!(parse_statement("a = b = 1").is_err());
        assert!(parse_statement("scale == 1").is_err());
    }

    #[test]
    fn test_rejects_bad_numbers() {
        assert!(parse_statement("scale = inf").is_err());
        assert!(parse_statement("scale = NaN").is_err());
        assert!(parse_statement("scale =").is_err());
        assert!(parse_statement("pos[0] = []").is_err());
        assert!(parse_statement("pos[0] = [1, 2").is_err());
    }

    #[test]
    fn test_rejects_bad_index() {
        assert!(parse_statement("pos[-1] = 3").is_err());
        assert!(parse_statement("pos[a] = 3").is_err());
        assert!(parse_statement("pos[1 = 3").is_err());
        assert!(parse_statement("pos[1]x = 3").is_err());
        assert!(parse_statement("1pos = 3").is_err());
    }

    #[test]
    fn test_value_shape_errors() {
        let list = Value::List(vec![1.0, 2.0, 3.0]);
        assert!(list.as_pair("k").is_err());
        assert!(list.as_scalar("k").is_err());
        assert!(Value::Scalar(1.0).as_pair("k").is_err());
    }
}
