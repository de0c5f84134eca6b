use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// 模板错误类型
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("template parse error: {0}")]
    Parse(String),

    #[error("template execute error: {0}")]
    Execute(String),
}

/// 模板中的一个片段
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// 原样输出的文本
    Text(String),
    /// `{{ ... }}` 动作
    Action(Pipeline),
}

/// `a | f x | g` 形式的管道
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
}

/// 一条命令：若第一个操作数是函数，其余操作数为参数
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub operands: Vec<Operand>,
}

/// 操作数及其后的 `.Method` 选择器
#[derive(Debug, Clone, PartialEq)]
pub struct Operand {
    pub primary: Primary,
    pub selectors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primary {
    Function(Function),
    Str(String),
    Int(i64),
    Group(Pipeline),
}

/// 内置函数，固定集合，不可扩展
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    FromJson,
    Uuid,
    Now,
    Add,
    Sub,
    Mul,
}

impl Function {
    /// 名称到函数的静态注册表
    const REGISTRY: &'static [(&'static str, Function)] = &[
        ("fromJson", Function::FromJson),
        ("uuid", Function::Uuid),
        ("now", Function::Now),
        ("add", Function::Add),
        ("sub", Function::Sub),
        ("mul", Function::Mul),
    ];

    pub fn lookup(name: &str) -> Option<Self> {
        Self::REGISTRY
            .iter()
            .find(|(registered, _)| *registered == name)
            .map(|(_, function)| *function)
    }

    pub fn name(&self) -> &'static str {
        Self::REGISTRY
            .iter()
            .find(|(_, function)| function == self)
            .map(|(name, _)| *name)
            .unwrap_or("unknown")
    }
}

/// 求值结果
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Time(DateTime<Utc>),
    Uuid(Uuid),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) => "int",
            Value::Time(_) => "time",
            Value::Uuid(_) => "uuid",
        }
    }

    /// 整数参数，接受可解析为整数的字符串
    pub fn as_int(&self) -> Result<i64, TemplateError> {
        match self {
            Value::Int(n) => Ok(*n),
            Value::Str(s) => s.trim().parse().map_err(|_| {
                TemplateError::Execute(format!("expected int, got string {:?}", s))
            }),
            other => Err(TemplateError::Execute(format!(
                "expected int, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn as_str(&self) -> Result<&str, TemplateError> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(TemplateError::Execute(format!(
                "expected string, got {}",
                other.type_name()
            ))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{}", s),
            Value::Int(n) => write!(f, "{}", n),
            Value::Time(t) => write!(f, "{}", t.to_rfc3339()),
            Value::Uuid(u) => write!(f, "{}", u.hyphenated()),
        }
    }
}
