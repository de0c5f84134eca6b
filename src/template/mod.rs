/// 模板模块 - 请求字段中内嵌的固定指令语言
mod eval;
pub mod json_path;
mod parser;
mod types;

pub use eval::{EvalContext, Template};
pub use parser::parse_template;
pub use types::{Command, Function, Node, Operand, Pipeline, Primary, TemplateError, Value};
