use std::collections::HashMap;
use std::fmt::Write;

use chrono::{TimeDelta, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::metrics::{ErrorKind, MetricsSink, record_error};
use crate::template::json_path;
use crate::template::parser::parse_template;
use crate::template::types::{
    Command, Function, Node, Operand, Pipeline, Primary, TemplateError, Value,
};

/// 求值时可见的上下文
pub struct EvalContext<'a> {
    /// 请求名称 -> 最近一次响应 body
    pub records: &'a HashMap<String, String>,
    pub metrics: &'a dyn MetricsSink,
}

/// 解析后的模板
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(input: &str) -> Result<Self, TemplateError> {
        Ok(Self {
            nodes: parse_template(input)?,
        })
    }

    /// 渲染模板，任何一个动作失败则整体失败
    pub fn render(&self, ctx: &EvalContext<'_>) -> Result<String, TemplateError> {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Action(pipeline) => {
                    let value = eval_pipeline(pipeline, ctx)?;
                    out.push_str(&value.to_string());
                }
            }
        }
        Ok(out)
    }
}

fn eval_pipeline(pipeline: &Pipeline, ctx: &EvalContext<'_>) -> Result<Value, TemplateError> {
    let mut piped: Option<Value> = None;
    for command in &pipeline.commands {
        piped = Some(eval_command(command, piped, ctx)?);
    }
    piped.ok_or_else(|| TemplateError::Execute("empty pipeline".to_string()))
}

fn eval_command(
    command: &Command,
    piped: Option<Value>,
    ctx: &EvalContext<'_>,
) -> Result<Value, TemplateError> {
    let Some((first, rest)) = command.operands.split_first() else {
        return Err(TemplateError::Execute("empty command".to_string()));
    };

    let mut args = rest
        .iter()
        .map(|operand| eval_operand(operand, Vec::new(), ctx))
        .collect::<Result<Vec<_>, _>>()?;
    args.extend(piped);

    eval_operand(first, args, ctx)
}

/// 对操作数求值，`args` 交给函数调用或最后一个方法选择器
fn eval_operand(
    operand: &Operand,
    mut args: Vec<Value>,
    ctx: &EvalContext<'_>,
) -> Result<Value, TemplateError> {
    if operand.selectors.is_empty() {
        return match &operand.primary {
            Primary::Function(function) => call_function(*function, args, ctx),
            other if args.is_empty() => eval_primary(other, ctx),
            _ => Err(TemplateError::Execute(
                "can't give argument to non-function".to_string(),
            )),
        };
    }

    let mut value = match &operand.primary {
        Primary::Function(function) => call_function(*function, Vec::new(), ctx)?,
        other => eval_primary(other, ctx)?,
    };

    let last = operand.selectors.len() - 1;
    for (i, selector) in operand.selectors.iter().enumerate() {
        let method_args = if i == last {
            std::mem::take(&mut args)
        } else {
            Vec::new()
        };
        value = call_method(value, selector, method_args)?;
    }
    Ok(value)
}

fn eval_primary(primary: &Primary, ctx: &EvalContext<'_>) -> Result<Value, TemplateError> {
    match primary {
        Primary::Function(function) => call_function(*function, Vec::new(), ctx),
        Primary::Str(s) => Ok(Value::Str(s.clone())),
        Primary::Int(n) => Ok(Value::Int(*n)),
        Primary::Group(pipeline) => eval_pipeline(pipeline, ctx),
    }
}

fn call_function(
    function: Function,
    args: Vec<Value>,
    ctx: &EvalContext<'_>,
) -> Result<Value, TemplateError> {
    match function {
        Function::FromJson => {
            let [name, path] = args.as_slice() else {
                return Err(arity_error(function, "2", args.len()));
            };
            let (name, path) = (name.as_str()?, path.as_str()?);

            match ctx.records.get(name) {
                Some(body) => Ok(Value::Str(json_path::extract(body, path))),
                None => {
                    record_error(ctx.metrics, ErrorKind::TemplateMissingEntry);
                    warn!(name, path, "No recorded response to read from");
                    Ok(Value::Str(String::new()))
                }
            }
        }
        Function::Uuid => {
            expect_no_args(function, &args)?;
            Ok(Value::Uuid(Uuid::new_v4()))
        }
        Function::Now => {
            expect_no_args(function, &args)?;
            Ok(Value::Time(Utc::now()))
        }
        Function::Add => {
            let mut total: i64 = 0;
            for arg in &args {
                total = total
                    .checked_add(arg.as_int()?)
                    .ok_or_else(|| overflow_error(function))?;
            }
            Ok(Value::Int(total))
        }
        Function::Sub => fold_ints(function, &args, i64::checked_sub),
        Function::Mul => fold_ints(function, &args, i64::checked_mul),
    }
}

/// 从左到右折叠：零个参数为 0，一个参数为其本身
fn fold_ints(
    function: Function,
    args: &[Value],
    op: fn(i64, i64) -> Option<i64>,
) -> Result<Value, TemplateError> {
    let Some((first, rest)) = args.split_first() else {
        return Ok(Value::Int(0));
    };

    let mut acc = first.as_int()?;
    for arg in rest {
        acc = op(acc, arg.as_int()?).ok_or_else(|| overflow_error(function))?;
    }
    Ok(Value::Int(acc))
}

fn call_method(value: Value, method: &str, args: Vec<Value>) -> Result<Value, TemplateError> {
    match (&value, method) {
        (Value::Time(t), "Add") => {
            let [seconds] = args.as_slice() else {
                return Err(method_arity_error(method, "1", args.len()));
            };
            let seconds = seconds.as_int()?;
            TimeDelta::try_seconds(seconds)
                .and_then(|delta| t.checked_add_signed(delta))
                .map(Value::Time)
                .ok_or_else(|| TemplateError::Execute(format!("time overflow adding {}s", seconds)))
        }
        (Value::Time(t), "Unix") => {
            no_method_args(method, &args)?;
            Ok(Value::Int(t.timestamp()))
        }
        (Value::Time(t), "UnixMilli") => {
            no_method_args(method, &args)?;
            Ok(Value::Int(t.timestamp_millis()))
        }
        (Value::Time(t), "Format") => {
            let [layout] = args.as_slice() else {
                return Err(method_arity_error(method, "1", args.len()));
            };
            let mut formatted = String::new();
            write!(formatted, "{}", t.format(layout.as_str()?)).map_err(|_| {
                TemplateError::Execute(format!("invalid time format {}", layout))
            })?;
            Ok(Value::Str(formatted))
        }
        (Value::Time(_) | Value::Uuid(_), "String") => {
            no_method_args(method, &args)?;
            Ok(Value::Str(value.to_string()))
        }
        _ => Err(TemplateError::Execute(format!(
            "can't evaluate method {} on {}",
            method,
            value.type_name()
        ))),
    }
}

fn expect_no_args(function: Function, args: &[Value]) -> Result<(), TemplateError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(arity_error(function, "0", args.len()))
    }
}

fn no_method_args(method: &str, args: &[Value]) -> Result<(), TemplateError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(method_arity_error(method, "0", args.len()))
    }
}

fn arity_error(function: Function, expected: &str, got: usize) -> TemplateError {
    TemplateError::Execute(format!(
        "wrong number of args for {}: want {} got {}",
        function.name(),
        expected,
        got
    ))
}

fn method_arity_error(method: &str, expected: &str, got: usize) -> TemplateError {
    TemplateError::Execute(format!(
        "wrong number of args for method {}: want {} got {}",
        method, expected, got
    ))
}

fn overflow_error(function: Function) -> TemplateError {
    TemplateError::Execute(format!("integer overflow in {}", function.name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{MetricsRegistry, names};

    fn render(input: &str, records: &HashMap<String, String>) -> Result<String, TemplateError> {
        let metrics = MetricsRegistry::new();
        let ctx = EvalContext {
            records,
            metrics: &metrics,
        };
        Template::parse(input)?.render(&ctx)
    }

    #[test]
    fn test_arithmetic() {
        let records = HashMap::new();
        assert_eq!(render("{{ add 3 8 21 }}", &records).unwrap(), "32");
        assert_eq!(render("{{ sub 21 9 4 1 }}", &records).unwrap(), "7");
        assert_eq!(render("{{ mul 4 1 9 }}", &records).unwrap(), "36");
    }

    #[test]
    fn test_arithmetic_edge_arity() {
        let records = HashMap::new();
        assert_eq!(render("{{ add }}", &records).unwrap(), "0");
        assert_eq!(render("{{ sub }}", &records).unwrap(), "0");
        assert_eq!(render("{{ mul }}", &records).unwrap(), "0");
        assert_eq!(render("{{ sub 5 }}", &records).unwrap(), "5");
        assert_eq!(render("{{ mul 7 }}", &records).unwrap(), "7");
    }

    #[test]
    fn test_pipeline_appends_previous_value() {
        let records = HashMap::new();
        assert_eq!(render("{{ add 1 2 | mul 10 }}", &records).unwrap(), "30");
        assert_eq!(render("{{ 5 | sub 20 }}", &records).unwrap(), "15");
    }

    #[test]
    fn test_from_json_feeds_arithmetic() {
        let mut records = HashMap::new();
        records.insert("page".to_string(), r#"{"next": 4}"#.to_string());
        assert_eq!(
            render(r#"{{ fromJson "page" "next" | add 1 }}"#, &records).unwrap(),
            "5"
        );
    }

    #[test]
    fn test_now_methods() {
        let records = HashMap::new();
        let unix: i64 = render("{{ (now.Add 123).Unix }}", &records)
            .unwrap()
            .parse()
            .unwrap();
        let now = Utc::now().timestamp();
        assert!(unix >= now + 120 && unix <= now + 126);

        let millis = render("{{ now.UnixMilli }}", &records).unwrap();
        assert!(millis.len() >= 13);

        let year = render(r#"{{ now.Format "%Y" }}"#, &records).unwrap();
        assert_eq!(year.len(), 4);
    }

    #[test]
    fn test_uuid_string() {
        let records = HashMap::new();
        let value = render("{{ (uuid).String }}", &records).unwrap();
        assert!(Uuid::parse_str(&value).is_ok());
        assert_eq!(value.len(), 36);
    }

    #[test]
    fn test_execute_errors() {
        let records = HashMap::new();
        assert!(matches!(
            render(r#"{{ add 1 "x" }}"#, &records),
            Err(TemplateError::Execute(_))
        ));
        assert!(matches!(
            render("{{ uuid 1 }}", &records),
            Err(TemplateError::Execute(_))
        ));
        assert!(matches!(
            render("{{ now.Nope }}", &records),
            Err(TemplateError::Execute(_))
        ));
        assert!(matches!(
            render("{{ 1 2 }}", &records),
            Err(TemplateError::Execute(_))
        ));
        assert!(matches!(
            render("{{ mul 9223372036854775807 2 }}", &records),
            Err(TemplateError::Execute(_))
        ));
        assert!(matches!(
            render(r#"{{ fromJson "only-one" }}"#, &records),
            Err(TemplateError::Execute(_))
        ));
    }

    #[test]
    fn test_missing_entry_signals_metric() {
        let metrics = MetricsRegistry::new();
        let records = HashMap::new();
        let ctx = EvalContext {
            records: &records,
            metrics: &metrics,
        };

        let output = Template::parse(r#"before-{{ fromJson "nope" "a" }}-after"#)
            .unwrap()
            .render(&ctx)
            .unwrap();

        assert_eq!(output, "before--after");
        assert_eq!(
            metrics.counter(names::ERRORS_TOTAL, &[("error", "template_missing_entry")]),
            1.0
        );
    }
}
