use serde_json::Value;

/// 从 JSON 文本中按路径提取值，并转换为文本
///
/// 路径语法:
/// - `auth.token` → 对象字段
/// - `items.0.id` → 数组下标
/// - `items.#` → 数组长度，`#` 之后不能再有路径段
/// - `a\.b` → 键名中包含 `.`
///
/// 路径不存在、body 不是合法 JSON 或值为 null 时返回空字符串。
pub fn extract(body: &str, path: &str) -> String {
    let Ok(root) = serde_json::from_str::<Value>(body) else {
        return String::new();
    };

    let segments = split_path(path);
    if segments.is_empty() {
        return String::new();
    }

    let mut current = &root;
    let last = segments.len() - 1;
    for (pos, segment) in segments.iter().enumerate() {
        let next = match current {
            Value::Object(map) => map.get(segment),
            // `#` 只能作为最后一段
            Value::Array(_) if segment == "#" && pos != last => return String::new(),
            Value::Array(items) if segment == "#" => {
                return items.len().to_string();
            }
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };

        match next {
            Some(value) => current = value,
            None => return String::new(),
        }
    }

    render(current)
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn split_path(path: &str) -> Vec<String> {
    if path.is_empty() {
        return Vec::new();
    }

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            '.' => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);

    segments
}
