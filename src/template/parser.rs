use crate::template::types::{Command, Function, Node, Operand, Pipeline, Primary, TemplateError};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// 动作内部的词法单元
#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    Pipe,
    Str(String),
    Int(i64),
    Ident(String),
    Field(String),
}

/// 解析模板文本
///
/// 支持的格式：
/// - `{{ fromJson "login" "auth.token" }}`
/// - `{{ add 1 2 3 }}`
/// - `{{ (now.Add 60).Unix }}`
/// - `{{ fromJson "a" "n" | mul 2 }}`
/// - `{{- ... -}}` 去除两侧空白
pub fn parse_template(input: &str) -> Result<Vec<Node>, TemplateError> {
    let mut nodes = Vec::new();
    let mut rest = input;

    while let Some(start) = rest.find(OPEN) {
        let mut text = &rest[..start];
        let mut action = &rest[start + OPEN.len()..];

        // `{{- ` 去除前面的空白
        if is_trim_marker(action) {
            text = text.trim_end();
            action = &action[1..];
        }
        if !text.is_empty() {
            nodes.push(Node::Text(text.to_string()));
        }

        let lexed = lex_action(action)?;
        let pipeline = ActionParser::new(lexed.tokens).parse()?;
        nodes.push(Node::Action(pipeline));

        rest = &action[lexed.consumed..];
        if lexed.trim_right {
            rest = rest.trim_start();
        }
    }

    if !rest.is_empty() {
        nodes.push(Node::Text(rest.to_string()));
    }

    Ok(nodes)
}

fn is_trim_marker(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next() == Some('-') && chars.next().is_some_and(char::is_whitespace)
}

struct LexedAction {
    tokens: Vec<Token>,
    /// 包含 `}}` 在内消耗的字节数
    consumed: usize,
    trim_right: bool,
}

fn lex_action(src: &str) -> Result<LexedAction, TemplateError> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(i, c)) = chars.peek() {
        let rest = &src[i..];

        if c.is_whitespace() {
            let trimmed = rest.trim_start();
            if trimmed.starts_with("-}}") {
                let consumed = src.len() - trimmed.len() + 3;
                return Ok(LexedAction {
                    tokens,
                    consumed,
                    trim_right: true,
                });
            }
            chars.next();
            continue;
        }

        if rest.starts_with(CLOSE) {
            return Ok(LexedAction {
                tokens,
                consumed: i + CLOSE.len(),
                trim_right: false,
            });
        }

        match c {
            '(' => {
                tokens.push(Token::LParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RParen);
                chars.next();
            }
            '|' => {
                tokens.push(Token::Pipe);
                chars.next();
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some((_, '"')) => break,
                        Some((_, '\\')) => match chars.next() {
                            Some((_, 'n')) => value.push('\n'),
                            Some((_, 't')) => value.push('\t'),
                            Some((_, '"')) => value.push('"'),
                            Some((_, '\\')) => value.push('\\'),
                            Some((_, other)) => {
                                return Err(TemplateError::Parse(format!(
                                    "unknown escape sequence \\{}",
                                    other
                                )));
                            }
                            None => {
                                return Err(TemplateError::Parse(
                                    "unterminated quoted string".to_string(),
                                ));
                            }
                        },
                        Some((_, ch)) => value.push(ch),
                        None => {
                            return Err(TemplateError::Parse(
                                "unterminated quoted string".to_string(),
                            ));
                        }
                    }
                }
                tokens.push(Token::Str(value));
            }
            '`' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some((_, '`')) => break,
                        Some((_, ch)) => value.push(ch),
                        None => {
                            return Err(TemplateError::Parse(
                                "unterminated raw string".to_string(),
                            ));
                        }
                    }
                }
                tokens.push(Token::Str(value));
            }
            '.' => {
                chars.next();
                let name = take_ident(&mut chars);
                if name.is_empty() {
                    return Err(TemplateError::Parse(format!(
                        "expected method name after '.' in {:?}",
                        rest
                    )));
                }
                tokens.push(Token::Field(name));
            }
            c if c.is_ascii_digit() || (c == '-' && starts_with_digit(&rest[1..])) => {
                chars.next();
                let mut literal = String::from(c);
                while let Some(&(_, d)) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    literal.push(d);
                    chars.next();
                }
                let n = literal.parse::<i64>().map_err(|e| {
                    TemplateError::Parse(format!("invalid number {}: {}", literal, e))
                })?;
                tokens.push(Token::Int(n));
            }
            c if c.is_alphabetic() || c == '_' => {
                tokens.push(Token::Ident(take_ident(&mut chars)));
            }
            other => {
                return Err(TemplateError::Parse(format!(
                    "unexpected {:?} in action",
                    other
                )));
            }
        }
    }

    Err(TemplateError::Parse("unclosed action".to_string()))
}

fn starts_with_digit(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_ascii_digit())
}

fn take_ident(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>) -> String {
    let mut name = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if !(c.is_alphanumeric() || c == '_') {
            break;
        }
        name.push(c);
        chars.next();
    }
    name
}

struct ActionParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl ActionParser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn parse(mut self) -> Result<Pipeline, TemplateError> {
        let pipeline = self.pipeline()?;
        match self.peek() {
            None => Ok(pipeline),
            Some(token) => Err(TemplateError::Parse(format!(
                "unexpected {:?} in action",
                token
            ))),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn pipeline(&mut self) -> Result<Pipeline, TemplateError> {
        let mut commands = vec![self.command()?];
        while self.peek() == Some(&Token::Pipe) {
            self.bump();
            commands.push(self.command()?);
        }
        Ok(Pipeline { commands })
    }

    fn command(&mut self) -> Result<Command, TemplateError> {
        let mut operands = Vec::new();
        while let Some(token) = self.peek() {
            if matches!(token, Token::Pipe | Token::RParen) {
                break;
            }
            operands.push(self.operand()?);
        }

        if operands.is_empty() {
            return Err(TemplateError::Parse("missing value for command".to_string()));
        }
        Ok(Command { operands })
    }

    fn operand(&mut self) -> Result<Operand, TemplateError> {
        let primary = match self.bump() {
            Some(Token::Ident(name)) => match Function::lookup(&name) {
                Some(function) => Primary::Function(function),
                None => {
                    return Err(TemplateError::Parse(format!(
                        "function {:?} not defined",
                        name
                    )));
                }
            },
            Some(Token::Str(s)) => Primary::Str(s),
            Some(Token::Int(n)) => Primary::Int(n),
            Some(Token::LParen) => {
                let inner = self.pipeline()?;
                if self.bump() != Some(Token::RParen) {
                    return Err(TemplateError::Parse("unclosed left paren".to_string()));
                }
                Primary::Group(inner)
            }
            Some(token) => {
                return Err(TemplateError::Parse(format!(
                    "unexpected {:?} in operand",
                    token
                )));
            }
            None => return Err(TemplateError::Parse("unexpected end of action".to_string())),
        };

        let mut selectors = Vec::new();
        while let Some(Token::Field(name)) = self.peek() {
            selectors.push(name.clone());
            self.bump();
        }

        Ok(Operand { primary, selectors })
    }
}
