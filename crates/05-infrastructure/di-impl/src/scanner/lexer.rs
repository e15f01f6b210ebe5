//! 词法分析器
//!
//! 只产出声明扫描需要的记号：名称（含 `\` 的限定名作为一个记号）、符号、
//! `::` 与 `->`。注释、字符串、heredoc 与变量被折叠成不携带内容的记号或直接跳过。

use infrastructure_common::{ScanError, ScanResult};

/// 记号类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// 标识符或限定名，保留原始大小写
    Name(String),
    /// `$name`
    Variable,
    /// 字符串、数字等字面量
    Literal,
    /// `::`
    DoubleColon,
    /// `->` 或 `?->`
    ObjectOperator,
    /// 其他单字符符号
    Symbol(char),
    /// 文件结束
    Eof,
}

/// 记号
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// 类型
    pub kind: TokenKind,
    /// 所在行（从 1 开始）
    pub line: usize,
}

impl Token {
    /// 是否为指定关键字（不区分大小写）
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(&self.kind, TokenKind::Name(name) if name.eq_ignore_ascii_case(keyword))
    }

    /// 是否为指定符号
    pub fn is_symbol(&self, symbol: char) -> bool {
        self.kind == TokenKind::Symbol(symbol)
    }

    /// 名称文本
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Name(name) => Some(name),
            _ => None,
        }
    }

    /// 用于错误信息的记号描述
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Name(name) => name.clone(),
            TokenKind::Variable => "$变量".to_string(),
            TokenKind::Literal => "字面量".to_string(),
            TokenKind::DoubleColon => "::".to_string(),
            TokenKind::ObjectOperator => "->".to_string(),
            TokenKind::Symbol(symbol) => symbol.to_string(),
            TokenKind::Eof => "文件结束".to_string(),
        }
    }
}

/// 源文件词法分析器
pub struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    source: &'a str,
}

impl<'a> Lexer<'a> {
    /// 创建词法分析器
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            source,
        }
    }

    /// 把整个输入切分为记号，最后一个记号总是 [`TokenKind::Eof`]
    ///
    /// 文件中出现 `<?php` 开标签时，标签之外的内容视为内联 HTML 并跳过；
    /// 没有任何开标签的文本按纯代码片段处理。
    pub fn tokenize(mut self) -> ScanResult<Vec<Token>> {
        let mut tokens = Vec::new();
        let mut in_code = !self.has_open_tag();
        if !in_code {
            in_code = self.skip_inline_html();
        }

        while in_code {
            self.skip_whitespace();
            let Some(current) = self.peek(0) else {
                break;
            };
            let line = self.line;

            match current {
                '?' if self.peek(1) == Some('>') => {
                    self.advance_by(2);
                    in_code = self.skip_inline_html();
                }
                '/' if self.peek(1) == Some('/') => self.skip_line_comment(),
                '#' if self.peek(1) == Some('[') => {
                    // 属性 `#[...]` 按普通的方括号处理
                    self.advance();
                }
                '#' => self.skip_line_comment(),
                '/' if self.peek(1) == Some('*') => self.skip_block_comment()?,
                '\'' | '"' | '`' => {
                    self.skip_quoted(current)?;
                    tokens.push(Token { kind: TokenKind::Literal, line });
                }
                '<' if self.starts_with("<<<") => {
                    self.skip_heredoc()?;
                    tokens.push(Token { kind: TokenKind::Literal, line });
                }
                ':' if self.peek(1) == Some(':') => {
                    self.advance_by(2);
                    tokens.push(Token { kind: TokenKind::DoubleColon, line });
                }
                '-' if self.peek(1) == Some('>') => {
                    self.advance_by(2);
                    tokens.push(Token { kind: TokenKind::ObjectOperator, line });
                }
                '?' if self.peek(1) == Some('-') && self.peek(2) == Some('>') => {
                    self.advance_by(3);
                    tokens.push(Token { kind: TokenKind::ObjectOperator, line });
                }
                '$' if self.peek(1).is_some_and(is_name_start) => {
                    self.advance();
                    self.take_while(is_name_char);
                    tokens.push(Token { kind: TokenKind::Variable, line });
                }
                c if c.is_ascii_digit() => {
                    self.take_while(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
                    tokens.push(Token { kind: TokenKind::Literal, line });
                }
                c if is_name_start(c) || c == '\\' => {
                    let name = self.take_while(|c| is_name_char(c) || c == '\\');
                    tokens.push(Token { kind: TokenKind::Name(name), line });
                }
                c => {
                    self.advance();
                    tokens.push(Token { kind: TokenKind::Symbol(c), line });
                }
            }
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            line: self.line,
        });
        Ok(tokens)
    }

    fn has_open_tag(&self) -> bool {
        self.source.contains("<?php") || self.source.contains("<?=")
    }

    /// 跳过内联 HTML 直到下一个开标签，返回是否回到了代码模式
    fn skip_inline_html(&mut self) -> bool {
        while self.pos < self.chars.len() {
            if self.starts_with("<?php") {
                self.advance_by(5);
                return true;
            }
            if self.starts_with("<?=") {
                self.advance_by(3);
                return true;
            }
            self.advance();
        }
        false
    }

    fn skip_whitespace(&mut self) {
        while self.peek(0).is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    /// 单行注释在换行或 `?>` 处结束
    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek(0) {
            if c == '\n' || (c == '?' && self.peek(1) == Some('>')) {
                break;
            }
            self.advance();
        }
    }

    fn skip_block_comment(&mut self) -> ScanResult<()> {
        let line = self.line;
        self.advance_by(2);
        while self.pos < self.chars.len() {
            if self.starts_with("*/") {
                self.advance_by(2);
                return Ok(());
            }
            self.advance();
        }
        Err(ScanError::Unterminated {
            construct: "注释",
            line,
        })
    }

    fn skip_quoted(&mut self, quote: char) -> ScanResult<()> {
        let line = self.line;
        self.advance();
        while let Some(c) = self.peek(0) {
            self.advance();
            if c == '\\' {
                self.advance();
            } else if c == quote {
                return Ok(());
            }
        }
        Err(ScanError::Unterminated {
            construct: "字符串",
            line,
        })
    }

    /// heredoc / nowdoc：`<<<ID`、`<<<"ID"`、`<<<'ID'`，结束标记允许缩进
    fn skip_heredoc(&mut self) -> ScanResult<()> {
        let line = self.line;
        self.advance_by(3);
        while matches!(self.peek(0), Some(' ' | '\t')) {
            self.advance();
        }
        let quoted = matches!(self.peek(0), Some('\'' | '"'));
        if quoted {
            self.advance();
        }
        let label = self.take_while(is_name_char);
        if label.is_empty() {
            return Err(ScanError::UnexpectedToken {
                expected: "heredoc 标记",
                found: self.peek(0).map(String::from).unwrap_or_default(),
                line,
            });
        }
        if quoted {
            self.advance();
        }

        while self.pos < self.chars.len() {
            if self.peek(0) == Some('\n') {
                self.advance();
                while matches!(self.peek(0), Some(' ' | '\t')) {
                    self.advance();
                }
                if self.starts_with(&label)
                    && !self.peek(label.chars().count()).is_some_and(is_name_char)
                {
                    self.advance_by(label.chars().count());
                    return Ok(());
                }
            } else {
                self.advance();
            }
        }
        Err(ScanError::Unterminated {
            construct: "heredoc",
            line,
        })
    }

    fn take_while(&mut self, predicate: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while self.peek(0).is_some_and(&predicate) {
            self.advance();
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn starts_with(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(offset, expected)| self.peek(offset) == Some(expected))
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek(0) {
            if c == '\n' {
                self.line += 1;
            }
            self.pos += 1;
        }
    }

    fn advance_by(&mut self, count: usize) {
        for _ in 0..count {
            self.advance();
        }
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || !c.is_ascii()
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || (!c.is_ascii() && !c.is_whitespace())
}
