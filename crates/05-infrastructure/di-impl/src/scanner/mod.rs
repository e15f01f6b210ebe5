//! 声明扫描器实现
//!
//! 在记号流上从左到右走一遍，维护三项滚动状态：当前命名空间、当前导入别名表、
//! 花括号深度。遇到类型声明时收集父类型列表，并按导入表把短名称解析为限定名。

mod lexer;

pub use lexer::{Lexer, Token, TokenKind};

use di_abstractions::DeclarationScanner;
use infrastructure_common::{
    DeclarationInfo, NamingConventions, ScanError, ScanResult, NAMESPACE_SEPARATOR,
};
use tracing::debug;

/// PHP 风格源文件的声明扫描器
#[derive(Debug, Default, Clone)]
pub struct PhpDeclarationScanner;

impl PhpDeclarationScanner {
    /// 创建扫描器
    pub fn new() -> Self {
        Self
    }
}

impl DeclarationScanner for PhpDeclarationScanner {
    fn scan(&self, source: &str) -> ScanResult<Vec<DeclarationInfo>> {
        let tokens = Lexer::new(source).tokenize()?;
        let declarations = DeclarationWalker::new(&tokens).walk()?;
        debug!("扫描完成，发现 {} 个类型声明", declarations.len());
        Ok(declarations)
    }

    fn name(&self) -> &str {
        "php"
    }
}

/// 类型声明的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclarationKind {
    Class,
    Interface,
    Trait,
    Enum,
}

impl DeclarationKind {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "class" => Some(Self::Class),
            "interface" => Some(Self::Interface),
            "trait" => Some(Self::Trait),
            "enum" => Some(Self::Enum),
            _ => None,
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Trait => "trait",
            Self::Enum => "enum",
        }
    }
}

/// 导入别名表，保持导入顺序
#[derive(Debug, Default)]
struct AliasTable {
    entries: Vec<(String, String)>,
}

impl AliasTable {
    fn insert(&mut self, alias: &str, target: String) {
        let key = alias.to_lowercase();
        self.entries.retain(|(existing, _)| *existing != key);
        self.entries.push((key, target));
    }

    fn get(&self, alias: &str) -> Option<&str> {
        let key = alias.to_lowercase();
        self.entries
            .iter()
            .find(|(existing, _)| *existing == key)
            .map(|(_, target)| target.as_str())
    }

    /// 目标以 `head` 结尾的第一个别名
    fn target_ending_with(&self, head: &str) -> Option<&str> {
        let head = head.to_lowercase();
        self.entries
            .iter()
            .map(|(_, target)| target.as_str())
            .find(|target| {
                let lowered = target.to_lowercase();
                lowered == head || lowered.ends_with(&format!("{NAMESPACE_SEPARATOR}{head}"))
            })
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

struct DeclarationWalker<'t> {
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
    namespace: String,
    /// 花括号形式命名空间的体所在深度
    namespace_depth: Option<usize>,
    aliases: AliasTable,
    open_braces: Vec<usize>,
    declarations: Vec<DeclarationInfo>,
}

impl<'t> DeclarationWalker<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            namespace: String::new(),
            namespace_depth: None,
            aliases: AliasTable::default(),
            open_braces: Vec::new(),
            declarations: Vec::new(),
        }
    }

    fn walk(mut self) -> ScanResult<Vec<DeclarationInfo>> {
        while !self.at_eof() {
            let token = self.current().clone();
            match &token.kind {
                TokenKind::Symbol('{') => {
                    self.depth += 1;
                    self.open_braces.push(token.line);
                    self.pos += 1;
                }
                TokenKind::Symbol('}') => {
                    if self.depth == 0 {
                        return Err(ScanError::UnexpectedToken {
                            expected: "与之匹配的 `{`",
                            found: "}".to_string(),
                            line: token.line,
                        });
                    }
                    self.depth -= 1;
                    self.open_braces.pop();
                    if self.namespace_depth == Some(self.depth + 1) {
                        self.namespace_depth = None;
                        self.namespace.clear();
                        self.aliases.clear();
                    }
                    self.pos += 1;
                }
                TokenKind::Name(word) if self.is_statement_start() => {
                    let word = word.to_ascii_lowercase();
                    match word.as_str() {
                        "namespace" if self.depth == 0 => self.namespace_statement()?,
                        "use" if self.depth == self.namespace_level() => self.use_statement()?,
                        _ => self.maybe_declaration()?,
                    }
                }
                _ => self.pos += 1,
            }
        }

        if let Some(line) = self.open_braces.first() {
            return Err(ScanError::Unterminated {
                construct: "代码块",
                line: *line,
            });
        }
        Ok(self.declarations)
    }

    /// 前一个记号是否允许语句或声明从这里开始
    ///
    /// `Foo::class`、`$obj->class`、`function list()`、`new class` 中的关键字不是声明。
    fn is_statement_start(&self) -> bool {
        let Some(previous) = self.pos.checked_sub(1).map(|index| &self.tokens[index]) else {
            return true;
        };
        !matches!(
            previous.kind,
            TokenKind::DoubleColon | TokenKind::ObjectOperator
        ) && !previous.is_keyword("function")
            && !previous.is_keyword("fn")
            && !previous.is_keyword("const")
            && !previous.is_keyword("new")
    }

    fn namespace_level(&self) -> usize {
        self.namespace_depth.unwrap_or(0)
    }

    fn namespace_statement(&mut self) -> ScanResult<()> {
        let start = self.current().line;
        self.pos += 1;
        let mut name = String::new();
        loop {
            let token = self.current().clone();
            match &token.kind {
                TokenKind::Name(segment) => {
                    name.push_str(segment);
                    self.pos += 1;
                }
                TokenKind::Symbol(';') => {
                    self.pos += 1;
                    break;
                }
                TokenKind::Symbol('{') => {
                    // 花括号形式：命名空间在对应的 `}` 处结束
                    self.namespace_depth = Some(self.depth + 1);
                    break;
                }
                TokenKind::Eof => {
                    return Err(ScanError::Unterminated {
                        construct: "namespace",
                        line: start,
                    })
                }
                _ => {
                    return Err(ScanError::UnexpectedToken {
                        expected: "命名空间名称",
                        found: token.describe(),
                        line: token.line,
                    })
                }
            }
        }
        self.namespace = NamingConventions::canonical_name(&name);
        self.aliases.clear();
        Ok(())
    }

    fn use_statement(&mut self) -> ScanResult<()> {
        let start = self.current().line;
        self.pos += 1;

        // 闭包的 `use (...)`
        if self.current().is_symbol('(') {
            return Ok(());
        }
        // `use function` / `use const` 与类型解析无关
        if self.current().is_keyword("function") || self.current().is_keyword("const") {
            return self.skip_to_terminator("use", start);
        }

        loop {
            let token = self.current().clone();
            let prefix = match &token.kind {
                TokenKind::Name(name) => {
                    self.pos += 1;
                    name.clone()
                }
                TokenKind::Eof => {
                    return Err(ScanError::Unterminated {
                        construct: "use",
                        line: start,
                    })
                }
                _ => {
                    return Err(ScanError::UnexpectedToken {
                        expected: "导入的名称",
                        found: token.describe(),
                        line: token.line,
                    })
                }
            };

            if self.current().is_symbol('{') {
                self.pos += 1;
                self.use_group(&prefix, start)?;
            } else {
                let alias = self.optional_alias(start)?;
                self.add_import(&prefix, alias);
            }

            let token = self.current().clone();
            match token.kind {
                TokenKind::Symbol(',') => self.pos += 1,
                TokenKind::Symbol(';') => {
                    self.pos += 1;
                    return Ok(());
                }
                TokenKind::Eof => {
                    return Err(ScanError::Unterminated {
                        construct: "use",
                        line: start,
                    })
                }
                _ => {
                    return Err(ScanError::UnexpectedToken {
                        expected: "`,` 或 `;`",
                        found: token.describe(),
                        line: token.line,
                    })
                }
            }
        }
    }

    /// 分组导入 `use A\{B, C as D}`，左花括号已消费
    fn use_group(&mut self, prefix: &str, start: usize) -> ScanResult<()> {
        loop {
            let token = self.current().clone();
            match &token.kind {
                TokenKind::Symbol('}') => {
                    self.pos += 1;
                    return Ok(());
                }
                TokenKind::Symbol(',') => self.pos += 1,
                TokenKind::Name(word)
                    if word.eq_ignore_ascii_case("function") || word.eq_ignore_ascii_case("const") =>
                {
                    // 混合分组中的函数/常量导入
                    self.pos += 1;
                    if self.current().name().is_some() {
                        self.pos += 1;
                    }
                    self.optional_alias(start)?;
                }
                TokenKind::Name(name) => {
                    self.pos += 1;
                    let alias = self.optional_alias(start)?;
                    let full = format!(
                        "{}{NAMESPACE_SEPARATOR}{}",
                        prefix.trim_end_matches(NAMESPACE_SEPARATOR),
                        name
                    );
                    self.add_import(&full, alias);
                }
                TokenKind::Eof => {
                    return Err(ScanError::Unterminated {
                        construct: "use",
                        line: start,
                    })
                }
                _ => {
                    return Err(ScanError::UnexpectedToken {
                        expected: "分组导入的名称",
                        found: token.describe(),
                        line: token.line,
                    })
                }
            }
        }
    }

    fn optional_alias(&mut self, start: usize) -> ScanResult<Option<String>> {
        if !self.current().is_keyword("as") {
            return Ok(None);
        }
        self.pos += 1;
        let token = self.current().clone();
        match &token.kind {
            TokenKind::Name(alias) => {
                let alias = alias.clone();
                self.pos += 1;
                Ok(Some(alias))
            }
            TokenKind::Eof => Err(ScanError::Unterminated {
                construct: "use",
                line: start,
            }),
            _ => Err(ScanError::UnexpectedToken {
                expected: "别名",
                found: token.describe(),
                line: token.line,
            }),
        }
    }

    fn add_import(&mut self, name: &str, alias: Option<String>) {
        let target = NamingConventions::canonical_name(name);
        let alias = alias.unwrap_or_else(|| NamingConventions::short_name(&target).to_string());
        self.aliases.insert(&alias, target);
    }

    fn maybe_declaration(&mut self) -> ScanResult<()> {
        let start = self.pos;
        let mut instantiable = true;
        let mut cursor = self.pos;

        // 修饰符
        loop {
            let token = &self.tokens[cursor];
            if token.is_keyword("abstract") {
                instantiable = false;
            } else if !(token.is_keyword("final") || token.is_keyword("readonly")) {
                break;
            }
            cursor += 1;
        }

        let keyword = &self.tokens[cursor];
        let Some(kind) = keyword.name().and_then(DeclarationKind::from_keyword) else {
            self.pos = start + 1;
            return Ok(());
        };
        if kind != DeclarationKind::Class && cursor != start {
            // 修饰符只能修饰 class
            self.pos = start + 1;
            return Ok(());
        }
        if kind == DeclarationKind::Enum && !self.looks_like_enum(cursor) {
            self.pos = start + 1;
            return Ok(());
        }

        let line = keyword.line;
        self.pos = cursor + 1;
        let name_token = self.current();
        let name = match &name_token.kind {
            TokenKind::Name(name) if !name.contains(NAMESPACE_SEPARATOR) => name.clone(),
            TokenKind::Eof => {
                return Err(ScanError::Unterminated {
                    construct: kind.keyword(),
                    line,
                })
            }
            _ => {
                return Err(ScanError::UnexpectedToken {
                    expected: "类型名称",
                    found: name_token.describe(),
                    line: name_token.line,
                })
            }
        };
        self.pos += 1;

        let instantiable = match kind {
            DeclarationKind::Class => instantiable,
            DeclarationKind::Interface | DeclarationKind::Trait | DeclarationKind::Enum => false,
        };
        let mut declaration =
            DeclarationInfo::new(NamingConventions::join(&self.namespace, &name), instantiable);
        declaration.line = line;

        loop {
            let token = self.current().clone();
            match &token.kind {
                TokenKind::Symbol('{') => break,
                TokenKind::Name(word) if word.eq_ignore_ascii_case("extends") => {
                    self.pos += 1;
                    declaration.extends.extend(self.parent_list(kind, line)?);
                }
                TokenKind::Name(word) if word.eq_ignore_ascii_case("implements") => {
                    self.pos += 1;
                    declaration.implements.extend(self.parent_list(kind, line)?);
                }
                // 回退枚举的底层类型 `enum Suit: string`
                TokenKind::Symbol(':') if kind == DeclarationKind::Enum => {
                    self.pos += 1;
                    if self.current().name().is_some() {
                        self.pos += 1;
                    }
                }
                TokenKind::Eof => {
                    return Err(ScanError::Unterminated {
                        construct: kind.keyword(),
                        line,
                    })
                }
                _ => {
                    return Err(ScanError::UnexpectedToken {
                        expected: "extends、implements 或 `{`",
                        found: token.describe(),
                        line: token.line,
                    })
                }
            }
        }

        debug!("发现类型声明: {} (第 {} 行)", declaration.name, line);
        self.declarations.push(declaration);
        Ok(())
    }

    /// `enum` 不是保留字，只有 `enum Name {`、`enum Name:`、`enum Name implements` 才是声明
    fn looks_like_enum(&self, cursor: usize) -> bool {
        let Some(next) = self.tokens.get(cursor + 2) else {
            return false;
        };
        self.tokens[cursor + 1].name().is_some()
            && (next.is_symbol('{') || next.is_symbol(':') || next.is_keyword("implements"))
    }

    /// 逗号分隔的父类型列表，在 `{` 或下一个段关键字前停止
    fn parent_list(&mut self, kind: DeclarationKind, line: usize) -> ScanResult<Vec<String>> {
        let mut parents = Vec::new();
        loop {
            let token = self.current().clone();
            match &token.kind {
                TokenKind::Name(name)
                    if !name.eq_ignore_ascii_case("implements")
                        && !name.eq_ignore_ascii_case("extends") =>
                {
                    parents.push(self.resolve_name(name));
                    self.pos += 1;
                }
                TokenKind::Eof => {
                    return Err(ScanError::Unterminated {
                        construct: kind.keyword(),
                        line,
                    })
                }
                _ => {
                    return Err(ScanError::UnexpectedToken {
                        expected: "父类型名称",
                        found: token.describe(),
                        line: token.line,
                    })
                }
            }

            if self.current().is_symbol(',') {
                self.pos += 1;
            } else {
                return Ok(parents);
            }
        }
    }

    /// 按当前命名空间与导入表解析父类型名称
    fn resolve_name(&self, name: &str) -> String {
        if NamingConventions::is_fully_qualified(name) {
            return NamingConventions::canonical_name(name);
        }
        if let Some(target) = self.aliases.get(name) {
            return target.to_string();
        }
        if let Some((head, tail)) = name.split_once(NAMESPACE_SEPARATOR) {
            if head.eq_ignore_ascii_case("namespace") {
                return NamingConventions::join(&self.namespace, tail);
            }
            if let Some(target) = self.aliases.get(head).or_else(|| self.aliases.target_ending_with(head)) {
                return NamingConventions::join(target, tail);
            }
        }
        NamingConventions::join(&self.namespace, name)
    }

    fn skip_to_terminator(&mut self, construct: &'static str, start: usize) -> ScanResult<()> {
        loop {
            match self.current().kind.clone() {
                TokenKind::Symbol(';') => {
                    self.pos += 1;
                    return Ok(());
                }
                TokenKind::Eof => {
                    return Err(ScanError::Unterminated {
                        construct,
                        line: start,
                    })
                }
                _ => self.pos += 1,
            }
        }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn at_eof(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(source: &str) -> Vec<DeclarationInfo> {
        PhpDeclarationScanner::new().scan(source).unwrap()
    }

    #[test]
    fn empty_file_has_no_declarations() {
        assert!(scan("").is_empty());
        assert!(scan("<?php\n").is_empty());
    }

    #[test]
    fn class_with_parents_resolved_through_imports() {
        let source = r#"<?php
namespace App\Mail;

use Vendor\Transport\TransportInterface;
use Vendor\Base\AbstractMailer as BaseMailer;
use Psr\Log;

final class SmtpMailer extends BaseMailer implements TransportInterface, Log\LoggerAwareInterface, \Countable
{
    use SomeTrait;

    public function count(): int { return 0; }
}
"#;
        let declarations = scan(source);
        assert_eq!(declarations.len(), 1);
        let mailer = &declarations[0];
        assert_eq!(mailer.name, "App\\Mail\\SmtpMailer");
        assert_eq!(mailer.extends, vec!["Vendor\\Base\\AbstractMailer"]);
        assert_eq!(
            mailer.implements,
            vec![
                "Vendor\\Transport\\TransportInterface",
                "Psr\\Log\\LoggerAwareInterface",
                "Countable"
            ]
        );
        assert!(mailer.instantiable);
        assert_eq!(mailer.line, 8);
    }

    #[test]
    fn abstract_interface_trait_and_enum_are_not_instantiable() {
        let source = r#"<?php
namespace Shapes;
abstract class Shape {}
interface Drawable extends Renderable, \Stringable {}
trait Named {}
enum Suit: string implements Drawable { case Hearts = 'H'; }
readonly final class Circle extends Shape implements Drawable {}
"#;
        let declarations = scan(source);
        let summary: Vec<_> = declarations
            .iter()
            .map(|d| (d.name.as_str(), d.instantiable))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Shapes\\Shape", false),
                ("Shapes\\Drawable", false),
                ("Shapes\\Named", false),
                ("Shapes\\Suit", false),
                ("Shapes\\Circle", true),
            ]
        );
        assert_eq!(declarations[1].extends, vec!["Shapes\\Renderable", "Stringable"]);
        assert_eq!(declarations[3].implements, vec!["Shapes\\Drawable"]);
    }

    #[test]
    fn class_constants_and_anonymous_classes_are_ignored() {
        let source = r#"<?php
namespace App;
$name = Foo::class;
$handler = new class extends Base {};
$obj->class = 1;
function enum() {}
class Real {}
"#;
        let names: Vec<_> = scan(source).into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["App\\Real"]);
    }

    #[test]
    fn braced_namespaces_reset_state() {
        let source = r#"<?php
namespace First {
    use Lib\Base;
    class A extends Base {}
}
namespace Second {
    class B extends Base {}
}
namespace {
    class Root {}
}
"#;
        let declarations = scan(source);
        assert_eq!(declarations[0].name, "First\\A");
        assert_eq!(declarations[0].extends, vec!["Lib\\Base"]);
        assert_eq!(declarations[1].name, "Second\\B");
        assert_eq!(declarations[1].extends, vec!["Second\\Base"]);
        assert_eq!(declarations[2].name, "Root");
    }

    #[test]
    fn grouped_imports_and_function_imports() {
        let source = r#"<?php
namespace App;
use Lib\Contracts\{Reader, Writer as Out, function helper};
use function Lib\strlen;
use const Lib\VERSION;
class Stream implements Reader, Out {}
"#;
        let declarations = scan(source);
        assert_eq!(
            declarations[0].implements,
            vec!["Lib\\Contracts\\Reader", "Lib\\Contracts\\Writer"]
        );
    }

    #[test]
    fn namespace_relative_and_alias_suffix_resolution() {
        let source = r#"<?php
namespace App;
use Vendor\Package\Http;
use Vendor\Package as Pkg;
class A extends namespace\Base implements Http\Client, Package\Http\Server {}
"#;
        let declaration = &scan(source)[0];
        assert_eq!(declaration.extends, vec!["App\\Base"]);
        assert_eq!(
            declaration.implements,
            vec!["Vendor\\Package\\Http\\Client", "Vendor\\Package\\Http\\Server"]
        );
    }

    #[test]
    fn closure_use_is_not_an_import() {
        let source = r#"<?php
namespace App;
$fn = function () use ($x) { return $x; };
class A extends x {}
"#;
        assert_eq!(scan(source)[0].extends, vec!["App\\x"]);
    }

    #[test]
    fn unterminated_statements_are_errors() {
        let scanner = PhpDeclarationScanner::new();
        assert_eq!(
            scanner.scan("<?php\nnamespace App"),
            Err(ScanError::Unterminated {
                construct: "namespace",
                line: 2
            })
        );
        assert!(matches!(
            scanner.scan("<?php use A\\B"),
            Err(ScanError::Unterminated { construct: "use", .. })
        ));
        assert!(matches!(
            scanner.scan("<?php class A extends B"),
            Err(ScanError::Unterminated { construct: "class", .. })
        ));
        assert!(matches!(
            scanner.scan("<?php class A {\n function f() {"),
            Err(ScanError::Unterminated { construct: "代码块", line: 1 })
        ));
        assert!(matches!(
            scanner.scan("<?php class A extends ; {}"),
            Err(ScanError::UnexpectedToken { .. })
        ));
    }
}
