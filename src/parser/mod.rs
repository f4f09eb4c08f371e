// パス: src/parser/mod.rs
// 役割: トークン列から AST を生成する再帰下降パーサのエントリポイント
// 意図: 字句解析結果を評価器に渡すためのモジュール構成を整理する
// 関連ファイル: src/parser/program.rs, src/parser/expr.rs, src/lexer.rs
//! 構文解析モジュール
//!
//! - 文（代入・import・式文）と式を解析する。
//! - 二項演算子の結合規則・優先順位は `INFIX_LEVELS` の表で管理する（`cmp > add > mul`）。
//! - 単項演算・累乗・`await` は表の下位でハンドコードする。

use crate::ast::{BinOp, CmpOp, Expr, Program, Stmt, UnaryOp};
use crate::errors::ParseError;
use crate::lexer::{lex, Token, TokenKind};

mod expr;
mod program;

/// 括弧・単項演算の入れ子の上限。超えたら構文エラーにする。
const MAX_NESTING: usize = 100;

pub struct Parser {
    ts: Vec<Token>,
    i: usize,
    depth: usize,
}

#[derive(Clone, Copy)]
pub(super) enum Assoc {
    Left,
    Non,
}

pub(super) struct InfixSpec {
    pub tokens: &'static [TokenKind],
    pub assoc: Assoc,
}

impl InfixSpec {
    pub(super) fn contains(&self, kind: &TokenKind) -> bool {
        self.tokens.iter().any(|tk| tk == kind)
    }
}

pub(super) const INFIX_LEVELS: &[InfixSpec] = &[
    InfixSpec {
        tokens: &[
            TokenKind::EQ,
            TokenKind::NE,
            TokenKind::LT,
            TokenKind::LE,
            TokenKind::GT,
            TokenKind::GE,
        ],
        assoc: Assoc::Non,
    },
    InfixSpec {
        tokens: &[TokenKind::PLUS, TokenKind::MINUS],
        assoc: Assoc::Left,
    },
    InfixSpec {
        tokens: &[
            TokenKind::STAR,
            TokenKind::SLASH,
            TokenKind::DBLSLASH,
            TokenKind::PERCENT,
        ],
        assoc: Assoc::Left,
    },
];

impl Parser {
    /// トークン列から新しいパーサインスタンスを構築する。
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            ts: tokens,
            i: 0,
            depth: 0,
        }
    }

    pub(super) fn peek(&self) -> &Token {
        // `lex` は必ず EOF を末尾に置くため、最後の要素で頭打ちにする。
        let idx = self.i.min(self.ts.len().saturating_sub(1));
        &self.ts[idx]
    }

    pub(super) fn pop_any(&mut self) -> Token {
        let t = self.peek().clone();
        if self.i < self.ts.len() {
            self.i += 1;
        }
        t
    }

    pub(super) fn peek_kind(&self, offset: usize) -> Option<TokenKind> {
        self.ts.get(self.i + offset).map(|t| t.kind.clone())
    }

    pub(super) fn pop(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        let t = self.peek().clone();
        if t.kind != kind {
            return Err(invalid_syntax(&t));
        }
        self.i += 1;
        Ok(t)
    }

    /// 入れ子を 1 段深くして `f` を解析する。
    pub(super) fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::new(
                "PAR020",
                "too many nested parentheses",
                Some(self.peek().pos),
            ));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    pub(super) fn accept(&mut self, kind: TokenKind) -> Option<Token> {
        if self.peek().kind == kind {
            Some(self.pop_any())
        } else {
            None
        }
    }
}

pub(super) fn invalid_syntax(token: &Token) -> ParseError {
    ParseError::new("PAR001", "invalid syntax", Some(token.pos))
}

/// クォートで囲まれた文字列リテラルを実際の文字列へ展開する。
pub(super) fn decode_string(quoted: &str) -> Result<String, ParseError> {
    let quote = match quoted.chars().next() {
        Some(q @ ('\'' | '"')) => q,
        _ => return Err(ParseError::new("PAR201", "malformed string literal", None)),
    };
    if quoted.len() < 2 || !quoted.ends_with(quote) {
        return Err(ParseError::new("PAR201", "malformed string literal", None));
    }
    let s = &quoted[1..quoted.len() - 1];
    let mut out = String::new();
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            let Some(e) = chars.next() else {
                return Err(ParseError::new("PAR202", "trailing backslash", None));
            };
            match e {
                'n' => out.push('\n'),
                'r' => out.push('\r'),
                't' => out.push('\t'),
                '0' => out.push('\0'),
                _ => out.push(e),
            }
        } else {
            out.push(ch);
        }
    }
    Ok(out)
}

/// 改行・`;` 区切りの文の列としてソースを解析する。
pub fn parse_program(src: &str) -> Result<Program, ParseError> {
    let ts = lex(src).map_err(|e| ParseError::new("PAR100", e.0.msg, e.0.pos))?;
    Parser::new(ts).parse_program()
}

/// 単一の式としてソースを解析する。前後の空行は許容する。
pub fn parse_expr(src: &str) -> Result<Expr, ParseError> {
    let ts = lex(src).map_err(|e| ParseError::new("PAR100", e.0.msg, e.0.pos))?;
    let mut p = Parser::new(ts);
    p.skip_separators();
    let e = p.parse_expr()?;
    p.skip_separators();
    if p.peek().kind != TokenKind::EOF {
        let t = p.peek().clone();
        return Err(invalid_syntax(&t));
    }
    Ok(e)
}
