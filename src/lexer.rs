// パス: src/lexer.rs
// 役割: 参照言語の字句解析器とトークン定義を提供する
// 意図: 構文解析に必要な位置付きトークンを生成する
// 関連ファイル: src/parser/mod.rs, src/errors.rs
//! 字句解析モジュール
//!
//! - ソースをトークン列へ変換する。改行は文の区切りとしてトークン化する。
//! - 正規表現ライブラリは使わず、1 文字ずつ手書きで走査する。
//! - すべてのトークンにバイト位置を記録し、診断情報と連携させる。

use crate::errors::LexerError;

#[derive(Debug, Clone, PartialEq, Eq)]
/// 生成されたトークンとその位置情報を保持するレコード。
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub pos: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// 字句解析で識別されるトークンの分類。
pub enum TokenKind {
    EOF,
    NEWLINE,
    // 演算子・記号トークン
    EQ,
    NE,
    LE,
    GE,
    LT,
    GT,
    PLUS,
    MINUS,
    DBLSTAR,
    STAR,
    DBLSLASH,
    SLASH,
    PERCENT,
    LPAREN,
    RPAREN,
    COMMA,
    DOT,
    SEMI,
    EQUAL,
    // リテラル分類
    STRING,
    FLOAT,
    INT,
    NAME,
    // キーワード分類
    IMPORT,
    FROM,
    AS,
    AWAIT,
    TRUE,
    FALSE,
    NONE,
}

/// 行内の空白かどうかを判定する（改行はトークンとして扱う）。
fn is_inline_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r')
}
/// 識別子の先頭に使用可能な文字かどうかを判定する。
fn is_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}
/// 識別子の後続として許容される文字か判定する。
fn is_ident_rest(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

struct Lexer<'a> {
    src: &'a str,
    cursor: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            cursor: 0,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexerError> {
        while self.cursor < self.src.len() {
            if self.consume_trivia() {
                continue;
            }
            self.lex_token()?;
        }
        self.push_simple(TokenKind::EOF, "", self.src.len());
        Ok(self.tokens)
    }

    fn consume_trivia(&mut self) -> bool {
        let mut advanced = false;
        while let Some(ch) = self.peek_char() {
            if is_inline_whitespace(ch) {
                self.advance_bytes(1);
                advanced = true;
            } else if ch == '#' {
                // 行末までのコメント
                while let Some(c) = self.peek_char() {
                    if c == '\n' {
                        break;
                    }
                    self.advance_bytes(c.len_utf8());
                }
                advanced = true;
            } else {
                break;
            }
        }
        advanced
    }

    fn lex_token(&mut self) -> Result<(), LexerError> {
        let start = self.cursor;
        let Some(ch) = self.peek_char() else {
            return Ok(());
        };
        if ch == '\n' {
            self.advance_bytes(1);
            self.push_simple(TokenKind::NEWLINE, "\n", start);
            return Ok(());
        }
        if self.try_multi_char_symbol(ch) || self.try_single_char_symbol(ch) {
            return Ok(());
        }
        if ch == '\'' || ch == '"' {
            return self.lex_string_literal(ch);
        }
        if ch.is_ascii_digit() {
            return self.lex_number();
        }
        if is_letter(ch) {
            self.lex_identifier_or_keyword();
            return Ok(());
        }
        Err(LexerError::new(
            "LEX090",
            format!("invalid character {:?}", ch),
            Some(start),
        ))
    }

    fn try_multi_char_symbol(&mut self, first: char) -> bool {
        let Some(second) = self.src[self.cursor + first.len_utf8()..].chars().next() else {
            return false;
        };
        let token = match (first, second) {
            ('=', '=') => Some((TokenKind::EQ, "==")),
            ('!', '=') => Some((TokenKind::NE, "!=")),
            ('<', '=') => Some((TokenKind::LE, "<=")),
            ('>', '=') => Some((TokenKind::GE, ">=")),
            ('*', '*') => Some((TokenKind::DBLSTAR, "**")),
            ('/', '/') => Some((TokenKind::DBLSLASH, "//")),
            _ => None,
        };
        if let Some((kind, value)) = token {
            let start = self.cursor;
            self.advance_bytes(2);
            self.push_simple(kind, value, start);
            return true;
        }
        false
    }

    fn try_single_char_symbol(&mut self, ch: char) -> bool {
        let token = match ch {
            '<' => Some((TokenKind::LT, "<")),
            '>' => Some((TokenKind::GT, ">")),
            '+' => Some((TokenKind::PLUS, "+")),
            '-' => Some((TokenKind::MINUS, "-")),
            '*' => Some((TokenKind::STAR, "*")),
            '/' => Some((TokenKind::SLASH, "/")),
            '%' => Some((TokenKind::PERCENT, "%")),
            '(' => Some((TokenKind::LPAREN, "(")),
            ')' => Some((TokenKind::RPAREN, ")")),
            ',' => Some((TokenKind::COMMA, ",")),
            '.' => Some((TokenKind::DOT, ".")),
            ';' => Some((TokenKind::SEMI, ";")),
            '=' => Some((TokenKind::EQUAL, "=")),
            _ => None,
        };
        if let Some((kind, value)) = token {
            let start = self.cursor;
            self.advance_bytes(1);
            self.push_simple(kind, value, start);
            return true;
        }
        false
    }

    fn lex_string_literal(&mut self, quote: char) -> Result<(), LexerError> {
        let start = self.cursor;
        self.advance_bytes(1); // 開始クォート
        let mut escaped = false;
        let mut ok = false;
        while let Some(ch) = self.peek_char() {
            self.advance_bytes(ch.len_utf8());
            if escaped {
                escaped = false;
                continue;
            }
            if ch == '\\' {
                escaped = true;
            } else if ch == quote {
                ok = true;
                break;
            } else if ch == '\n' {
                break;
            }
        }
        if !ok {
            return Err(LexerError::new(
                "LEX003",
                "unterminated string literal",
                Some(start),
            ));
        }
        let end = self.cursor;
        self.push_slice(TokenKind::STRING, start, end);
        Ok(())
    }

    fn lex_number(&mut self) -> Result<(), LexerError> {
        let start = self.cursor;
        self.take_while(|c| c.is_ascii_digit() || c == '_');
        let mut kind = TokenKind::INT;
        let rest = &self.src[self.cursor..];
        if rest.starts_with('.') && !rest[1..].starts_with('.') {
            self.advance_bytes(1);
            self.take_while(|c| c.is_ascii_digit());
            kind = TokenKind::FLOAT;
        }
        if matches!(self.peek_char(), Some('e' | 'E')) {
            let save = self.cursor;
            self.advance_bytes(1);
            if matches!(self.peek_char(), Some('+' | '-')) {
                self.advance_bytes(1);
            }
            if self.take_while(|c| c.is_ascii_digit()) == 0 {
                self.cursor = save;
            } else {
                kind = TokenKind::FLOAT;
            }
        }
        if matches!(self.peek_char(), Some(c) if is_letter(c)) {
            return Err(LexerError::new(
                "LEX020",
                "invalid decimal literal",
                Some(start),
            ));
        }
        let end = self.cursor;
        self.push_slice(kind, start, end);
        Ok(())
    }

    fn lex_identifier_or_keyword(&mut self) {
        let start = self.cursor;
        self.take_while(is_ident_rest);
        let word = &self.src[start..self.cursor];
        let kind = match word {
            "import" => TokenKind::IMPORT,
            "from" => TokenKind::FROM,
            "as" => TokenKind::AS,
            "await" => TokenKind::AWAIT,
            "True" => TokenKind::TRUE,
            "False" => TokenKind::FALSE,
            "None" => TokenKind::NONE,
            _ => TokenKind::NAME,
        };
        self.push_slice(kind, start, self.cursor);
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> usize {
        let start = self.cursor;
        while let Some(ch) = self.peek_char() {
            if !pred(ch) {
                break;
            }
            self.advance_bytes(ch.len_utf8());
        }
        self.cursor - start
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.cursor..].chars().next()
    }

    fn advance_bytes(&mut self, n: usize) {
        self.cursor = (self.cursor + n).min(self.src.len());
    }

    fn push_simple(&mut self, kind: TokenKind, value: &str, pos: usize) {
        self.tokens.push(Token {
            kind,
            value: value.to_string(),
            pos,
        });
    }

    fn push_slice(&mut self, kind: TokenKind, start: usize, end: usize) {
        let value = self.src[start..end].to_string();
        self.tokens.push(Token {
            kind,
            value,
            pos: start,
        });
    }
}

/// ソース文字列をトークン列へ変換する。末尾には必ず `EOF` が付く。
pub fn lex(src: &str) -> Result<Vec<Token>, LexerError> {
    Lexer::new(src).run()
}
