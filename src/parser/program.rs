// パス: src/parser/program.rs
// 役割: 文（代入・import・式文）の構文解析ルーチンを実装する
// 意図: プログラム全体の解析ロジックを式解析から分離し可読性を高める
// 関連ファイル: src/parser/expr.rs, src/parser/mod.rs

use super::*;

impl Parser {
    pub(super) fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut stmts = Vec::new();
        self.skip_separators();
        while self.peek().kind != TokenKind::EOF {
            stmts.push(self.parse_stmt()?);
            match self.peek().kind {
                TokenKind::EOF => break,
                TokenKind::NEWLINE | TokenKind::SEMI => self.skip_separators(),
                _ => return Err(invalid_syntax(self.peek())),
            }
        }
        Ok(Program { stmts })
    }

    pub(super) fn skip_separators(&mut self) {
        while matches!(self.peek().kind, TokenKind::NEWLINE | TokenKind::SEMI) {
            self.pop_any();
        }
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.peek().kind {
            TokenKind::IMPORT => self.parse_import(),
            TokenKind::FROM => self.parse_from_import(),
            TokenKind::NAME if self.peek_kind(1) == Some(TokenKind::EQUAL) => {
                let target = self.pop_any().value;
                self.pop(TokenKind::EQUAL)?;
                let value = self.parse_expr()?;
                Ok(Stmt::Assign { target, value })
            }
            _ => Ok(Stmt::Expr(self.parse_expr()?)),
        }
    }

    fn parse_import(&mut self) -> Result<Stmt, ParseError> {
        self.pop(TokenKind::IMPORT)?;
        let module = self.pop(TokenKind::NAME)?.value;
        let bind_as = self.parse_alias()?.unwrap_or_else(|| module.clone());
        Ok(Stmt::Import {
            module,
            member: None,
            bind_as,
        })
    }

    fn parse_from_import(&mut self) -> Result<Stmt, ParseError> {
        self.pop(TokenKind::FROM)?;
        let module = self.pop(TokenKind::NAME)?.value;
        self.pop(TokenKind::IMPORT)?;
        let member = self.pop(TokenKind::NAME)?.value;
        let bind_as = self.parse_alias()?.unwrap_or_else(|| member.clone());
        Ok(Stmt::Import {
            module,
            member: Some(member),
            bind_as,
        })
    }

    fn parse_alias(&mut self) -> Result<Option<String>, ParseError> {
        if self.accept(TokenKind::AS).is_some() {
            return Ok(Some(self.pop(TokenKind::NAME)?.value));
        }
        Ok(None)
    }
}
