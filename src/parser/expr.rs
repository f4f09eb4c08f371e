// パス: src/parser/expr.rs
// 役割: 式の解析に関する `Parser` 実装をまとめる
// 意図: 中置演算・単項演算・後置チェーンのロジックを専用モジュールに切り分ける
// 関連ファイル: src/parser/program.rs, src/parser/mod.rs

use super::*;

impl Parser {
    pub(super) fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.nested(|p| p.parse_infix_level(0))
    }

    fn parse_infix_level(&mut self, level: usize) -> Result<Expr, ParseError> {
        if level >= INFIX_LEVELS.len() {
            return self.parse_unary();
        }
        let spec = &INFIX_LEVELS[level];
        let mut left = self.parse_infix_level(level + 1)?;
        match spec.assoc {
            Assoc::Left => {
                while spec.contains(&self.peek().kind) {
                    let op_token = self.pop_any();
                    let right = self.parse_infix_level(level + 1)?;
                    left = Self::mk_binop(left, &op_token, right)?;
                }
                Ok(left)
            }
            Assoc::Non => {
                if spec.contains(&self.peek().kind) {
                    let op_token = self.pop_any();
                    let right = self.parse_infix_level(level + 1)?;
                    left = Self::mk_binop(left, &op_token, right)?;
                    if spec.contains(&self.peek().kind) {
                        // 連鎖比較は未対応
                        return Err(invalid_syntax(self.peek()));
                    }
                }
                Ok(left)
            }
        }
    }

    fn mk_binop(left: Expr, op_token: &Token, right: Expr) -> Result<Expr, ParseError> {
        let arith = match op_token.kind {
            TokenKind::PLUS => Some(BinOp::Add),
            TokenKind::MINUS => Some(BinOp::Sub),
            TokenKind::STAR => Some(BinOp::Mul),
            TokenKind::SLASH => Some(BinOp::Div),
            TokenKind::DBLSLASH => Some(BinOp::FloorDiv),
            TokenKind::PERCENT => Some(BinOp::Mod),
            _ => None,
        };
        if let Some(op) = arith {
            return Ok(Expr::BinOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        let op = match op_token.kind {
            TokenKind::EQ => CmpOp::Eq,
            TokenKind::NE => CmpOp::Ne,
            TokenKind::LT => CmpOp::Lt,
            TokenKind::LE => CmpOp::Le,
            TokenKind::GT => CmpOp::Gt,
            TokenKind::GE => CmpOp::Ge,
            _ => return Err(invalid_syntax(op_token)),
        };
        Ok(Expr::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek().kind {
            TokenKind::MINUS => UnaryOp::Neg,
            TokenKind::PLUS => UnaryOp::Pos,
            _ => return self.parse_power(),
        };
        self.pop_any();
        let operand = self.nested(Self::parse_unary)?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    // power := await_primary ['**' unary]
    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_await()?;
        if self.accept(TokenKind::DBLSTAR).is_some() {
            let exp = self.nested(Self::parse_unary)?;
            return Ok(Expr::BinOp {
                op: BinOp::Pow,
                left: Box::new(base),
                right: Box::new(exp),
            });
        }
        Ok(base)
    }

    fn parse_await(&mut self) -> Result<Expr, ParseError> {
        if self.accept(TokenKind::AWAIT).is_some() {
            let value = self.parse_postfix()?;
            return Ok(Expr::Await {
                value: Box::new(value),
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_atom()?;
        loop {
            if self.accept(TokenKind::DOT).is_some() {
                let name = self.pop(TokenKind::NAME)?.value;
                expr = Expr::Attr {
                    value: Box::new(expr),
                    name,
                };
            } else if self.accept(TokenKind::LPAREN).is_some() {
                let args = self.parse_call_args()?;
                expr = Expr::Call {
                    func: Box::new(expr),
                    args,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if self.accept(TokenKind::RPAREN).is_some() {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            if self.accept(TokenKind::COMMA).is_some() {
                if self.accept(TokenKind::RPAREN).is_some() {
                    return Ok(args);
                }
                continue;
            }
            self.pop(TokenKind::RPAREN)?;
            return Ok(args);
        }
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        let t = self.pop_any();
        match t.kind {
            TokenKind::INT => {
                let digits: String = t.value.chars().filter(|c| *c != '_').collect();
                let value = digits.parse::<i64>().map_err(|_| {
                    ParseError::new("PAR010", "integer literal out of range", Some(t.pos))
                })?;
                Ok(Expr::IntLit { value })
            }
            TokenKind::FLOAT => {
                let value = t.value.parse::<f64>().map_err(|_| {
                    ParseError::new("PAR011", "invalid float literal", Some(t.pos))
                })?;
                Ok(Expr::FloatLit { value })
            }
            TokenKind::STRING => Ok(Expr::StringLit {
                value: decode_string(&t.value)?,
            }),
            TokenKind::TRUE => Ok(Expr::BoolLit { value: true }),
            TokenKind::FALSE => Ok(Expr::BoolLit { value: false }),
            TokenKind::NONE => Ok(Expr::NoneLit),
            TokenKind::NAME => Ok(Expr::Name { name: t.value }),
            TokenKind::LPAREN => {
                let inner = self.parse_expr()?;
                self.pop(TokenKind::RPAREN)?;
                Ok(inner)
            }
            _ => Err(invalid_syntax(&t)),
        }
    }
}
