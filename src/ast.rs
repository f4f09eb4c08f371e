// パス: src/ast.rs
// 役割: Abstract syntax tree of the reference REPL language
// 意図: Give the parser and evaluator a neutral shared representation
// 関連ファイル: src/parser/mod.rs, src/evaluator.rs
//! 抽象構文木（AST）
//!
//! 設計ノート:
//! - 単項マイナスは `Unary` として保持し、評価器側で数値に適用する。
//! - `import` 系は束縛名を解決済みの形で持ち、評価器は名前の登録だけを行う。

// 式ノード
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Name {
        name: String,
    },
    IntLit {
        value: i64,
    },
    FloatLit {
        value: f64,
    },
    StringLit {
        value: String,
    },
    BoolLit {
        value: bool,
    },
    NoneLit,
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    BinOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Compare {
        op: CmpOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    Attr {
        value: Box<Expr>,
        name: String,
    },
    Await {
        value: Box<Expr>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl BinOp {
    /// エラーメッセージ用の演算子表記。
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

// 文ノード
#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    Assign {
        target: String,
        value: Expr,
    },
    /// `import m as a` / `from m import n as a` を正規化した束縛。
    Import {
        module: String,
        member: Option<String>,
        bind_as: String,
    },
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}
