// パス: src/evaluator.rs
// 役割: Reference interpreter implementing the REPL evaluator contract
// 意図: Make the loop usable end to end with Python-compatible values and error categories
// 関連ファイル: src/ast.rs, src/parser/mod.rs, src/repl/executor.rs, src/repl/rewrite.rs
//! 参照評価器（interpreter）
//!
//! 目的:
//! - REPL の評価器契約（中断可能な投入・即時評価）を満たす最小の言語処理系。
//! - 値の表示は Python の `repr`、エラーは Python の例外名とメッセージに揃える。
//!
//! 仕様要点:
//! - 整数は i64。桁あふれは `OverflowError` として報告する。
//! - `//` と `%` は床除算の規則（結果の符号は除数に従う）。
//! - `await` は中断可能経路でのみ有効。直接経路では `SyntaxError` になる。
//! - 直接経路では各評価ステップで割り込みフラグを確認し、`KeyboardInterrupt` を送出する。

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_recursion::async_recursion;
use async_trait::async_trait;
use futures::FutureExt;
use tracing::{debug, trace};

use crate::ast::{BinOp, CmpOp, Expr, Stmt, UnaryOp};
use crate::errors::EvalError;
use crate::parser::{parse_expr, parse_program};
use crate::repl::executor::Evaluator;
use crate::repl::interrupt::InterruptFlag;
use crate::repl::output::Console;
use crate::repl::rewrite::SuspendableUnit;

/// ブロッキングスリープが割り込みを確認する間隔。
const SLEEP_POLL: Duration = Duration::from_millis(5);
/// 文字列の繰り返しで作れる長さの上限（バイト）。
const MAX_REPEAT_BYTES: usize = 1 << 30;

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Builtin(Builtin),
    Module(Module),
    Awaitable(Awaitable),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Builtin {
    Print,
    Str,
    Abs,
    Len,
    SleepMs,
    MathSqrt,
    AsyncioSleep,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Module {
    Math,
    Asyncio,
}

/// `await` できる値。
#[derive(Clone, Debug, PartialEq)]
pub enum Awaitable {
    Sleep(Duration),
}

/// グローバル名前空間。組み込み関数はここには入らず、名前解決の最後に参照される。
pub type Namespace = HashMap<String, Value>;

impl Builtin {
    fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "print" => Builtin::Print,
            "str" => Builtin::Str,
            "abs" => Builtin::Abs,
            "len" => Builtin::Len,
            "sleep_ms" => Builtin::SleepMs,
            _ => return None,
        })
    }

    fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Str => "str",
            Builtin::Abs => "abs",
            Builtin::Len => "len",
            Builtin::SleepMs => "sleep_ms",
            Builtin::MathSqrt => "sqrt",
            Builtin::AsyncioSleep => "sleep",
        }
    }
}

impl Module {
    fn named(name: &str) -> Option<Self> {
        match name {
            "math" => Some(Module::Math),
            "asyncio" => Some(Module::Asyncio),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Module::Math => "math",
            Module::Asyncio => "asyncio",
        }
    }

    fn member(self, name: &str) -> Option<Value> {
        match (self, name) {
            (Module::Math, "pi") => Some(Value::Float(std::f64::consts::PI)),
            (Module::Math, "sqrt") => Some(Value::Builtin(Builtin::MathSqrt)),
            (Module::Asyncio, "sleep") => Some(Value::Builtin(Builtin::AsyncioSleep)),
            _ => None,
        }
    }
}

impl Value {
    /// Python の型名（エラーメッセージ用）。
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Builtin(_) => "builtin_function_or_method",
            Value::Module(_) => "module",
            Value::Awaitable(_) => "coroutine",
        }
    }

    /// `str()` / `print` 用の表現。文字列は引用符なし、それ以外は `repr` と同じ。
    pub fn to_str_form(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// `None` を「値なし」として扱う。
    pub fn into_option(self) -> Option<Value> {
        match self {
            Value::None => None,
            other => Some(other),
        }
    }

    fn as_num(&self) -> Option<Num> {
        match self {
            Value::Bool(b) => Some(Num::Int(i64::from(*b))),
            Value::Int(i) => Some(Num::Int(*i)),
            Value::Float(x) => Some(Num::Float(*x)),
            _ => None,
        }
    }
}

/// `repr` 相当の表示。
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => f.write_str(&float_repr(*x)),
            Value::Str(s) => f.write_str(&str_repr(s)),
            Value::Builtin(b) => write!(f, "<built-in function {}>", b.name()),
            Value::Module(m) => write!(f, "<module '{}'>", m.name()),
            Value::Awaitable(Awaitable::Sleep(_)) => f.write_str("<coroutine object sleep>"),
        }
    }
}

fn float_repr(x: f64) -> String {
    if x.is_nan() {
        return "nan".into();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.into();
    }
    let abs = x.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        let sci = format!("{:e}", x);
        if let Some((mantissa, exp)) = sci.split_once('e') {
            if let Ok(exp) = exp.parse::<i32>() {
                let sign = if exp < 0 { '-' } else { '+' };
                return format!("{}e{}{:02}", mantissa, sign, exp.unsigned_abs());
            }
        }
        return sci;
    }
    if x.fract() == 0.0 {
        format!("{:.1}", x)
    } else {
        format!("{}", x)
    }
}

fn str_repr(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c < ' ' || c == '\x7f' => out.push_str(&format!("\\x{:02x}", u32::from(c))),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

#[derive(Clone, Copy, Debug)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn to_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(x) => x,
        }
    }
}

fn type_error(message: impl Into<String>) -> EvalError {
    EvalError::new("TypeError", message)
}

fn zero_division(message: &str) -> EvalError {
    EvalError::new("ZeroDivisionError", message)
}

fn overflow() -> EvalError {
    EvalError::new("OverflowError", "integer overflow")
}

fn await_outside_function() -> EvalError {
    EvalError::syntax("'await' outside function")
}

fn unsupported(op: BinOp, left: &Value, right: &Value) -> EvalError {
    let symbol = match op {
        BinOp::Pow => "** or pow()",
        other => other.symbol(),
    };
    type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        symbol,
        left.type_name(),
        right.type_name()
    ))
}

fn unary(op: UnaryOp, operand: &Value) -> Result<Value, EvalError> {
    match (op, operand.as_num()) {
        (UnaryOp::Neg, Some(Num::Int(i))) => i.checked_neg().map(Value::Int).ok_or_else(overflow),
        (UnaryOp::Neg, Some(Num::Float(x))) => Ok(Value::Float(-x)),
        (UnaryOp::Pos, Some(Num::Int(i))) => Ok(Value::Int(i)),
        (UnaryOp::Pos, Some(Num::Float(x))) => Ok(Value::Float(x)),
        (_, None) => {
            let symbol = if op == UnaryOp::Neg { "-" } else { "+" };
            Err(type_error(format!(
                "bad operand type for unary {}: '{}'",
                symbol,
                operand.type_name()
            )))
        }
    }
}

fn binary(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (op, left, right) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => return Ok(Value::Str(format!("{}{}", a, b))),
        (BinOp::Mul, Value::Str(s), Value::Int(n)) | (BinOp::Mul, Value::Int(n), Value::Str(s)) => {
            return repeat_str(s, *n);
        }
        _ => {}
    }
    match (left.as_num(), right.as_num()) {
        (Some(Num::Int(x)), Some(Num::Int(y))) => int_binary(op, x, y),
        (Some(a), Some(b)) => float_binary(op, a.to_f64(), b.to_f64()),
        _ => Err(unsupported(op, left, right)),
    }
}

fn repeat_str(s: &str, n: i64) -> Result<Value, EvalError> {
    let count = usize::try_from(n).unwrap_or(0);
    if s.is_empty() || count == 0 {
        return Ok(Value::Str(String::new()));
    }
    let total = s
        .len()
        .checked_mul(count)
        .filter(|total| *total <= MAX_REPEAT_BYTES)
        .ok_or_else(|| EvalError::new("MemoryError", "repeated string is too long"))?;
    let mut repeated = String::new();
    repeated
        .try_reserve_exact(total)
        .map_err(|_| EvalError::new("MemoryError", "repeated string is too long"))?;
    for _ in 0..count {
        repeated.push_str(s);
    }
    Ok(Value::Str(repeated))
}

fn int_binary(op: BinOp, x: i64, y: i64) -> Result<Value, EvalError> {
    let result = match op {
        BinOp::Add => x.checked_add(y),
        BinOp::Sub => x.checked_sub(y),
        BinOp::Mul => x.checked_mul(y),
        BinOp::Div => {
            if y == 0 {
                return Err(zero_division("division by zero"));
            }
            return Ok(Value::Float(x as f64 / y as f64));
        }
        BinOp::FloorDiv => {
            if y == 0 {
                return Err(zero_division("integer division or modulo by zero"));
            }
            x.checked_div(y)
                .map(|q| if x % y != 0 && (x < 0) != (y < 0) { q - 1 } else { q })
        }
        BinOp::Mod => {
            if y == 0 {
                return Err(zero_division("integer division or modulo by zero"));
            }
            x.checked_rem(y)
                .map(|r| if r != 0 && (r < 0) != (y < 0) { r + y } else { r })
        }
        BinOp::Pow => {
            if y < 0 {
                if x == 0 {
                    return Err(zero_division("0.0 cannot be raised to a negative power"));
                }
                return Ok(Value::Float((x as f64).powf(y as f64)));
            }
            u32::try_from(y).ok().and_then(|e| x.checked_pow(e))
        }
    };
    result.map(Value::Int).ok_or_else(overflow)
}

fn float_binary(op: BinOp, x: f64, y: f64) -> Result<Value, EvalError> {
    let value = match op {
        BinOp::Add => x + y,
        BinOp::Sub => x - y,
        BinOp::Mul => x * y,
        BinOp::Div => {
            if y == 0.0 {
                return Err(zero_division("float division by zero"));
            }
            x / y
        }
        BinOp::FloorDiv => {
            if y == 0.0 {
                return Err(zero_division("float floor division by zero"));
            }
            (x / y).floor()
        }
        BinOp::Mod => {
            if y == 0.0 {
                return Err(zero_division("float modulo"));
            }
            let r = x % y;
            if r != 0.0 && (r < 0.0) != (y < 0.0) {
                r + y
            } else {
                r
            }
        }
        BinOp::Pow => {
            if x == 0.0 && y < 0.0 {
                return Err(zero_division("0.0 cannot be raised to a negative power"));
            }
            x.powf(y)
        }
    };
    Ok(Value::Float(value))
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::None, Value::None) => true,
        (Value::Builtin(a), Value::Builtin(b)) => a == b,
        (Value::Module(a), Value::Module(b)) => a == b,
        _ => match (left.as_num(), right.as_num()) {
            (Some(Num::Int(a)), Some(Num::Int(b))) => a == b,
            (Some(a), Some(b)) => a.to_f64() == b.to_f64(),
            _ => false,
        },
    }
}

fn compare(op: CmpOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match op {
        CmpOp::Eq => return Ok(Value::Bool(values_equal(left, right))),
        CmpOp::Ne => return Ok(Value::Bool(!values_equal(left, right))),
        _ => {}
    }
    let ordering = match (left, right) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => match (left.as_num(), right.as_num()) {
            (Some(Num::Int(a)), Some(Num::Int(b))) => Some(a.cmp(&b)),
            // NaN はどの順序比較も偽
            (Some(a), Some(b)) => a.to_f64().partial_cmp(&b.to_f64()),
            _ => {
                let symbol = match op {
                    CmpOp::Lt => "<",
                    CmpOp::Le => "<=",
                    CmpOp::Gt => ">",
                    _ => ">=",
                };
                return Err(type_error(format!(
                    "'{}' not supported between instances of '{}' and '{}'",
                    symbol,
                    left.type_name(),
                    right.type_name()
                )));
            }
        },
    };
    let holds = ordering.is_some_and(|o| match op {
        CmpOp::Lt => o == Ordering::Less,
        CmpOp::Le => o != Ordering::Greater,
        CmpOp::Gt => o == Ordering::Greater,
        CmpOp::Ge => o != Ordering::Less,
        CmpOp::Eq => o == Ordering::Equal,
        CmpOp::Ne => o != Ordering::Equal,
    });
    Ok(Value::Bool(holds))
}

fn attribute(value: &Value, name: &str) -> Result<Value, EvalError> {
    match value {
        Value::Module(m) => m.member(name).ok_or_else(|| {
            EvalError::new(
                "AttributeError",
                format!("module '{}' has no attribute '{}'", m.name(), name),
            )
        }),
        other => Err(EvalError::new(
            "AttributeError",
            format!("'{}' object has no attribute '{}'", other.type_name(), name),
        )),
    }
}

fn import(module: &str, member: Option<&str>) -> Result<Value, EvalError> {
    let m = Module::named(module).ok_or_else(|| {
        EvalError::new("ModuleNotFoundError", format!("No module named '{}'", module))
    })?;
    match member {
        None => Ok(Value::Module(m)),
        Some(name) => m.member(name).ok_or_else(|| {
            EvalError::new(
                "ImportError",
                format!("cannot import name '{}' from '{}'", name, module),
            )
        }),
    }
}

fn single_arg<'v>(name: &str, args: &'v [Value]) -> Result<&'v Value, EvalError> {
    match args {
        [value] => Ok(value),
        _ => Err(type_error(format!(
            "{}() takes exactly one argument ({} given)",
            name,
            args.len()
        ))),
    }
}

fn real_arg(name: &str, args: &[Value]) -> Result<f64, EvalError> {
    let value = single_arg(name, args)?;
    value
        .as_num()
        .map(Num::to_f64)
        .ok_or_else(|| type_error(format!("must be real number, not {}", value.type_name())))
}

fn expr_awaits(expr: &Expr) -> bool {
    match expr {
        Expr::Await { .. } => true,
        Expr::Unary { operand, .. } => expr_awaits(operand),
        Expr::BinOp { left, right, .. } | Expr::Compare { left, right, .. } => {
            expr_awaits(left) || expr_awaits(right)
        }
        Expr::Call { func, args } => expr_awaits(func) || args.iter().any(expr_awaits),
        Expr::Attr { value, .. } => expr_awaits(value),
        _ => false,
    }
}

fn stmt_awaits(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Expr(expr) | Stmt::Assign { value: expr, .. } => expr_awaits(expr),
        Stmt::Import { .. } => false,
    }
}

/// 直接経路の評価を 1 回のポーリングで完了させる。
fn drive<T>(future: impl Future<Output = Result<T, EvalError>>) -> Result<T, EvalError> {
    future.now_or_never().unwrap_or_else(|| {
        Err(EvalError::new(
            "RuntimeError",
            "direct evaluation attempted to suspend",
        ))
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Direct,
    Suspendable,
}

/// 名前解決の文脈。ローカル → グローバル → 組み込みの順に探す。
struct Frame<'a> {
    globals: &'a Namespace,
    locals: Option<&'a Namespace>,
    mode: Mode,
}

impl Frame<'_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.locals
            .and_then(|locals| locals.get(name))
            .or_else(|| self.globals.get(name))
            .cloned()
            .or_else(|| Builtin::lookup(name).map(Value::Builtin))
    }
}

/// REPL に接続する評価器。`print` は `Console` を通して書き込む。
pub struct Interpreter {
    console: Arc<Console>,
    interrupts: InterruptFlag,
}

impl Interpreter {
    pub fn new(console: Arc<Console>, interrupts: InterruptFlag) -> Self {
        Self {
            console,
            interrupts,
        }
    }

    fn check_interrupt(&self, mode: Mode) -> Result<(), EvalError> {
        if mode == Mode::Direct && self.interrupts.take_pending() {
            debug!("keyboard interrupt raised in evaluator");
            return Err(EvalError::interrupted());
        }
        Ok(())
    }

    #[async_recursion(?Send)]
    async fn eval<'a>(&'a self, expr: &'a Expr, frame: &'a Frame<'a>) -> Result<Value, EvalError> {
        self.check_interrupt(frame.mode)?;
        match expr {
            Expr::Name { name } => frame.lookup(name).ok_or_else(|| {
                EvalError::new("NameError", format!("name '{}' is not defined", name))
            }),
            Expr::IntLit { value } => Ok(Value::Int(*value)),
            Expr::FloatLit { value } => Ok(Value::Float(*value)),
            Expr::StringLit { value } => Ok(Value::Str(value.clone())),
            Expr::BoolLit { value } => Ok(Value::Bool(*value)),
            Expr::NoneLit => Ok(Value::None),
            Expr::Unary { op, operand } => {
                let v = self.eval(operand, frame).await?;
                unary(*op, &v)
            }
            Expr::BinOp { op, left, right } => {
                let l = self.eval(left, frame).await?;
                let r = self.eval(right, frame).await?;
                binary(*op, &l, &r)
            }
            Expr::Compare { op, left, right } => {
                let l = self.eval(left, frame).await?;
                let r = self.eval(right, frame).await?;
                compare(*op, &l, &r)
            }
            Expr::Call { func, args } => {
                let callee = self.eval(func, frame).await?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg, frame).await?);
                }
                self.call(&callee, &values)
            }
            Expr::Attr { value, name } => {
                let v = self.eval(value, frame).await?;
                attribute(&v, name)
            }
            Expr::Await { value } => {
                if frame.mode == Mode::Direct {
                    return Err(await_outside_function());
                }
                match self.eval(value, frame).await? {
                    Value::Awaitable(Awaitable::Sleep(duration)) => {
                        trace!(?duration, "suspending on sleep");
                        tokio::time::sleep(duration).await;
                        Ok(Value::None)
                    }
                    other => Err(type_error(format!(
                        "object {} can't be used in 'await' expression",
                        other.type_name()
                    ))),
                }
            }
        }
    }

    fn call(&self, callee: &Value, args: &[Value]) -> Result<Value, EvalError> {
        let builtin = match callee {
            Value::Builtin(b) => *b,
            other => {
                return Err(type_error(format!(
                    "'{}' object is not callable",
                    other.type_name()
                )))
            }
        };
        match builtin {
            Builtin::Print => {
                let mut line = args
                    .iter()
                    .map(Value::to_str_form)
                    .collect::<Vec<_>>()
                    .join(" ");
                line.push('\n');
                self.console
                    .write_all(line.as_bytes())
                    .map_err(|err| EvalError::new("OSError", err.to_string()))?;
                Ok(Value::None)
            }
            Builtin::Str => match args {
                [] => Ok(Value::Str(String::new())),
                [value] => Ok(Value::Str(value.to_str_form())),
                _ => Err(type_error(format!(
                    "str expected at most 1 argument, got {}",
                    args.len()
                ))),
            },
            Builtin::Abs => {
                let value = single_arg("abs", args)?;
                match value.as_num() {
                    Some(Num::Int(i)) => i.checked_abs().map(Value::Int).ok_or_else(overflow),
                    Some(Num::Float(x)) => Ok(Value::Float(x.abs())),
                    None => Err(type_error(format!(
                        "bad operand type for abs(): '{}'",
                        value.type_name()
                    ))),
                }
            }
            Builtin::Len => match single_arg("len", args)? {
                Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                other => Err(type_error(format!(
                    "object of type '{}' has no len()",
                    other.type_name()
                ))),
            },
            Builtin::SleepMs => {
                let value = single_arg("sleep_ms", args)?;
                let ms = match value.as_num() {
                    Some(Num::Int(ms)) => ms,
                    _ => {
                        return Err(type_error(format!(
                            "can't convert {} to int",
                            value.type_name()
                        )))
                    }
                };
                let ms = u64::try_from(ms).map_err(|_| {
                    EvalError::new("ValueError", "sleep length must be non-negative")
                })?;
                self.blocking_sleep(Duration::from_millis(ms))?;
                Ok(Value::None)
            }
            Builtin::MathSqrt => {
                let x = real_arg("sqrt", args)?;
                if x < 0.0 {
                    return Err(EvalError::new("ValueError", "math domain error"));
                }
                Ok(Value::Float(x.sqrt()))
            }
            Builtin::AsyncioSleep => {
                let secs = real_arg("sleep", args)?;
                let duration = Duration::try_from_secs_f64(secs.max(0.0)).map_err(|_| {
                    EvalError::new("OverflowError", "sleep length is too large")
                })?;
                Ok(Value::Awaitable(Awaitable::Sleep(duration)))
            }
        }
    }

    /// スレッドを止めて待つ。割り込みが配送されたら途中で `KeyboardInterrupt` を返す。
    fn blocking_sleep(&self, total: Duration) -> Result<(), EvalError> {
        let deadline = Instant::now() + total;
        loop {
            if self.interrupts.take_pending() {
                debug!("blocking sleep interrupted");
                return Err(EvalError::interrupted());
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep(SLEEP_POLL.min(deadline - now));
        }
    }

    /// 文の列を実行する。束縛先は `locals` があればそこ、なければグローバル。
    async fn exec_block(
        &self,
        stmts: &[Stmt],
        globals: &mut Namespace,
        mut locals: Option<&mut Namespace>,
        mode: Mode,
    ) -> Result<(), EvalError> {
        for stmt in stmts {
            let (target, value) = match stmt {
                Stmt::Expr(expr) => {
                    let frame = Frame {
                        globals: &*globals,
                        locals: locals.as_deref(),
                        mode,
                    };
                    self.eval(expr, &frame).await?;
                    continue;
                }
                Stmt::Assign { target, value } => {
                    let frame = Frame {
                        globals: &*globals,
                        locals: locals.as_deref(),
                        mode,
                    };
                    (target, self.eval(value, &frame).await?)
                }
                Stmt::Import {
                    module,
                    member,
                    bind_as,
                } => (bind_as, import(module, member.as_deref())?),
            };
            trace!(name = %target, "binding");
            if let Some(scope) = locals.as_deref_mut() {
                scope.insert(target.clone(), value);
            } else {
                globals.insert(target.clone(), value);
            }
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl Evaluator for Interpreter {
    type Globals = Namespace;
    type Value = Value;

    async fn submit(
        &self,
        unit: &SuspendableUnit,
        globals: &mut Namespace,
    ) -> Result<Option<Value>, EvalError> {
        if unit.yields_value {
            let expr = parse_expr(&unit.body)?;
            let frame = Frame {
                globals: &*globals,
                locals: None,
                mode: Mode::Suspendable,
            };
            return self.eval(&expr, &frame).await.map(Value::into_option);
        }
        let program = parse_program(&unit.body)?;
        let mut locals = Namespace::new();
        let result = self
            .exec_block(&program.stmts, globals, Some(&mut locals), Mode::Suspendable)
            .await;
        // 宣言された名前だけがユニットの外へ出る
        if let Some(name) = &unit.declared {
            if let Some(value) = locals.remove(name) {
                debug!(%name, "declared binding written back");
                globals.insert(name.clone(), value);
            }
        }
        result.map(|()| None)
    }

    fn evaluate_now(
        &self,
        source: &str,
        globals: &mut Namespace,
    ) -> Result<Option<Value>, EvalError> {
        let expr = parse_expr(source)?;
        if expr_awaits(&expr) {
            return Err(await_outside_function());
        }
        let frame = Frame {
            globals: &*globals,
            locals: None,
            mode: Mode::Direct,
        };
        drive(self.eval(&expr, &frame)).map(Value::into_option)
    }

    fn execute_now(&self, source: &str, globals: &mut Namespace) -> Result<(), EvalError> {
        let program = parse_program(source)?;
        if program.stmts.iter().any(stmt_awaits) {
            return Err(await_outside_function());
        }
        drive(self.exec_block(&program.stmts, globals, None, Mode::Direct))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repl::interrupt::{InterruptDelivery, CTRL_C};
    use crate::repl::output::SharedWriter;
    use crate::repl::rewrite::wrap_suspendable;
    use std::sync::Mutex;

    fn interpreter() -> (Interpreter, Arc<Mutex<Vec<u8>>>, InterruptFlag) {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let console = Arc::new(Console::new(SharedWriter::from_shared(buf.clone())));
        let flag = InterruptFlag::new();
        (Interpreter::new(console, flag.clone()), buf, flag)
    }

    fn eval_now(src: &str) -> Result<Option<Value>, EvalError> {
        let (interp, _, _) = interpreter();
        interp.evaluate_now(src, &mut Namespace::new())
    }

    fn repr(src: &str) -> String {
        match eval_now(src) {
            Ok(Some(v)) => v.to_string(),
            Ok(None) => "<none>".into(),
            Err(err) => err.to_string(),
        }
    }

    #[test]
    /// 算術演算が Python と同じ結果・表示になることを確認する。
    fn arithmetic_matches_python() {
        assert_eq!(repr("1+1"), "2");
        assert_eq!(repr("7 / 2"), "3.5");
        assert_eq!(repr("4 / 2"), "2.0");
        assert_eq!(repr("-7 // 2"), "-4");
        assert_eq!(repr("-7 % 3"), "2");
        assert_eq!(repr("7 % -3"), "-2");
        assert_eq!(repr("2 ** 10"), "1024");
        assert_eq!(repr("2 ** -1"), "0.5");
        assert_eq!(repr("-2 ** 2"), "-4");
        assert_eq!(repr("True + 1"), "2");
        assert_eq!(repr("7.5 // 2"), "3.0");
    }

    #[test]
    /// 値の repr 表現を確認する。
    fn value_repr_forms() {
        assert_eq!(repr("'abc'"), "'abc'");
        assert_eq!(repr("\"it's\""), "\"it's\"");
        assert_eq!(repr("'a' + 'b' * 3"), "'abbb'");
        assert_eq!(repr("1e20 * 1.0"), "1e+20");
        assert_eq!(repr("0.00001 * 1"), "1e-05");
        assert_eq!(repr("1 < 2"), "True");
        assert_eq!(repr("None"), "<none>");
        assert_eq!(repr("print"), "<built-in function print>");
    }

    #[test]
    /// Python と同じ種別・メッセージのエラーになることを確認する。
    fn errors_use_python_categories() {
        assert_eq!(repr("1/0"), "ZeroDivisionError: division by zero");
        assert_eq!(repr("1//0"), "ZeroDivisionError: integer division or modulo by zero");
        assert_eq!(repr("1.0/0"), "ZeroDivisionError: float division by zero");
        assert_eq!(repr("y"), "NameError: name 'y' is not defined");
        assert_eq!(
            repr("1 + 'a'"),
            "TypeError: unsupported operand type(s) for +: 'int' and 'str'"
        );
        assert_eq!(repr("'a' < 1"), "TypeError: '<' not supported between instances of 'str' and 'int'");
        assert_eq!(repr("len(3)"), "TypeError: object of type 'int' has no len()");
        assert_eq!(repr("3(1)"), "TypeError: 'int' object is not callable");
        assert_eq!(repr("9223372036854775807 + 1"), "OverflowError: integer overflow");
        assert_eq!(
            repr("'ab' * 9223372036854775807"),
            "MemoryError: repeated string is too long"
        );
        assert_eq!(repr("'' * 9223372036854775807"), "''");
        assert!(eval_now("x =").unwrap_err().is_syntax());
    }

    #[test]
    /// 文として実行した代入と import がグローバルへ束縛されることを確認する。
    fn statements_bind_globals() {
        let (interp, out, _) = interpreter();
        let mut g = Namespace::new();
        assert!(interp.evaluate_now("x = 5", &mut g).unwrap_err().is_syntax());
        interp.execute_now("x = 5; import math as m", &mut g).unwrap();
        assert_eq!(interp.evaluate_now("x * 2", &mut g).unwrap(), Some(Value::Int(10)));
        assert_eq!(
            interp.evaluate_now("m.sqrt(16)", &mut g).unwrap(),
            Some(Value::Float(4.0))
        );
        interp.execute_now("print('x is', x, 1.5)", &mut g).unwrap();
        assert_eq!(String::from_utf8(out.lock().unwrap().clone()).unwrap(), "x is 5 1.5\n");
        let err = interp.execute_now("from math import tau", &mut g).unwrap_err();
        assert_eq!(err.to_string(), "ImportError: cannot import name 'tau' from 'math'");
        let err = interp.execute_now("import numpy", &mut g).unwrap_err();
        assert_eq!(err.to_string(), "ModuleNotFoundError: No module named 'numpy'");
    }

    #[test]
    /// 直接経路での await は構文エラーとして扱われることを確認する。
    fn await_is_rejected_on_direct_path() {
        let (interp, out, _) = interpreter();
        let mut g = Namespace::new();
        let err = interp.execute_now("print(1)\nawait(x)", &mut g).unwrap_err();
        assert_eq!(err.to_string(), "SyntaxError: 'await' outside function");
        assert!(out.lock().unwrap().is_empty());
    }

    #[test]
    /// 配送済みの割り込みが次の評価ステップで KeyboardInterrupt になることを確認する。
    fn pending_interrupt_raises_keyboard_interrupt() {
        let (interp, _, flag) = interpreter();
        flag.enable(CTRL_C);
        assert!(flag.raise());
        let err = interp.evaluate_now("sleep_ms(10000)", &mut Namespace::new()).unwrap_err();
        assert!(err.is_interrupt());
        flag.disable();
    }

    #[tokio::test(start_paused = true)]
    /// 中断可能ユニットが宣言された名前だけを書き戻すことを確認する。
    async fn submit_writes_back_declared_names_only() {
        let (interp, _, _) = interpreter();
        let mut g = Namespace::new();
        interp.submit(&wrap_suspendable("import asyncio"), &mut g).await.unwrap();
        assert!(g.contains_key("asyncio"));
        let unit = wrap_suspendable("x = await asyncio.sleep(1)");
        assert_eq!(interp.submit(&unit, &mut g).await.unwrap(), None);
        assert_eq!(g.get("x"), Some(&Value::None));
        let unit = wrap_suspendable("await asyncio.sleep(0.5) == None");
        assert_eq!(interp.submit(&unit, &mut g).await.unwrap(), Some(Value::Bool(true)));
        let err = interp
            .submit(&wrap_suspendable("await 3 "), &mut g)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "TypeError: object int can't be used in 'await' expression");
    }
}
