use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use thiserror::Error;

use crate::ast::{BinaryOp, Block, Expr, ExprKind, Pos, Program, Stmt, StmtKind, UnaryOp};
use crate::environment::Environment;

mod builtins;

pub use builtins::Builtin;

/// Runtime value. Lists are shared by handle: cloning a `Value::List`
/// clones the `Rc`, so mutation through one alias is visible through
/// every alias of the same list.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Str(String),
    None,
    List(Rc<RefCell<Vec<Value>>>),
    // Lazy arithmetic progression; stop is exclusive, step is nonzero.
    Range { start: i64, stop: i64, step: i64 },
}

impl Value {
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::Str(_) => "str",
            Value::None => "NoneType",
            Value::List(_) => "list",
            Value::Range { .. } => "range",
        }
    }

    /// Falsy values are `False`, `0`, the empty string, and the empty
    /// list; everything else (including `None`) is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::None | Value::Range { .. } => true,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::None, Value::None) => true,
            (Value::List(a), Value::List(b)) => {
                // Same handle compares equal without walking the elements.
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            (
                Value::Range { start, stop, step },
                Value::Range {
                    start: start2,
                    stop: stop2,
                    step: step2,
                },
            ) => start == start2 && stop == stop2 && step == step2,
            _ => false,
        }
    }
}

/// Renders a value for display. With `escape` set, string values keep
/// their surrounding quotes; list elements are always escaped.
pub fn render(value: &Value, escape: bool) -> String {
    match value {
        Value::Int(n) => n.to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Str(s) => {
            if escape {
                format!("\"{s}\"")
            } else {
                s.clone()
            }
        }
        Value::None => "None".to_string(),
        Value::Range { start, stop, step } => format!("range({start}, {stop}, {step})"),
        Value::List(items) => {
            let rendered = items
                .borrow()
                .iter()
                .map(|item| render(item, true))
                .collect::<Vec<_>>()
                .join(", ");
            format!("[{rendered}]")
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", render(self, false))
    }
}

#[derive(Debug, Clone)]
pub struct UserFunction {
    pub name: String,
    pub params: Vec<String>,
    pub body: Block,
}

/// Failure category, mirroring how the driver reports and exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Type,
    Lookup,
    Arity,
    Bounds,
    Arithmetic,
    Structure,
    // Call-depth exhaustion; fatal rather than an ordinary script error.
    Resource,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("runtime error at {pos}: {message}")]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    pub pos: Pos,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, pos: Pos) -> Self {
        Self {
            kind,
            message: message.into(),
            pos,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self.kind, ErrorKind::Resource)
    }
}

// Outcome of one statement: either fall through to the next statement or
// unwind to the nearest call boundary carrying the returned value.
#[derive(Debug, Clone)]
enum Flow {
    Normal,
    Return(Value),
}

const MAX_CALL_DEPTH: usize = 200;

pub struct Interpreter {
    env: Environment,
    functions: HashMap<String, Rc<UserFunction>>,
    call_depth: usize,
    out: Box<dyn Write>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Builds an interpreter whose `print` builtin writes to `out`
    /// instead of stdout.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        Self {
            env: Environment::new(),
            functions: HashMap::new(),
            call_depth: 0,
            out,
        }
    }

    /// Reads a variable back out of the interpreter, using the same
    /// lookup rules as the evaluated program.
    pub fn variable(&self, name: &str) -> Option<Value> {
        self.env.get(name)
    }

    pub fn eval_program(&mut self, program: &Program) -> Result<(), RuntimeError> {
        for stmt in &program.statements {
            match self.eval_stmt(stmt)? {
                Flow::Normal => {}
                // The parser rejects top-level returns; kept as a guard.
                Flow::Return(_) => {
                    return Err(RuntimeError::new(
                        ErrorKind::Structure,
                        "'return' outside function",
                        stmt.pos,
                    ));
                }
            }
        }
        Ok(())
    }

    fn eval_stmt(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        match &stmt.kind {
            StmtKind::Assign { target, value } => {
                self.eval_assign(target, value, stmt.pos)?;
                Ok(Flow::Normal)
            }
            StmtKind::Expr(expr) => {
                self.eval_expr(expr)?;
                Ok(Flow::Normal)
            }
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval_expr(condition)?.is_truthy() {
                    self.eval_block(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.eval_block(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }
            StmtKind::While { condition, body } => {
                while self.eval_expr(condition)?.is_truthy() {
                    if let Flow::Return(value) = self.eval_block(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }
            StmtKind::For {
                name,
                iterable,
                body,
            } => {
                let value = self.eval_expr(iterable)?;
                let elements = builtins::iterable_elements(value, iterable.pos)?;

                for element in elements {
                    // The loop variable binds in the current scope and
                    // persists after the loop ends.
                    self.env.set(name.clone(), element);
                    if let Flow::Return(value) = self.eval_block(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }
            StmtKind::FunctionDef { name, params, body } => {
                let function = Rc::new(UserFunction {
                    name: name.clone(),
                    params: params.clone(),
                    body: body.clone(),
                });
                self.functions.insert(name.clone(), function);
                Ok(Flow::Normal)
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::None,
                };
                Ok(Flow::Return(value))
            }
        }
    }

    fn eval_block(&mut self, block: &Block) -> Result<Flow, RuntimeError> {
        for stmt in block {
            if let Flow::Return(value) = self.eval_stmt(stmt)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn eval_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match &expr.kind {
            ExprKind::Name(name) => self.env.get(name).ok_or_else(|| {
                RuntimeError::new(
                    ErrorKind::Lookup,
                    format!("name '{name}' is not defined"),
                    expr.pos,
                )
            }),
            ExprKind::Int(value) => Ok(Value::Int(*value)),
            ExprKind::Str(value) => Ok(Value::Str(value.clone())),
            ExprKind::Bool(value) => Ok(Value::Bool(*value)),
            ExprKind::NoneLiteral => Ok(Value::None),
            ExprKind::List(items) => {
                let mut evaluated = Vec::with_capacity(items.len());
                for item in items {
                    evaluated.push(self.eval_expr(item)?);
                }
                Ok(Value::list(evaluated))
            }
            ExprKind::ListComp {
                element,
                var,
                iterable,
                filter,
            } => {
                let value = self.eval_expr(iterable)?;
                let elements = builtins::iterable_elements(value, iterable.pos)?;

                let mut collected = Vec::new();
                for item in elements {
                    // Comprehensions share the enclosing scope; the loop
                    // variable persists afterwards, same as a for loop.
                    self.env.set(var.clone(), item);
                    if let Some(filter) = filter {
                        if !self.eval_expr(filter)?.is_truthy() {
                            continue;
                        }
                    }
                    collected.push(self.eval_expr(element)?);
                }
                Ok(Value::list(collected))
            }
            ExprKind::Index { base, index } => {
                let base_value = self.eval_expr(base)?;
                let index_value = self.eval_expr(index)?;
                let Value::List(items) = base_value else {
                    return Err(RuntimeError::new(
                        ErrorKind::Type,
                        "only lists can be indexed",
                        expr.pos,
                    ));
                };
                let idx = check_index(&index_value, items.borrow().len(), expr.pos)?;
                let element = items.borrow()[idx].clone();
                Ok(element)
            }
            ExprKind::Call { name, args } => self.eval_call(name, args, expr.pos),
            ExprKind::Unary { op, operand } => {
                let value = self.eval_expr(operand)?;
                self.eval_unary(*op, value, expr.pos)
            }
            ExprKind::Binary { lhs, op, rhs } => {
                // Both operands evaluate eagerly, left before right, even
                // for `and`/`or`.
                let lhs = self.eval_expr(lhs)?;
                let rhs = self.eval_expr(rhs)?;
                self.eval_binary(*op, lhs, rhs, expr.pos)
            }
        }
    }

    fn eval_call(&mut self, name: &str, args: &[Expr], pos: Pos) -> Result<Value, RuntimeError> {
        // User definitions shadow builtins of the same name.
        if let Some(function) = self.functions.get(name).cloned() {
            let values = self.eval_args(args)?;
            return self.call_user(&function, values, pos);
        }

        if let Some(builtin) = Builtin::lookup(name) {
            let values = self.eval_args(args)?;
            return self.eval_builtin(builtin, values, pos);
        }

        Err(RuntimeError::new(
            ErrorKind::Lookup,
            format!("function '{name}' is not defined"),
            pos,
        ))
    }

    // Arguments evaluate left to right in the caller's environment,
    // before the callee's frame exists.
    fn eval_args(&mut self, args: &[Expr]) -> Result<Vec<Value>, RuntimeError> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_expr(arg)?);
        }
        Ok(values)
    }

    fn call_user(
        &mut self,
        function: &UserFunction,
        args: Vec<Value>,
        pos: Pos,
    ) -> Result<Value, RuntimeError> {
        if args.len() != function.params.len() {
            return Err(RuntimeError::new(
                ErrorKind::Arity,
                format!(
                    "{}() takes {} argument(s), got {}",
                    function.name,
                    function.params.len(),
                    args.len()
                ),
                pos,
            ));
        }

        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::new(
                ErrorKind::Resource,
                format!("maximum call depth ({MAX_CALL_DEPTH}) exceeded"),
                pos,
            ));
        }

        let mut frame = HashMap::with_capacity(function.params.len());
        for (param, arg) in function.params.iter().zip(args) {
            frame.insert(param.clone(), arg);
        }

        self.call_depth += 1;
        self.env.push_frame(frame);
        let result = self.eval_block(&function.body);
        self.env.pop_frame();
        self.call_depth -= 1;

        match result? {
            Flow::Normal => Ok(Value::None),
            Flow::Return(value) => Ok(value),
        }
    }

    fn eval_assign(&mut self, target: &Expr, value: &Expr, pos: Pos) -> Result<(), RuntimeError> {
        let value = self.eval_expr(value)?;

        match &target.kind {
            ExprKind::Name(name) => {
                self.env.set(name.clone(), value);
                Ok(())
            }
            ExprKind::Index { base, index } => {
                ensure_variable_root(base)?;

                let base_value = self.eval_expr(base)?;
                let index_value = self.eval_expr(index)?;
                let Value::List(items) = base_value else {
                    return Err(RuntimeError::new(
                        ErrorKind::Type,
                        "only lists can be indexed",
                        target.pos,
                    ));
                };

                let idx = check_index(&index_value, items.borrow().len(), target.pos)?;
                items.borrow_mut()[idx] = value;
                // The list is shared by handle, so the root variable's
                // binding is already current; no re-store is needed.
                Ok(())
            }
            // The parser restricts targets; kept as a guard.
            _ => Err(RuntimeError::new(
                ErrorKind::Structure,
                "only variables can be modified",
                pos,
            )),
        }
    }

    fn eval_unary(&self, op: UnaryOp, value: Value, pos: Pos) -> Result<Value, RuntimeError> {
        match (op, value) {
            (UnaryOp::Neg, Value::Int(n)) => n.checked_neg().map(Value::Int).ok_or_else(|| {
                RuntimeError::new(ErrorKind::Arithmetic, "integer overflow", pos)
            }),
            (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
            (op, value) => Err(RuntimeError::new(
                ErrorKind::Type,
                format!(
                    "unsupported operand type for unary '{}': '{}'",
                    op.symbol(),
                    value.type_name()
                ),
                pos,
            )),
        }
    }

    fn eval_binary(
        &self,
        op: BinaryOp,
        lhs: Value,
        rhs: Value,
        pos: Pos,
    ) -> Result<Value, RuntimeError> {
        match op {
            BinaryOp::Add => match (lhs, rhs) {
                (Value::Int(a), Value::Int(b)) => checked_arith(a.checked_add(b), pos),
                (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
                (Value::List(a), Value::List(b)) => {
                    let mut items = a.borrow().clone();
                    items.extend(b.borrow().iter().cloned());
                    Ok(Value::list(items))
                }
                (a, b) => Err(binary_type_error(op, &a, &b, pos)),
            },
            BinaryOp::Sub => match (lhs, rhs) {
                (Value::Int(a), Value::Int(b)) => checked_arith(a.checked_sub(b), pos),
                (a, b) => Err(binary_type_error(op, &a, &b, pos)),
            },
            BinaryOp::Mul => match (lhs, rhs) {
                (Value::Int(a), Value::Int(b)) => checked_arith(a.checked_mul(b), pos),
                (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
                    Ok(Value::Str(repeat_str(&s, n)))
                }
                (Value::List(items), Value::Int(n)) | (Value::Int(n), Value::List(items)) => {
                    Ok(Value::list(repeat_list(&items.borrow(), n)))
                }
                (a, b) => Err(binary_type_error(op, &a, &b, pos)),
            },
            BinaryOp::Div => match (lhs, rhs) {
                (Value::Int(_), Value::Int(0)) => Err(RuntimeError::new(
                    ErrorKind::Arithmetic,
                    "division by zero",
                    pos,
                )),
                // i64 division truncates toward zero.
                (Value::Int(a), Value::Int(b)) => checked_arith(a.checked_div(b), pos),
                (a, b) => Err(binary_type_error(op, &a, &b, pos)),
            },
            BinaryOp::Mod => match (lhs, rhs) {
                (Value::Int(_), Value::Int(0)) => Err(RuntimeError::new(
                    ErrorKind::Arithmetic,
                    "modulo by zero",
                    pos,
                )),
                (Value::Int(a), Value::Int(b)) => checked_arith(a.checked_rem(b), pos),
                (a, b) => Err(binary_type_error(op, &a, &b, pos)),
            },
            BinaryOp::And => match (lhs, rhs) {
                (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a && b)),
                (a, b) => Err(binary_type_error(op, &a, &b, pos)),
            },
            BinaryOp::Or => match (lhs, rhs) {
                (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a || b)),
                (a, b) => Err(binary_type_error(op, &a, &b, pos)),
            },
            BinaryOp::Eq => Ok(Value::Bool(lhs == rhs)),
            BinaryOp::NotEq => Ok(Value::Bool(lhs != rhs)),
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => match (lhs, rhs) {
                (Value::Int(a), Value::Int(b)) => Ok(Value::Bool(compare(op, a.cmp(&b)))),
                (Value::Str(a), Value::Str(b)) => Ok(Value::Bool(compare(op, a.cmp(&b)))),
                (a, b) => Err(binary_type_error(op, &a, &b, pos)),
            },
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn compare(op: BinaryOp, ordering: std::cmp::Ordering) -> bool {
    match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::LtEq => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        BinaryOp::GtEq => ordering.is_ge(),
        _ => false,
    }
}

fn checked_arith(result: Option<i64>, pos: Pos) -> Result<Value, RuntimeError> {
    result
        .map(Value::Int)
        .ok_or_else(|| RuntimeError::new(ErrorKind::Arithmetic, "integer overflow", pos))
}

fn binary_type_error(op: BinaryOp, lhs: &Value, rhs: &Value, pos: Pos) -> RuntimeError {
    RuntimeError::new(
        ErrorKind::Type,
        format!(
            "unsupported operand types for '{}': '{}' and '{}'",
            op.symbol(),
            lhs.type_name(),
            rhs.type_name()
        ),
        pos,
    )
}

fn repeat_str(s: &str, count: i64) -> String {
    if count <= 0 {
        String::new()
    } else {
        s.repeat(count as usize)
    }
}

fn repeat_list(items: &[Value], count: i64) -> Vec<Value> {
    if count <= 0 {
        return Vec::new();
    }

    let mut repeated = Vec::with_capacity(items.len().saturating_mul(count as usize));
    for _ in 0..count {
        repeated.extend(items.iter().cloned());
    }
    repeated
}

fn check_index(index: &Value, len: usize, pos: Pos) -> Result<usize, RuntimeError> {
    let Value::Int(n) = index else {
        return Err(RuntimeError::new(
            ErrorKind::Bounds,
            "index must be an integer",
            pos,
        ));
    };

    // Negative indices are deliberately unsupported.
    if *n < 0 || *n as usize >= len {
        return Err(RuntimeError::new(
            ErrorKind::Bounds,
            "index out of range",
            pos,
        ));
    }

    Ok(*n as usize)
}

// An index assignment target must bottom out in a variable.
fn ensure_variable_root(base: &Expr) -> Result<(), RuntimeError> {
    let mut current = base;
    loop {
        match &current.kind {
            ExprKind::Name(_) => return Ok(()),
            ExprKind::Index { base, .. } => current = base,
            _ => {
                return Err(RuntimeError::new(
                    ErrorKind::Structure,
                    "only variables can be modified",
                    current.pos,
                ));
            }
        }
    }
}
