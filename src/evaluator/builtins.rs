use super::*;

/// Native functions, registered under fixed names. A user-defined
/// function may shadow any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Print,
    Len,
    Type,
    Range,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Len => "len",
            Builtin::Type => "type",
            Builtin::Range => "range",
        }
    }

    pub fn lookup(name: &str) -> Option<Builtin> {
        match name {
            "print" => Some(Builtin::Print),
            "len" => Some(Builtin::Len),
            "type" => Some(Builtin::Type),
            "range" => Some(Builtin::Range),
            _ => None,
        }
    }
}

impl Interpreter {
    pub(super) fn eval_builtin(
        &mut self,
        builtin: Builtin,
        args: Vec<Value>,
        pos: Pos,
    ) -> Result<Value, RuntimeError> {
        match builtin {
            Builtin::Print => self.builtin_print(args, pos),
            Builtin::Len => builtin_len(args, pos),
            Builtin::Type => builtin_type(args, pos),
            Builtin::Range => builtin_range(args, pos),
        }
    }

    fn builtin_print(&mut self, args: Vec<Value>, pos: Pos) -> Result<Value, RuntimeError> {
        expect_arity("print", 1, &args, pos)?;
        writeln!(self.out, "{}", render(&args[0], false)).map_err(|err| {
            RuntimeError::new(
                ErrorKind::Resource,
                format!("failed to write output: {err}"),
                pos,
            )
        })?;
        Ok(Value::None)
    }
}

fn expect_arity(name: &str, expected: usize, args: &[Value], pos: Pos) -> Result<(), RuntimeError> {
    if args.len() != expected {
        return Err(RuntimeError::new(
            ErrorKind::Arity,
            format!("{name}() takes {expected} argument(s), got {}", args.len()),
            pos,
        ));
    }
    Ok(())
}

fn builtin_len(args: Vec<Value>, pos: Pos) -> Result<Value, RuntimeError> {
    expect_arity("len", 1, &args, pos)?;

    match &args[0] {
        Value::List(items) => Ok(Value::Int(items.borrow().len() as i64)),
        Value::Range { start, stop, step } => {
            Ok(Value::Int(range_len(*start, *stop, *step) as i64))
        }
        other => Err(RuntimeError::new(
            ErrorKind::Type,
            format!("object of type '{}' has no len()", other.type_name()),
            pos,
        )),
    }
}

fn builtin_type(args: Vec<Value>, pos: Pos) -> Result<Value, RuntimeError> {
    expect_arity("type", 1, &args, pos)?;
    Ok(Value::Str(args[0].type_name().to_string()))
}

fn builtin_range(args: Vec<Value>, pos: Pos) -> Result<Value, RuntimeError> {
    if args.is_empty() || args.len() > 3 {
        return Err(RuntimeError::new(
            ErrorKind::Arity,
            format!("range() takes 1 to 3 argument(s), got {}", args.len()),
            pos,
        ));
    }

    let to_int = |value: &Value| -> Result<i64, RuntimeError> {
        let Value::Int(n) = value else {
            return Err(RuntimeError::new(
                ErrorKind::Type,
                format!("range arguments must be integers, got '{}'", value.type_name()),
                pos,
            ));
        };
        Ok(*n)
    };

    let (start, stop, step) = match args.len() {
        1 => (0, to_int(&args[0])?, 1),
        2 => (to_int(&args[0])?, to_int(&args[1])?, 1),
        _ => (to_int(&args[0])?, to_int(&args[1])?, to_int(&args[2])?),
    };

    if step == 0 {
        return Err(RuntimeError::new(
            ErrorKind::Arithmetic,
            "range step cannot be zero",
            pos,
        ));
    }

    Ok(Value::Range { start, stop, step })
}

/// Snapshots an iterable's elements for `for` loops and comprehensions.
pub(crate) fn iterable_elements(value: Value, pos: Pos) -> Result<Vec<Value>, RuntimeError> {
    match value {
        Value::List(items) => Ok(items.borrow().clone()),
        Value::Range { start, stop, step } => Ok(materialize_range(start, stop, step)),
        other => Err(RuntimeError::new(
            ErrorKind::Type,
            format!(
                "for loop iterable must be a list or range, got '{}'",
                other.type_name()
            ),
            pos,
        )),
    }
}

// Number of elements the range produces: ceil((stop-start)/step),
// clamped to zero. Computed in i128 so the span cannot overflow.
pub(crate) fn range_len(start: i64, stop: i64, step: i64) -> usize {
    let span = i128::from(stop) - i128::from(start);
    let step = i128::from(step);

    if step > 0 {
        if span <= 0 {
            0
        } else {
            ((span + step - 1) / step) as usize
        }
    } else if span >= 0 {
        0
    } else {
        ((span + step + 1) / step) as usize
    }
}

fn materialize_range(start: i64, stop: i64, step: i64) -> Vec<Value> {
    let mut values = Vec::with_capacity(range_len(start, stop, step));
    let mut current = start;

    if step > 0 {
        while current < stop {
            values.push(Value::Int(current));
            current = current.saturating_add(step);
        }
    } else {
        while current > stop {
            values.push(Value::Int(current));
            current = current.saturating_add(step);
        }
    }

    values
}
