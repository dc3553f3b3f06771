use crate::ast::{BinaryOp, Expr, Node, Program, SwitchCase, UnaryOp};
use crate::error::{EvalError, EvalResult};
use crate::value::{escape_html, is_truthy, loose_equals, number, to_display, Data};
use serde_json::Value;
use std::cmp::Ordering;
use tracing::{debug, instrument, warn};

pub const DEFAULT_MAX_LOOP_ITERATIONS: usize = 10_000;

/// Executes compiled artifacts against a data context
#[derive(Debug, Clone)]
pub struct Renderer {
    max_loop_iterations: usize,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Control flow signal from executing a node list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Normal,
    Break,
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            max_loop_iterations: DEFAULT_MAX_LOOP_ITERATIONS,
        }
    }

    pub fn with_max_loop_iterations(mut self, limit: usize) -> Self {
        self.max_loop_iterations = limit;
        self
    }

    /// Parse and execute an artifact
    #[instrument(skip(self, source, data), fields(len = source.len()))]
    pub fn render(&self, source: &str, data: &Data) -> EvalResult<String> {
        let program = Program::parse(source)?;
        self.execute(&program, data)
    }

    pub fn execute(&self, program: &Program, data: &Data) -> EvalResult<String> {
        let mut scope = Scope {
            variables: data.clone(),
            out: String::new(),
            limit: self.max_loop_iterations,
        };
        scope.run(&program.nodes)?;
        debug!(output_len = scope.out.len(), "Artifact rendered");
        Ok(scope.out)
    }

    /// Evaluate a single expression against `data`
    pub fn evaluate(&self, expr: &Expr, data: &Data) -> EvalResult<Value> {
        let scope = Scope {
            variables: data.clone(),
            out: String::new(),
            limit: self.max_loop_iterations,
        };
        scope.eval(expr)
    }
}

/// Per-render state. Loop and `set` variables live alongside the data, so they
/// stay visible after the block that introduced them.
struct Scope {
    variables: Data,
    out: String,
    limit: usize,
}

impl Scope {
    fn run(&mut self, nodes: &[Node]) -> EvalResult<Flow> {
        for node in nodes {
            if self.run_node(node)? == Flow::Break {
                return Ok(Flow::Break);
            }
        }
        Ok(Flow::Normal)
    }

    fn run_node(&mut self, node: &Node) -> EvalResult<Flow> {
        match node {
            Node::Text(text) => self.out.push_str(text),
            Node::Echo { expr, escape } => {
                let value = self.eval(expr)?;
                let text = to_display(&value);
                if *escape {
                    self.out.push_str(&escape_html(&text));
                } else {
                    self.out.push_str(&text);
                }
            }
            Node::If {
                branches,
                otherwise,
            } => {
                for (condition, body) in branches {
                    if is_truthy(&self.eval(condition)?) {
                        return self.run(body);
                    }
                }
                return self.run(otherwise);
            }
            Node::Foreach {
                iterable,
                key,
                item,
                body,
            } => self.run_foreach(iterable, key.as_deref(), item, body)?,
            Node::For {
                variable,
                start,
                end,
                inclusive,
                body,
            } => self.run_for(variable, start, end, *inclusive, body)?,
            Node::While { condition, body } => {
                let mut iterations = 0;
                while is_truthy(&self.eval(condition)?) {
                    self.count_iteration(&mut iterations)?;
                    if self.run(body)? == Flow::Break {
                        break;
                    }
                }
            }
            Node::DoWhile { body, condition } => {
                let mut iterations = 0;
                loop {
                    self.count_iteration(&mut iterations)?;
                    if self.run(body)? == Flow::Break || !is_truthy(&self.eval(condition)?) {
                        break;
                    }
                }
            }
            Node::Switch { subject, cases } => self.run_switch(subject, cases)?,
            Node::Set { name, value } => {
                let value = self.eval(value)?;
                self.variables.insert(name.clone(), value);
            }
            Node::Break => return Ok(Flow::Break),
        }
        Ok(Flow::Normal)
    }

    fn count_iteration(&self, iterations: &mut usize) -> EvalResult<()> {
        *iterations += 1;
        if *iterations > self.limit {
            warn!(limit = self.limit, "Loop iteration limit reached");
            return Err(EvalError::LoopLimit { limit: self.limit });
        }
        Ok(())
    }

    fn run_foreach(
        &mut self,
        iterable: &Expr,
        key: Option<&str>,
        item: &str,
        body: &[Node],
    ) -> EvalResult<()> {
        let entries: Vec<(Value, Value)> = match self.eval(iterable)? {
            Value::Null => Vec::new(),
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(index, value)| (Value::from(index), value))
                .collect(),
            Value::Object(map) => map
                .into_iter()
                .map(|(name, value)| (Value::String(name), value))
                .collect(),
            other => {
                return Err(EvalError::type_error(format!(
                    "Cannot iterate over {}",
                    type_name(&other)
                )))
            }
        };

        for (entry_key, value) in entries {
            if let Some(key) = key {
                self.variables.insert(key.to_string(), entry_key);
            }
            self.variables.insert(item.to_string(), value);
            if self.run(body)? == Flow::Break {
                break;
            }
        }
        Ok(())
    }

    fn run_for(
        &mut self,
        variable: &str,
        start: &Expr,
        end: &Expr,
        inclusive: bool,
        body: &[Node],
    ) -> EvalResult<()> {
        let start = self.eval_integer(start)?;
        let end = self.eval_integer(end)?;
        let end = if inclusive { end.saturating_add(1) } else { end };

        let mut iterations = 0;
        let mut current = start;
        while current < end {
            self.count_iteration(&mut iterations)?;
            self.variables.insert(variable.to_string(), Value::from(current));
            if self.run(body)? == Flow::Break {
                break;
            }
            current += 1;
        }
        Ok(())
    }

    fn run_switch(&mut self, subject: &Expr, cases: &[SwitchCase]) -> EvalResult<()> {
        let subject = self.eval(subject)?;

        let mut matched = None;
        for (index, case) in cases.iter().enumerate() {
            if let Some(test) = &case.test {
                if loose_equals(&subject, &self.eval(test)?) {
                    matched = Some(index);
                    break;
                }
            }
        }
        let start = matched.or_else(|| cases.iter().position(|case| case.test.is_none()));

        // Fall through from the matched case until a `break`
        if let Some(start) = start {
            for case in &cases[start..] {
                if self.run(&case.body)? == Flow::Break {
                    break;
                }
            }
        }
        Ok(())
    }

    fn eval_integer(&self, expr: &Expr) -> EvalResult<i64> {
        match self.eval(expr)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .ok_or_else(|| EvalError::type_error(format!("Range bound {} is not an integer", n))),
            other => Err(EvalError::type_error(format!(
                "Range bound must be a number, got {}",
                type_name(&other)
            ))),
        }
    }

    fn eval(&self, expr: &Expr) -> EvalResult<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Variable(name) => {
                self.variables
                    .get(name)
                    .cloned()
                    .ok_or_else(|| EvalError::VariableNotFound { name: name.clone() })
            }
            Expr::Member { object, property } => {
                let object = self.eval(object)?;
                Ok(member(&object, property))
            }
            Expr::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                Ok(match &index {
                    Value::String(key) => member(&object, key),
                    Value::Number(n) => member(&object, &n.to_string()),
                    _ => Value::Null,
                })
            }
            Expr::Unary { operator, operand } => {
                let value = self.eval(operand)?;
                match operator {
                    UnaryOp::Not => Ok(Value::Bool(!is_truthy(&value))),
                    UnaryOp::Negate => match value.as_f64() {
                        Some(n) => to_number(-n, "-"),
                        None => Err(EvalError::invalid_operands(
                            "-",
                            format!("Expected number, got {}", type_name(&value)),
                        )),
                    },
                }
            }
            Expr::Binary {
                left,
                operator,
                right,
            } => self.eval_binary(left, *operator, right),
            Expr::Call { name, arguments } => self.call(name, arguments),
        }
    }

    /// Evaluate, treating an unknown variable as null
    fn eval_lenient(&self, expr: &Expr) -> EvalResult<Value> {
        match self.eval(expr) {
            Err(EvalError::VariableNotFound { .. }) => Ok(Value::Null),
            other => other,
        }
    }

    fn eval_binary(&self, left: &Expr, operator: BinaryOp, right: &Expr) -> EvalResult<Value> {
        let symbol = operator.symbol();
        match operator {
            BinaryOp::Coalesce => {
                let left = self.eval_lenient(left)?;
                if left.is_null() {
                    self.eval(right)
                } else {
                    Ok(left)
                }
            }
            BinaryOp::And => {
                let result = is_truthy(&self.eval(left)?) && is_truthy(&self.eval(right)?);
                Ok(Value::Bool(result))
            }
            BinaryOp::Or => {
                let result = is_truthy(&self.eval(left)?) || is_truthy(&self.eval(right)?);
                Ok(Value::Bool(result))
            }
            BinaryOp::Equals => {
                let (left, right) = self.operands(left, right)?;
                Ok(Value::Bool(loose_equals(&left, &right)))
            }
            BinaryOp::NotEquals => {
                let (left, right) = self.operands(left, right)?;
                Ok(Value::Bool(!loose_equals(&left, &right)))
            }
            BinaryOp::Add => {
                let (left, right) = self.operands(left, right)?;
                match (&left, &right) {
                    (Value::String(_), _) | (_, Value::String(_)) => Ok(Value::String(format!(
                        "{}{}",
                        to_display(&left),
                        to_display(&right)
                    ))),
                    _ => {
                        let (a, b) = numbers(&left, &right, symbol)?;
                        to_number(a + b, symbol)
                    }
                }
            }
            BinaryOp::Subtract => {
                let (a, b) = self.numeric_operands(left, right, symbol)?;
                to_number(a - b, symbol)
            }
            BinaryOp::Multiply => {
                let (a, b) = self.numeric_operands(left, right, symbol)?;
                to_number(a * b, symbol)
            }
            BinaryOp::Divide => {
                let (a, b) = self.numeric_operands(left, right, symbol)?;
                if b == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                to_number(a / b, symbol)
            }
            BinaryOp::Modulo => {
                let (a, b) = self.numeric_operands(left, right, symbol)?;
                if b == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                to_number(a % b, symbol)
            }
            BinaryOp::LessThan => Ok(Value::Bool(self.compare(left, right, symbol)?.is_lt())),
            BinaryOp::LessThanOrEqual => {
                Ok(Value::Bool(self.compare(left, right, symbol)?.is_le()))
            }
            BinaryOp::GreaterThan => Ok(Value::Bool(self.compare(left, right, symbol)?.is_gt())),
            BinaryOp::GreaterThanOrEqual => {
                Ok(Value::Bool(self.compare(left, right, symbol)?.is_ge()))
            }
        }
    }

    fn operands(&self, left: &Expr, right: &Expr) -> EvalResult<(Value, Value)> {
        Ok((self.eval(left)?, self.eval(right)?))
    }

    fn numeric_operands(&self, left: &Expr, right: &Expr, symbol: &str) -> EvalResult<(f64, f64)> {
        let (left, right) = self.operands(left, right)?;
        numbers(&left, &right, symbol)
    }

    /// Strings compare lexically, everything else numerically
    fn compare(&self, left: &Expr, right: &Expr, symbol: &str) -> EvalResult<Ordering> {
        let (left, right) = self.operands(left, right)?;
        if let (Value::String(a), Value::String(b)) = (&left, &right) {
            return Ok(a.cmp(b));
        }
        let (a, b) = numbers(&left, &right, symbol)?;
        a.partial_cmp(&b)
            .ok_or_else(|| EvalError::invalid_operands(symbol, "Values are not comparable"))
    }

    fn call(&self, name: &str, arguments: &[Expr]) -> EvalResult<Value> {
        let arity = |expected: usize| {
            if arguments.len() == expected {
                Ok(())
            } else {
                Err(EvalError::type_error(format!(
                    "{}() takes {} argument(s), got {}",
                    name,
                    expected,
                    arguments.len()
                )))
            }
        };

        match name {
            "is_null" => {
                arity(1)?;
                Ok(Value::Bool(self.eval_lenient(&arguments[0])?.is_null()))
            }
            "default" => {
                arity(2)?;
                let value = self.eval_lenient(&arguments[0])?;
                match &value {
                    Value::Null => self.eval(&arguments[1]),
                    Value::String(s) if s.is_empty() => self.eval(&arguments[1]),
                    _ => Ok(value),
                }
            }
            "count" => {
                arity(1)?;
                let count = match self.eval(&arguments[0])? {
                    Value::Null => 0,
                    Value::Array(items) => items.len(),
                    Value::Object(map) => map.len(),
                    Value::String(s) => s.chars().count(),
                    other => {
                        return Err(EvalError::type_error(format!(
                            "count() expects a collection, got {}",
                            type_name(&other)
                        )))
                    }
                };
                Ok(Value::from(count))
            }
            "upper" => {
                arity(1)?;
                Ok(Value::String(to_display(&self.eval(&arguments[0])?).to_uppercase()))
            }
            "lower" => {
                arity(1)?;
                Ok(Value::String(to_display(&self.eval(&arguments[0])?).to_lowercase()))
            }
            "trim" => {
                arity(1)?;
                Ok(Value::String(to_display(&self.eval(&arguments[0])?).trim().to_string()))
            }
            "json" => {
                arity(1)?;
                Ok(Value::String(self.eval(&arguments[0])?.to_string()))
            }
            _ => Err(EvalError::UnknownFunction {
                name: name.to_string(),
            }),
        }
    }
}

/// Member lookup; anything missing reads as null
fn member(object: &Value, property: &str) -> Value {
    match object {
        Value::Object(map) => map.get(property).cloned().unwrap_or(Value::Null),
        Value::Array(items) => property
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index))
            .cloned()
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn numbers(left: &Value, right: &Value, operator: &str) -> EvalResult<(f64, f64)> {
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(mismatch(operator, left, right)),
    }
}

fn to_number(value: f64, operator: &str) -> EvalResult<Value> {
    number(value).ok_or_else(|| {
        EvalError::invalid_operands(operator, format!("Result {} is not a finite number", value))
    })
}

fn mismatch(operator: &str, left: &Value, right: &Value) -> EvalError {
    EvalError::invalid_operands(
        operator,
        format!(
            "Expected numbers, got {} {} {}",
            type_name(left),
            operator,
            type_name(right)
        ),
    )
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
