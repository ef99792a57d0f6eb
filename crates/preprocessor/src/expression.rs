use crate::PreprocessError;
use crate::defines::SymbolTable;
use regex::Regex;
use std::sync::LazyLock;

/// `defined(X)` is rewritten to the bracket form `defined[X]` before the
/// infix-to-postfix conversion so its parentheses do not participate in
/// precedence grouping, and reverted before operand extraction.
static DEFINED_TO_BRACKET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"defined\s*\((.+?)\)").unwrap());
static BRACKET_TO_DEFINED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"defined\[(.+?)\]").unwrap());
static DEFINED_OPERAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"defined\((.+)\)").unwrap());

/// Comparison operators recognized in conditions, in detection order.
///
/// Two-character operators are searched before their one-character
/// prefixes; reordering breaks `>=`/`<=` splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Ge,
    Le,
    Lt,
    Gt,
}

impl CompareOp {
    const DETECTION_ORDER: [CompareOp; 6] = [
        CompareOp::Eq,
        CompareOp::Ne,
        CompareOp::Ge,
        CompareOp::Le,
        CompareOp::Lt,
        CompareOp::Gt,
    ];

    pub fn token(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
        }
    }
}

/// Parsed condition of an `#if`/`#elif` directive.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// `defined(NAME)`, `!defined(NAME)`, or a bare macro name.
    IsDefined { name: String, negated: bool },
    /// `LHS op RHS`; sides are macro names or literals, resolved at
    /// evaluation time.
    Compare {
        lhs: String,
        op: CompareOp,
        rhs: String,
    },
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
}

impl Expression {
    /// Parse a condition string into an expression tree.
    ///
    /// Leftover or missing operands after the postfix conversion surface a
    /// [`PreprocessError::MalformedExpression`] instead of a silently
    /// partial tree.
    pub fn parse(expr: &str) -> Result<Expression, PreprocessError> {
        let rewritten = DEFINED_TO_BRACKET.replace_all(expr, "defined[$1]");
        let postfix = infix_to_postfix(&rewritten);

        let malformed = || PreprocessError::MalformedExpression {
            expr: expr.to_string(),
        };

        let mut stack: Vec<StackItem> = Vec::new();
        for token in postfix {
            if token == "&&" || token == "||" {
                if stack.len() < 2 {
                    return Err(malformed());
                }
                let right = stack.pop().map(StackItem::into_expression);
                let left = stack.pop().map(StackItem::into_expression);
                let (Some(left), Some(right)) = (left, right) else {
                    return Err(malformed());
                };
                let node = if token == "&&" {
                    Expression::And(Box::new(left), Box::new(right))
                } else {
                    Expression::Or(Box::new(left), Box::new(right))
                };
                stack.push(StackItem::Node(node));
            } else {
                stack.push(StackItem::Raw(token));
            }
        }

        if stack.len() != 1 {
            return Err(malformed());
        }
        Ok(stack.remove(0).into_expression())
    }

    /// Evaluate against the symbol table. Both sides of `And`/`Or` are
    /// always evaluated; there is no short-circuit requirement.
    pub fn evaluate(&self, symbols: &SymbolTable) -> bool {
        match self {
            Expression::IsDefined { name, negated } => symbols.is_defined(name) != *negated,
            Expression::Compare { lhs, op, rhs } => {
                let left = symbols.value(lhs).unwrap_or(lhs);
                let right = symbols.value(rhs).unwrap_or(rhs);
                compare(left, right, *op)
            }
            Expression::And(left, right) => {
                let l = left.evaluate(symbols);
                let r = right.evaluate(symbols);
                l && r
            }
            Expression::Or(left, right) => {
                let l = left.evaluate(symbols);
                let r = right.evaluate(symbols);
                l || r
            }
        }
    }
}

/// Pending postfix item: either an unparsed operand string or an already
/// folded subtree.
enum StackItem {
    Raw(String),
    Node(Expression),
}

impl StackItem {
    fn into_expression(self) -> Expression {
        match self {
            StackItem::Raw(token) => {
                let reverted = BRACKET_TO_DEFINED.replace_all(&token, "defined($1)");
                extract_operation(&reverted)
            }
            StackItem::Node(node) => node,
        }
    }
}

/// Classify an operand string: `defined(...)` check, comparison, or
/// bare-name truthiness.
fn extract_operation(expr: &str) -> Expression {
    if let Some(caps) = DEFINED_OPERAND.captures(expr) {
        return Expression::IsDefined {
            name: caps[1].trim().to_string(),
            negated: expr.starts_with('!'),
        };
    }
    for op in CompareOp::DETECTION_ORDER {
        if let Some(pos) = expr.find(op.token()) {
            return Expression::Compare {
                lhs: expr[..pos].trim().to_string(),
                op,
                rhs: expr[pos + op.token().len()..].trim().to_string(),
            };
        }
    }
    Expression::IsDefined {
        name: expr.trim().to_string(),
        negated: false,
    }
}

fn priority(token: &str) -> u8 {
    match token {
        "||" => 2,
        "&&" => 3,
        _ => 0,
    }
}

/// Shunting-yard conversion recognizing `&&` and `||` as the only binary
/// operators; parenthesized and `defined[...]` runs stay atomic tokens.
fn infix_to_postfix(infix: &str) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();
    let mut stack: Vec<&str> = Vec::new();
    let mut operand = String::new();

    fn push_operand(operand: &mut String, result: &mut Vec<String>) {
        let trimmed = operand.trim();
        if !trimmed.is_empty() {
            result.push(trimmed.to_string());
        }
        operand.clear();
    }

    let chars: Vec<char> = infix.chars().collect();
    let mut idx = 0;
    while idx < chars.len() {
        let c = chars[idx];
        let pair = if idx + 1 < chars.len() {
            match (c, chars[idx + 1]) {
                ('&', '&') => Some("&&"),
                ('|', '|') => Some("||"),
                _ => None,
            }
        } else {
            None
        };

        if c == '(' {
            operand.clear();
            stack.push("(");
        } else if c == ')' {
            push_operand(&mut operand, &mut result);
            while let Some(top) = stack.last() {
                if *top == "(" {
                    break;
                }
                result.push(stack.pop().unwrap_or_default().to_string());
            }
            stack.pop();
        } else if let Some(op) = pair {
            push_operand(&mut operand, &mut result);
            while let Some(top) = stack.last() {
                if *top == "(" || priority(top) < priority(op) {
                    break;
                }
                result.push(stack.pop().unwrap_or_default().to_string());
            }
            stack.push(op);
            idx += 1;
        } else {
            operand.push(c);
        }
        idx += 1;
    }
    push_operand(&mut operand, &mut result);

    while let Some(top) = stack.pop() {
        if top != "(" {
            result.push(top.to_string());
        }
    }
    result
}

/// Numeric comparison when both sides parse; lexical string comparison
/// otherwise.
fn compare(left: &str, right: &str, op: CompareOp) -> bool {
    if let (Ok(l), Ok(r)) = (left.parse::<f64>(), right.parse::<f64>()) {
        match op {
            CompareOp::Eq => l == r,
            CompareOp::Ne => l != r,
            CompareOp::Ge => l >= r,
            CompareOp::Le => l <= r,
            CompareOp::Lt => l < r,
            CompareOp::Gt => l > r,
        }
    } else {
        match op {
            CompareOp::Eq => left == right,
            CompareOp::Ne => left != right,
            CompareOp::Ge => left >= right,
            CompareOp::Le => left <= right,
            CompareOp::Lt => left < right,
            CompareOp::Gt => left > right,
        }
    }
}
