use crate::PreprocessError;
use crate::cursor::LineCursor;
use crate::defines::{SymbolTable, parse_define_line};
use crate::expression::Expression;
use std::collections::BTreeMap;

/// One `(condition, body)` pair of an `#if`/`#elif` chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub condition: Expression,
    pub body: Vec<DirectiveNode>,
}

/// Node of the directive tree. The root of a source is a plain
/// `Vec<DirectiveNode>`, an implicit top-level group with no condition.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveNode {
    /// An ordinary source line, kept verbatim. `define` carries the parsed
    /// `(name, value)` pair when the line is a `#define`.
    Line {
        text: String,
        define: Option<(String, Option<String>)>,
    },
    /// A full `#if*`/`#elif`/`#else`/`#endif` chain.
    ConditionGroup {
        branches: Vec<Branch>,
        else_branch: Option<Vec<DirectiveNode>>,
    },
}

/// Directive keyword recognized as the first word of a line.
enum Directive {
    Ifdef(String),
    Ifndef(String),
    If(String),
    Elif(String),
    Else,
    Endif,
}

/// Keyword that ended a block consumption.
enum Terminator {
    Elif(String),
    Else,
    Endif,
}

/// Build the whole-source directive tree, consuming the cursor to
/// exhaustion.
pub fn build_tree(cursor: &mut LineCursor) -> Result<Vec<DirectiveNode>, PreprocessError> {
    let mut nodes = Vec::new();
    // A stray #elif/#else/#endif with no open group is consumed leniently.
    while consume_block(cursor, &mut nodes)?.is_some() {}
    Ok(nodes)
}

/// Consume lines into `nodes` until a group-terminating keyword or end of
/// input. Nested groups are consumed fully via recursion.
fn consume_block(
    cursor: &mut LineCursor,
    nodes: &mut Vec<DirectiveNode>,
) -> Result<Option<Terminator>, PreprocessError> {
    while let Some(line) = cursor.next_line() {
        match directive_of(&line) {
            Some(Directive::Ifdef(name)) => {
                let condition = Expression::IsDefined {
                    name,
                    negated: false,
                };
                nodes.push(consume_condition_group(cursor, condition)?);
            }
            Some(Directive::Ifndef(name)) => {
                let condition = Expression::IsDefined {
                    name,
                    negated: true,
                };
                nodes.push(consume_condition_group(cursor, condition)?);
            }
            Some(Directive::If(expr)) => {
                nodes.push(consume_condition_group(cursor, Expression::parse(&expr)?)?);
            }
            Some(Directive::Elif(expr)) => return Ok(Some(Terminator::Elif(expr))),
            Some(Directive::Else) => return Ok(Some(Terminator::Else)),
            Some(Directive::Endif) => return Ok(Some(Terminator::Endif)),
            None => {
                let define = parse_define_line(&line);
                nodes.push(DirectiveNode::Line { text: line, define });
            }
        }
    }
    // Unterminated groups close silently at end of input.
    Ok(None)
}

/// Consume a whole `#if*` chain after its opening directive has been read.
fn consume_condition_group(
    cursor: &mut LineCursor,
    first_condition: Expression,
) -> Result<DirectiveNode, PreprocessError> {
    let mut branches = Vec::new();
    let mut else_branch = None;
    let mut condition = first_condition;

    loop {
        let mut body = Vec::new();
        let terminator = consume_block(cursor, &mut body)?;
        branches.push(Branch { condition, body });

        match terminator {
            Some(Terminator::Elif(expr)) => condition = Expression::parse(&expr)?,
            Some(Terminator::Else) => {
                let mut body = Vec::new();
                consume_block(cursor, &mut body)?;
                else_branch = Some(body);
                break;
            }
            Some(Terminator::Endif) | None => break,
        }
    }

    Ok(DirectiveNode::ConditionGroup {
        branches,
        else_branch,
    })
}

/// Recognize a conditional directive as the first word of a line. `#define`
/// and `#include` are not control directives and fall through to `Line`.
fn directive_of(line: &str) -> Option<Directive> {
    let trimmed = line.trim_start();
    if !trimmed.starts_with('#') {
        return None;
    }
    let (keyword, rest) = match trimmed.find(char::is_whitespace) {
        Some(pos) => trimmed.split_at(pos),
        None => (trimmed, ""),
    };
    let expr = strip_line_comment(rest).trim().to_string();
    match keyword {
        "#ifdef" => Some(Directive::Ifdef(expr)),
        "#ifndef" => Some(Directive::Ifndef(expr)),
        "#if" => Some(Directive::If(expr)),
        "#elif" => Some(Directive::Elif(expr)),
        "#else" => Some(Directive::Else),
        "#endif" => Some(Directive::Endif),
        _ => None,
    }
}

/// Drop a trailing `//` comment from a condition expression.
fn strip_line_comment(expr: &str) -> &str {
    match expr.find("//") {
        Some(pos) => &expr[..pos],
        None => expr,
    }
}

/// Walk the tree and concatenate the surviving lines, returning the
/// recomposed source and the defines discovered along the executed path.
///
/// The first branch whose condition holds is emitted; otherwise the else
/// branch; otherwise nothing. A visited `#define` line also updates the
/// live symbol table, so later conditionals in the same pass see it.
pub fn recompose(
    nodes: &[DirectiveNode],
    symbols: &mut SymbolTable,
) -> (String, BTreeMap<String, Option<String>>) {
    let mut out = String::new();
    let mut discovered = BTreeMap::new();
    recompose_into(nodes, symbols, &mut discovered, &mut out);
    (out, discovered)
}

fn recompose_into(
    nodes: &[DirectiveNode],
    symbols: &mut SymbolTable,
    discovered: &mut BTreeMap<String, Option<String>>,
    out: &mut String,
) {
    for node in nodes {
        match node {
            DirectiveNode::Line { text, define } => {
                out.push_str(text);
                out.push('\n');
                if let Some((name, value)) = define {
                    symbols.define(name.clone(), value.clone());
                    discovered.insert(name.clone(), value.clone());
                }
            }
            DirectiveNode::ConditionGroup {
                branches,
                else_branch,
            } => {
                let taken = branches
                    .iter()
                    .find(|branch| branch.condition.evaluate(symbols));
                match taken {
                    Some(branch) => recompose_into(&branch.body, symbols, discovered, out),
                    None => {
                        if let Some(body) = else_branch {
                            recompose_into(body, symbols, discovered, out);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(source: &str) -> Vec<DirectiveNode> {
        build_tree(&mut LineCursor::new(source)).unwrap()
    }

    fn render(source: &str, symbols: &mut SymbolTable) -> String {
        let tree = build(source);
        recompose(&tree, symbols).0
    }

    #[test]
    fn plain_lines_become_line_nodes() {
        let tree = build("float x;\nfloat y;\n");
        assert_eq!(tree.len(), 2);
        assert!(matches!(&tree[0], DirectiveNode::Line { text, define: None } if text == "float x;"));
    }

    #[test]
    fn ifdef_opens_a_condition_group() {
        let tree = build("#ifdef FOO\nA\n#endif\n");
        assert_eq!(tree.len(), 1);
        match &tree[0] {
            DirectiveNode::ConditionGroup {
                branches,
                else_branch,
            } => {
                assert_eq!(branches.len(), 1);
                assert_eq!(
                    branches[0].condition,
                    Expression::IsDefined {
                        name: "FOO".to_string(),
                        negated: false
                    }
                );
                assert_eq!(branches[0].body.len(), 1);
                assert!(else_branch.is_none());
            }
            other => panic!("expected ConditionGroup, got {other:?}"),
        }
    }

    #[test]
    fn else_populates_the_else_branch() {
        let tree = build("#ifdef FOO\nA\n#else\nB\n#endif\n");
        match &tree[0] {
            DirectiveNode::ConditionGroup { else_branch, .. } => {
                assert_eq!(else_branch.as_ref().map(Vec::len), Some(1));
            }
            other => panic!("expected ConditionGroup, got {other:?}"),
        }
    }

    #[test]
    fn elif_appends_a_branch_to_the_same_group() {
        let tree = build("#if defined(A)\nX\n#elif defined(B)\nY\n#else\nZ\n#endif\n");
        match &tree[0] {
            DirectiveNode::ConditionGroup {
                branches,
                else_branch,
            } => {
                assert_eq!(branches.len(), 2);
                assert!(else_branch.is_some());
            }
            other => panic!("expected ConditionGroup, got {other:?}"),
        }
    }

    #[test]
    fn nested_groups_are_consumed_recursively() {
        let tree = build("#ifdef A\n#ifdef B\ninner\n#endif\nouter\n#endif\n");
        assert_eq!(tree.len(), 1);
        match &tree[0] {
            DirectiveNode::ConditionGroup { branches, .. } => {
                assert_eq!(branches[0].body.len(), 2);
                assert!(matches!(
                    branches[0].body[0],
                    DirectiveNode::ConditionGroup { .. }
                ));
            }
            other => panic!("expected ConditionGroup, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_group_closes_at_end_of_input() {
        let tree = build("#ifdef FOO\nA\n");
        assert_eq!(tree.len(), 1);
        let mut symbols = SymbolTable::new();
        symbols.define("FOO", None);
        let (out, _) = recompose(&tree, &mut symbols);
        assert_eq!(out, "A\n");
    }

    #[test]
    fn stray_endif_is_ignored() {
        let tree = build("A\n#endif\nB\n");
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn define_lines_are_flagged() {
        let tree = build("#define FOO 1\n");
        match &tree[0] {
            DirectiveNode::Line { define, .. } => {
                assert_eq!(
                    define,
                    &Some(("FOO".to_string(), Some("1".to_string())))
                );
            }
            other => panic!("expected Line, got {other:?}"),
        }
    }

    #[test]
    fn condition_line_comment_is_stripped() {
        let mut symbols = SymbolTable::new();
        symbols.define("FOO", None);
        let out = render("#ifdef FOO // enables A\nA\n#endif\n", &mut symbols);
        assert_eq!(out, "A\n");
    }

    #[test]
    fn first_true_branch_wins() {
        let mut symbols = SymbolTable::new();
        symbols.define("A", Some("1".to_string()));
        symbols.define("B", Some("1".to_string()));
        let out = render("#if defined(A)\nX\n#elif defined(B)\nY\n#endif\n", &mut symbols);
        assert_eq!(out, "X\n");
    }

    #[test]
    fn no_branch_and_no_else_emits_nothing() {
        let mut symbols = SymbolTable::new();
        let out = render("before\n#ifdef FOO\nA\n#endif\nafter\n", &mut symbols);
        assert_eq!(out, "before\nafter\n");
    }

    #[test]
    fn discovered_define_updates_live_symbols() {
        let mut symbols = SymbolTable::new();
        let out = render("#define FOO\n#ifdef FOO\nYES\n#endif\n", &mut symbols);
        assert_eq!(out, "#define FOO\nYES\n");
        assert!(symbols.is_defined("FOO"));
    }

    #[test]
    fn rejected_branch_defines_are_not_harvested() {
        let tree = build("#ifdef SEL\n#define FOO 1\n#else\n#define BAR 2\n#endif\n");
        let mut symbols = SymbolTable::new();
        symbols.define("SEL", None);
        let (_, discovered) = recompose(&tree, &mut symbols);
        assert_eq!(discovered.get("FOO"), Some(&Some("1".to_string())));
        assert!(!discovered.contains_key("BAR"));
    }

    #[test]
    fn malformed_condition_surfaces_a_parse_error() {
        let result = build_tree(&mut LineCursor::new("#if defined(A) &&\nX\n#endif\n"));
        assert!(matches!(
            result,
            Err(PreprocessError::MalformedExpression { .. })
        ));
    }

    #[test]
    fn indented_directives_are_recognized() {
        let mut symbols = SymbolTable::new();
        let out = render("  #ifdef FOO\nA\n  #endif\nB\n", &mut symbols);
        assert_eq!(out, "B\n");
    }
}
