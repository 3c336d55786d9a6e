//! Recursive-descent parser for MTL template strings
//!
//! Statements do not nest textually; sub-templates in modifier positions
//! are parsed recursively, each clause scanning up to the terminator set
//! for its position. A nested `{...}` consumes its own closing brace, so a
//! terminator character at inner depth never ends the outer clause.

use crate::error::SyntaxError;
use crate::parser::ast::{
    CompareOp, Conditional, FieldStmt, FilterCall, Node, Template,
};
use crate::parser::scanner::Scanner;

/// Parse an MTL source string into a template
pub fn parse(input: &str) -> Result<Template, SyntaxError> {
    let mut scanner = Scanner::new(input);
    parse_sequence(&mut scanner, "")
    // with no terminators the sequence always runs to end of input
}

/// Parse nodes until end of input or a character from `terms` at the
/// current depth; the terminator is left unconsumed for the caller.
fn parse_sequence(s: &mut Scanner, terms: &str) -> Result<Template, SyntaxError> {
    let mut nodes = Vec::new();
    loop {
        let start = s.pos();
        match s.peek() {
            None => break,
            Some(c) if terms.contains(c) => break,
            Some('{') => {
                let stmt = parse_statement(s)?;
                nodes.push(Node::Field(Box::new(stmt)));
            }
            Some(_) => {
                let text = s.take_while(|c| c != '{' && !terms.contains(c));
                nodes.push(Node::Text {
                    text: text.to_string(),
                    span: start..s.pos(),
                });
            }
        }
    }
    Ok(Template::new(nodes))
}

/// Parse a `{...}` statement; the scanner is positioned on the `{`.
fn parse_statement(s: &mut Scanner) -> Result<FieldStmt, SyntaxError> {
    let start = s.pos();
    s.bump(); // '{'

    // Optimistic delim parse: everything up to a '+' is a join delimiter.
    // If the rest of the statement fails to parse that way, back off and
    // re-parse without one (ordered-choice semantics).
    let body_start = s.pos();
    let delim = s.take_while(|c| c != '+' && c != '{' && c != '}').to_string();
    if s.peek() == Some('+') {
        s.bump();
        match parse_statement_body(s, Some(delim), start) {
            Ok(stmt) => return Ok(stmt),
            Err(_) => s.reset(body_start),
        }
    } else {
        s.reset(body_start);
    }
    parse_statement_body(s, None, start)
}

fn parse_statement_body(
    s: &mut Scanner,
    expand: Option<String>,
    start: usize,
) -> Result<FieldStmt, SyntaxError> {
    let field = if s.eat('%') {
        let name = ident(s, "expected variable name after '%'")?;
        format!("%{name}")
    } else {
        ident(s, "expected field name")?
    };

    let subfield = if s.eat(':') {
        Some(parse_subfield(s)?)
    } else {
        None
    };

    let mut attributes = Vec::new();
    while at_attribute(s) {
        s.bump(); // '.'
        attributes.push(ident(s, "expected attribute name after '.'")?);
    }

    let mut filters = Vec::new();
    while s.eat('|') {
        let name = ident(s, "expected filter name after '|'")?;
        let arg = if s.eat('(') {
            let tpl = parse_sequence(s, ")}")?;
            if !s.eat(')') {
                return Err(SyntaxError::new(s.pos(), "unterminated filter argument"));
            }
            Some(tpl)
        } else {
            None
        };
        filters.push(FilterCall { name, arg });
    }

    let find_replace = if s.eat('[') {
        parse_find_replace(s)?
    } else {
        Vec::new()
    };

    let conditional = if s.eat(' ') {
        Some(parse_conditional(s)?)
    } else {
        None
    };

    let combine = if s.eat('&') {
        let tpl = parse_sequence(s, "&?,}")?;
        if s.peek() == Some('&') {
            return Err(SyntaxError::new(
                s.pos(),
                "multiple combine clauses in one statement",
            ));
        }
        Some(tpl)
    } else {
        None
    };

    let bool_branch = if s.eat('?') {
        Some(parse_sequence(s, ",}")?)
    } else {
        None
    };

    let default = if s.eat(',') {
        Some(parse_sequence(s, "}")?)
    } else {
        None
    };

    if !s.eat('}') {
        return Err(match s.peek() {
            Some(c) => SyntaxError::new(s.pos(), format!("unexpected character '{c}'")),
            None => SyntaxError::new(start, "unterminated template statement"),
        });
    }

    let stmt = FieldStmt {
        expand,
        field,
        subfield,
        attributes,
        filters,
        find_replace,
        conditional,
        combine,
        bool_branch,
        default,
        span: start..s.pos(),
    };
    validate_statement(&stmt, start)?;
    Ok(stmt)
}

/// Alphanumeric-plus-underscore identifier
fn ident(s: &mut Scanner, expected: &str) -> Result<String, SyntaxError> {
    let pos = s.pos();
    let name = s.take_while(|c| c.is_alphanumeric() || c == '_');
    if name.is_empty() {
        return Err(SyntaxError::new(pos, expected));
    }
    Ok(name.to_string())
}

/// Subfields run to the next modifier sigil. They may contain ':' and '.'
/// (format specifications like `int:03d` or `float:.2f`); a '.' only ends
/// the subfield when it starts an attribute (next character is a letter
/// or '_').
fn parse_subfield(s: &mut Scanner) -> Result<String, SyntaxError> {
    let pos = s.pos();
    let mut subfield = String::new();
    while let Some(c) = s.peek() {
        if "{}|[]&?, ".contains(c) {
            break;
        }
        if c == '.' && matches!(s.peek_second(), Some(n) if n.is_alphabetic() || n == '_') {
            break;
        }
        subfield.push(c);
        s.bump();
    }
    if subfield.is_empty() {
        return Err(SyntaxError::new(pos, "expected subfield after ':'"));
    }
    Ok(subfield)
}

fn at_attribute(s: &Scanner) -> bool {
    s.peek() == Some('.')
        && matches!(s.peek_second(), Some(c) if c.is_alphabetic() || c == '_')
}

/// `find,replace(|find,replace)*]` with the opening '[' already consumed.
/// Both sides are raw literals; braces would break the statement's brace
/// balance and are rejected.
fn parse_find_replace(s: &mut Scanner) -> Result<Vec<(String, String)>, SyntaxError> {
    let mut pairs = Vec::new();
    loop {
        let find = s.take_while(|c| !",|]{}".contains(c)).to_string();
        if !s.eat(',') {
            return Err(SyntaxError::new(
                s.pos(),
                "expected ',' between find and replace",
            ));
        }
        let replace = s.take_while(|c| !",|]{}".contains(c)).to_string();
        pairs.push((find, replace));
        if s.eat('|') {
            continue;
        }
        if s.eat(']') {
            return Ok(pairs);
        }
        return Err(SyntaxError::new(
            s.pos(),
            "expected '|' or ']' after find/replace pair",
        ));
    }
}

/// `(not )? OP value` with the leading space already consumed
fn parse_conditional(s: &mut Scanner) -> Result<Conditional, SyntaxError> {
    let negated = s.eat_str("not ");
    let op = parse_operator(s)?;
    if !s.eat(' ') {
        return Err(SyntaxError::new(s.pos(), "conditional clause requires a value"));
    }
    let value = parse_sequence(s, "&?,}")?;
    if value.is_empty() {
        return Err(SyntaxError::new(s.pos(), "conditional clause requires a value"));
    }
    Ok(Conditional { negated, op, value })
}

// Longest match wins: '<=' before '<'
const OPERATORS: [(&str, CompareOp); 10] = [
    ("contains", CompareOp::Contains),
    ("matches", CompareOp::Matches),
    ("startswith", CompareOp::StartsWith),
    ("endswith", CompareOp::EndsWith),
    ("<=", CompareOp::Le),
    (">=", CompareOp::Ge),
    ("==", CompareOp::Eq),
    ("!=", CompareOp::Ne),
    ("<", CompareOp::Lt),
    (">", CompareOp::Gt),
];

fn parse_operator(s: &mut Scanner) -> Result<CompareOp, SyntaxError> {
    for (token, op) in OPERATORS {
        if s.eat_str(token) {
            return Ok(op);
        }
    }
    Err(SyntaxError::new(s.pos(), "expected conditional operator"))
}

/// Parse-time shape checks for the fields whose clause usage is fixed
fn validate_statement(stmt: &FieldStmt, start: usize) -> Result<(), SyntaxError> {
    if stmt.field == "var" && (stmt.subfield.is_none() || stmt.default.is_none()) {
        return Err(SyntaxError::new(
            start,
            "var requires a name and a value: {var:NAME,VALUE}",
        ));
    }
    if stmt.field == "format" {
        let ok = stmt
            .subfield
            .as_deref()
            .and_then(|sf| sf.split_once(':'))
            .map(|(ty, _)| matches!(ty, "int" | "float" | "str"))
            .unwrap_or(false);
        if !ok {
            return Err(SyntaxError::new(
                start,
                "format requires a subfield in the form TYPE:FORMAT with TYPE one of 'int', 'float', 'str'",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only_statement(input: &str) -> FieldStmt {
        let tpl = parse(input).expect("should parse");
        assert_eq!(tpl.nodes.len(), 1, "expected a single node in {input:?}");
        match &tpl.nodes[0] {
            Node::Field(stmt) => (**stmt).clone(),
            other => panic!("expected statement, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_literal_only() {
        let tpl = parse("just text, no fields").expect("should parse");
        assert_eq!(tpl.nodes.len(), 1);
        match &tpl.nodes[0] {
            Node::Text { text, .. } => assert_eq!(text, "just text, no fields"),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_empty_string() {
        assert!(parse("").expect("should parse").is_empty());
    }

    #[test]
    fn test_parse_simple_field() {
        let stmt = only_statement("{title}");
        assert_eq!(stmt.field, "title");
        assert!(stmt.subfield.is_none());
        assert!(stmt.expand.is_none());
        assert!(stmt.filters.is_empty());
    }

    #[test]
    fn test_parse_namespaced_field() {
        let stmt = only_statement("{audio:artist}");
        assert_eq!(stmt.field, "audio");
        assert_eq!(stmt.subfield.as_deref(), Some("artist"));
    }

    #[test]
    fn test_parse_attribute_chain() {
        let stmt = only_statement("{filepath.parent.name}");
        assert_eq!(stmt.field, "filepath");
        assert_eq!(stmt.attributes, vec!["parent", "name"]);
    }

    #[test]
    fn test_parse_expand_with_delim() {
        let stmt = only_statement("{, +audio:genre}");
        assert_eq!(stmt.expand.as_deref(), Some(", "));
        assert_eq!(stmt.field, "audio");
    }

    #[test]
    fn test_parse_expand_without_delim() {
        let stmt = only_statement("{+audio:genre}");
        assert_eq!(stmt.expand.as_deref(), Some(""));
    }

    #[test]
    fn test_plus_in_find_replace_is_not_a_delim() {
        let stmt = only_statement("{title[+,-]}");
        assert!(stmt.expand.is_none());
        assert_eq!(stmt.field, "title");
        assert_eq!(stmt.find_replace, vec![("+".to_string(), "-".to_string())]);
    }

    #[test]
    fn test_parse_filters() {
        let stmt = only_statement("{keywords|lower|parens}");
        let names: Vec<_> = stmt.filters.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["lower", "parens"]);
        assert!(stmt.filters[0].arg.is_none());
    }

    #[test]
    fn test_parse_filter_with_argument() {
        let stmt = only_statement("{keywords|split(;)}");
        assert_eq!(stmt.filters.len(), 1);
        let arg = stmt.filters[0].arg.as_ref().expect("should have arg");
        match &arg.nodes[0] {
            Node::Text { text, .. } => assert_eq!(text, ";"),
            other => panic!("expected text arg, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_filter_argument_with_nested_statement() {
        let stmt = only_statement("{keywords|split({%sep})}");
        let arg = stmt.filters[0].arg.as_ref().expect("should have arg");
        match &arg.nodes[0] {
            Node::Field(inner) => assert_eq!(inner.field, "%sep"),
            other => panic!("expected nested statement, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_find_replace_pairs() {
        let stmt = only_statement("{title[a,b|c,d]}");
        assert_eq!(
            stmt.find_replace,
            vec![
                ("a".to_string(), "b".to_string()),
                ("c".to_string(), "d".to_string())
            ]
        );
    }

    #[test]
    fn test_parse_find_replace_empty_sides() {
        let stmt = only_statement("{title[-,]}");
        assert_eq!(stmt.find_replace, vec![("-".to_string(), String::new())]);
    }

    #[test]
    fn test_parse_conditional() {
        let stmt = only_statement("{audio:title contains Beach}");
        let cond = stmt.conditional.expect("should have conditional");
        assert!(!cond.negated);
        assert_eq!(cond.op, CompareOp::Contains);
        match &cond.value.nodes[0] {
            Node::Text { text, .. } => assert_eq!(text, "Beach"),
            other => panic!("expected text value, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_negated_conditional() {
        let stmt = only_statement("{audio:title not matches X}");
        let cond = stmt.conditional.expect("should have conditional");
        assert!(cond.negated);
        assert_eq!(cond.op, CompareOp::Matches);
    }

    #[test]
    fn test_parse_numeric_operators_longest_match() {
        let stmt = only_statement("{size <= 100}");
        assert_eq!(stmt.conditional.expect("cond").op, CompareOp::Le);
        let stmt = only_statement("{size < 100}");
        assert_eq!(stmt.conditional.expect("cond").op, CompareOp::Lt);
    }

    #[test]
    fn test_conditional_value_may_contain_spaces_and_pipes() {
        let stmt = only_statement("{audio:artist matches The Piano Guys|Queen}");
        let cond = stmt.conditional.expect("cond");
        match &cond.value.nodes[0] {
            Node::Text { text, .. } => assert_eq!(text, "The Piano Guys|Queen"),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_combine() {
        let stmt = only_statement("{created.year&{audio:title,}}");
        let combine = stmt.combine.expect("should have combine");
        assert_eq!(combine.nodes.len(), 1);
        match &combine.nodes[0] {
            Node::Field(inner) => {
                assert_eq!(inner.field, "audio");
                assert!(inner.default.is_some());
            }
            other => panic!("expected nested statement, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_bool_and_default() {
        let stmt = only_statement("{audio:title?have title,no title}");
        let yes = stmt.bool_branch.expect("true branch");
        match &yes.nodes[0] {
            Node::Text { text, .. } => assert_eq!(text, "have title"),
            other => panic!("expected text, got {other:?}"),
        }
        let no = stmt.default.expect("default");
        match &no.nodes[0] {
            Node::Text { text, .. } => assert_eq!(text, "no title"),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn test_default_keeps_commas() {
        let stmt = only_statement("{title,a, b, c}");
        let def = stmt.default.expect("default");
        match &def.nodes[0] {
            Node::Text { text, .. } => assert_eq!(text, "a, b, c"),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn test_nested_statement_in_default() {
        let stmt = only_statement("{var:pipe,{pipe}}");
        assert_eq!(stmt.field, "var");
        assert_eq!(stmt.subfield.as_deref(), Some("pipe"));
        let def = stmt.default.expect("default");
        match &def.nodes[0] {
            Node::Field(inner) => assert_eq!(inner.field, "pipe"),
            other => panic!("expected nested statement, got {other:?}"),
        }
    }

    #[test]
    fn test_text_around_statement() {
        let tpl = parse("a {title} z").expect("should parse");
        assert_eq!(tpl.nodes.len(), 3);
        assert_eq!(tpl.fields(), vec!["title"]);
    }

    #[test]
    fn test_close_brace_is_literal_at_top_level() {
        let tpl = parse("a}b").expect("should parse");
        match &tpl.nodes[0] {
            Node::Text { text, .. } => assert_eq!(text, "a}b"),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn test_variable_field() {
        let stmt = only_statement("{%album}");
        assert_eq!(stmt.field, "%album");
    }

    #[test]
    fn test_format_subfield_keeps_colon_and_dot() {
        let stmt = only_statement("{format:float:.2f,{size}}");
        assert_eq!(stmt.field, "format");
        assert_eq!(stmt.subfield.as_deref(), Some("float:.2f"));
        assert!(stmt.attributes.is_empty());
    }

    #[test]
    fn test_error_unterminated_statement() {
        let err = parse("{title").expect_err("should fail");
        assert_eq!(err.offset, 0);
    }

    #[test]
    fn test_error_empty_field() {
        assert!(parse("{}").is_err());
        assert!(parse("{|lower}").is_err());
    }

    #[test]
    fn test_error_conditional_without_value() {
        assert!(parse("{title matches}").is_err());
        assert!(parse("{title matches }").is_err());
    }

    #[test]
    fn test_error_space_without_operator() {
        assert!(parse("{my field}").is_err());
    }

    #[test]
    fn test_error_multiple_combines() {
        assert!(parse("{a&{b}&{c}}").is_err());
    }

    #[test]
    fn test_error_var_shape() {
        assert!(parse("{var}").is_err());
        assert!(parse("{var:name}").is_err());
        assert!(parse("{var:name,value}").is_ok());
    }

    #[test]
    fn test_error_format_shape() {
        assert!(parse("{format}").is_err());
        assert!(parse("{format:bogus:03d,{size}}").is_err());
        assert!(parse("{format:int:03d,{size}}").is_ok());
    }

    #[test]
    fn test_error_braces_in_find_replace() {
        assert!(parse("{title[{,x]}").is_err());
    }

    #[test]
    fn test_span_covers_statement() {
        let tpl = parse("ab{title}cd").expect("should parse");
        match &tpl.nodes[1] {
            Node::Field(stmt) => assert_eq!(stmt.span, 2..9),
            other => panic!("expected statement, got {other:?}"),
        }
    }
}
