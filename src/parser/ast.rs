//! Abstract syntax tree for the Metadata Template Language

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// A parsed template: an ordered sequence of literal runs and statements
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    pub nodes: Vec<Node>,
}

impl Template {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Whether the template contains no nodes at all
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Field names referenced at the top level, in order.
    ///
    /// Does not verify that the fields resolve to anything; used by hosts
    /// to label rendered records.
    pub fn fields(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                Node::Field(stmt) => Some(stmt.field.as_str()),
                Node::Text { .. } => None,
            })
            .collect()
    }

    /// The first statement of the template, if any
    pub fn first_statement(&self) -> Option<&FieldStmt> {
        self.nodes.iter().find_map(|n| match n {
            Node::Field(stmt) => Some(stmt.as_ref()),
            Node::Text { .. } => None,
        })
    }
}

/// One element of a template
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A run of raw text between statements
    Text { text: String, span: Span },
    /// A `{...}` statement with its modifier chain
    Field(Box<FieldStmt>),
}

/// A single `{...}` statement.
///
/// Modifier clauses appear in the fixed syntactic order
/// `delim`? `+`? field (`:` subfield)? (`.` attr)* (`|` filter)*
/// `[find,replace]`? conditional? `&combine`? `?true`? `,default`?.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldStmt {
    /// Join delimiter when the `+` in-place flag is present; `Some("")`
    /// for a bare `{+field}`
    pub expand: Option<String>,
    /// Field name; a leading `%` marks a variable reference
    pub field: String,
    pub subfield: Option<String>,
    /// Dot-chained attribute accessors, e.g. `parent`, `year`
    pub attributes: Vec<String>,
    pub filters: Vec<FilterCall>,
    /// Literal find/replace pairs applied in order to every value
    pub find_replace: Vec<(String, String)>,
    pub conditional: Option<Conditional>,
    /// `&` sub-template appended to the value list
    pub combine: Option<Template>,
    /// `?` sub-template selected when the statement is truthy
    pub bool_branch: Option<Template>,
    /// `,` sub-template substituted when the value list is empty
    pub default: Option<Template>,
    pub span: Span,
}

/// A `|name` or `|name(arg)` filter invocation; the argument is itself a
/// template, rendered before the filter runs
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCall {
    pub name: String,
    pub arg: Option<Template>,
}

/// A ` OP value` conditional clause
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub negated: bool,
    pub op: CompareOp,
    /// The right-hand value template; string operators split its rendering
    /// on `|` into alternatives
    pub value: Template,
}

/// Conditional operators, longest-match-first in the grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Contains,
    Matches,
    StartsWith,
    EndsWith,
    Le,
    Ge,
    Lt,
    Gt,
    Eq,
    Ne,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Contains => "contains",
            CompareOp::Matches => "matches",
            CompareOp::StartsWith => "startswith",
            CompareOp::EndsWith => "endswith",
            CompareOp::Le => "<=",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
        }
    }

    /// True for the word operators that split their value on `|`
    pub fn is_string_op(&self) -> bool {
        matches!(
            self,
            CompareOp::Contains | CompareOp::Matches | CompareOp::StartsWith | CompareOp::EndsWith
        )
    }

    /// True for the numeric comparison operators
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge
        )
    }
}
