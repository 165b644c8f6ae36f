//! Node kind and field name constants for the Kamailio configuration grammar
//!
//! Every node produced by the parser carries one of these tags. Rules and
//! position queries compare against the constants instead of spelling the
//! strings out, so a renamed production only has to change here.

// ============================================================================
// Structure
// ============================================================================

pub const SOURCE_FILE: &str = "source_file";
pub const STATEMENT: &str = "statement";
pub const COMPOUND_STATEMENT: &str = "compound_statement";
pub const BLOCK_START: &str = "block_start";
pub const BLOCK_END: &str = "block_end";
pub const ERROR: &str = "ERROR";

// ============================================================================
// Top-level directives
// ============================================================================

pub const ROUTE_DEFINITION: &str = "route_definition";
pub const ROUTE_TYPE: &str = "route_type";
pub const ROUTE_NAME: &str = "route_name";
pub const TOP_LEVEL_ASSIGNMENT_EXPRESSION: &str = "top_level_assignment_expression";
pub const CORE_VALUE: &str = "core_value";
pub const LOADMODULE_STATEMENT: &str = "loadmodule_statement";
pub const LOADPATH_STATEMENT: &str = "loadpath_statement";
pub const INCLUDE_STATEMENT: &str = "include_statement";
pub const MODPARAM_STATEMENT: &str = "modparam_statement";
pub const XML: &str = "xml";
pub const XML_TAG: &str = "xml_tag";
pub const XML_TEXT: &str = "xml_text";

// ============================================================================
// Control flow
// ============================================================================

pub const IF_STATEMENT: &str = "if_statement";
pub const SWITCH_STATEMENT: &str = "switch_statement";
pub const WHILE_STATEMENT: &str = "while_statement";
pub const CASE_STATEMENT: &str = "case_statement";
pub const RETURN_STATEMENT: &str = "return_statement";
pub const CORE_FUNCTION: &str = "core_function";

// ============================================================================
// Expressions
// ============================================================================

pub const EXPRESSION: &str = "expression";
pub const ASSIGNMENT_EXPRESSION: &str = "assignment_expression";
pub const BINARY_EXPRESSION: &str = "binary_expression";
pub const UNARY_EXPRESSION: &str = "unary_expression";
pub const PARENTHESIZED_EXPRESSION: &str = "parenthesized_expression";
pub const CALL_EXPRESSION: &str = "call_expression";
pub const ARGUMENT_LIST: &str = "argument_list";
pub const IDENTIFIER: &str = "identifier";
pub const STRING: &str = "string";
pub const NUMBER: &str = "number";

// ============================================================================
// Pseudo-variables
// ============================================================================

pub const PSEUDO_VARIABLE: &str = "pseudo_variable";
pub const PSEUDO_CONTENT: &str = "pseudo_content";
pub const PVAR_EXPRESSION: &str = "pvar_expression";
pub const AVP_VAR: &str = "avp_var";
pub const SCRIPT_VAR: &str = "script_var";
pub const DLG_VAR: &str = "dlg_var";
pub const PVAR_CALL: &str = "pvar_call";
pub const PVAR_ARGUMENT: &str = "pvar_argument";
pub const PVAR_INDEX: &str = "pvar_index";
pub const VARIABLE_NAME: &str = "variable_name";
pub const TRANSFORMATION: &str = "transformation";

// ============================================================================
// Extras
// ============================================================================

pub const COMMENT: &str = "comment";
pub const DEPRECATED_COMMENT: &str = "deprecated_comment";
pub const PREPROC_DIRECTIVE: &str = "preproc_directive";

// ============================================================================
// Fields
// ============================================================================

pub const FIELD_ALTERNATIVE: &str = "alternative";
pub const FIELD_ARGUMENT: &str = "argument";
pub const FIELD_ARGUMENTS: &str = "arguments";
pub const FIELD_BODY: &str = "body";
pub const FIELD_CLASS: &str = "class";
pub const FIELD_CONDITION: &str = "condition";
pub const FIELD_CONSEQUENCE: &str = "consequence";
pub const FIELD_FILE: &str = "file";
pub const FIELD_FUNCTION: &str = "function";
pub const FIELD_KEY: &str = "key";
pub const FIELD_LEFT: &str = "left";
pub const FIELD_MODULE: &str = "module";
pub const FIELD_NAME: &str = "name";
pub const FIELD_OPERATOR: &str = "operator";
pub const FIELD_PATH: &str = "path";
pub const FIELD_RIGHT: &str = "right";
pub const FIELD_TYPE: &str = "type";
pub const FIELD_VALUE: &str = "value";

/// Named node kinds of the grammar, used to validate queries.
pub const NAMED_KINDS: &[&str] = &[
    SOURCE_FILE,
    STATEMENT,
    COMPOUND_STATEMENT,
    BLOCK_START,
    BLOCK_END,
    ERROR,
    ROUTE_DEFINITION,
    ROUTE_TYPE,
    ROUTE_NAME,
    TOP_LEVEL_ASSIGNMENT_EXPRESSION,
    CORE_VALUE,
    LOADMODULE_STATEMENT,
    LOADPATH_STATEMENT,
    INCLUDE_STATEMENT,
    MODPARAM_STATEMENT,
    XML,
    XML_TAG,
    XML_TEXT,
    IF_STATEMENT,
    SWITCH_STATEMENT,
    WHILE_STATEMENT,
    CASE_STATEMENT,
    RETURN_STATEMENT,
    CORE_FUNCTION,
    EXPRESSION,
    ASSIGNMENT_EXPRESSION,
    BINARY_EXPRESSION,
    UNARY_EXPRESSION,
    PARENTHESIZED_EXPRESSION,
    CALL_EXPRESSION,
    ARGUMENT_LIST,
    IDENTIFIER,
    STRING,
    NUMBER,
    PSEUDO_VARIABLE,
    PSEUDO_CONTENT,
    PVAR_EXPRESSION,
    AVP_VAR,
    SCRIPT_VAR,
    DLG_VAR,
    PVAR_CALL,
    PVAR_ARGUMENT,
    PVAR_INDEX,
    VARIABLE_NAME,
    TRANSFORMATION,
    COMMENT,
    DEPRECATED_COMMENT,
    PREPROC_DIRECTIVE,
];

/// Keywords that appear as anonymous leaves.
pub const KEYWORDS: &[&str] = &[
    "if",
    "else",
    "switch",
    "case",
    "default",
    "while",
    "return",
    "drop",
    "exit",
    "break",
    "loadmodule",
    "loadpath",
    "include_file",
    "import_file",
    "modparam",
    "defined",
    "avp",
    "var",
    "dlg_var",
];

/// Punctuation and operators that appear as anonymous leaves.
pub const PUNCTUATION: &[&str] = &[
    "$", "$(", "(", ")", "{", "}", "[", "]", ";", ",", ":", ".", "=", "==", "!=", "=~", "!~", "<",
    ">", "<=", ">=", "+", "-", "*", "/", "%", "!", "&", "&&", "|", "||", "^", "~", "=>",
];

/// Field names of the grammar, used to validate queries.
pub const FIELDS: &[&str] = &[
    FIELD_ALTERNATIVE,
    FIELD_ARGUMENT,
    FIELD_ARGUMENTS,
    FIELD_BODY,
    FIELD_CLASS,
    FIELD_CONDITION,
    FIELD_CONSEQUENCE,
    FIELD_FILE,
    FIELD_FUNCTION,
    FIELD_KEY,
    FIELD_LEFT,
    FIELD_MODULE,
    FIELD_NAME,
    FIELD_OPERATOR,
    FIELD_PATH,
    FIELD_RIGHT,
    FIELD_TYPE,
    FIELD_VALUE,
];

/// Route block keywords (`request_route { }`, `failure_route[NAME] { }`, ...).
pub const ROUTE_KEYWORDS: &[&str] = &[
    "route",
    "request_route",
    "failure_route",
    "branch_route",
    "branch_failure_route",
    "onreply_route",
    "reply_route",
    "onsend_route",
    "event_route",
];

/// Actions that unconditionally end the current control path.
pub const CORE_ACTIONS: &[&str] = &["drop", "exit", "break"];

/// Returns the static keyword or punctuation string equal to `text`.
pub fn anonymous_kind(text: &str) -> Option<&'static str> {
    KEYWORDS
        .iter()
        .chain(PUNCTUATION.iter())
        .find(|k| **k == text)
        .copied()
}

/// Returns the static route keyword equal to `text`.
pub fn route_keyword(text: &str) -> Option<&'static str> {
    ROUTE_KEYWORDS.iter().find(|k| **k == text).copied()
}
