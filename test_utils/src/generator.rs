//! Module for generating random Kamailio routing scripts for property-based testing.
//!
//! [`Script`] covers the constructs the grammar accepts without error: global
//! parameters, module loading, route blocks, pseudo-variable assignments,
//! calls, `if`/`while`/`switch` and the terminal actions. Generation uses a
//! depth parameter to bound nesting.
//!
//! Every generated script is syntactically valid, so properties that need
//! malformed input should mutate the rendered code instead.

use quickcheck::{Arbitrary, Gen};

const MAX_DEPTH: usize = 4;

const FUNCTIONS: &[&str] = &["xlog", "t_relay", "sl_send_reply", "append_hf", "is_method"];
const VARIABLES: &[&str] = &["caller", "count", "dst", "retries", "x"];
const HEADERS: &[&str] = &["$rU", "$fU", "$ru", "$si", "$hdr(Via)"];
const ROUTE_NAMES: &[&str] = &["RELAY", "AUTH", "NATDETECT", "WITHINDLG"];
const PARAMETERS: &[&str] = &["debug", "children", "log_stderror", "fork"];

#[derive(Clone, Debug)]
pub enum Scope {
    Avp,
    Var,
    DlgVar,
}

#[derive(Clone, Debug)]
pub enum Expr {
    Number(u16),
    Str(String),
    Variable(Scope, String),
    Builtin(String),
    Binary(Box<Expr>, &'static str, Box<Expr>),
    Call(String, Vec<Expr>),
}

#[derive(Clone, Debug)]
pub enum Stmt {
    Assign(Scope, String, Expr),
    Call(String, Vec<Expr>),
    If {
        condition: Expr,
        consequence: Vec<Stmt>,
        alternative: Option<Vec<Stmt>>,
    },
    While(Expr, Vec<Stmt>),
    Switch(Expr, Vec<(String, Vec<Stmt>)>),
    RouteCall(String),
    Drop,
    Exit,
    Return(Option<u16>),
    Comment(String),
}

#[derive(Clone, Debug)]
pub enum Item {
    Parameter(String, u16),
    LoadModule(String),
    ModParam(String, String, u16),
    GlobalAssign(Scope, String, Expr),
    Route {
        route_type: &'static str,
        name: Option<String>,
        body: Vec<Stmt>,
    },
}

/// A whole routing script.
#[derive(Clone, Debug)]
pub struct Script {
    pub items: Vec<Item>,
}

fn gen_range(g: &mut Gen, min: usize, max: usize) -> usize {
    min + (usize::arbitrary(g) % (max - min + 1))
}

fn pick<T: Clone>(g: &mut Gen, choices: &[T]) -> T {
    g.choose(choices).cloned().unwrap_or_else(|| choices[0].clone())
}

fn gen_word(g: &mut Gen) -> String {
    let letters: Vec<char> = "abcdefghijklmnopqrstuvwxyz ".chars().collect();
    (0..gen_range(g, 0, 8)).map(|_| pick(g, &letters)).collect()
}

fn gen_scope(g: &mut Gen) -> Scope {
    pick(g, &[Scope::Avp, Scope::Var, Scope::DlgVar])
}

fn gen_expr(g: &mut Gen, depth: usize) -> Expr {
    let choice = if depth == 0 { gen_range(g, 0, 3) } else { gen_range(g, 0, 5) };
    match choice {
        0 => Expr::Number(u16::arbitrary(g)),
        1 => Expr::Str(gen_word(g)),
        2 => Expr::Variable(gen_scope(g), pick(g, VARIABLES).to_string()),
        3 => Expr::Builtin(pick(g, HEADERS).to_string()),
        4 => Expr::Binary(
            Box::new(gen_expr(g, depth - 1)),
            pick(g, &["+", "-", "==", "!=", "<", "&&", "||"]),
            Box::new(gen_expr(g, depth - 1)),
        ),
        _ => Expr::Call(
            pick(g, FUNCTIONS).to_string(),
            (0..gen_range(g, 0, 2)).map(|_| gen_expr(g, 0)).collect(),
        ),
    }
}

fn gen_block(g: &mut Gen, depth: usize) -> Vec<Stmt> {
    (0..gen_range(g, 0, 4)).map(|_| gen_stmt(g, depth)).collect()
}

fn gen_stmt(g: &mut Gen, depth: usize) -> Stmt {
    let choice = if depth == 0 { gen_range(g, 0, 6) } else { gen_range(g, 0, 9) };
    match choice {
        0 | 1 => Stmt::Assign(gen_scope(g), pick(g, VARIABLES).to_string(), gen_expr(g, 2)),
        2 => Stmt::Call(
            pick(g, FUNCTIONS).to_string(),
            (0..gen_range(g, 0, 3)).map(|_| gen_expr(g, 1)).collect(),
        ),
        3 => Stmt::RouteCall(pick(g, ROUTE_NAMES).to_string()),
        4 => pick(g, &[Stmt::Drop, Stmt::Exit, Stmt::Return(None)]),
        5 => Stmt::Return(Some(u16::arbitrary(g))),
        6 => Stmt::Comment(gen_word(g)),
        7 => Stmt::If {
            condition: gen_expr(g, 1),
            consequence: gen_block(g, depth - 1),
            alternative: bool::arbitrary(g).then(|| gen_block(g, depth - 1)),
        },
        8 => Stmt::While(gen_expr(g, 1), gen_block(g, depth - 1)),
        _ => Stmt::Switch(
            Expr::Builtin(pick(g, HEADERS).to_string()),
            (0..gen_range(g, 1, 3))
                .map(|_| (gen_word(g), gen_block(g, depth - 1)))
                .collect(),
        ),
    }
}

fn gen_item(g: &mut Gen, depth: usize) -> Item {
    match gen_range(g, 0, 5) {
        0 => Item::Parameter(pick(g, PARAMETERS).to_string(), u16::arbitrary(g)),
        1 => Item::LoadModule(format!("{}.so", pick(g, &["tm", "sl", "rr", "dialog"]))),
        2 => Item::ModParam(
            pick(g, &["tm", "rr", "dialog"]).to_string(),
            pick(g, &["fr_timer", "append_fromtag", "dlg_flag"]).to_string(),
            u16::arbitrary(g),
        ),
        3 => Item::GlobalAssign(gen_scope(g), pick(g, VARIABLES).to_string(), gen_expr(g, 1)),
        _ => {
            let (route_type, name) = match gen_range(g, 0, 2) {
                0 => ("request_route", None),
                1 => ("route", Some(pick(g, ROUTE_NAMES).to_string())),
                _ => ("failure_route", Some(pick(g, ROUTE_NAMES).to_string())),
            };
            Item::Route {
                route_type,
                name,
                body: gen_block(g, depth),
            }
        }
    }
}

impl Arbitrary for Script {
    fn arbitrary(g: &mut Gen) -> Self {
        let depth = g.size().min(MAX_DEPTH);
        Script {
            items: (0..gen_range(g, 0, 6)).map(|_| gen_item(g, depth)).collect(),
        }
    }
}

impl Scope {
    fn class(&self) -> &'static str {
        match self {
            Scope::Avp => "avp",
            Scope::Var => "var",
            Scope::DlgVar => "dlg_var",
        }
    }
}

impl Expr {
    pub fn to_code(&self) -> String {
        match self {
            Expr::Number(n) => n.to_string(),
            Expr::Str(s) => format!("\"{}\"", s),
            Expr::Variable(scope, name) => format!("${}({})", scope.class(), name),
            Expr::Builtin(b) => b.clone(),
            Expr::Binary(left, op, right) => {
                format!("({} {} {})", left.to_code(), op, right.to_code())
            }
            Expr::Call(name, args) => format!(
                "{}({})",
                name,
                args.iter().map(Expr::to_code).collect::<Vec<_>>().join(", ")
            ),
        }
    }
}

fn write_block(out: &mut String, stmts: &[Stmt], indent: usize) {
    out.push_str("{\n");
    for stmt in stmts {
        stmt.write(out, indent + 1);
    }
    out.push_str(&"\t".repeat(indent));
    out.push('}');
}

impl Stmt {
    fn write(&self, out: &mut String, indent: usize) {
        out.push_str(&"\t".repeat(indent));
        match self {
            Stmt::Assign(scope, name, value) => {
                out.push_str(&format!("${}({}) = {};", scope.class(), name, value.to_code()));
            }
            Stmt::Call(name, args) => {
                out.push_str(&Expr::Call(name.clone(), args.clone()).to_code());
                out.push(';');
            }
            Stmt::If {
                condition,
                consequence,
                alternative,
            } => {
                out.push_str(&format!("if ({}) ", condition.to_code()));
                write_block(out, consequence, indent);
                if let Some(alternative) = alternative {
                    out.push_str(" else ");
                    write_block(out, alternative, indent);
                }
            }
            Stmt::While(condition, body) => {
                out.push_str(&format!("while ({}) ", condition.to_code()));
                write_block(out, body, indent);
            }
            Stmt::Switch(subject, cases) => {
                out.push_str(&format!("switch ({}) {{\n", subject.to_code()));
                for (label, body) in cases {
                    out.push_str(&"\t".repeat(indent + 1));
                    out.push_str(&format!("case \"{}\":\n", label));
                    for stmt in body {
                        stmt.write(out, indent + 2);
                    }
                    out.push_str(&"\t".repeat(indent + 2));
                    out.push_str("break;\n");
                }
                out.push_str(&"\t".repeat(indent));
                out.push('}');
            }
            Stmt::RouteCall(name) => out.push_str(&format!("route({});", name)),
            Stmt::Drop => out.push_str("drop;"),
            Stmt::Exit => out.push_str("exit;"),
            Stmt::Return(None) => out.push_str("return;"),
            Stmt::Return(Some(code)) => out.push_str(&format!("return {};", code)),
            Stmt::Comment(text) => out.push_str(&format!("/* {} */", text)),
        }
        out.push('\n');
    }
}

impl Script {
    pub fn to_code(&self) -> String {
        let mut out = String::new();
        for item in &self.items {
            match item {
                Item::Parameter(name, value) => out.push_str(&format!("{}={}\n", name, value)),
                Item::LoadModule(module) => out.push_str(&format!("loadmodule \"{}\"\n", module)),
                Item::ModParam(module, parameter, value) => out.push_str(&format!(
                    "modparam(\"{}\", \"{}\", {})\n",
                    module, parameter, value
                )),
                Item::GlobalAssign(scope, name, value) => out.push_str(&format!(
                    "${}({}) = {};\n",
                    scope.class(),
                    name,
                    value.to_code()
                )),
                Item::Route {
                    route_type,
                    name,
                    body,
                } => {
                    out.push_str(route_type);
                    if let Some(name) = name {
                        out.push_str(&format!("[{}]", name));
                    }
                    out.push(' ');
                    write_block(&mut out, body, 0);
                    out.push('\n');
                }
            }
        }
        out
    }
}
