use std::io::Write;

use crate::{ast::*, tree::Tree};

const INDENT_WIDTH: usize = 2;

pub fn print_program_string(tree: &Tree) -> String {
    let mut buf = Vec::with_capacity(4096);
    print_program(&mut buf, tree).expect("writing to a Vec never fails");
    into_string(buf)
}

pub fn print_definition_string(tree: &Tree, id: DefId) -> String {
    let mut buf = Vec::with_capacity(1024);
    print_definition(&mut buf, tree, 0, id).expect("writing to a Vec never fails");
    into_string(buf)
}

pub fn print_block_string(tree: &Tree, block: &Block) -> String {
    let mut buf = Vec::with_capacity(1024);
    print_block(&mut buf, tree, 0, block).expect("writing to a Vec never fails");
    into_string(buf)
}

pub fn print_expr_string(tree: &Tree, expr: &Expr) -> String {
    let mut buf = Vec::with_capacity(512);
    print_expr(&mut buf, tree, 0, expr).expect("writing to a Vec never fails");
    into_string(buf)
}

fn into_string(buf: Vec<u8>) -> String {
    String::from_utf8(buf).expect("the printer only writes UTF-8")
}

/// Prints the namespaces in use, then every global definition in
/// registration order.
pub fn print_program(w: &mut impl Write, tree: &Tree) -> std::io::Result<()> {
    for &namespace in tree.namespaces() {
        writeln!(w, "use {}", tree.name(namespace))?;
    }
    for &id in tree.globals() {
        print_definition(w, tree, 0, id)?;
    }
    Ok(())
}

pub fn print_definition(
    w: &mut impl Write,
    tree: &Tree,
    i: usize,
    id: DefId,
) -> std::io::Result<()> {
    sp(w, i)?;
    match tree.definition(id) {
        Definition::Class(class) => {
            write!(w, "{}class {}", modifiers(&class.modifiers), tree.name(class.name))?;
            if !class.generics.is_empty() {
                let generics: Vec<_> = class
                    .generics
                    .iter()
                    .map(|&g| tree.name(tree.definition(g).name()))
                    .collect();
                write!(w, "<{}>", generics.join(", "))?;
            }
            if !class.parents.is_empty() {
                write!(w, " : {}", types(tree, &class.parents))?;
            }
            let flags = class_flags(class);
            if !flags.is_empty() {
                write!(w, " [{}]", flags.join(", "))?;
            }
            writeln!(w)?;
            for variant in &class.variants {
                sp(w, i + 1)?;
                write!(w, "variant {}", tree.name(variant.name))?;
                if !variant.args.is_empty() {
                    write!(w, "{}", arguments(tree, &variant.args))?;
                }
                writeln!(w)?;
            }
            for &member in &class.members {
                print_definition(w, tree, i + 1, member)?;
            }
        }
        Definition::Method(method) => {
            write!(w, "{}", modifiers(&method.modifiers))?;
            if method.is_constructor {
                write!(w, "init")?;
            } else {
                let keyword = if method.enclosing.is_some() {
                    "method"
                } else {
                    "function"
                };
                write!(
                    w,
                    "{keyword} {} {}",
                    ty(tree, &method.return_type),
                    tree.name(method.name)
                )?;
            }
            write!(w, "{}", arguments(tree, &method.args))?;
            match &method.body {
                Some(body) => {
                    writeln!(w)?;
                    print_block(w, tree, i + 1, body)?;
                }
                None => writeln!(w, " (signature)")?,
            }
        }
        Definition::DataMember(member) => {
            writeln!(
                w,
                "{}field {} {}",
                modifiers(&member.modifiers),
                ty(tree, &member.ty),
                tree.name(member.name)
            )?;
            if let Some(initializer) = &member.initializer {
                print_expr(w, tree, i + 1, initializer)?;
            }
        }
        Definition::GenericTypeParameter(generic) => {
            writeln!(w, "generic {}", tree.name(generic.name))?;
        }
    }
    Ok(())
}

pub fn print_block(
    w: &mut impl Write,
    tree: &Tree,
    i: usize,
    block: &Block,
) -> std::io::Result<()> {
    for stmt in &block.statements {
        print_stmt(w, tree, i, stmt)?;
    }
    Ok(())
}

fn print_labeled_block(
    w: &mut impl Write,
    tree: &Tree,
    i: usize,
    label: &str,
    block: &Block,
) -> std::io::Result<()> {
    sp(w, i)?;
    writeln!(w, "{label}")?;
    print_block(w, tree, i + 1, block)
}

fn print_labeled_expr(
    w: &mut impl Write,
    tree: &Tree,
    i: usize,
    label: &str,
    expr: &Expr,
) -> std::io::Result<()> {
    sp(w, i)?;
    writeln!(w, "{label}")?;
    print_expr(w, tree, i + 1, expr)
}

pub fn print_stmt(w: &mut impl Write, tree: &Tree, i: usize, stmt: &Stmt) -> std::io::Result<()> {
    if let StmtKind::Expr(expr) = &stmt.kind {
        return print_expr(w, tree, i, expr);
    }
    sp(w, i)?;
    match &stmt.kind {
        StmtKind::If {
            condition,
            then_block,
            else_block,
        } => {
            writeln!(w, "if")?;
            print_expr(w, tree, i + 1, condition)?;
            print_labeled_block(w, tree, i + 1, "then", then_block)?;
            if let Some(else_block) = else_block {
                print_labeled_block(w, tree, i + 1, "else", else_block)?;
            }
        }
        StmtKind::While { condition, body } => {
            writeln!(w, "while")?;
            print_expr(w, tree, i + 1, condition)?;
            print_labeled_block(w, tree, i + 1, "body", body)?;
        }
        StmtKind::For { header, body } => {
            match header {
                ForHeader::Each {
                    variable,
                    ty: variable_ty,
                    iterable,
                } => {
                    write!(w, "for ")?;
                    if let Some(variable_ty) = variable_ty {
                        write!(w, "{} ", ty(tree, variable_ty))?;
                    }
                    writeln!(w, "{} in", tree.name(*variable))?;
                    print_expr(w, tree, i + 1, iterable)?;
                }
                ForHeader::Classic {
                    init,
                    condition,
                    step,
                } => {
                    writeln!(w, "for")?;
                    if let Some(init) = init {
                        sp(w, i + 1)?;
                        writeln!(w, "init")?;
                        print_stmt(w, tree, i + 2, init)?;
                    }
                    if let Some(condition) = condition {
                        print_labeled_expr(w, tree, i + 1, "condition", condition)?;
                    }
                    if let Some(step) = step {
                        print_labeled_expr(w, tree, i + 1, "step", step)?;
                    }
                }
            }
            print_labeled_block(w, tree, i + 1, "body", body)?;
        }
        StmtKind::Break => writeln!(w, "break")?,
        StmtKind::Continue => writeln!(w, "continue")?,
        StmtKind::Return(value) => {
            writeln!(w, "return")?;
            if let Some(value) = value {
                print_expr(w, tree, i + 1, value)?;
            }
        }
        StmtKind::Defer(block) => {
            writeln!(w, "defer")?;
            print_block(w, tree, i + 1, block)?;
        }
        StmtKind::Jump(label) => writeln!(w, "goto {}", tree.name(*label))?,
        StmtKind::Label(label) => writeln!(w, "label {}", tree.name(*label))?,
        StmtKind::VariableDeclaration(declaration) => {
            let keyword = if declaration.is_mutable { "var" } else { "let" };
            write!(w, "{keyword} {}", tree.name(declaration.name))?;
            if let Some(declared) = &declaration.ty {
                write!(w, ": {}", ty(tree, declared))?;
            }
            writeln!(w)?;
            if let Some(initializer) = &declaration.initializer {
                print_expr(w, tree, i + 1, initializer)?;
            }
        }
        StmtKind::ConstructorCall { args } => {
            writeln!(w, "super")?;
            for arg in args {
                print_expr(w, tree, i + 1, arg)?;
            }
        }
        StmtKind::Expr(_) => unreachable!(),
    }
    Ok(())
}

pub fn print_expr(w: &mut impl Write, tree: &Tree, i: usize, expr: &Expr) -> std::io::Result<()> {
    sp(w, i)?;
    match &expr.kind {
        ExprKind::Binary { op, lhs, rhs } => {
            writeln!(w, "binary {op:?}")?;
            print_expr(w, tree, i + 1, lhs)?;
            print_expr(w, tree, i + 1, rhs)?;
        }
        ExprKind::Unary { op, operand } => {
            writeln!(w, "unary {op:?}")?;
            print_expr(w, tree, i + 1, operand)?;
        }
        ExprKind::MethodCall {
            receiver,
            name,
            args,
        } => {
            writeln!(w, "call {}", tree.name(*name))?;
            if let Some(receiver) = receiver {
                print_labeled_expr(w, tree, i + 1, "receiver", receiver)?;
            }
            if !args.is_empty() {
                sp(w, i + 1)?;
                writeln!(w, "arguments")?;
                for arg in args {
                    print_expr(w, tree, i + 2, arg)?;
                }
            }
        }
        ExprKind::MemberSelector { object, member } => {
            writeln!(w, "member {}", tree.name(*member))?;
            print_expr(w, tree, i + 1, object)?;
        }
        ExprKind::Match { subject, cases } => {
            writeln!(w, "match")?;
            print_expr(w, tree, i + 1, subject)?;
            for case in cases {
                sp(w, i + 1)?;
                writeln!(w, "case")?;
                for pattern in &case.patterns {
                    print_expr(w, tree, i + 2, pattern)?;
                }
                if let Some(guard) = &case.guard {
                    print_labeled_expr(w, tree, i + 2, "guard", guard)?;
                }
                print_labeled_block(w, tree, i + 2, "body", &case.body)?;
            }
        }
        ExprKind::Lambda { params, body } => {
            let params: Vec<_> = params
                .iter()
                .map(|param| match &param.ty {
                    Some(param_ty) => format!("{} {}", ty(tree, param_ty), tree.name(param.name)),
                    None => tree.name(param.name).to_owned(),
                })
                .collect();
            writeln!(w, "lambda |{}|", params.join(", "))?;
            print_block(w, tree, i + 1, body)?;
        }
        ExprKind::AnonymousFunction {
            args,
            return_type,
            body,
        } => {
            writeln!(
                w,
                "function {} {}",
                arguments(tree, args),
                ty(tree, return_type)
            )?;
            print_block(w, tree, i + 1, body)?;
        }
        ExprKind::ArrayLiteral(elements) => {
            writeln!(w, "array")?;
            for element in elements {
                print_expr(w, tree, i + 1, element)?;
            }
        }
        ExprKind::ArraySubscript { array, index } => {
            writeln!(w, "subscript")?;
            print_expr(w, tree, i + 1, array)?;
            print_expr(w, tree, i + 1, index)?;
        }
        ExprKind::ArrayAllocation {
            element_type,
            length,
        } => {
            writeln!(w, "new array {}", ty(tree, element_type))?;
            print_expr(w, tree, i + 1, length)?;
        }
        ExprKind::TypeCast { ty: target, expr } => {
            writeln!(w, "cast {}", ty(tree, target))?;
            print_expr(w, tree, i + 1, expr)?;
        }
        ExprKind::HeapAllocation { ty: class, args } => {
            writeln!(w, "new {}", ty(tree, class))?;
            for arg in args {
                print_expr(w, tree, i + 1, arg)?;
            }
        }
        ExprKind::ClassDecomposition { ty: class, fields } => {
            writeln!(w, "decompose {}", ty(tree, class))?;
            for (field, pattern) in fields {
                sp(w, i + 1)?;
                writeln!(w, "field {}", tree.name(*field))?;
                print_expr(w, tree, i + 2, pattern)?;
            }
        }
        ExprKind::Typed { ty: bound, name } => {
            writeln!(w, "typed {} {}", ty(tree, bound), tree.name(*name))?;
        }
        ExprKind::Placeholder => writeln!(w, "placeholder")?,
        ExprKind::Wildcard => writeln!(w, "wildcard")?,
        ExprKind::Yield(value) => {
            writeln!(w, "yield")?;
            if let Some(value) = value {
                print_expr(w, tree, i + 1, value)?;
            }
        }
        ExprKind::This => writeln!(w, "this")?,
        ExprKind::Identifier(name) => writeln!(w, "ident {}", tree.name(*name))?,
        ExprKind::Integer(text) => writeln!(w, "int {text}")?,
        ExprKind::Float(text) => writeln!(w, "float {text}")?,
        ExprKind::String(text) => writeln!(w, "string {text:?}")?,
        ExprKind::Char(c) => writeln!(w, "char {c:?}")?,
        ExprKind::Bool(b) => writeln!(w, "bool {b}")?,
    }
    Ok(())
}

/// `Name<A, B>[]`
pub fn ty(tree: &Tree, ty: &Type) -> String {
    let mut out = tree.name(ty.name).to_owned();
    if !ty.arguments.is_empty() {
        out.push('<');
        out.push_str(&types(tree, &ty.arguments));
        out.push('>');
    }
    for _ in 0..ty.array_dimensions {
        out.push_str("[]");
    }
    out
}

fn types(tree: &Tree, types: &[Type]) -> String {
    types
        .iter()
        .map(|t| ty(tree, t))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `(int x, string y)`
fn arguments(tree: &Tree, args: &[Argument]) -> String {
    let args: Vec<_> = args
        .iter()
        .map(|arg| format!("{} {}", ty(tree, &arg.ty), tree.name(arg.name)))
        .collect();
    format!("({})", args.join(", "))
}

fn modifiers(modifiers: &Modifiers) -> String {
    let mut out = String::new();
    for (set, word) in [
        (modifiers.is_native, "native "),
        (modifiers.is_private, "private "),
        (modifiers.is_static, "static "),
        (modifiers.is_virtual, "virtual "),
    ] {
        if set {
            out.push_str(word);
        }
    }
    out
}

fn class_flags(class: &ClassDefinition) -> Vec<&'static str> {
    let p = &class.properties;
    [
        (p.is_interface, "interface"),
        (p.is_process, "process"),
        (p.is_message, "message"),
        (p.is_enum, "enum"),
        (class.is_generated, "generated"),
        (class.is_imported, "imported"),
    ]
    .into_iter()
    .filter_map(|(set, flag)| set.then_some(flag))
    .collect()
}

fn sp(w: &mut impl Write, i: usize) -> std::io::Result<()> {
    write!(w, "{:1$}", "", i * INDENT_WIDTH)
}
