//! Small builders for the code the process generator synthesizes. Every node
//! gets the location of the declaration it was generated for.

use crate::{
    ast::{
        Argument, BinaryOperator, Block, DataMemberDefinition, Definition, Expr, ExprKind,
        MatchCase, MethodDefinition, Modifiers, Name, Stmt, StmtKind, Type, VariableDeclaration,
    },
    names,
    token::Location,
    tree::Tree,
};

pub(super) struct Synth {
    location: Location,
}

impl Synth {
    pub fn new(location: Location) -> Synth {
        Synth { location }
    }

    fn expr(&self, kind: ExprKind) -> Expr {
        Expr::new(kind, self.location.clone())
    }

    pub fn ident(&self, name: Name) -> Expr {
        self.expr(ExprKind::Identifier(name))
    }

    pub fn this(&self) -> Expr {
        self.expr(ExprKind::This)
    }

    pub fn int(&self, value: usize) -> Expr {
        self.expr(ExprKind::Integer(value.to_string().into()))
    }

    pub fn member(&self, object: Expr, member: Name) -> Expr {
        self.expr(ExprKind::MemberSelector {
            object: Box::new(object),
            member,
        })
    }

    /// `this.member`
    pub fn field(&self, member: Name) -> Expr {
        self.member(self.this(), member)
    }

    /// `Class.member`, used for static members.
    pub fn path(&self, class: Name, member: Name) -> Expr {
        self.member(self.ident(class), member)
    }

    pub fn call(&self, receiver: Expr, name: Name, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::MethodCall {
            receiver: Some(Box::new(receiver)),
            name,
            args,
        })
    }

    /// `Process.name(args)`
    pub fn runtime(&self, name: Name, args: Vec<Expr>) -> Expr {
        self.call(self.ident(names::PROCESS), name, args)
    }

    pub fn new_object(&self, ty: Type, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::HeapAllocation { ty, args })
    }

    pub fn cast(&self, ty: Type, expr: Expr) -> Expr {
        self.expr(ExprKind::TypeCast {
            ty,
            expr: Box::new(expr),
        })
    }

    pub fn assign(&self, target: Expr, value: Expr) -> Expr {
        self.expr(ExprKind::Binary {
            op: BinaryOperator::Assign,
            lhs: Box::new(target),
            rhs: Box::new(value),
        })
    }

    pub fn matching(&self, subject: Expr, cases: Vec<MatchCase>) -> Expr {
        self.expr(ExprKind::Match {
            subject: Box::new(subject),
            cases,
        })
    }

    pub fn case(&self, pattern: Expr, statements: Vec<Stmt>) -> MatchCase {
        MatchCase {
            patterns: vec![pattern],
            guard: None,
            body: Block { statements },
            location: self.location.clone(),
        }
    }

    pub fn wildcard(&self) -> Expr {
        self.expr(ExprKind::Wildcard)
    }

    pub fn ty(&self, name: Name) -> Type {
        Type::named(name, self.location.clone())
    }

    /// `Box<ty>`
    pub fn boxed(&self, ty: Type) -> Type {
        let mut boxed = self.ty(names::BOX);
        boxed.arguments.push(ty);
        boxed
    }

    pub fn stmt(&self, kind: StmtKind) -> Stmt {
        Stmt {
            kind,
            location: self.location.clone(),
        }
    }

    pub fn expr_stmt(&self, expr: Expr) -> Stmt {
        self.stmt(StmtKind::Expr(expr))
    }

    pub fn let_stmt(&self, name: Name, initializer: Expr) -> Stmt {
        self.stmt(StmtKind::VariableDeclaration(VariableDeclaration {
            name,
            ty: None,
            initializer: Some(initializer),
            is_mutable: false,
        }))
    }

    pub fn return_stmt(&self, value: Expr) -> Stmt {
        self.stmt(StmtKind::Return(Some(value)))
    }

    pub fn argument(&self, ty: Type, name: Name) -> Argument {
        Argument {
            name,
            ty,
            location: self.location.clone(),
        }
    }

    pub fn method(
        &self,
        return_type: Type,
        name: Name,
        args: Vec<Argument>,
        body: Option<Vec<Stmt>>,
    ) -> Definition {
        Definition::Method(MethodDefinition {
            name,
            location: self.location.clone(),
            return_type,
            args,
            body: body.map(|statements| Block { statements }),
            modifiers: Modifiers::default(),
            is_constructor: false,
            enclosing: None,
        })
    }

    /// `init(args) { this.a = a ... }` followed by `rest`.
    pub fn storing_constructor(&self, args: Vec<Argument>, rest: Vec<Stmt>) -> Definition {
        let mut statements: Vec<_> = args
            .iter()
            .map(|arg| self.expr_stmt(self.assign(self.field(arg.name), self.ident(arg.name))))
            .collect();
        statements.extend(rest);
        self.constructor(args, statements)
    }

    pub fn constructor(&self, args: Vec<Argument>, statements: Vec<Stmt>) -> Definition {
        Definition::Method(MethodDefinition {
            name: names::INIT,
            location: self.location.clone(),
            return_type: self.ty(names::VOID),
            args,
            body: Some(Block { statements }),
            modifiers: Modifiers::default(),
            is_constructor: true,
            enclosing: None,
        })
    }

    /// `static int name = value`
    pub fn constant(&self, name: Name, value: usize) -> Definition {
        Definition::DataMember(DataMemberDefinition {
            name,
            location: self.location.clone(),
            ty: self.ty(names::INT),
            initializer: Some(self.int(value)),
            modifiers: Modifiers {
                is_static: true,
                ..Modifiers::default()
            },
            enclosing: None,
        })
    }

    /// Adds a data member for each argument to the current class.
    pub fn fields(&self, tree: &mut Tree, args: &[Argument]) {
        for arg in args {
            tree.add_data_member(arg.name, arg.ty.clone(), None, self.location.clone());
        }
    }
}

/// `base` followed by `suffix`, interned.
pub(super) fn derived_name(tree: &mut Tree, base: Name, suffix: &str) -> Name {
    let text = format!("{}{suffix}", tree.name(base));
    tree.intern(&text)
}

/// `get{Interface}Proxy`
pub(super) fn accessor_name(tree: &mut Tree, interface: Name) -> Name {
    let text = format!("get{}Proxy", tree.name(interface));
    tree.intern(&text)
}

pub(super) fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalizes_first_letter() {
        assert_eq!(capitalize("area"), "Area");
        assert_eq!(capitalize("x"), "X");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn derived_names() {
        let mut tree = Tree::new();
        let shape = tree.intern("Shape");
        let call = derived_name(&mut tree, shape, "Call");
        assert_eq!(tree.name(call), "ShapeCall");
        let accessor = accessor_name(&mut tree, shape);
        assert_eq!(tree.name(accessor), "getShapeProxy");
    }
}
