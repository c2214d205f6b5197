// program     ::= declaration*
// declaration ::= modifier* ( class | interface | enum | process | message
//                           | import | use | function )
// class       ::= 'class' NAME generics? ( '(' args ')' | (':' types)? '{' member* '}' )
// interface   ::= 'interface' NAME generics? (':' types)? '{' member* '}'
// process     ::= 'process' ( 'interface' interface-rest | class-rest )
// message     ::= 'message' ( class | interface | enum )
// enum        ::= 'enum' NAME generics? '{' variant (',' variant)* (';' member*)? '}'
// member      ::= modifier* ( 'init' '(' args ')' block
//                           | type NAME '(' args ')' block?
//                           | type NAME ('=' expr)? )
// function    ::= type NAME '(' args ')' block
// type        ::= NAME ('<' type (',' type)* '>')? ('[' ']')*
//
// Every declaration, member and statement ends with a line break (or a
// closing brace). Semicolons only appear in `for` headers and enums.
//
// Precedence (loosest first)
//
// = += -= *= /= %=
// .. ...
// ||
// &&
// |
// ^
// &
// == !=
// < <= > >=
// << >>
// + -
// * / %
// prefix - ! ~ ++ --
// postfix . () [] ++ --

use crate::{names, token::Location, util::intern::Interned};

pub type Name = Interned<str>;

/// A stable index into the [`Tree`](crate::tree::Tree) definition arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DefId(pub(crate) u32);

#[derive(Clone, Debug)]
pub enum Definition {
    Class(ClassDefinition),
    Method(MethodDefinition),
    DataMember(DataMemberDefinition),
    GenericTypeParameter(GenericTypeParameterDefinition),
}

impl Definition {
    pub fn name(&self) -> Name {
        match self {
            Definition::Class(c) => c.name,
            Definition::Method(m) => m.name,
            Definition::DataMember(d) => d.name,
            Definition::GenericTypeParameter(g) => g.name,
        }
    }

    pub fn location(&self) -> &Location {
        match self {
            Definition::Class(c) => &c.location,
            Definition::Method(m) => &m.location,
            Definition::DataMember(d) => &d.location,
            Definition::GenericTypeParameter(g) => &g.location,
        }
    }

    /// Sets the class a member definition belongs to. Classes are never
    /// enclosed.
    pub(crate) fn set_enclosing(&mut self, enclosing: Option<DefId>) {
        match self {
            Definition::Class(_) => {}
            Definition::Method(m) => m.enclosing = enclosing,
            Definition::DataMember(d) => d.enclosing = enclosing,
            Definition::GenericTypeParameter(g) => g.enclosing = enclosing,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Properties {
    pub is_interface: bool,
    pub is_process: bool,
    pub is_message: bool,
    pub is_enum: bool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub is_native: bool,
    pub is_private: bool,
    pub is_static: bool,
    pub is_virtual: bool,
}

#[derive(Clone, Debug)]
pub struct ClassDefinition {
    pub name: Name,
    pub location: Location,
    pub properties: Properties,
    pub modifiers: Modifiers,
    pub parents: Vec<Type>,
    /// [`GenericTypeParameterDefinition`]s, in declaration order.
    pub generics: Vec<DefId>,
    /// Methods and data members, in declaration order.
    pub members: Vec<DefId>,
    /// Only ever non-empty for enums.
    pub variants: Vec<EnumVariant>,
    /// Whether the class comes from an imported module rather than from the
    /// file being compiled.
    pub is_imported: bool,
    /// Whether the class was synthesized by the process generator.
    pub is_generated: bool,
}

#[derive(Clone, Debug)]
pub struct MethodDefinition {
    pub name: Name,
    pub location: Location,
    pub return_type: Type,
    pub args: Vec<Argument>,
    /// `None` for signatures (interface members and native methods).
    pub body: Option<Block>,
    pub modifiers: Modifiers,
    pub is_constructor: bool,
    /// The owning class. `None` for free functions.
    pub enclosing: Option<DefId>,
}

impl MethodDefinition {
    pub fn returns_value(&self) -> bool {
        !self.return_type.is_void()
    }

    /// Whether other processes may invoke this method through a message.
    pub fn is_externally_callable(&self) -> bool {
        !self.is_constructor && !self.modifiers.is_private && !self.modifiers.is_static
    }
}

#[derive(Clone, Debug)]
pub struct DataMemberDefinition {
    pub name: Name,
    pub location: Location,
    pub ty: Type,
    pub initializer: Option<Expr>,
    pub modifiers: Modifiers,
    pub enclosing: Option<DefId>,
}

#[derive(Clone, Debug)]
pub struct GenericTypeParameterDefinition {
    pub name: Name,
    pub location: Location,
    pub enclosing: Option<DefId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Argument {
    pub name: Name,
    pub ty: Type,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumVariant {
    pub name: Name,
    pub args: Vec<Argument>,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Type {
    pub name: Name,
    pub arguments: Vec<Type>,
    pub array_dimensions: u8,
    pub location: Location,
}

impl Type {
    pub fn named(name: Name, location: Location) -> Type {
        Type {
            name,
            arguments: Vec::new(),
            array_dimensions: 0,
            location,
        }
    }

    pub fn is_void(&self) -> bool {
        self.name == names::VOID && self.array_dimensions == 0
    }

    /// Whether values of this type are copied rather than referenced.
    pub fn is_value_type(&self) -> bool {
        self.array_dimensions == 0 && names::VALUE_TYPES.contains(&self.name)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Block {
    pub statements: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    If {
        condition: Expr,
        then_block: Block,
        else_block: Option<Block>,
    },
    While {
        condition: Expr,
        body: Block,
    },
    For {
        header: ForHeader,
        body: Block,
    },
    Break,
    Continue,
    Return(Option<Expr>),
    Defer(Block),
    /// `goto label`
    Jump(Name),
    /// `label:`
    Label(Name),
    VariableDeclaration(VariableDeclaration),
    /// `super(args)`, calling the constructor of the first parent.
    ConstructorCall {
        args: Vec<Expr>,
    },
    Expr(Expr),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ForHeader {
    /// `for x in iterable`
    Each {
        variable: Name,
        ty: Option<Type>,
        iterable: Expr,
    },
    /// `for (init; condition; step)`
    Classic {
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        step: Option<Expr>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct VariableDeclaration {
    pub name: Name,
    pub ty: Option<Type>,
    pub initializer: Option<Expr>,
    pub is_mutable: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub location: Location,
}

impl Expr {
    pub fn new(kind: ExprKind, location: Location) -> Expr {
        Expr { kind, location }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Binary {
        op: BinaryOperator,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    /// A call. Without a receiver this is a free function or constructor call.
    MethodCall {
        receiver: Option<Box<Expr>>,
        name: Name,
        args: Vec<Expr>,
    },
    MemberSelector {
        object: Box<Expr>,
        member: Name,
    },
    Match {
        subject: Box<Expr>,
        /// Non empty list of cases.
        cases: Vec<MatchCase>,
    },
    Lambda {
        params: Vec<LambdaParam>,
        body: Block,
    },
    AnonymousFunction {
        args: Vec<Argument>,
        return_type: Type,
        body: Block,
    },
    ArrayLiteral(Vec<Expr>),
    ArraySubscript {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    ArrayAllocation {
        element_type: Type,
        length: Box<Expr>,
    },
    TypeCast {
        ty: Type,
        expr: Box<Expr>,
    },
    HeapAllocation {
        ty: Type,
        args: Vec<Expr>,
    },
    /// `Type { field: pattern, ... }`, only in patterns.
    ClassDecomposition {
        ty: Type,
        fields: Vec<(Name, Expr)>,
    },
    /// `Type name`, only in patterns.
    Typed {
        ty: Type,
        name: Name,
    },
    Placeholder,
    Wildcard,
    Yield(Option<Box<Expr>>),
    This,
    Identifier(Name),
    Integer(Box<str>),
    Float(Box<str>),
    String(Box<str>),
    Char(char),
    Bool(bool),
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchCase {
    /// Non empty list of alternative patterns.
    pub patterns: Vec<Expr>,
    pub guard: Option<Expr>,
    pub body: Block,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LambdaParam {
    pub name: Name,
    pub ty: Option<Type>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
    /// `..`
    Range,
    /// `...`
    RangeInclusive,
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOperator {
    pub fn is_assignment(self) -> bool {
        use BinaryOperator::*;
        matches!(
            self,
            Assign | AddAssign | SubAssign | MulAssign | DivAssign | RemAssign
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOperator {
    Neg,
    Not,
    BitNot,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}
