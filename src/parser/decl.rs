use tracing::debug;

use super::{Parser, Result};
use crate::{
    ast::{
        Argument, BinaryOperator, Block, DataMemberDefinition, DefId, Definition, EnumVariant, Expr,
        ExprKind, MethodDefinition, Modifiers, Name, Properties, Stmt, StmtKind, Type,
    },
    context::Import,
    error::{ErrorKind, SyntaxError},
    names, process,
    token::{Keyword, Location, Operator, TokenKind},
};

impl Parser<'_> {
    pub(super) fn parse_declaration(&mut self) -> Result<()> {
        let location = self.peek().location.clone();
        let modifiers = self.parse_modifiers();
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Keyword(Keyword::Class) => {
                self.advance();
                self.parse_class(location, Properties::default(), modifiers)
            }
            TokenKind::Keyword(Keyword::Interface) => {
                self.advance();
                let properties = Properties {
                    is_interface: true,
                    ..Properties::default()
                };
                self.parse_class(location, properties, modifiers)
            }
            TokenKind::Keyword(Keyword::Enum) => {
                self.advance();
                self.parse_enum(location, Properties::default(), modifiers)
            }
            TokenKind::Keyword(Keyword::Process) => {
                self.advance();
                let properties = Properties {
                    is_process: true,
                    is_interface: self.take_keyword(Keyword::Interface),
                    ..Properties::default()
                };
                self.parse_class(location, properties, modifiers)
            }
            TokenKind::Keyword(Keyword::Message) => {
                self.advance();
                self.parse_message(location, modifiers)
            }
            TokenKind::Keyword(Keyword::Import) => {
                self.advance();
                self.parse_import()
            }
            // `use` is only a keyword at the start of a declaration.
            TokenKind::Identifier(text) if &*text == "use" => {
                self.advance();
                if !self.on_same_line() {
                    return Err(self.unexpected("namespace"));
                }
                let (name, _) = self.parse_identifier()?;
                self.expect_terminator()?;
                self.ctx.tree.use_namespace(name);
                Ok(())
            }
            TokenKind::Identifier(_) => self.parse_function(modifiers),
            _ => Err(self.unexpected("declaration")),
        }
    }

    fn parse_modifiers(&mut self) -> Modifiers {
        let mut modifiers = Modifiers::default();
        loop {
            let flag = match self.peek().kind {
                TokenKind::Keyword(Keyword::Native) => &mut modifiers.is_native,
                TokenKind::Keyword(Keyword::Private) => &mut modifiers.is_private,
                TokenKind::Keyword(Keyword::Static) => &mut modifiers.is_static,
                TokenKind::Keyword(Keyword::Virtual) => &mut modifiers.is_virtual,
                _ => return modifiers,
            };
            *flag = true;
            self.advance();
        }
    }

    /// `message` followed by a class, interface or enum.
    fn parse_message(&mut self, location: Location, modifiers: Modifiers) -> Result<()> {
        let mut properties = Properties {
            is_message: true,
            ..Properties::default()
        };
        if self.take_keyword(Keyword::Enum) {
            return self.parse_enum(location, properties, modifiers);
        }
        if self.take_keyword(Keyword::Interface) {
            properties.is_interface = true;
        } else {
            self.consume_keyword(Keyword::Class)?;
        }
        self.parse_class(location, properties, modifiers)
    }

    /// Everything after the introducing keyword of a class, interface or
    /// process declaration.
    fn parse_class(
        &mut self,
        location: Location,
        properties: Properties,
        modifiers: Modifiers,
    ) -> Result<()> {
        let (name, _) = self.parse_declared_name()?;
        let generics = self.parse_generic_parameters()?;

        if !properties.is_interface && self.is(Operator::LeftParen) {
            let args = self.parse_arguments()?;
            self.expect_terminator()?;
            let class = self.start_class(name, location, properties, modifiers, Vec::new(), generics);
            self.add_primary_constructor(args);
            return self.finish_class(class);
        }

        let parents = self.parse_parents()?;
        let class = self.start_class(name, location, properties, modifiers, parents, generics);
        self.consume(Operator::LeftBrace)?;
        while !self.is(Operator::RightBrace) && !self.peek().is_eof() {
            self.parse_member()?;
        }
        self.consume(Operator::RightBrace)?;
        self.expect_terminator()?;
        self.finish_class(class)
    }

    /// `enum Name<T> { A, B(int x) ; members }`
    fn parse_enum(
        &mut self,
        location: Location,
        mut properties: Properties,
        modifiers: Modifiers,
    ) -> Result<()> {
        properties.is_enum = true;
        let (name, _) = self.parse_declared_name()?;
        let generics = self.parse_generic_parameters()?;
        let parents = self.parse_parents()?;
        let class = self.start_class(name, location, properties, modifiers, parents, generics);

        self.consume(Operator::LeftBrace)?;
        let closing = [Operator::Semicolon, Operator::RightBrace];
        let variants = self.parse_list(&closing, |p| {
            let (name, location) = p.parse_declared_name()?;
            let args = if p.is(Operator::LeftParen) {
                p.parse_arguments()?
            } else {
                Vec::new()
            };
            Ok(EnumVariant {
                name,
                args,
                location,
            })
        })?;
        self.ctx.tree.class_mut(class).variants = variants;
        if self.take(Operator::Semicolon) {
            while !self.is(Operator::RightBrace) && !self.peek().is_eof() {
                self.parse_member()?;
            }
        }
        self.consume(Operator::RightBrace)?;
        self.expect_terminator()?;
        self.finish_class(class)
    }

    fn start_class(
        &mut self,
        name: Name,
        location: Location,
        properties: Properties,
        modifiers: Modifiers,
        parents: Vec<Type>,
        generics: Vec<(Name, Location)>,
    ) -> DefId {
        let tree = &mut self.ctx.tree;
        let class = tree.start_class(name, location, properties, modifiers, parents);
        for (name, location) in generics {
            tree.add_generic_parameter(name, location);
        }
        class
    }

    fn finish_class(&mut self, class: DefId) -> Result<()> {
        let finished = self.ctx.tree.finish_class();
        debug_assert_eq!(finished, class);
        process::declare_class(&mut self.ctx.tree, class);
        Ok(())
    }

    fn parse_generic_parameters(&mut self) -> Result<Vec<(Name, Location)>> {
        if !self.take(Operator::Less) {
            return Ok(Vec::new());
        }
        let generics = self.parse_list(&[Operator::Greater], Parser::parse_declared_name)?;
        self.consume(Operator::Greater)?;
        Ok(generics)
    }

    fn parse_parents(&mut self) -> Result<Vec<Type>> {
        if !self.take(Operator::Colon) {
            return Ok(Vec::new());
        }
        let mut parents = vec![self.parse_type()?];
        while self.take(Operator::Comma) {
            parents.push(self.parse_type()?);
        }
        Ok(parents)
    }

    /// `'(' (type name (',' type name)*)? ')'`
    pub(super) fn parse_arguments(&mut self) -> Result<Vec<Argument>> {
        self.consume(Operator::LeftParen)?;
        let args = self.parse_list(&[Operator::RightParen], |p| {
            let ty = p.parse_type()?;
            let (name, location) = p.parse_declared_name()?;
            Ok(Argument { name, ty, location })
        })?;
        self.consume(Operator::RightParen)?;
        Ok(args)
    }

    fn parse_member(&mut self) -> Result<()> {
        let modifiers = self.parse_modifiers();
        let location = self.peek().location.clone();

        if self.take_keyword(Keyword::Init) {
            let args = self.parse_arguments()?;
            let body = self.parse_braced_block()?;
            self.expect_terminator()?;
            self.ctx.tree.add_member(Definition::Method(MethodDefinition {
                name: names::INIT,
                return_type: Type::named(names::VOID, location.clone()),
                location,
                args,
                body: Some(body),
                modifiers,
                is_constructor: true,
                enclosing: None,
            }));
            return Ok(());
        }

        let ty = self.parse_type()?;
        let (name, location) = self.parse_declared_name()?;

        if self.is(Operator::LeftParen) {
            let args = self.parse_arguments()?;
            let body = if self.is(Operator::LeftBrace) && self.on_same_line() {
                Some(self.parse_braced_block()?)
            } else {
                None
            };
            self.expect_terminator()?;
            self.ctx.tree.add_member(Definition::Method(MethodDefinition {
                name,
                location,
                return_type: ty,
                args,
                body,
                modifiers,
                is_constructor: false,
                enclosing: None,
            }));
            return Ok(());
        }

        let initializer = if self.take(Operator::Assign) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect_terminator()?;
        self.ctx
            .tree
            .add_member(Definition::DataMember(DataMemberDefinition {
                name,
                location,
                ty,
                initializer,
                modifiers,
                enclosing: None,
            }));
        Ok(())
    }

    /// `class Point(int x, int y)` declares the fields `x` and `y` and a
    /// constructor assigning them.
    fn add_primary_constructor(&mut self, args: Vec<Argument>) {
        let mut statements = Vec::with_capacity(args.len());
        for arg in &args {
            self.ctx
                .tree
                .add_data_member(arg.name, arg.ty.clone(), None, arg.location.clone());
            let location = arg.location.clone();
            let field = Expr::new(
                ExprKind::MemberSelector {
                    object: Box::new(Expr::new(ExprKind::This, location.clone())),
                    member: arg.name,
                },
                location.clone(),
            );
            let assignment = Expr::new(
                ExprKind::Binary {
                    op: BinaryOperator::Assign,
                    lhs: Box::new(field),
                    rhs: Box::new(Expr::new(ExprKind::Identifier(arg.name), location.clone())),
                },
                location.clone(),
            );
            statements.push(Stmt {
                kind: StmtKind::Expr(assignment),
                location,
            });
        }
        let location = self.ctx.tree.class(self.current_class()).location.clone();
        self.ctx.tree.add_member(Definition::Method(MethodDefinition {
            name: names::INIT,
            location: location.clone(),
            return_type: Type::named(names::VOID, location),
            args,
            body: Some(Block { statements }),
            modifiers: Modifiers::default(),
            is_constructor: true,
            enclosing: None,
        }));
    }

    fn current_class(&self) -> DefId {
        self.ctx
            .tree
            .current_class()
            .expect("members are only parsed inside a class")
    }

    /// A free function: `Type name(args) { ... }`.
    fn parse_function(&mut self, modifiers: Modifiers) -> Result<()> {
        let return_type = self.parse_type()?;
        let (name, location) = self.parse_declared_name()?;
        let args = self.parse_arguments()?;
        self.ctx.tree.start_function(MethodDefinition {
            name,
            location,
            return_type,
            args,
            body: None,
            modifiers,
            is_constructor: false,
            enclosing: None,
        });
        let body = self.parse_braced_block()?;
        self.expect_terminator()?;
        self.ctx.tree.finish_function(body);
        Ok(())
    }

    /// `import a.b` or `import "path/file.plume"`.
    fn parse_import(&mut self) -> Result<()> {
        let location = self.peek().location.clone();
        let import = if let TokenKind::String(path) = &self.peek().kind {
            let import = Import::File(path.clone());
            self.advance();
            import
        } else {
            let mut path = String::new();
            loop {
                match &self.lexer.peek_token().kind {
                    TokenKind::Identifier(segment) => path.push_str(segment),
                    _ => return Err(self.unexpected("module name")),
                }
                self.advance();
                if !self.on_same_line() || !self.take(Operator::Dot) {
                    break;
                }
                path.push('.');
            }
            Import::Module(path.into())
        };
        self.expect_terminator()?;
        self.import_module(&import, location)
    }

    fn import_module(&mut self, import: &Import, location: Location) -> Result<()> {
        let Some(path) = self.ctx.config.resolve(import) else {
            return Err(SyntaxError::new(
                ErrorKind::ModuleNotFound(import.to_string().into()),
                location,
            ));
        };
        if !self.ctx.tree.register_import(&path.to_string_lossy()) {
            debug!(module = %import, "already imported");
            return Ok(());
        }
        let (file, text) = self.ctx.files.load(&path).map_err(|error| {
            SyntaxError::new(
                ErrorKind::ModuleUnreadable {
                    path: path.clone(),
                    reason: error.to_string().into(),
                },
                location,
            )
        })?;
        debug!(module = %import, file = %file, "importing");

        let was_importing = self.ctx.tree.set_importing(true);
        let result = Parser::new(&mut *self.ctx, file, &text).parse_program();
        self.ctx.tree.set_importing(was_importing);
        result
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::{
        context::{Config, Context, SOURCE_EXTENSION},
        parser,
        util::{
            fmt::tree::print_program_string,
            test_utils::{format_error, tree_tests, TEST_FILE},
        },
    };

    tree_tests!(
        use parser;

        fn test_generic_class_with_members() {
            let program = "
                class Cell<T>: Object {
                    T value
                    T get() { return this.value }
                }
            ";
            let tree_ok = "
                class Cell<T> : Object
                  field T value
                  method T get()
                    return
                      member value
                        this
            ";
        }

        fn test_primary_constructor() {
            let program = "class Point(int x, int y)";
            let tree_ok = "
                class Point
                  field int x
                  field int y
                  init(int x, int y)
                    binary Assign
                      member x
                        this
                      ident x
                    binary Assign
                      member y
                        this
                      ident y
            ";
        }

        fn test_enum_variants() {
            let program = "
                enum Option<T> {
                    None,
                    Some(T value)
                }
            ";
            let tree_ok = "
                class Option<T> [enum]
                  variant None
                  variant Some(T value)
            ";
        }

        fn test_enum_members_follow_a_semicolon() {
            let program = "
                enum Color {
                    Red, Green;
                    bool isRed() { return false }
                }
            ";
            let tree_ok = "
                class Color [enum]
                  variant Red
                  variant Green
                  method bool isRed()
                    return
                      bool false
            ";
        }

        fn test_message_class() {
            let program = "message class Ping(int id)";
            let tree_ok = "
                class Ping [message]
                  field int id
                  init(int id)
                    binary Assign
                      member id
                        this
                      ident id
            ";
        }

        fn test_member_modifiers() {
            let program = "
                class Worker {
                    private static int count = 0
                    native virtual void run()
                }
            ";
            let tree_ok = "
                class Worker
                  private static field int count
                    int 0
                  native virtual method void run() (signature)
            ";
        }

        fn test_free_function() {
            let program = "int twice(int x) { return x * 2 }";
            let tree_ok = "
                function int twice(int x)
                  return
                    binary Mul
                      ident x
                      int 2
            ";
        }

        fn test_use_namespace() {
            let program = "
                use net
                class Server {}
            ";
            let tree_ok = "
                use net
                class Server
            ";
        }

        fn test_use_needs_a_namespace() {
            let program = "use\nclass A {}";
            let expected_errors = &["2:1: expected namespace, but got keyword `class`"];
        }

        fn test_class_without_a_name() {
            let program = "class {\n}";
            let expected_errors = &["1:7: expected identifier, but got `{`"];
        }

        fn test_declarations_need_a_line_break() {
            let program = "class A {} class B {}";
            let expected_errors = &["1:12: expected a line break before keyword `class`"];
        }

        fn test_interfaces_have_no_primary_constructor() {
            let program = "interface I(int x)";
            let expected_errors = &["1:12: expected `{`, but got `(`"];
        }

        fn test_missing_module() {
            let program = "import a.b";
            let expected_errors = &["1:8: module `a.b` not found"];
        }
    );

    fn context_with_stdlib(dir: &std::path::Path) -> Context {
        Context::new(Config {
            stdlib_dir: dir.to_path_buf(),
            extension: SOURCE_EXTENSION,
        })
    }

    #[test]
    fn imported_modules_are_marked_and_read_once() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("geometry")).unwrap();
        fs::write(
            dir.path().join("geometry").join("point.plume"),
            "class Point(int x, int y)\n",
        )
        .unwrap();

        let mut ctx = context_with_stdlib(dir.path());
        let src = "import geometry.point\nimport geometry.point\nclass Line {}\n";
        parser::parse_source(&mut ctx, TEST_FILE, src).unwrap();

        let printed = print_program_string(&ctx.tree);
        let headers: Vec<_> = printed.lines().filter(|l| l.starts_with("class")).collect();
        assert_eq!(headers, ["class Point [imported]", "class Line"]);
    }

    #[test]
    fn errors_in_imported_modules_point_into_them() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.plume"), "class {}\n").unwrap();

        let mut ctx = context_with_stdlib(dir.path());
        let error = parser::parse_source(&mut ctx, TEST_FILE, "import broken").unwrap_err();
        assert!(error.location.file.ends_with("broken.plume"));
        assert_eq!(
            format_error(&error),
            "1:7: expected identifier, but got `{`"
        );
    }
}
