use std::collections::HashSet;

use tracing::debug;

use crate::{
    ast::{
        Block, ClassDefinition, DataMemberDefinition, DefId, Definition, Expr,
        GenericTypeParameterDefinition, MethodDefinition, Modifiers, Name, Properties, Stmt, Type,
    },
    names,
    token::Location,
    util::intern::Interner,
};

/// Owns the AST of a whole compilation and the state needed to build it.
///
/// Definitions live in an arena and refer to each other through [`DefId`]s.
/// Building is bracketed: there is at most one class open at a time, and
/// blocks nest strictly inside it.
#[derive(Debug)]
pub struct Tree {
    names: Interner<str>,
    definitions: Vec<Definition>,
    globals: Vec<DefId>,
    namespaces: Vec<Name>,
    imported_modules: HashSet<Box<str>>,
    current_class: Option<DefId>,
    current_function: Option<DefId>,
    blocks: Vec<Vec<Stmt>>,
    importing: bool,
    fresh: u32,
}

impl Default for Tree {
    fn default() -> Self {
        Tree::new()
    }
}

impl Tree {
    pub fn new() -> Tree {
        let mut names = Interner::with_capacity(256);
        for &(expected, text) in names::ALL {
            let handle = names.intern(text);
            assert_eq!(handle, expected);
        }
        Tree {
            names,
            definitions: Vec::with_capacity(256),
            globals: Vec::with_capacity(64),
            namespaces: Vec::new(),
            imported_modules: HashSet::new(),
            current_class: None,
            current_function: None,
            blocks: Vec::new(),
            importing: false,
            fresh: 0,
        }
    }

    pub fn intern(&mut self, text: &str) -> Name {
        self.names.intern(text)
    }

    pub fn name(&self, name: Name) -> &str {
        self.names.get(name)
    }

    /// Returns a name no source file can declare, such as `__subject3`.
    pub fn fresh_name(&mut self, prefix: &str) -> Name {
        self.fresh += 1;
        let text = format!("__{prefix}{}", self.fresh);
        self.names.intern(&text)
    }

    pub fn definition(&self, id: DefId) -> &Definition {
        &self.definitions[id.0 as usize]
    }

    fn definition_mut(&mut self, id: DefId) -> &mut Definition {
        &mut self.definitions[id.0 as usize]
    }

    /// Panics if `id` is not a class.
    pub fn class(&self, id: DefId) -> &ClassDefinition {
        match self.definition(id) {
            Definition::Class(class) => class,
            other => panic!("{id:?} is not a class: {other:?}"),
        }
    }

    /// Panics if `id` is not a class.
    pub fn class_mut(&mut self, id: DefId) -> &mut ClassDefinition {
        match self.definition_mut(id) {
            Definition::Class(class) => class,
            other => panic!("{id:?} is not a class: {other:?}"),
        }
    }

    pub fn method(&self, id: DefId) -> Option<&MethodDefinition> {
        match self.definition(id) {
            Definition::Method(method) => Some(method),
            _ => None,
        }
    }

    pub fn method_mut(&mut self, id: DefId) -> Option<&mut MethodDefinition> {
        match self.definition_mut(id) {
            Definition::Method(method) => Some(method),
            _ => None,
        }
    }

    /// The methods of `class`, in declaration order.
    pub fn methods(
        &self,
        class: DefId,
    ) -> impl Iterator<Item = (DefId, &MethodDefinition)> + '_ {
        self.class(class)
            .members
            .iter()
            .filter_map(|&id| self.method(id).map(|method| (id, method)))
    }

    /// Definitions registered as program-level declarations, in order.
    pub fn globals(&self) -> &[DefId] {
        &self.globals
    }

    pub fn namespaces(&self) -> &[Name] {
        &self.namespaces
    }

    /// Finds the most recently registered global class named `name`.
    pub fn find_class(&self, name: Name) -> Option<DefId> {
        self.globals.iter().rev().copied().find(|&id| {
            matches!(self.definition(id), Definition::Class(class) if class.name == name)
        })
    }

    pub fn current_class(&self) -> Option<DefId> {
        self.current_class
    }

    /// Whether definitions being added come from an imported module.
    pub fn set_importing(&mut self, importing: bool) -> bool {
        std::mem::replace(&mut self.importing, importing)
    }

    fn push(&mut self, definition: Definition) -> DefId {
        let index = u32::try_from(self.definitions.len()).expect("too many definitions");
        self.definitions.push(definition);
        DefId(index)
    }

    pub fn start_class(
        &mut self,
        name: Name,
        location: Location,
        properties: Properties,
        modifiers: Modifiers,
        parents: Vec<Type>,
    ) -> DefId {
        assert!(self.current_class.is_none(), "class brackets must not overlap");
        let id = self.push(Definition::Class(ClassDefinition {
            name,
            location,
            properties,
            modifiers,
            parents,
            generics: Vec::new(),
            members: Vec::new(),
            variants: Vec::new(),
            is_imported: self.importing,
            is_generated: false,
        }));
        self.current_class = Some(id);
        id
    }

    /// Starts a synthesized class. It takes its location and imported flag
    /// from `origin`, the class it was generated for.
    pub fn start_generated_class(
        &mut self,
        name: Name,
        properties: Properties,
        parents: Vec<Type>,
        origin: DefId,
    ) -> DefId {
        let origin = self.class(origin);
        let (location, is_imported) = (origin.location.clone(), origin.is_imported);
        let id = self.start_class(name, location, properties, Modifiers::default(), parents);
        let class = self.class_mut(id);
        class.is_imported = is_imported;
        class.is_generated = true;
        id
    }

    /// Makes an already finished class current again, so that more members
    /// can be added to it.
    pub fn reopen_class(&mut self, id: DefId) {
        assert!(self.current_class.is_none(), "class brackets must not overlap");
        self.current_class = Some(id);
    }

    pub fn finish_class(&mut self) -> DefId {
        debug_assert!(self.blocks.is_empty());
        self.current_class.take().expect("no class to finish")
    }

    pub fn add_generic_parameter(&mut self, name: Name, location: Location) -> DefId {
        let class = self.current_class.expect("no current class");
        let id = self.push(Definition::GenericTypeParameter(
            GenericTypeParameterDefinition {
                name,
                location,
                enclosing: Some(class),
            },
        ));
        self.class_mut(class).generics.push(id);
        id
    }

    /// Adds a method or data member to the current class.
    pub fn add_member(&mut self, mut definition: Definition) -> DefId {
        let class = self.current_class.expect("no current class");
        definition.set_enclosing(Some(class));
        let id = self.push(definition);
        self.class_mut(class).members.push(id);
        id
    }

    pub fn add_data_member(
        &mut self,
        name: Name,
        ty: Type,
        initializer: Option<Expr>,
        location: Location,
    ) -> DefId {
        self.add_member(Definition::DataMember(DataMemberDefinition {
            name,
            location,
            ty,
            initializer,
            modifiers: Modifiers::default(),
            enclosing: None,
        }))
    }

    /// Starts a free function. Its body is supplied when it's finished.
    pub fn start_function(&mut self, method: MethodDefinition) -> DefId {
        assert!(self.current_function.is_none(), "functions must not nest");
        debug_assert!(method.enclosing.is_none());
        let id = self.push(Definition::Method(method));
        self.current_function = Some(id);
        id
    }

    /// Finishes the current free function, registering it globally.
    pub fn finish_function(&mut self, body: Block) -> DefId {
        let id = self.current_function.take().expect("no function to finish");
        if let Some(function) = self.method_mut(id) {
            function.body = Some(body);
        }
        self.add_global_definition(id);
        id
    }

    pub fn start_block(&mut self) {
        self.blocks.push(Vec::new());
    }

    /// Appends a statement to the innermost open block.
    pub fn add_statement(&mut self, stmt: Stmt) {
        self.blocks
            .last_mut()
            .expect("statement outside of a block")
            .push(stmt);
    }

    pub fn finish_block(&mut self) -> Block {
        let statements = self.blocks.pop().expect("no block to finish");
        Block { statements }
    }

    pub fn block_depth(&self) -> usize {
        self.blocks.len()
    }

    /// Drops blocks opened past `depth`, along with their statements.
    pub fn truncate_blocks(&mut self, depth: usize) {
        self.blocks.truncate(depth);
    }

    /// Registers a definition as a program-level declaration.
    pub fn add_global_definition(&mut self, id: DefId) {
        debug_assert!(!self.globals.contains(&id), "{id:?} registered twice");
        debug!(
            name = self.name(self.definition(id).name()),
            imported = self.importing,
            "registered global definition"
        );
        self.globals.push(id);
    }

    /// `use Name`
    pub fn use_namespace(&mut self, name: Name) {
        if !self.namespaces.contains(&name) {
            self.namespaces.push(name);
        }
    }

    /// Records that `file` is part of the compilation. Returns `false` if it
    /// already was.
    pub fn register_import(&mut self, file: &str) -> bool {
        self.imported_modules.insert(file.into())
    }

    /// Deep copies `id` into fresh arena slots. The copy is not registered as
    /// a global, and its members and generic parameters point back to it.
    pub fn clone_class(&mut self, id: DefId) -> DefId {
        let original = self.class(id).clone();
        let copy = self.push(Definition::Class(original.clone()));
        let mut rewire = |ids: &[DefId]| -> Vec<DefId> {
            ids.iter()
                .map(|&child| {
                    let mut definition = self.definition(child).clone();
                    definition.set_enclosing(Some(copy));
                    self.push(definition)
                })
                .collect()
        };
        let generics = rewire(&original.generics);
        let members = rewire(&original.members);
        let class = self.class_mut(copy);
        class.generics = generics;
        class.members = members;
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Argument, StmtKind};

    fn location() -> Location {
        Location::start_of("test.plume".into())
    }

    fn method(tree: &mut Tree, name: &str) -> Definition {
        let name = tree.intern(name);
        Definition::Method(MethodDefinition {
            name,
            location: location(),
            return_type: Type::named(names::INT, location()),
            args: vec![Argument {
                name: tree.intern("x"),
                ty: Type::named(names::INT, location()),
                location: location(),
            }],
            body: Some(Block::default()),
            modifiers: Modifiers::default(),
            is_constructor: false,
            enclosing: None,
        })
    }

    #[test]
    fn well_known_names_are_preinterned() {
        let tree = Tree::new();
        assert_eq!(tree.name(names::VOID), "void");
        assert_eq!(tree.name(names::MESSAGE_HANDLER_ID), "messageHandlerId");
    }

    #[test]
    fn class_brackets() {
        let mut tree = Tree::new();
        let name = tree.intern("Point");
        let class = tree.start_class(
            name,
            location(),
            Properties::default(),
            Modifiers::default(),
            vec![],
        );
        let t = tree.intern("T");
        tree.add_generic_parameter(t, location());
        let m = method(&mut tree, "get");
        let member = tree.add_member(m);
        assert_eq!(tree.finish_class(), class);
        tree.add_global_definition(class);

        assert_eq!(tree.find_class(name), Some(class));
        assert_eq!(tree.class(class).members, [member]);
        assert_eq!(tree.method(member).unwrap().enclosing, Some(class));
        assert_eq!(tree.methods(class).count(), 1);
    }

    #[test]
    fn clone_class_is_deep() {
        let mut tree = Tree::new();
        let name = tree.intern("Worker");
        let class = tree.start_class(
            name,
            location(),
            Properties::default(),
            Modifiers::default(),
            vec![],
        );
        let m = method(&mut tree, "run");
        tree.add_member(m);
        tree.finish_class();

        let copy = tree.clone_class(class);
        assert_ne!(copy, class);
        let original_member = tree.class(class).members[0];
        let copied_member = tree.class(copy).members[0];
        assert_ne!(original_member, copied_member);
        assert_eq!(tree.method(copied_member).unwrap().enclosing, Some(copy));

        tree.method_mut(copied_member).unwrap().body = None;
        assert!(tree.method(original_member).unwrap().body.is_some());
        assert!(tree.globals().is_empty());
    }

    #[test]
    fn generated_classes_inherit_imported_flag() {
        let mut tree = Tree::new();
        tree.set_importing(true);
        let name = tree.intern("Worker");
        let class = tree.start_class(
            name,
            location(),
            Properties::default(),
            Modifiers::default(),
            vec![],
        );
        tree.finish_class();
        tree.set_importing(false);

        let generated_name = tree.intern("WorkerProxy");
        let generated =
            tree.start_generated_class(generated_name, Properties::default(), vec![], class);
        tree.finish_class();
        assert!(tree.class(generated).is_imported);
        assert!(tree.class(generated).is_generated);
    }

    #[test]
    fn blocks_nest() {
        let mut tree = Tree::new();
        tree.start_block();
        tree.add_statement(Stmt {
            kind: StmtKind::Break,
            location: location(),
        });
        tree.start_block();
        assert_eq!(tree.block_depth(), 2);
        tree.truncate_blocks(1);
        let block = tree.finish_block();
        assert_eq!(block.statements.len(), 1);
        assert_eq!(tree.block_depth(), 0);
    }

    #[test]
    fn imports_are_deduplicated() {
        let mut tree = Tree::new();
        assert!(tree.register_import("a.plume"));
        assert!(!tree.register_import("a.plume"));
        assert!(tree.register_import("b.plume"));
    }
}
