//! The process generator.
//!
//! A `process` is split into an interface other processes program against,
//! call classes marshalling each method, an interface id table, the message
//! handler owning the real implementation, a handler factory and a proxy.
//! A `process interface` gets call classes and a proxy of its own, and an
//! ordinary class implementing one is turned into a message handler in place.
//!
//! Generation is a total transformation over declarations the parser has
//! already accepted. It reports no errors.

mod call;
mod dispatch;
mod proxy;
mod synth;

use std::collections::{HashMap, HashSet};

use tracing::debug;

use self::synth::{accessor_name, capitalize, derived_name, Synth};
use crate::{
    ast::{DefId, MethodDefinition, Name},
    names,
    tree::Tree,
};

/// Registers a finished class as a global definition, generating the
/// message passing code its process semantics call for.
pub fn declare_class(tree: &mut Tree, class: DefId) {
    let properties = tree.class(class).properties;
    if properties.is_process && !properties.is_interface {
        generate_process(tree, class);
        return;
    }
    tree.add_global_definition(class);
    if properties.is_process {
        generate_interface(tree, class);
    } else if !properties.is_interface && !properties.is_enum {
        let interfaces = process_interfaces(tree, class);
        if !interfaces.is_empty() {
            generate_implementor(tree, class, &interfaces);
        }
    }
}

/// A method invoked through a message, and the class carrying its arguments.
#[derive(Clone, Debug)]
struct Callable {
    method: MethodDefinition,
    call_class: Name,
}

/// The process interfaces `class` inherits, directly or through other
/// classes, depth first in declaration order and without duplicates.
fn process_interfaces(tree: &Tree, class: DefId) -> Vec<DefId> {
    fn visit(tree: &Tree, class: DefId, seen: &mut HashSet<DefId>, found: &mut Vec<DefId>) {
        for parent in &tree.class(class).parents {
            let Some(id) = tree.find_class(parent.name) else {
                continue;
            };
            if !seen.insert(id) {
                continue;
            }
            let properties = tree.class(id).properties;
            if properties.is_process && properties.is_interface {
                found.push(id);
            }
            visit(tree, id, seen, found);
        }
    }

    let mut seen = HashSet::from([class]);
    let mut found = Vec::new();
    visit(tree, class, &mut seen, &mut found);
    found
}

/// The methods of `class` that messages can invoke, each with the name of its
/// call class: `{Class}{Method}Call`, with an ordinal after the method name
/// for the second and later overloads.
///
/// With `inherited`, the methods of inherited process interfaces follow,
/// unless `class` already has one with the same name and arity. Proxy
/// accessors are never included.
fn callables(tree: &mut Tree, class: DefId, inherited: bool) -> Vec<Callable> {
    let owner = tree.class(class).name;
    let interfaces = process_interfaces(tree, class);
    let interface_names: Vec<Name> = std::iter::once(owner)
        .chain(interfaces.iter().map(|&id| tree.class(id).name))
        .collect();
    let accessors: Vec<Name> = interface_names
        .into_iter()
        .map(|name| accessor_name(tree, name))
        .collect();

    let is_marshalled = |method: &MethodDefinition| {
        method.is_externally_callable() && !accessors.contains(&method.name)
    };
    let mut methods: Vec<MethodDefinition> = tree
        .methods(class)
        .map(|(_, method)| method)
        .filter(|&method| is_marshalled(method))
        .cloned()
        .collect();
    if inherited {
        for &interface in &interfaces {
            for (_, method) in tree.methods(interface) {
                let present = methods
                    .iter()
                    .any(|m| m.name == method.name && m.args.len() == method.args.len());
                if !present && is_marshalled(method) {
                    methods.push(method.clone());
                }
            }
        }
    }

    let mut overloads: HashMap<Name, usize> = HashMap::new();
    let mut callables = Vec::with_capacity(methods.len());
    for method in methods {
        let count = overloads.entry(method.name).or_default();
        *count += 1;
        let ordinal = if *count > 1 {
            count.to_string()
        } else {
            String::new()
        };
        let text = format!(
            "{}{}{ordinal}Call",
            tree.name(owner),
            capitalize(tree.name(method.name))
        );
        callables.push(Callable {
            call_class: tree.intern(&text),
            method,
        });
    }
    callables
}

/// `process P: I { ... }`
fn generate_process(tree: &mut Tree, original: DefId) {
    let name = tree.class(original).name;
    debug!(process = tree.name(name), "generating process");
    let synth = Synth::new(tree.class(original).location.clone());

    let own = callables(tree, original, false);
    let inherited = process_interfaces(tree, original);
    let constructor_args = proxy::first_constructor_args(tree, original);

    let interface = declare_process_interface(tree, original, &synth);
    call::generate(tree, interface, &own, &synth);
    // The process's own id comes first.
    let table: Vec<DefId> = std::iter::once(interface).chain(inherited).collect();
    let ids = dispatch::generate_ids(tree, interface, &table, &synth);

    let routes = proxy::process_routes(tree, own, &table, &ids, &synth);
    let handler = dispatch::generate_handler(tree, original, &ids, &synth);
    let factory = proxy::generate_factory(tree, interface, handler, &constructor_args, &synth);
    proxy::generate_process_proxy(
        tree,
        interface,
        factory,
        constructor_args,
        &routes,
        &ids,
        &synth,
    );
}

/// Clones the process into the interface other processes see: its public
/// methods as signatures, plus `void wait()`.
fn declare_process_interface(tree: &mut Tree, original: DefId, synth: &Synth) -> DefId {
    let interface = tree.clone_class(original);
    let members: Vec<DefId> = tree
        .class(interface)
        .members
        .iter()
        .copied()
        .filter(|&id| tree.method(id).is_some_and(MethodDefinition::is_externally_callable))
        .collect();
    for &id in &members {
        if let Some(method) = tree.method_mut(id) {
            method.body = None;
        }
    }
    let class = tree.class_mut(interface);
    class.members = members;
    class.properties.is_interface = true;

    tree.reopen_class(interface);
    tree.add_member(synth.method(synth.ty(names::VOID), names::WAIT, vec![], None));
    tree.finish_class();
    tree.add_global_definition(interface);
    interface
}

/// `process interface I { ... }`
fn generate_interface(tree: &mut Tree, interface: DefId) {
    let name = tree.class(interface).name;
    debug!(interface = tree.name(name), "generating process interface");
    let synth = Synth::new(tree.class(interface).location.clone());

    let callables = callables(tree, interface, true);
    call::generate(tree, interface, &callables, &synth);

    let proxy = derived_name(tree, name, "Proxy");
    let accessor = accessor_name(tree, name);
    tree.reopen_class(interface);
    tree.add_member(synth.method(synth.ty(proxy), accessor, vec![], None));
    tree.finish_class();

    proxy::generate_interface_proxy(tree, interface, callables, &synth);
}

/// An ordinary class implementing process interfaces. It's reopened rather
/// than cloned, and registers itself with the runtime on construction.
fn generate_implementor(tree: &mut Tree, class: DefId, interfaces: &[DefId]) {
    let name = tree.class(class).name;
    debug!(class = tree.name(name), "generating message handler");
    let location = tree.class(class).location.clone();
    let synth = Synth::new(location.clone());

    let ids = dispatch::generate_ids(tree, class, interfaces, &synth);

    let parents = &mut tree.class_mut(class).parents;
    if !parents.iter().any(|p| p.name == names::MESSAGE_HANDLER) {
        parents.push(synth.ty(names::MESSAGE_HANDLER));
    }
    let constructors: Vec<DefId> = tree
        .methods(class)
        .filter(|(_, method)| method.is_constructor)
        .map(|(id, _)| id)
        .collect();

    tree.reopen_class(class);
    tree.add_data_member(names::MESSAGE_HANDLER_ID, synth.ty(names::INT), None, location);
    let registration = synth.expr_stmt(synth.assign(
        synth.field(names::MESSAGE_HANDLER_ID),
        synth.runtime(names::REGISTER_MESSAGE_HANDLER, vec![synth.this()]),
    ));
    if constructors.is_empty() {
        tree.add_member(synth.constructor(vec![], vec![registration]));
    } else {
        for id in constructors {
            let body = tree.method_mut(id).and_then(|method| method.body.as_mut());
            if let Some(body) = body {
                body.statements.push(registration.clone());
            }
        }
    }
    tree.add_member(dispatch::handle_message(&ids, &synth));
    proxy::add_accessors(tree, &ids, 0, &synth.field(names::MESSAGE_HANDLER_ID), &synth);
    tree.finish_class();
}
