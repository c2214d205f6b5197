//! Proxies, handler factories and proxy accessors.
//!
//! A proxy implements a process type by turning every method call into a
//! message: it builds the call object, sends it to the target pid and, when
//! the method returns a value, blocks for the reply to that message.

use super::{
    callables,
    dispatch::InterfaceIds,
    process_interfaces,
    synth::{accessor_name, derived_name, Synth},
    Callable,
};
use crate::{
    ast::{Argument, DefId, Definition, Expr, Name, Properties},
    names,
    tree::Tree,
};

/// A method a proxy marshals, and the interface id its messages carry.
pub(super) struct Route {
    callable: Callable,
    interface_id: Expr,
}

/// The arguments of the first constructor of `class`, if any.
pub(super) fn first_constructor_args(tree: &Tree, class: DefId) -> Vec<Argument> {
    tree.methods(class)
        .find(|(_, method)| method.is_constructor)
        .map(|(_, method)| method.args.clone())
        .unwrap_or_default()
}

/// The process's own callables under its own id, then the methods of each
/// inherited interface it doesn't declare itself, under that interface's id.
pub(super) fn process_routes(
    tree: &mut Tree,
    own: Vec<Callable>,
    table: &[DefId],
    ids: &InterfaceIds,
    synth: &Synth,
) -> Vec<Route> {
    let mut routes: Vec<Route> = own
        .into_iter()
        .map(|callable| Route {
            callable,
            interface_id: ids.selector(synth, 0),
        })
        .collect();
    for (index, &interface) in table.iter().enumerate().skip(1) {
        for callable in callables(tree, interface, true) {
            let method = &callable.method;
            let present = routes.iter().any(|route| {
                route.callable.method.name == method.name
                    && route.callable.method.args.len() == method.args.len()
            });
            if !present {
                routes.push(Route {
                    callable,
                    interface_id: ids.selector(synth, index),
                });
            }
        }
    }
    routes
}

/// `{P}MessageHandlerFactory: MessageHandlerFactory`, holding the constructor
/// arguments until the runtime asks for the handler. Returns its name.
pub(super) fn generate_factory(
    tree: &mut Tree,
    interface: DefId,
    handler: Name,
    args: &[Argument],
    synth: &Synth,
) -> Name {
    let process = tree.class(interface).name;
    let name = derived_name(tree, process, "MessageHandlerFactory");
    let parents = vec![synth.ty(names::MESSAGE_HANDLER_FACTORY)];
    tree.start_generated_class(name, Properties::default(), parents, interface);
    synth.fields(tree, args);
    tree.add_member(synth.storing_constructor(args.to_vec(), vec![]));
    let handler = synth.new_object(
        synth.ty(handler),
        args.iter().map(|arg| synth.field(arg.name)).collect(),
    );
    tree.add_member(synth.method(
        synth.ty(names::MESSAGE_HANDLER),
        names::CREATE_MESSAGE_HANDLER,
        vec![],
        Some(vec![synth.return_stmt(handler)]),
    ));
    let id = tree.finish_class();
    tree.add_global_definition(id);
    name
}

/// `{P}Proxy: P`. Constructing one spawns the process.
pub(super) fn generate_process_proxy(
    tree: &mut Tree,
    interface: DefId,
    factory: Name,
    args: Vec<Argument>,
    routes: &[Route],
    ids: &InterfaceIds,
    synth: &Synth,
) {
    let process = tree.class(interface).name;
    let name = derived_name(tree, process, "Proxy");
    tree.start_generated_class(name, Properties::default(), vec![synth.ty(process)], interface);
    synth.fields(tree, &[synth.argument(synth.ty(names::INT), names::PID)]);

    let factory = synth.new_object(
        synth.ty(factory),
        args.iter().map(|arg| synth.ident(arg.name)).collect(),
    );
    let spawn = synth.assign(
        synth.field(names::PID),
        synth.runtime(names::SPAWN, vec![factory]),
    );
    tree.add_member(synth.constructor(args, vec![synth.expr_stmt(spawn)]));

    for route in routes {
        let method = marshalling_method(tree, route, synth);
        tree.add_member(method);
    }
    let wait = synth.runtime(names::WAIT, vec![synth.field(names::PID)]);
    tree.add_member(synth.method(
        synth.ty(names::VOID),
        names::WAIT,
        vec![],
        Some(vec![synth.expr_stmt(wait)]),
    ));
    add_accessors(tree, ids, 1, &synth.field(names::PID), synth);
    let id = tree.finish_class();
    tree.add_global_definition(id);
}

/// `{I}Proxy: I`, created by the accessors of whatever implements `I`. Its
/// messages carry the interface id the implementor assigned to `I`, and it
/// keeps the ids of every process interface `I` inherits so it can hand out
/// their proxies too.
pub(super) fn generate_interface_proxy(
    tree: &mut Tree,
    interface: DefId,
    callables: Vec<Callable>,
    synth: &Synth,
) {
    let interface_name = tree.class(interface).name;
    let name = derived_name(tree, interface_name, "Proxy");
    let parents = vec![synth.ty(interface_name)];
    let inherited = process_interfaces(tree, interface);
    tree.start_generated_class(name, Properties::default(), parents, interface);
    let mut fields = vec![
        synth.argument(synth.ty(names::INT), names::PID),
        synth.argument(synth.ty(names::INT), names::INTERFACE_ID),
    ];
    for &parent in &inherited {
        let field = id_field(tree, parent);
        fields.push(synth.argument(synth.ty(names::INT), field));
    }
    synth.fields(tree, &fields);
    tree.add_member(synth.storing_constructor(fields, vec![]));

    for callable in callables {
        let route = Route {
            callable,
            interface_id: synth.field(names::INTERFACE_ID),
        };
        let method = marshalling_method(tree, &route, synth);
        tree.add_member(method);
    }
    let accessor = accessor_name(tree, interface_name);
    tree.add_member(synth.method(
        synth.ty(name),
        accessor,
        vec![],
        Some(vec![synth.return_stmt(synth.this())]),
    ));
    for parent in inherited {
        let parent_name = tree.class(parent).name;
        let proxy = derived_name(tree, parent_name, "Proxy");
        let accessor = accessor_name(tree, parent_name);
        let mut args = vec![synth.field(names::PID), synth.field(id_field(tree, parent))];
        for grandparent in process_interfaces(tree, parent) {
            args.push(synth.field(id_field(tree, grandparent)));
        }
        let created = synth.new_object(synth.ty(proxy), args);
        tree.add_member(synth.method(
            synth.ty(proxy),
            accessor,
            vec![],
            Some(vec![synth.return_stmt(created)]),
        ));
    }
    let id = tree.finish_class();
    tree.add_global_definition(id);
}

/// `{I}Id`
fn id_field(tree: &mut Tree, interface: DefId) -> Name {
    let name = tree.class(interface).name;
    derived_name(tree, name, "Id")
}

/// ```text
/// R m(A a) {
///     let call = new PMCall(Process.getPid(), a)
///     let message = new Message(PInterfaceId.PId, call)
///     Process.send(this.pid, message)
///     return ((Box<R>) Process.receiveMethodResult(message.id)).value
/// }
/// ```
///
/// Void methods don't pass the caller's pid and return right after sending.
/// Reference results are cast rather than unboxed.
fn marshalling_method(tree: &mut Tree, route: &Route, synth: &Synth) -> Definition {
    let method = &route.callable.method;
    let mut call_args = Vec::with_capacity(method.args.len() + 1);
    if method.returns_value() {
        call_args.push(synth.runtime(names::GET_PID, vec![]));
    }
    for arg in &method.args {
        call_args.push(forwarded(tree, arg, synth));
    }

    let call = synth.new_object(synth.ty(route.callable.call_class), call_args);
    let message = synth.new_object(
        synth.ty(names::MESSAGE),
        vec![route.interface_id.clone(), synth.ident(names::CALL)],
    );
    let send = synth.runtime(
        names::SEND,
        vec![synth.field(names::PID), synth.ident(names::MESSAGE_ARG)],
    );
    let mut body = vec![
        synth.let_stmt(names::CALL, call),
        synth.let_stmt(names::MESSAGE_ARG, message),
        synth.expr_stmt(send),
    ];
    if method.returns_value() {
        let result = synth.runtime(
            names::RECEIVE_METHOD_RESULT,
            vec![synth.member(synth.ident(names::MESSAGE_ARG), names::ID)],
        );
        let return_type = method.return_type.clone();
        let value = if return_type.is_value_type() {
            synth.member(synth.cast(synth.boxed(return_type), result), names::VALUE)
        } else {
            synth.cast(return_type, result)
        };
        body.push(synth.return_stmt(value));
    }
    synth.method(
        method.return_type.clone(),
        method.name,
        method.args.clone(),
        Some(body),
    )
}

/// Process interface arguments are sent as their proxies.
fn forwarded(tree: &mut Tree, arg: &Argument, synth: &Synth) -> Expr {
    let value = synth.ident(arg.name);
    if arg.ty.array_dimensions > 0 {
        return value;
    }
    let Some(class) = tree.find_class(arg.ty.name) else {
        return value;
    };
    let accessor = accessor_name(tree, arg.ty.name);
    if tree.methods(class).any(|(_, method)| method.name == accessor) {
        synth.call(value, accessor, vec![])
    } else {
        value
    }
}

/// Adds `{I}Proxy get{I}Proxy() { return new {I}Proxy(pid, ...InterfaceId.{I}Id, ...) }`
/// for every interface in `ids` after the first `skip`. The ids of the
/// interfaces `I` inherits follow its own.
pub(super) fn add_accessors(
    tree: &mut Tree,
    ids: &InterfaceIds,
    skip: usize,
    pid: &Expr,
    synth: &Synth,
) {
    for (index, entry) in ids.entries.iter().enumerate().skip(skip) {
        let proxy = derived_name(tree, entry.interface, "Proxy");
        let accessor = accessor_name(tree, entry.interface);
        let args = [pid.clone(), ids.selector(synth, index)]
            .into_iter()
            .chain(entry.inherited.iter().map(|&parent| ids.selector(synth, parent)))
            .collect();
        let created = synth.new_object(synth.ty(proxy), args);
        tree.add_member(synth.method(
            synth.ty(proxy),
            accessor,
            vec![],
            Some(vec![synth.return_stmt(created)]),
        ));
    }
}
