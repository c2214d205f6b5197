//! Call classes: one per method invoked through messages, carrying its
//! arguments, and the caller's pid when a result has to be sent back.

use super::{
    synth::{derived_name, Synth},
    Callable,
};
use crate::{
    ast::{Argument, DefId, MethodDefinition, Properties, Stmt},
    names,
    tree::Tree,
};

/// Declares `interface {Target}Call { void call(Message message, Target target) }`
/// and a class implementing it for each callable.
pub(super) fn generate(tree: &mut Tree, target: DefId, callables: &[Callable], synth: &Synth) {
    let target_name = tree.class(target).name;
    let call_interface = derived_name(tree, target_name, "Call");
    let call_args = || {
        vec![
            synth.argument(synth.ty(names::MESSAGE), names::MESSAGE_ARG),
            synth.argument(synth.ty(target_name), names::TARGET),
        ]
    };

    let properties = Properties {
        is_interface: true,
        ..Properties::default()
    };
    tree.start_generated_class(call_interface, properties, vec![], target);
    tree.add_member(synth.method(synth.ty(names::VOID), names::CALL, call_args(), None));
    let id = tree.finish_class();
    tree.add_global_definition(id);

    for callable in callables {
        let parents = vec![synth.ty(call_interface)];
        tree.start_generated_class(callable.call_class, Properties::default(), parents, target);
        let mut fields = Vec::with_capacity(callable.method.args.len() + 1);
        if callable.method.returns_value() {
            fields.push(synth.argument(synth.ty(names::INT), names::CALLER_PID));
        }
        fields.extend(callable.method.args.iter().cloned());
        synth.fields(tree, &fields);
        tree.add_member(synth.storing_constructor(fields, vec![]));
        tree.add_member(synth.method(
            synth.ty(names::VOID),
            names::CALL,
            call_args(),
            Some(call_body(&callable.method, synth)),
        ));
        let id = tree.finish_class();
        tree.add_global_definition(id);
    }
}

/// Invokes the method on the target with the stored arguments. A result is
/// sent back to the caller as a reply to the message, boxed unless it's a
/// reference.
fn call_body(method: &MethodDefinition, synth: &Synth) -> Vec<Stmt> {
    let args = method
        .args
        .iter()
        .map(|Argument { name, .. }| synth.field(*name))
        .collect();
    let invocation = synth.call(synth.ident(names::TARGET), method.name, args);
    if !method.returns_value() {
        return vec![synth.expr_stmt(invocation)];
    }

    let result = synth.ident(names::RESULT);
    let payload = if method.return_type.is_value_type() {
        synth.new_object(synth.boxed(method.return_type.clone()), vec![result])
    } else {
        result
    };
    let reply = synth.call(synth.ident(names::MESSAGE_ARG), names::REPLY, vec![payload]);
    vec![
        synth.let_stmt(names::RESULT, invocation),
        synth.expr_stmt(synth.runtime(names::SEND, vec![synth.field(names::CALLER_PID), reply])),
    ]
}
