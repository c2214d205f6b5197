//! Interface ids and the `handleMessage` method dispatching on them.

use super::{
    process_interfaces,
    proxy::add_accessors,
    synth::{derived_name, Synth},
};
use crate::{
    ast::{DefId, Definition, Expr, Name, Properties},
    names,
    tree::Tree,
};

/// The generated `{Class}InterfaceId` class. A message's interface id is the
/// index of its interface in `entries`.
#[derive(Debug)]
pub(super) struct InterfaceIds {
    pub class: Name,
    pub entries: Vec<IdEntry>,
}

#[derive(Debug)]
pub(super) struct IdEntry {
    pub interface: Name,
    /// `{Interface}Id`
    pub field: Name,
    /// `{Interface}Call`
    pub call_interface: Name,
    /// Indices of the process interfaces `interface` inherits, in the order
    /// its proxy takes their ids.
    pub inherited: Vec<usize>,
}

impl InterfaceIds {
    /// `{Class}InterfaceId.{Interface}Id`
    pub fn selector(&self, synth: &Synth, index: usize) -> Expr {
        synth.path(self.class, self.entries[index].field)
    }
}

/// Declares `{origin}InterfaceId` with one `static int` per interface in
/// `table`, numbered from 0 in order.
pub(super) fn generate_ids(
    tree: &mut Tree,
    origin: DefId,
    table: &[DefId],
    synth: &Synth,
) -> InterfaceIds {
    let origin_name = tree.class(origin).name;
    let class = derived_name(tree, origin_name, "InterfaceId");
    let mut entries = Vec::with_capacity(table.len());
    for &id in table {
        let interface = tree.class(id).name;
        let inherited = process_interfaces(tree, id)
            .into_iter()
            .filter_map(|parent| table.iter().position(|&entry| entry == parent))
            .collect();
        entries.push(IdEntry {
            interface,
            field: derived_name(tree, interface, "Id"),
            call_interface: derived_name(tree, interface, "Call"),
            inherited,
        });
    }

    tree.start_generated_class(class, Properties::default(), vec![], origin);
    for (index, entry) in entries.iter().enumerate() {
        tree.add_member(synth.constant(entry.field, index));
    }
    let id = tree.finish_class();
    tree.add_global_definition(id);
    InterfaceIds { class, entries }
}

/// ```text
/// void handleMessage(Message message) {
///     match message.interfaceId {
///         PInterfaceId.IId -> { ((ICall) message.payload).call(message, this) },
///         ...
///         _ -> {}
///     }
/// }
/// ```
///
/// Messages for unknown interfaces are dropped.
pub(super) fn handle_message(ids: &InterfaceIds, synth: &Synth) -> Definition {
    let message = || synth.ident(names::MESSAGE_ARG);
    let mut cases: Vec<_> = ids
        .entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let payload = synth.cast(
                synth.ty(entry.call_interface),
                synth.member(message(), names::PAYLOAD),
            );
            let call = synth.call(payload, names::CALL, vec![message(), synth.this()]);
            synth.case(ids.selector(synth, index), vec![synth.expr_stmt(call)])
        })
        .collect();
    cases.push(synth.case(synth.wildcard(), vec![]));

    let matching = synth.matching(synth.member(message(), names::INTERFACE_ID), cases);
    synth.method(
        synth.ty(names::VOID),
        names::HANDLE_MESSAGE,
        vec![synth.argument(synth.ty(names::MESSAGE), names::MESSAGE_ARG)],
        Some(vec![synth.expr_stmt(matching)]),
    )
}

/// Turns the original process class into `{P}MessageHandler: P,
/// MessageHandler`, keeping its members and adding dispatch, a `wait` stub
/// and proxy accessors for the inherited interfaces. Returns the new name.
pub(super) fn generate_handler(
    tree: &mut Tree,
    original: DefId,
    ids: &InterfaceIds,
    synth: &Synth,
) -> Name {
    let process = tree.class(original).name;
    let name = derived_name(tree, process, "MessageHandler");
    let class = tree.class_mut(original);
    class.name = name;
    class.properties.is_process = false;
    class.parents = vec![synth.ty(process), synth.ty(names::MESSAGE_HANDLER)];
    class.is_generated = true;

    tree.reopen_class(original);
    tree.add_member(handle_message(ids, synth));
    tree.add_member(synth.method(synth.ty(names::VOID), names::WAIT, vec![], Some(vec![])));
    // Inside the handler, the process's pid is the current one.
    let pid = synth.runtime(names::GET_PID, vec![]);
    add_accessors(tree, ids, 1, &pid, synth);
    tree.finish_class();
    tree.add_global_definition(original);
    name
}
