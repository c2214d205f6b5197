//! Names every compilation knows about before reading any source: primitive
//! types, the runtime API used by generated processes, and the members the
//! process generator synthesizes.
//!
//! Each [`Tree`](crate::tree::Tree) interns [`ALL`] first, in order, so these
//! constants are valid handles into its interner.

use crate::{ast::Name, util::intern::Interned};

macro_rules! well_known {
    ($($ident:ident = $text:literal,)*) => {
        well_known!(@consts 1; $($ident = $text,)*);

        pub const ALL: &[(Name, &str)] = &[$(($ident, $text),)*];
    };
    (@consts $index:expr; $ident:ident = $text:literal, $($rest:tt)*) => {
        pub const $ident: Name = Interned::from_index($index);
        well_known!(@consts $index + 1; $($rest)*);
    };
    (@consts $index:expr;) => {};
}

well_known! {
    VOID = "void",
    INT = "int",
    FLOAT = "float",
    BOOL = "bool",
    CHAR = "char",
    BYTE = "byte",
    LONG = "long",
    DOUBLE = "double",
    OBJECT = "object",
    INIT = "init",

    PROCESS = "Process",
    MESSAGE = "Message",
    MESSAGE_HANDLER = "MessageHandler",
    MESSAGE_HANDLER_FACTORY = "MessageHandlerFactory",
    BOX = "Box",
    SEND = "send",
    SPAWN = "spawn",
    GET_PID = "getPid",
    WAIT = "wait",
    RECEIVE_METHOD_RESULT = "receiveMethodResult",
    REGISTER_MESSAGE_HANDLER = "registerMessageHandler",
    REPLY = "reply",
    ID = "id",
    INTERFACE_ID = "interfaceId",
    PAYLOAD = "payload",
    VALUE = "value",

    HANDLE_MESSAGE = "handleMessage",
    CREATE_MESSAGE_HANDLER = "createMessageHandler",
    CALL = "call",
    MESSAGE_ARG = "message",
    TARGET = "target",
    RESULT = "result",
    CALLER_PID = "callerPid",
    PID = "pid",
    MESSAGE_HANDLER_ID = "messageHandlerId",
}

/// Primitive types whose values are copied rather than referenced.
pub const VALUE_TYPES: &[Name] = &[INT, FLOAT, BOOL, CHAR, BYTE, LONG, DOUBLE];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_follow_declaration_order() {
        for (index, (name, _)) in ALL.iter().enumerate() {
            let expected = u32::try_from(index + 1).unwrap();
            assert_eq!(*name, Interned::from_index(expected));
        }
        assert_eq!(ALL[0].1, "void");
    }
}
