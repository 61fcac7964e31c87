// Interface adapters: wire protocol, content loading and network handling.

pub mod content;
pub mod http;
pub mod net;
pub mod protocol;
pub mod sink;
pub mod state;
