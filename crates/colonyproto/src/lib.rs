//! `colonyproto`: the JSON wire protocol shared by the colony server and its
//! clients.
//!
//! Every WebSocket text frame carries exactly one envelope:
//! `{"type": <string>, "payload": <type-specific>}`. Server-to-client types
//! are `init` (full room snapshot, once per connection), `update` (per-tick
//! delta), and the diagnostic `echo`/`error`. The only client-to-server type
//! is `cmd`, whose payload is a closed set of actions.
//!
//! The value types in [`state`] double as the server's domain vocabulary, so
//! a tile or gopher is serialized exactly as the simulation holds it.

pub mod state;
pub mod wire;

pub use state::{Gopher, GopherState, Inventory, Terrain, Tile, WOOD_CAP};
pub use wire::{ClientMsg, Command, Delta, ServerMsg, Snapshot};
