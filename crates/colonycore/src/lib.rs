//! `colonycore`: room state, connection fan-out, and the per-tick simulation
//! behind the colony server.
//!
//! One [`room::Room`] holds a generated tile world, its gophers, and a
//! resource ledger behind a single lock. The [`registry::RoomRegistry`]
//! creates rooms on first access and notifies a lifecycle observer, which is
//! how each room gets its [`ticker`] task. Connected transports register
//! with the [`hub::ConnectionHub`] through the [`hub::ClientSocket`]
//! contract; the [`session`] module drives one connected client from init
//! snapshot to deregistration.

pub mod hub;
pub mod mapgen;
pub mod registry;
pub mod room;
pub mod session;
pub mod sim;
pub mod ticker;
pub mod world;

pub use hub::{ClientSocket, ConnectionHub, SocketError};
pub use registry::{RoomLifecycle, RoomRegistry, WorldConfig};
pub use room::Room;
pub use session::ColonyService;
pub use sim::Simulation;
pub use ticker::{spawn_room_ticker, TickerHandle, TickerLifecycle};
pub use world::World;

/// One process-random u64, for worlds and simulations nobody asked to seed.
pub(crate) fn process_seed() -> u64 {
    let mut b = [0u8; 8];
    getrandom::getrandom(&mut b).expect("getrandom");
    u64::from_be_bytes(b)
}
