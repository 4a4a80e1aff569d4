//! Wire types and REST helpers shared by the Reloj clock clients.

pub mod api;
