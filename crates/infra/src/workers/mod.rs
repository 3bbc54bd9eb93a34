//! Background workers driving dispatch from a transport.

pub mod receive_worker;
