//! Boundary contracts for the transport collaborator

pub mod protocol;
