// Domain layer: plain data types and the collaborator ports the engine is injected with.

pub mod model;
pub mod ports;
