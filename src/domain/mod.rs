// Domain layer: the table model, request types, on-disk layout and ports.

pub mod model;
pub mod paths;
pub mod ports;
