// Domain layer: key schema, models and ports. Concrete stores live in adapters.

pub mod keys;
pub mod model;
pub mod ports;
