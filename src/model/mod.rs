mod body;
mod coordinates;
mod rocket;
mod system;

pub use body::{Body, BodyID, BodyInfo};
pub use coordinates::{CelestialCoordinates, OBLIQUITY_OF_THE_ECLIPTIC};
pub use rocket::{Condition, FlightProgram, Part, Resume, Rocket};
pub use system::{BodyRecord, NorthPoleRecord, OrbitRecord, System, SystemError};
