//! Domain models shared by the pipeline services and the HTTP routes.

pub mod assignment;
pub mod course;
pub mod schedule;
pub mod session;

pub use self::assignment::*;
pub use self::course::*;
pub use self::schedule::*;
pub use self::session::*;
