pub mod location;
pub mod outcome;
pub mod tenant;
