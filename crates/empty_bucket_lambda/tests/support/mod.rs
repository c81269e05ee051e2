pub mod events;
pub mod fakes;
