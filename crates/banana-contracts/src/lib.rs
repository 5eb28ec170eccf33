pub mod events;
pub mod hook;
pub mod presets;
pub mod review;
pub mod runs;
