pub mod health;
pub mod movements;
pub mod workouts;
