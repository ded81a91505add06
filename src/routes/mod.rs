pub mod health;
pub mod preferences;
pub mod qloo;
pub mod recommendations;
