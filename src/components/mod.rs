pub mod controls;
pub mod globe;
pub mod network;
pub mod soundtrack;
pub mod window;
