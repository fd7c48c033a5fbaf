pub mod camera;
pub mod event;
pub mod level;
pub mod particles;
pub mod scene;
