pub mod anim;
pub mod controller;
pub mod entity;
pub mod physics;
pub mod tile;
