pub mod constants;
pub mod event;
pub mod filler;
pub mod fillers;
pub mod gen;
pub mod input;
pub mod ntuplizer_errors;
pub mod object_map;
pub mod pipeline;
