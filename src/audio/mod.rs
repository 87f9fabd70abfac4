pub mod analysis;
pub mod anchor;
pub mod bands;
mod fanout;
pub mod features;
pub mod params;
pub mod peak;
mod pipeline;
pub mod ring;
pub mod window;
