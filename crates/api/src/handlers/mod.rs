pub mod clips;
pub mod shots;
pub mod voices;
