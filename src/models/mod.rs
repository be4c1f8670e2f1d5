pub mod ambulance;
pub mod audit;
pub mod incident;
pub mod material;
pub mod space;
pub mod user;
