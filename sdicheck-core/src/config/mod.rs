// Environment variable access with substitution tracking.
pub mod env;
