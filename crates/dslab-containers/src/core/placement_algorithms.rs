pub mod best_fit;
pub mod first_fit;
pub mod first_fit_threshold;
pub mod worst_fit;
